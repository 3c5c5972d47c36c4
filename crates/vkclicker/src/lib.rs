//! # VKCLICKER
//!
//! The render loop crate, integrating the memory layer.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         VKCLICKER                                │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐    binds     ┌───────────────────────────┐  │
//! │  │ GpuCore         │─────────────>│ ManualScope (long-lived)  │  │
//! │  │ instance, device│              └───────────────────────────┘  │
//! │  │ swapchain, pipe │                                             │
//! │  └─────────────────┘                                             │
//! │  ┌─────────────────┐    per frame ┌───────────────────────────┐  │
//! │  │ RenderLoop      │─────────────>│ Scope (scratch) + frame() │  │
//! │  │ scene workload  │              └───────────────────────────┘  │
//! │  └─────────────────┘                                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: `vkclicker.toml` loading
//! - `device`: stand-in device objects bound to a manual scope
//! - `render_loop`: frame orchestration and timing
//! - `scene`: per-frame culling and sorting workload

pub mod config;
pub mod device;
pub mod render_loop;
pub mod scene;

pub use config::{AppConfig, RenderConfig, DEFAULT_CONFIG_PATH};
pub use device::{DeviceObject, GpuCore, ObjectKind};
pub use render_loop::{FrameContext, FrameStats, FrameStatsAccumulator, RenderLoop};
pub use scene::{build_draw_list, DrawList, Quad};
