//! # VKCLICKER Memory Layer
//!
//! Region-based memory for a real-time render loop:
//! - Chained bump arenas with O(1) scope rollback
//! - A registry of arena classes (scratch, frame, long-lived)
//! - Scope guards that tear down bound resources before memory is reused
//! - Arena-backed containers that never free individually
//!
//! ## Architecture Rules
//!
//! 1. **No per-object deallocation** - memory is reclaimed by scope or frame
//! 2. **Fatal on misuse** - capacity overflows and stale handles panic
//! 3. **Explicit context** - the registry is passed around, never global
//!
//! ## Example
//!
//! ```rust
//! use vkclicker_mem::{ArenaClass, ArenaRegistry, DynArr, RegistryConfig};
//!
//! let mut mem = ArenaRegistry::init(&RegistryConfig::default()).unwrap();
//!
//! for _ in 0..3 {
//!     {
//!         let mut scratch = mem.scope(ArenaClass::Scratch);
//!         let mut visible = DynArr::new(&mut scratch, ArenaClass::Scratch, 64);
//!         visible.add(&mut scratch, 7u32);
//!     }
//!     mem.frame();
//! }
//!
//! mem.end();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod containers;
pub mod error;
pub mod memory;

pub use config::RegistryConfig;
pub use containers::{Arr, DynArr, Link, LinkIter, Map, Queue, Set, Str};
pub use error::{MemError, MemResult};
pub use memory::{
    Allocation, Arena, ArenaClass, ArenaCreateInfo, ArenaRegistry, ManualScope, Scope,
    ScopeHandle, ScopedResource,
};
