//! # Memory Management
//!
//! Chained arenas, the registry of arena classes, and scope guards.
//!
//! ## Design Philosophy
//!
//! Memory is reclaimed in bulk, never per object:
//! - Allocation is a pointer bump
//! - A scope rewinds everything allocated after it in O(chain length)
//! - The frame arena is wiped once per iteration

pub mod arena;
mod registry;
mod scope;

pub use arena::{
    Allocation, Arena, ArenaCreateInfo, ScopeHandle, SlabAllocFn, SlabFreeFn, DEFAULT_MEMORY_SIZE,
    LINK_BYTES, META_BYTES,
};
pub use registry::{ArenaClass, ArenaRegistry};
pub use scope::{ManualScope, Scope, ScopedResource};
