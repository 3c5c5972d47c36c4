//! # Semantic Containers
//!
//! Non-owning handles over arena storage. None of them free memory
//! individually; their storage goes away with the scope or arena it came
//! from.
//!
//! Element types are [`bytemuck::Pod`]. Every read and write goes through
//! the [`ArenaRegistry`](crate::ArenaRegistry), so a handle used after its
//! memory was rolled back panics instead of reading reused bytes.

mod arr;
mod dyn_arr;
mod link;
mod map;
mod queue;
mod set;
mod str;

pub use arr::Arr;
pub use dyn_arr::DynArr;
pub use link::{Link, LinkIter};
pub use map::Map;
pub use queue::Queue;
pub use set::Set;
pub use str::Str;
