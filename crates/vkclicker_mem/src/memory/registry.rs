//! # Arena Registry
//!
//! The set of named arenas every subsystem allocates from.
//!
//! | class | cleared |
//! |---|---|
//! | [`ArenaClass::Scratch`] | only when its scope unwinds; leak-checked every frame |
//! | [`ArenaClass::Frame`] | unconditionally by [`ArenaRegistry::frame`] |
//! | [`ArenaClass::LongLived`] | by explicit scope teardown or [`ArenaRegistry::end`] |
//!
//! The registry is an explicit context object: build one with
//! [`ArenaRegistry::init`], thread it through the render loop, and retire it
//! with [`ArenaRegistry::end`].

use std::fmt;

use bytemuck::Pod;

use crate::config::RegistryConfig;
use crate::containers::Arr;
use crate::error::MemResult;
use crate::memory::arena::{Allocation, Arena, ArenaCreateInfo};
use crate::memory::scope::{ManualScope, Scope};

/// Lifetime class of an arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArenaClass {
    /// Short-lived working memory. Must be unwound before the frame ends.
    Scratch,
    /// Per-iteration memory, cleared once per frame.
    Frame,
    /// Long-lived memory, numbered from zero.
    LongLived(u8),
}

impl ArenaClass {
    /// The first long-lived class.
    pub const PERSISTENT: Self = Self::LongLived(0);

    /// Slot of this class in the registry.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Scratch => 0,
            Self::Frame => 1,
            Self::LongLived(n) => 2 + n as usize,
        }
    }
}

impl fmt::Display for ArenaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scratch => write!(f, "scratch"),
            Self::Frame => write!(f, "frame"),
            Self::LongLived(n) => write!(f, "long-lived #{n}"),
        }
    }
}

/// The process's arenas, indexed by [`ArenaClass`].
///
/// # Example
///
/// ```rust
/// use vkclicker_mem::{ArenaClass, ArenaRegistry, RegistryConfig};
///
/// let config = RegistryConfig::default()
///     .with_scratch_size(4096)
///     .with_frame_size(4096)
///     .with_long_lived(1, 4096);
/// let mut mem = ArenaRegistry::init(&config).unwrap();
///
/// {
///     let mut scope = mem.scope(ArenaClass::Scratch);
///     let layers = scope.alloc::<u32>(ArenaClass::Scratch, 4);
///     layers.set(&mut scope, 0, 7);
/// } // scratch rewound here
///
/// mem.frame();
/// mem.end();
/// ```
pub struct ArenaRegistry {
    arenas: Vec<Arena>,
    frame_index: u64,
}

impl ArenaRegistry {
    /// Builds every arena described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`MemError::InvalidConfig`](crate::error::MemError::InvalidConfig)
    /// if the configuration fails validation.
    pub fn init(config: &RegistryConfig) -> MemResult<Self> {
        config.validate()?;

        let mut arenas = Vec::with_capacity(config.arena_count());
        arenas.push(Arena::create(ArenaCreateInfo::with_memory_size(
            config.scratch_size,
        )));
        arenas.push(Arena::create(ArenaCreateInfo::with_memory_size(
            config.frame_size,
        )));
        for n in 0..config.effective_long_lived_count() as usize {
            arenas.push(Arena::create(ArenaCreateInfo::with_memory_size(
                config.long_lived_size(n),
            )));
        }

        tracing::debug!(
            arenas = arenas.len(),
            scratch = config.scratch_size,
            frame = config.frame_size,
            "arena registry initialised"
        );

        Ok(Self {
            arenas,
            frame_index: 0,
        })
    }

    /// Destroys every arena.
    pub fn end(self) {
        let frames = self.frame_index;
        for arena in self.arenas {
            drop(arena.destroy());
        }
        tracing::debug!(frames, "arena registry ended");
    }

    /// Number of arenas in the registry.
    #[must_use]
    pub fn arena_count(&self) -> usize {
        self.arenas.len()
    }

    /// Number of completed [`Self::frame`] calls.
    #[must_use]
    pub const fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The arena of `class`.
    ///
    /// # Panics
    ///
    /// Panics if `class` names a long-lived arena that was not configured.
    #[must_use]
    pub fn arena(&self, class: ArenaClass) -> &Arena {
        let count = self.arenas.len();
        self.arenas
            .get(class.index())
            .unwrap_or_else(|| panic!("{class} arena is not configured ({count} arenas)"))
    }

    /// The arena of `class`, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `class` names a long-lived arena that was not configured.
    #[must_use]
    pub fn arena_mut(&mut self, class: ArenaClass) -> &mut Arena {
        let count = self.arenas.len();
        self.arenas
            .get_mut(class.index())
            .unwrap_or_else(|| panic!("{class} arena is not configured ({count} arenas)"))
    }

    /// Bump-allocates `size` raw zeroed bytes from `class`.
    pub fn alloc_bytes(&mut self, class: ArenaClass, size: u32) -> Allocation {
        self.arena_mut(class).alloc(size)
    }

    /// Allocates `count` zero-initialised `T`s from `class`.
    pub fn alloc<T: Pod>(&mut self, class: ArenaClass, count: usize) -> Arr<T> {
        let allocation = self.arena_mut(class).new_slice::<T>(count);
        Arr::from_raw_parts(class, allocation, count)
    }

    /// Frees the most recent allocation of `class`.
    ///
    /// # Errors
    ///
    /// Returns [`MemError::NotOnTop`](crate::error::MemError::NotOnTop) if
    /// `allocation` is not on top.
    pub fn free(&mut self, class: ArenaClass, allocation: Allocation) -> MemResult<()> {
        self.arena_mut(class).free(allocation)
    }

    /// Bytes of a live allocation.
    #[must_use]
    pub fn bytes(&self, class: ArenaClass, allocation: Allocation) -> &[u8] {
        self.arena(class).bytes(allocation)
    }

    /// Mutable bytes of a live allocation.
    #[must_use]
    pub fn bytes_mut(&mut self, class: ArenaClass, allocation: Allocation) -> &mut [u8] {
        self.arena_mut(class).bytes_mut(allocation)
    }

    /// Opens a scope that rewinds `class` when dropped.
    pub fn scope(&mut self, class: ArenaClass) -> Scope<'_> {
        let handle = self.arena(class).create_scope();
        Scope::new(self, class, handle)
    }

    /// Opens a scope that rewinds `class` only when explicitly cleared.
    pub fn manual_scope(&self, class: ArenaClass) -> ManualScope {
        ManualScope::new(class, self.arena(class).create_scope())
    }

    /// Marks the end of a render iteration.
    ///
    /// Clears the frame arena. In debug builds, panics if any scratch
    /// allocation outlived the iteration that made it.
    pub fn frame(&mut self) {
        debug_assert!(
            self.arena(ArenaClass::Scratch).is_unwound(),
            "scratch allocations survived frame {}: {} bytes still in use",
            self.frame_index,
            self.arena(ArenaClass::Scratch).used_bytes()
        );

        self.arena_mut(ArenaClass::Frame).clear();
        self.frame_index += 1;

        tracing::trace!(frame = self.frame_index, "frame arena cleared");
    }
}

impl fmt::Debug for ArenaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaRegistry")
            .field("arenas", &self.arenas)
            .field("frame_index", &self.frame_index)
            .finish()
    }
}
