//! # Arena Allocator
//!
//! A chained bump allocator for allocations that are released in bulk.
//!
//! An [`Arena`] is a chain of fixed-capacity slabs. Allocations bump the
//! front of the active slab; when it is exhausted a new slab is chained
//! behind it (memory is never resized in place). A [`ScopeHandle`] records
//! the current `(depth, front)` so everything allocated after it can be
//! dropped in one step.
//!
//! ## Slab layout
//!
//! ```text
//! ┌──────────┬──────┬──────────┬──────┬─────────── ─ ─ ──┬──────┐
//! │ alloc 0  │ size │ alloc 1  │ size │      free        │ link │
//! └──────────┴──────┴──────────┴──────┴─────────── ─ ─ ──┴──────┘
//!  ▲ offset 0                         ▲ front              ▲ capacity - 4
//! ```
//!
//! - Every allocation is rounded up to 4 bytes and followed by a 4-byte
//!   metadata word holding its size.
//! - The last word of each slab is the chain link: the index of the next
//!   slab, or `u32::MAX` if there is none.
//!
//! ## Liveness
//!
//! Every allocation gets a serial number from a counter that only grows.
//! Each slab keeps its live allocations, oldest first, as `(offset, end,
//! serial)`; rewinding a slab drops the entries above the new front. A
//! handle is live only while its exact entry is still on that stack, so a
//! handle whose memory was rolled back and handed out again is caught.
//!
//! ## Thread Safety
//!
//! This arena is NOT thread-safe. Use one arena per thread.

use std::fmt;

use bytemuck::Pod;

use crate::error::{MemError, MemResult};

/// Size of the metadata word stored after every allocation.
pub const META_BYTES: u32 = 4;

/// Size of the chain link word reserved at the tail of every slab.
pub const LINK_BYTES: u32 = 4;

/// Default slab capacity in bytes (32 MiB).
pub const DEFAULT_MEMORY_SIZE: u32 = 4096 * 256 * 32;

/// Link word value for the last slab of a chain.
const NO_LINK: u32 = u32::MAX;

/// Acquires backing memory for a slab of the given capacity in bytes.
pub type SlabAllocFn = fn(u32) -> Box<[u32]>;

/// Releases backing memory previously returned by a [`SlabAllocFn`].
pub type SlabFreeFn = fn(Box<[u32]>);

/// Allocates zeroed slab memory from the process heap.
#[must_use]
pub fn heap_alloc(bytes: u32) -> Box<[u32]> {
    vec![0u32; (bytes / 4) as usize].into_boxed_slice()
}

/// Returns slab memory to the process heap.
pub fn heap_free(memory: Box<[u32]>) {
    drop(memory);
}

/// Rounds `size` up to the next multiple of 4.
#[inline]
#[must_use]
pub const fn align4(size: u32) -> u32 {
    assert!(size <= u32::MAX - 3, "allocation size overflows the arena's address space");
    (size + 3) & !3
}

/// Parameters for [`Arena::create`].
#[derive(Clone, Copy, Debug)]
pub struct ArenaCreateInfo {
    /// Slab memory acquisition. Only used for slabs the arena owns.
    pub alloc: SlabAllocFn,
    /// Slab memory release. Only used for slabs the arena owns.
    pub free: SlabFreeFn,
    /// Capacity of the first slab in bytes, and the minimum capacity of
    /// every chained slab. Must be a multiple of 4.
    pub memory_size: u32,
}

impl ArenaCreateInfo {
    /// Heap-backed create info with the given slab capacity.
    #[must_use]
    pub fn with_memory_size(memory_size: u32) -> Self {
        Self {
            memory_size,
            ..Self::default()
        }
    }
}

impl Default for ArenaCreateInfo {
    fn default() -> Self {
        Self {
            alloc: heap_alloc,
            free: heap_free,
            memory_size: DEFAULT_MEMORY_SIZE,
        }
    }
}

/// Location of a single arena allocation.
///
/// An allocation is only valid until the scope it was made in unwinds or
/// its arena is cleared. Reading through a dead allocation panics, even if
/// the same bytes have since been allocated again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Allocation {
    pub(crate) depth: u32,
    pub(crate) offset: u32,
    pub(crate) size: u32,
    pub(crate) serial: u64,
}

impl Allocation {
    /// Index of the slab in the chain.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Byte offset within the slab.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.offset
    }

    /// Size in bytes, rounded up to a multiple of 4.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Position in the arena's allocation order.
    #[inline]
    #[must_use]
    pub const fn serial(&self) -> u64 {
        self.serial
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Allocation(depth={}, off={}, size={})",
            self.depth, self.offset, self.size
        )
    }
}

/// A checkpoint in an arena chain.
///
/// The position is packed as `depth << 32 | front`. The serial is the
/// first one handed out after the checkpoint, so anything older belongs to
/// the memory the checkpoint preserves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct ScopeHandle {
    packed: u64,
    serial: u64,
}

impl ScopeHandle {
    #[inline]
    const fn new(depth: u32, front: u32, serial: u64) -> Self {
        Self {
            packed: ((depth as u64) << 32) | front as u64,
            serial,
        }
    }

    /// The packed position.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.packed
    }

    /// Chain depth of the checkpoint.
    #[inline]
    #[must_use]
    pub const fn depth(self) -> u32 {
        (self.packed >> 32) as u32
    }

    /// Front of the checkpoint's slab.
    #[inline]
    #[must_use]
    pub const fn front(self) -> u32 {
        self.packed as u32
    }

    /// Serial of the first allocation made after the checkpoint.
    #[inline]
    #[must_use]
    pub const fn serial(self) -> u64 {
        self.serial
    }
}

/// A live allocation as recorded by its slab.
#[derive(Clone, Copy)]
struct Entry {
    offset: u32,
    end: u32,
    serial: u64,
}

/// One link of the chain.
struct Slab {
    memory: Box<[u32]>,
    front: u32,
    /// Live allocations in address order. The last one ends at `front`.
    live: Vec<Entry>,
    /// False for memory handed to [`Arena::with_memory`].
    owned: bool,
}

impl Slab {
    fn new(mut memory: Box<[u32]>, owned: bool) -> Self {
        if let Some(link) = memory.last_mut() {
            *link = NO_LINK;
        }
        Self {
            memory,
            front: 0,
            live: Vec::new(),
            owned,
        }
    }

    /// Moves the front back to `front`, forgetting everything above it.
    fn rewind(&mut self, front: u32) {
        self.front = front;
        let keep = self.live.partition_point(|e| e.offset < front);
        self.live.truncate(keep);
    }

    fn entry(&self, allocation: Allocation) -> Option<&Entry> {
        let i = self
            .live
            .binary_search_by_key(&allocation.offset, |e| e.offset)
            .ok()?;
        let entry = &self.live[i];
        (entry.serial == allocation.serial).then_some(entry)
    }

    #[inline]
    fn capacity(&self) -> u32 {
        (self.memory.len() * 4) as u32
    }

    #[inline]
    fn fits(&self, size: u32) -> bool {
        u64::from(self.front) + u64::from(size) + u64::from(META_BYTES)
            <= u64::from(self.capacity() - LINK_BYTES)
    }

    fn set_link(&mut self, next: u32) {
        if let Some(link) = self.memory.last_mut() {
            *link = next;
        }
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.memory)
    }

    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.memory)
    }
}

/// A chained bump-pointer arena.
///
/// Allocation is a bump of the active slab's front. Memory is reclaimed all
/// at once through [`Arena::clear`] or [`Arena::destroy_scope`]; only the
/// most recent allocation can be freed individually.
///
/// # Example
///
/// ```rust
/// use vkclicker_mem::{Arena, ArenaCreateInfo};
///
/// let mut arena = Arena::create(ArenaCreateInfo::with_memory_size(1024));
/// let scope = arena.create_scope();
/// let block = arena.alloc(40);
/// assert_eq!(block.offset(), 0);
/// arena.destroy_scope(scope);
/// assert_eq!(arena.front(), 0);
/// ```
pub struct Arena {
    info: ArenaCreateInfo,
    /// Index is the chain depth. Never empty.
    slabs: Vec<Slab>,
    next_serial: u64,
}

impl Arena {
    /// Creates an arena whose first slab is acquired through `info.alloc`.
    ///
    /// # Panics
    ///
    /// Panics if `info.memory_size` cannot hold a single allocation's
    /// metadata plus the link word, or is not a multiple of 4.
    #[must_use]
    pub fn create(info: ArenaCreateInfo) -> Self {
        Self::validate(&info);
        let memory = (info.alloc)(info.memory_size);
        Self::from_first_slab(info, Slab::new(memory, true))
    }

    /// Creates an arena over memory owned by the caller.
    ///
    /// The memory is handed back by [`Arena::destroy`]. Chained slabs are
    /// still acquired through `info.alloc`.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`Arena::create`], or if the
    /// memory does not hold exactly `info.memory_size` bytes.
    #[must_use]
    pub fn with_memory(info: ArenaCreateInfo, memory: Box<[u32]>) -> Self {
        Self::validate(&info);
        assert_eq!(
            memory.len() * 4,
            info.memory_size as usize,
            "pre-owned memory does not match the arena's memory size"
        );
        Self::from_first_slab(info, Slab::new(memory, false))
    }

    fn validate(info: &ArenaCreateInfo) {
        assert!(
            info.memory_size > META_BYTES + LINK_BYTES,
            "arena memory size {} cannot hold a single allocation",
            info.memory_size
        );
        assert!(
            info.memory_size % 4 == 0,
            "arena memory size {} is not a multiple of 4",
            info.memory_size
        );
    }

    fn from_first_slab(info: ArenaCreateInfo, slab: Slab) -> Self {
        let mut slabs = Vec::with_capacity(4);
        slabs.push(slab);
        Self {
            info,
            slabs,
            next_serial: 0,
        }
    }

    /// Destroys the arena, releasing every owned slab deepest first.
    ///
    /// Returns the caller's memory if the arena was created with
    /// [`Arena::with_memory`].
    #[must_use]
    pub fn destroy(mut self) -> Option<Box<[u32]>> {
        let mut preowned = None;
        for slab in std::mem::take(&mut self.slabs).into_iter().rev() {
            if slab.owned {
                (self.info.free)(slab.memory);
            } else {
                preowned = Some(slab.memory);
            }
        }
        preowned
    }

    /// Bump-allocates at least `size` zeroed bytes, 4-byte aligned.
    ///
    /// When the active slab cannot fit the request, the next empty slab that
    /// can is used; if there is none a new slab of
    /// `max(memory_size, size + META_BYTES + LINK_BYTES)` bytes is chained.
    ///
    /// # Panics
    ///
    /// Panics if the rounded request cannot be addressed by a slab.
    pub fn alloc(&mut self, size: u32) -> Allocation {
        let size = align4(size);
        let mut depth = self.depth();

        if !self.slabs[depth].fits(size) {
            if self.slabs[depth].front > 0 {
                depth += 1;
            }
            // Every slab from `depth` on is empty, so their order is free:
            // move one that fits into place rather than leave a gap.
            match self.slabs[depth..].iter().position(|s| s.fits(size)) {
                Some(i) => self.slabs.swap(depth, depth + i),
                None => {
                    self.chain(size);
                    let last = self.slabs.len() - 1;
                    self.slabs.swap(depth, last);
                }
            }
            self.relink();
        }

        let serial = self.next_serial;
        self.next_serial += 1;

        let slab = &mut self.slabs[depth];
        let offset = slab.front;
        slab.front += size + META_BYTES;
        let meta = ((slab.front - META_BYTES) / 4) as usize;
        slab.memory[meta] = size;
        slab.bytes_mut()[offset as usize..(offset + size) as usize].fill(0);
        slab.live.push(Entry {
            offset,
            end: slab.front,
            serial,
        });

        debug_assert!(
            self.slabs[depth + 1..].iter().all(|s| s.front == 0),
            "slabs past the active one must be empty"
        );

        Allocation {
            depth: depth as u32,
            offset,
            size,
            serial,
        }
    }

    /// Allocates `count` zero-initialised `T`s and returns their location.
    ///
    /// # Panics
    ///
    /// Panics if the byte size of the request does not fit in a `u32`.
    pub fn new_slice<T: Pod>(&mut self, count: usize) -> Allocation {
        let bytes = std::mem::size_of::<T>()
            .checked_mul(count)
            .and_then(|b| u32::try_from(b).ok())
            .expect("typed allocation exceeds the arena's address space");
        self.alloc(bytes)
    }

    fn chain(&mut self, size: u32) {
        let needed = size
            .checked_add(META_BYTES + LINK_BYTES)
            .expect("allocation size overflows the arena's address space");
        let capacity = self.info.memory_size.max(needed);
        let memory = (self.info.alloc)(capacity);
        assert_eq!(
            memory.len() * 4,
            capacity as usize,
            "slab allocator returned the wrong amount of memory"
        );

        self.slabs.push(Slab::new(memory, true));

        tracing::debug!(
            slabs = self.slabs.len(),
            capacity,
            "arena chained a new slab"
        );
    }

    /// Rewrites every slab's link word after the chain changed shape.
    fn relink(&mut self) {
        let last = self.slabs.len() - 1;
        for (i, slab) in self.slabs.iter_mut().enumerate() {
            slab.set_link(if i == last { NO_LINK } else { i as u32 + 1 });
        }
    }

    /// Frees `allocation` if it is the most recent allocation of the active
    /// slab.
    ///
    /// # Errors
    ///
    /// Returns [`MemError::NotOnTop`] for any other allocation, including
    /// one that was already rolled back. The arena is left unchanged.
    pub fn free(&mut self, allocation: Allocation) -> MemResult<()> {
        let depth = self.depth();
        let slab = &mut self.slabs[depth];

        if allocation.depth as usize == depth {
            if let Some(top) = slab.live.last() {
                if top.offset == allocation.offset && top.serial == allocation.serial {
                    slab.rewind(allocation.offset);
                    return Ok(());
                }
            }
        }

        Err(MemError::NotOnTop {
            depth: allocation.depth,
            offset: allocation.offset,
        })
    }

    /// Resets every slab in the chain. No memory is released.
    pub fn clear(&mut self) {
        for slab in &mut self.slabs {
            slab.rewind(0);
        }
    }

    /// Records the current end of the chain.
    pub fn create_scope(&self) -> ScopeHandle {
        let mut depth = 0;
        while depth + 1 < self.slabs.len() && self.slabs[depth + 1].front > 0 {
            depth += 1;
        }
        ScopeHandle::new(depth as u32, self.slabs[depth].front, self.next_serial)
    }

    /// Drops everything allocated since `handle` was created.
    ///
    /// Slabs deeper than the checkpoint are cleared entirely, then the
    /// checkpoint's slab is rewound to the recorded front.
    ///
    /// # Panics
    ///
    /// Panics if the memory below the checkpoint is no longer the memory
    /// that was there when the checkpoint was taken. That happens when
    /// scopes are restored out of order: an enclosing scope already rewound
    /// past this one, whether or not the space has been reused since.
    pub fn destroy_scope(&mut self, handle: ScopeHandle) {
        let depth = handle.depth() as usize;
        let front = handle.front();

        assert!(
            self.checkpoint_intact(handle),
            "scope (depth={}, front={}) restored out of order: arena is at (depth={}, front={})",
            depth,
            front,
            self.depth(),
            self.front()
        );

        for slab in &mut self.slabs[depth + 1..] {
            slab.rewind(0);
        }
        self.slabs[depth].rewind(front);
    }

    /// The allocation that ended at the checkpoint must still be live and
    /// older than the checkpoint.
    fn checkpoint_intact(&self, handle: ScopeHandle) -> bool {
        let depth = handle.depth() as usize;
        let front = handle.front();
        let Some(slab) = self.slabs.get(depth) else {
            return false;
        };
        if depth > self.depth() || front > slab.front {
            return false;
        }
        if front == 0 {
            return true;
        }
        let below = slab.live.partition_point(|e| e.offset < front);
        below > 0 && {
            let boundary = slab.live[below - 1];
            boundary.end == front && boundary.serial < handle.serial()
        }
    }

    /// Index of the active slab: the last one with a nonzero front, or 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.slabs.iter().rposition(|s| s.front > 0).unwrap_or(0)
    }

    /// Front of the active slab.
    #[must_use]
    pub fn front(&self) -> u32 {
        self.slabs[self.depth()].front
    }

    /// Front of the slab at `depth`, if it exists.
    #[must_use]
    pub fn front_at(&self, depth: usize) -> Option<u32> {
        self.slabs.get(depth).map(|s| s.front)
    }

    /// Capacity of the slab at `depth`, if it exists.
    #[must_use]
    pub fn capacity_at(&self, depth: usize) -> Option<u32> {
        self.slabs.get(depth).map(Slab::capacity)
    }

    /// Number of slabs in the chain.
    #[must_use]
    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    /// Capacity of the first slab in bytes.
    #[must_use]
    pub const fn memory_size(&self) -> u32 {
        self.info.memory_size
    }

    /// Returns true if every slab in the chain is empty.
    #[must_use]
    pub fn is_unwound(&self) -> bool {
        self.slabs.iter().all(|s| s.front == 0)
    }

    /// Coarse footprint: slab count times the first slab's capacity.
    #[must_use]
    pub fn total_used_memory(&self) -> u64 {
        self.slabs.len() as u64 * u64::from(self.info.memory_size)
    }

    /// Exact number of bytes in use, metadata included.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.slabs.iter().map(|s| u64::from(s.front)).sum()
    }

    /// Returns true if `allocation` has not been rolled back.
    ///
    /// Memory that was rolled back and allocated again belongs to the new
    /// allocation only.
    #[must_use]
    pub fn is_live(&self, allocation: Allocation) -> bool {
        self.slabs
            .get(allocation.depth as usize)
            .and_then(|s| s.entry(allocation))
            .is_some_and(|e| e.end - e.offset == allocation.size + META_BYTES)
    }

    /// Bytes of a live allocation.
    ///
    /// # Panics
    ///
    /// Panics if the allocation has been rolled back.
    #[must_use]
    pub fn bytes(&self, allocation: Allocation) -> &[u8] {
        self.assert_live(allocation);
        let start = allocation.offset as usize;
        &self.slabs[allocation.depth as usize].bytes()[start..start + allocation.size as usize]
    }

    /// Mutable bytes of a live allocation.
    ///
    /// # Panics
    ///
    /// Panics if the allocation has been rolled back.
    #[must_use]
    pub fn bytes_mut(&mut self, allocation: Allocation) -> &mut [u8] {
        self.assert_live(allocation);
        let start = allocation.offset as usize;
        &mut self.slabs[allocation.depth as usize].bytes_mut()[start..start + allocation.size as usize]
    }

    fn assert_live(&self, allocation: Allocation) {
        assert!(
            self.is_live(allocation),
            "stale allocation {allocation}: its scope has been unwound"
        );
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        for slab in std::mem::take(&mut self.slabs).into_iter().rev() {
            if slab.owned {
                (self.info.free)(slab.memory);
            }
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("memory_size", &self.info.memory_size)
            .field("slabs", &self.slabs.len())
            .field("depth", &self.depth())
            .field("front", &self.front())
            .finish()
    }
}
