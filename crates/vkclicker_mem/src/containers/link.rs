//! # Append List
//!
//! A singly-linked list used to collect an unknown number of values before
//! flattening them into an [`Arr`].
//!
//! Every [`Link::add`] allocates one node and prepends it. Nodes are never
//! freed individually.

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::Pod;

use crate::containers::Arr;
use crate::memory::arena::align4;
use crate::memory::{Allocation, ArenaClass, ArenaRegistry};

/// Node layout: `[value | next depth | next offset | next serial]`.
const NEXT_BYTES: u32 = 16;

/// Depth stored in the last node's next pointer.
const END: u32 = u32::MAX;

/// An arena-backed singly-linked list, newest node first.
pub struct Link<T: Pod> {
    class: ArenaClass,
    head: Option<Allocation>,
    _phantom: PhantomData<T>,
}

impl<T: Pod> Clone for Link<T> {
    fn clone(&self) -> Self {
        Self {
            class: self.class,
            head: self.head,
            _phantom: PhantomData,
        }
    }
}

impl<T: Pod> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("class", &self.class)
            .field("head", &self.head)
            .finish()
    }
}

impl<T: Pod> Link<T> {
    /// An empty list whose nodes will be allocated from `class`.
    #[must_use]
    pub const fn new(class: ArenaClass) -> Self {
        Self {
            class,
            head: None,
            _phantom: PhantomData,
        }
    }

    /// Arena class the nodes are allocated from.
    #[must_use]
    pub const fn class(&self) -> ArenaClass {
        self.class
    }

    /// Returns true if nothing has been added.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn value_bytes() -> u32 {
        let size = u32::try_from(size_of::<T>()).unwrap_or(u32::MAX);
        align4(size)
    }

    /// Allocates a node holding `value` and makes it the head.
    pub fn add(&mut self, registry: &mut ArenaRegistry, value: T) {
        let value_bytes = Self::value_bytes();
        let node = registry.alloc_bytes(self.class, value_bytes + NEXT_BYTES);
        let (depth, offset, serial) = self
            .head
            .map_or((END, 0, 0), |h| (h.depth, h.offset, h.serial));

        let bytes = registry.bytes_mut(self.class, node);
        let (value_slot, next_slot) = bytes.split_at_mut(value_bytes as usize);
        value_slot[..size_of::<T>()].copy_from_slice(bytemuck::bytes_of(&value));
        next_slot[..4].copy_from_slice(&depth.to_le_bytes());
        next_slot[4..8].copy_from_slice(&offset.to_le_bytes());
        next_slot[8..16].copy_from_slice(&serial.to_le_bytes());

        self.head = Some(node);
    }

    /// Walks the nodes, newest first.
    pub fn iter<'a>(&self, registry: &'a ArenaRegistry) -> LinkIter<'a, T> {
        LinkIter {
            registry,
            class: self.class,
            next: self.head,
            _phantom: PhantomData,
        }
    }

    /// Number of nodes. Walks the whole list.
    #[must_use]
    pub fn len(&self, registry: &ArenaRegistry) -> usize {
        self.iter(registry).count()
    }

    /// Flattens the list into an array allocated from `class`, oldest value
    /// first.
    pub fn to_arr(&self, registry: &mut ArenaRegistry, class: ArenaClass) -> Arr<T> {
        let len = self.len(registry);
        let out = Arr::new(registry, class, len);
        let mut next = self.head;
        for i in (0..len).rev() {
            let Some(node) = next else { break };
            let (value, after) = read_node::<T>(registry, self.class, node);
            out.set(registry, i, value);
            next = after;
        }
        out
    }
}

fn read_node<T: Pod>(
    registry: &ArenaRegistry,
    class: ArenaClass,
    node: Allocation,
) -> (T, Option<Allocation>) {
    let bytes = registry.bytes(class, node);
    let value_bytes = node.size - NEXT_BYTES;
    let value = bytemuck::pod_read_unaligned(&bytes[..size_of::<T>()]);

    let next_slot = &bytes[value_bytes as usize..];
    let word = |at: usize| {
        u32::from_le_bytes([next_slot[at], next_slot[at + 1], next_slot[at + 2], next_slot[at + 3]])
    };
    let depth = word(0);
    let next = (depth != END).then(|| Allocation {
        depth,
        offset: word(4),
        size: node.size,
        serial: u64::from(word(8)) | (u64::from(word(12)) << 32),
    });
    (value, next)
}

/// Iterator over a [`Link`], newest value first.
pub struct LinkIter<'a, T: Pod> {
    registry: &'a ArenaRegistry,
    class: ArenaClass,
    next: Option<Allocation>,
    _phantom: PhantomData<T>,
}

impl<T: Pod> Iterator for LinkIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let node = self.next?;
        let (value, next) = read_node::<T>(self.registry, self.class, node);
        self.next = next;
        Some(value)
    }
}
