//! # Circular Queue
//!
//! A ring buffer that keeps the most recent `capacity` values. Adding to a
//! full queue evicts the oldest value.

use bytemuck::Pod;

use crate::containers::Arr;
use crate::memory::{ArenaClass, ArenaRegistry};

/// A fixed-capacity FIFO with overwrite-oldest eviction.
#[derive(Debug)]
pub struct Queue<T: Pod> {
    arr: Arr<T>,
    count: usize,
    front: usize,
}

impl<T: Pod> Queue<T> {
    /// Allocates a queue of `capacity` slots from `class`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(registry: &mut ArenaRegistry, class: ArenaClass, capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be greater than zero");
        Self {
            arr: Arr::new(registry, class, capacity),
            count: 0,
            front: 0,
        }
    }

    #[inline]
    fn slot(&self, i: usize) -> usize {
        (self.front + i) % self.arr.len()
    }

    /// Appends `value`, returning the evicted oldest value if the queue was
    /// full.
    pub fn add(&mut self, registry: &mut ArenaRegistry, value: T) -> Option<T> {
        if self.count == self.arr.len() {
            let evicted = self.arr.get(registry, self.front);
            self.arr.set(registry, self.front, value);
            self.front = self.slot(1);
            return Some(evicted);
        }
        self.arr.set(registry, self.slot(self.count), value);
        self.count += 1;
        None
    }

    /// The oldest value.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    #[must_use]
    pub fn peek(&self, registry: &ArenaRegistry) -> T {
        assert!(self.count > 0, "peek on an empty queue");
        self.arr.get(registry, self.front)
    }

    /// Removes and returns the oldest value.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    pub fn pop(&mut self, registry: &ArenaRegistry) -> T {
        assert!(self.count > 0, "pop on an empty queue");
        let value = self.arr.get(registry, self.front);
        self.front = self.slot(1);
        self.count -= 1;
        value
    }

    /// Forgets every value.
    pub fn clear(&mut self) {
        self.count = 0;
        self.front = 0;
    }

    /// Number of queued values.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if nothing is queued.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.arr.len()
    }

    /// Iterates from oldest to newest.
    pub fn iter<'a>(&self, registry: &'a ArenaRegistry) -> impl Iterator<Item = T> + 'a {
        let arr = self.arr;
        let front = self.front;
        (0..self.count).map(move |i| arr.get(registry, (front + i) % arr.len()))
    }

    /// Copies the queued values, oldest first, into an array from `class`.
    pub fn to_arr(&self, registry: &mut ArenaRegistry, class: ArenaClass) -> Arr<T> {
        let out = Arr::new(registry, class, self.count);
        for i in 0..self.count {
            let value = self.arr.get(registry, self.slot(i));
            out.set(registry, i, value);
        }
        out
    }
}
