//! # Fixed Array
//!
//! A bounds-checked, fixed-length view over one arena allocation.
//!
//! The array does not own its memory. Elements are copied in and out through
//! the registry, which checks that the allocation has not been rolled back.
//!
//! # Example
//!
//! ```rust
//! use vkclicker_mem::{Arr, ArenaClass, ArenaRegistry, RegistryConfig};
//!
//! let mut mem = ArenaRegistry::init(&RegistryConfig::default().with_frame_size(4096)).unwrap();
//! let scores: Arr<u32> = Arr::new(&mut mem, ArenaClass::Frame, 3);
//! scores.set(&mut mem, 0, 30);
//! scores.set(&mut mem, 1, 10);
//! scores.set(&mut mem, 2, 20);
//! scores.sort_by(&mut mem, |a, b| a < b);
//! assert_eq!(scores.to_vec(&mem), vec![10, 20, 30]);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::Pod;

use crate::containers::Link;
use crate::memory::{Allocation, ArenaClass, ArenaRegistry};

/// A fixed-length array of `T` in an arena.
pub struct Arr<T: Pod> {
    class: ArenaClass,
    allocation: Allocation,
    len: usize,
    _phantom: PhantomData<T>,
}

impl<T: Pod> Clone for Arr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Pod> Copy for Arr<T> {}

impl<T: Pod> fmt::Debug for Arr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arr")
            .field("class", &self.class)
            .field("allocation", &self.allocation)
            .field("len", &self.len)
            .finish()
    }
}

impl<T: Pod> Arr<T> {
    /// Allocates `len` zeroed elements from `class`.
    pub fn new(registry: &mut ArenaRegistry, class: ArenaClass, len: usize) -> Self {
        registry.alloc(class, len)
    }

    pub(crate) const fn from_raw_parts(class: ArenaClass, allocation: Allocation, len: usize) -> Self {
        Self {
            class,
            allocation,
            len,
            _phantom: PhantomData,
        }
    }

    /// Same storage, first `len` elements only.
    pub(crate) fn prefix(self, len: usize) -> Self {
        debug_assert!(len <= self.len);
        Self { len, ..self }
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the array has no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Arena class the array was allocated from.
    #[inline]
    #[must_use]
    pub const fn class(&self) -> ArenaClass {
        self.class
    }

    /// The backing allocation.
    #[inline]
    #[must_use]
    pub const fn allocation(&self) -> Allocation {
        self.allocation
    }

    /// Returns true if the backing memory has not been rolled back.
    #[must_use]
    pub fn is_live(&self, registry: &ArenaRegistry) -> bool {
        registry.arena(self.class).is_live(self.allocation)
    }

    /// Raw bytes of the elements.
    ///
    /// # Panics
    ///
    /// Panics if the array's scope has been unwound.
    #[must_use]
    pub fn as_bytes<'a>(&self, registry: &'a ArenaRegistry) -> &'a [u8] {
        &registry.bytes(self.class, self.allocation)[..self.len * size_of::<T>()]
    }

    fn as_bytes_mut<'a>(&self, registry: &'a mut ArenaRegistry) -> &'a mut [u8] {
        &mut registry.bytes_mut(self.class, self.allocation)[..self.len * size_of::<T>()]
    }

    #[inline]
    fn check_index(&self, index: usize) {
        assert!(
            index < self.len,
            "index {index} out of bounds for array of length {}",
            self.len
        );
    }

    /// Copies out element `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len` or the array's scope has been unwound.
    #[must_use]
    pub fn get(&self, registry: &ArenaRegistry, index: usize) -> T {
        self.check_index(index);
        let start = index * size_of::<T>();
        bytemuck::pod_read_unaligned(&self.as_bytes(registry)[start..start + size_of::<T>()])
    }

    /// Overwrites element `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len` or the array's scope has been unwound.
    pub fn set(&self, registry: &mut ArenaRegistry, index: usize, value: T) {
        self.check_index(index);
        let start = index * size_of::<T>();
        self.as_bytes_mut(registry)[start..start + size_of::<T>()]
            .copy_from_slice(bytemuck::bytes_of(&value));
    }

    /// Applies `f` to element `index` in place.
    pub fn update(&self, registry: &mut ArenaRegistry, index: usize, f: impl FnOnce(&mut T)) {
        let mut value = self.get(registry, index);
        f(&mut value);
        self.set(registry, index, value);
    }

    /// Sets every element to `value`.
    pub fn fill(&self, registry: &mut ArenaRegistry, value: T) {
        let size = size_of::<T>();
        if size == 0 {
            return;
        }
        for chunk in self.as_bytes_mut(registry).chunks_exact_mut(size) {
            chunk.copy_from_slice(bytemuck::bytes_of(&value));
        }
    }

    /// Writes `values` starting at element `index`.
    ///
    /// # Panics
    ///
    /// Panics if the values do not fit.
    pub fn put(&self, registry: &mut ArenaRegistry, index: usize, values: &[T]) {
        assert!(
            index.checked_add(values.len()).is_some_and(|end| end <= self.len),
            "cannot put {} elements at {index} into array of length {}",
            values.len(),
            self.len
        );
        let start = index * size_of::<T>();
        let src: &[u8] = bytemuck::cast_slice(values);
        self.as_bytes_mut(registry)[start..start + src.len()].copy_from_slice(src);
    }

    /// Copies every element of `other` into this array starting at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `other` does not fit.
    pub fn put_arr(&self, registry: &mut ArenaRegistry, index: usize, other: Self) {
        assert!(
            index.checked_add(other.len).is_some_and(|end| end <= self.len),
            "cannot put {} elements at {index} into array of length {}",
            other.len,
            self.len
        );
        for i in 0..other.len {
            let value = other.get(registry, i);
            self.set(registry, index + i, value);
        }
    }

    /// Copies elements `from..to` into a new array allocated from `class`.
    ///
    /// A negative `to` counts from the end: `-1` copies through the last
    /// element, `-2` stops one short of it.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds or reversed.
    pub fn copy(&self, registry: &mut ArenaRegistry, class: ArenaClass, from: usize, to: isize) -> Self {
        let len = self.len as isize;
        assert!(
            to < len && to >= -len.max(1),
            "copy end {to} out of bounds for array of length {}",
            self.len
        );
        let end = if to >= 0 {
            to.unsigned_abs()
        } else {
            (len + to + 1).unsigned_abs()
        };
        assert!(from <= end, "copy range {from}..{end} is reversed");

        let out = Self::new(registry, class, end - from);
        for i in 0..out.len {
            let value = self.get(registry, from + i);
            out.set(registry, i, value);
        }
        out
    }

    /// Reverses the elements in place.
    pub fn reverse(&self, registry: &mut ArenaRegistry) {
        for i in 0..self.len / 2 {
            let j = self.len - 1 - i;
            let a = self.get(registry, i);
            let b = self.get(registry, j);
            self.set(registry, i, b);
            self.set(registry, j, a);
        }
    }

    /// Iterates over copies of the elements.
    pub fn iter<'a>(
        &self,
        registry: &'a ArenaRegistry,
    ) -> impl DoubleEndedIterator<Item = T> + ExactSizeIterator + 'a {
        let bytes = self.as_bytes(registry);
        let size = size_of::<T>();
        (0..self.len).map(move |i| bytemuck::pod_read_unaligned(&bytes[i * size..(i + 1) * size]))
    }

    /// Copies the elements into a `Vec`.
    #[must_use]
    pub fn to_vec(&self, registry: &ArenaRegistry) -> Vec<T> {
        self.iter(registry).collect()
    }

    /// Collects the elements for which `keep(value, index)` holds into a new
    /// array allocated from `class`, in their original order.
    ///
    /// Matches are staged in the frame arena, which is rewound afterwards
    /// unless `class` is the frame arena itself.
    pub fn filter(
        &self,
        registry: &mut ArenaRegistry,
        class: ArenaClass,
        mut keep: impl FnMut(&T, usize) -> bool,
    ) -> Self {
        if class == ArenaClass::Frame {
            return self.stage(registry, class, &mut keep);
        }
        let mut scope = registry.scope(ArenaClass::Frame);
        self.stage(&mut scope, class, &mut keep)
    }

    fn stage(
        &self,
        registry: &mut ArenaRegistry,
        class: ArenaClass,
        keep: &mut impl FnMut(&T, usize) -> bool,
    ) -> Self {
        let mut matches = Link::new(ArenaClass::Frame);
        for i in 0..self.len {
            let value = self.get(registry, i);
            if keep(&value, i) {
                matches.add(registry, value);
            }
        }
        matches.to_arr(registry, class)
    }

    /// Stable insertion sort. `should_move_before(a, b)` returns true if `a`
    /// belongs in front of `b`.
    pub fn sort_by(&self, registry: &mut ArenaRegistry, mut should_move_before: impl FnMut(&T, &T) -> bool) {
        for i in 1..self.len {
            let mut idx = i;
            while idx > 0 {
                let current = self.get(registry, idx);
                let other = self.get(registry, idx - 1);
                if !should_move_before(&current, &other) {
                    break;
                }
                self.set(registry, idx, other);
                self.set(registry, idx - 1, current);
                idx -= 1;
            }
        }
    }

    /// Concatenates `a` and `b` into a new array allocated from `class`.
    pub fn combine(registry: &mut ArenaRegistry, class: ArenaClass, a: Self, b: Self) -> Self {
        let out = Self::new(registry, class, a.len + b.len);
        out.put_arr(registry, 0, a);
        out.put_arr(registry, a.len, b);
        out
    }
}
