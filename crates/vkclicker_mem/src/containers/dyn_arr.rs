//! # Dynamic Array
//!
//! A fixed-capacity array with a running count. Appending past the capacity
//! is a fatal error; callers size the array for the worst case up front.

use bytemuck::Pod;

use crate::containers::Arr;
use crate::memory::{ArenaClass, ArenaRegistry};

/// An append-only array bounded by its capacity.
///
/// The element count lives in the handle, not the arena, so the type is
/// not `Clone`: two copies would track diverging counts over the same
/// storage. Use [`DynArr::arr`] for a shareable view.
///
/// ```compile_fail
/// use vkclicker_mem::{ArenaClass, ArenaRegistry, DynArr, RegistryConfig};
///
/// let mut mem = ArenaRegistry::init(&RegistryConfig::default().with_frame_size(4096)).unwrap();
/// let events: DynArr<u32> = DynArr::new(&mut mem, ArenaClass::Frame, 4);
/// let _copy = events.clone();
/// ```
#[derive(Debug)]
pub struct DynArr<T: Pod> {
    arr: Arr<T>,
    count: usize,
}

impl<T: Pod> DynArr<T> {
    /// Allocates room for `capacity` elements from `class`.
    pub fn new(registry: &mut ArenaRegistry, class: ArenaClass, capacity: usize) -> Self {
        Self {
            arr: Arr::new(registry, class, capacity),
            count: 0,
        }
    }

    /// Appends `value`.
    ///
    /// # Panics
    ///
    /// Panics if the array is full.
    pub fn add(&mut self, registry: &mut ArenaRegistry, value: T) {
        assert!(
            self.count < self.arr.len(),
            "dynamic array capacity {} exceeded",
            self.arr.len()
        );
        self.arr.set(registry, self.count, value);
        self.count += 1;
    }

    /// Number of elements added.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if nothing has been added.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Maximum number of elements.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.arr.len()
    }

    /// Returns true if [`Self::add`] would panic.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.count == self.arr.len()
    }

    /// Forgets every element. The memory stays allocated.
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Sets the number of elements in use.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the capacity.
    pub fn set_count(&mut self, count: usize) {
        assert!(
            count <= self.arr.len(),
            "count {count} exceeds dynamic array capacity {}",
            self.arr.len()
        );
        self.count = count;
    }

    /// Copies out element `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the current count.
    #[must_use]
    pub fn get(&self, registry: &ArenaRegistry, index: usize) -> T {
        self.arr().get(registry, index)
    }

    /// Overwrites element `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the current count.
    pub fn set(&self, registry: &mut ArenaRegistry, index: usize, value: T) {
        self.arr().set(registry, index, value);
    }

    /// View of the elements added so far.
    #[must_use]
    pub fn arr(&self) -> Arr<T> {
        self.arr.prefix(self.count)
    }

    /// Iterates over the elements added so far.
    pub fn iter<'a>(&self, registry: &'a ArenaRegistry) -> impl DoubleEndedIterator<Item = T> + 'a {
        self.arr().iter(registry)
    }
}

impl<T: Pod> From<Arr<T>> for DynArr<T> {
    /// Treats every element of `arr` as already added.
    fn from(arr: Arr<T>) -> Self {
        Self {
            count: arr.len(),
            arr,
        }
    }
}
