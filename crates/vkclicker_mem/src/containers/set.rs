//! # Hash Set
//!
//! Fixed-capacity key set, probed the same way as [`Map`](crate::Map).
//! Keys are also recorded in insertion order so the set can be flattened
//! deterministically.

use crate::containers::map::{find, new_keys, vacant, EMPTY};
use crate::containers::{Arr, DynArr};
use crate::memory::{ArenaClass, ArenaRegistry};

/// A fixed-capacity set of `u64` keys.
#[derive(Debug)]
pub struct Set {
    slots: Arr<u64>,
    order: DynArr<u64>,
}

impl Set {
    /// Allocates a set of `capacity` slots from `class`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(registry: &mut ArenaRegistry, class: ArenaClass, capacity: usize) -> Self {
        Self {
            slots: new_keys(registry, class, capacity),
            order: DynArr::new(registry, class, capacity),
        }
    }

    /// Adds `key`. Returns false if it was already present.
    ///
    /// # Panics
    ///
    /// Panics if `key` is new and the set is full, or if `key` is `u64::MAX`.
    pub fn insert(&mut self, registry: &mut ArenaRegistry, key: u64) -> bool {
        assert!(key != EMPTY, "u64::MAX is reserved for empty slots");
        if find(self.slots, registry, key).is_some() {
            return false;
        }
        assert!(!self.order.is_full(), "hash set is full ({} keys)", self.order.len());
        let Some(slot) = vacant(self.slots, registry, key) else {
            unreachable!("a set below capacity has an empty slot")
        };
        self.slots.set(registry, slot, key);
        self.order.add(registry, key);
        true
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains(&self, registry: &ArenaRegistry, key: u64) -> bool {
        key != EMPTY && find(self.slots, registry, key).is_some()
    }

    /// Number of keys.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Arr<u64> {
        self.order.arr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;

    fn registry() -> ArenaRegistry {
        let config = RegistryConfig::default()
            .with_scratch_size(1024)
            .with_frame_size(1024)
            .with_long_lived(1, 1024);
        ArenaRegistry::init(&config).unwrap()
    }

    #[test]
    fn test_insert_reports_new_keys() {
        let mut mem = registry();
        let mut set = Set::new(&mut mem, ArenaClass::Frame, 8);
        assert!(set.insert(&mut mem, 5));
        assert!(set.insert(&mut mem, 13));
        assert!(!set.insert(&mut mem, 5));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&mem, 13));
        assert!(!set.contains(&mem, 21));
    }

    #[test]
    fn test_keys_in_insertion_order() {
        let mut mem = registry();
        let mut set = Set::new(&mut mem, ArenaClass::Frame, 8);
        for key in [9u64, 1, 17, 1, 4] {
            set.insert(&mut mem, key);
        }
        assert_eq!(set.keys().to_vec(&mem), vec![9, 1, 17, 4]);
    }

    #[test]
    #[should_panic(expected = "hash set is full")]
    fn test_insert_into_full_set_panics() {
        let mut mem = registry();
        let mut set = Set::new(&mut mem, ArenaClass::Frame, 2);
        set.insert(&mut mem, 1);
        set.insert(&mut mem, 2);
        set.insert(&mut mem, 3);
    }

    #[test]
    fn test_reserved_key_is_never_contained() {
        let mut mem = registry();
        let set = Set::new(&mut mem, ArenaClass::Frame, 2);
        assert!(!set.contains(&mem, u64::MAX));
        assert!(set.is_empty());
        assert_eq!(set.capacity(), 2);
    }
}
