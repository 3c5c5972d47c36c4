//! # Hash Map
//!
//! Fixed-capacity open addressing over `u64` keys.
//!
//! Probing is linear from `key % capacity`. Erase uses backward-shift
//! deletion, so every key stays reachable from its home slot without
//! tombstones and a lookup can stop at the first empty slot.
//!
//! `u64::MAX` marks an empty slot and cannot be used as a key.

use bytemuck::Pod;

use crate::containers::Arr;
use crate::memory::{ArenaClass, ArenaRegistry};

/// Key value of an unoccupied slot.
pub(crate) const EMPTY: u64 = u64::MAX;

/// Probe sequence shared with [`Set`](crate::containers::Set).
#[inline]
pub(crate) fn home(key: u64, capacity: usize) -> usize {
    (key % capacity as u64) as usize
}

/// Slot holding `key`, or `None` if it is absent.
pub(crate) fn find(keys: Arr<u64>, registry: &ArenaRegistry, key: u64) -> Option<usize> {
    let capacity = keys.len();
    let start = home(key, capacity);
    for i in 0..capacity {
        let slot = (start + i) % capacity;
        match keys.get(registry, slot) {
            k if k == key => return Some(slot),
            EMPTY => return None,
            _ => {}
        }
    }
    None
}

/// First empty slot on `key`'s probe sequence.
pub(crate) fn vacant(keys: Arr<u64>, registry: &ArenaRegistry, key: u64) -> Option<usize> {
    let capacity = keys.len();
    let start = home(key, capacity);
    (0..capacity)
        .map(|i| (start + i) % capacity)
        .find(|&slot| keys.get(registry, slot) == EMPTY)
}

pub(crate) fn new_keys(registry: &mut ArenaRegistry, class: ArenaClass, capacity: usize) -> Arr<u64> {
    assert!(capacity > 0, "hash table capacity must be greater than zero");
    let keys = Arr::new(registry, class, capacity);
    keys.fill(registry, EMPTY);
    keys
}

/// A fixed-capacity `u64 -> V` hash map.
///
/// # Example
///
/// ```rust
/// use vkclicker_mem::{ArenaClass, ArenaRegistry, Map, RegistryConfig};
///
/// let mut mem = ArenaRegistry::init(&RegistryConfig::default().with_frame_size(4096)).unwrap();
/// let mut bindings: Map<u32> = Map::new(&mut mem, ArenaClass::Frame, 8);
/// bindings.insert_value(&mut mem, 3, 10);
/// bindings.insert_value(&mut mem, 11, 20);
/// assert_eq!(bindings.contains(&mem, 11), Some(20));
/// assert_eq!(bindings.contains(&mem, 19), None);
/// ```
///
/// The entry count is held by the handle, so a map cannot be cloned:
///
/// ```compile_fail
/// use vkclicker_mem::{ArenaClass, ArenaRegistry, Map, RegistryConfig};
///
/// let mut mem = ArenaRegistry::init(&RegistryConfig::default().with_frame_size(4096)).unwrap();
/// let bindings: Map<u32> = Map::new(&mut mem, ArenaClass::Frame, 8);
/// let _copy = bindings.clone();
/// ```
#[derive(Debug)]
pub struct Map<V: Pod> {
    keys: Arr<u64>,
    values: Arr<V>,
    count: usize,
}

impl<V: Pod> Map<V> {
    /// Allocates a map of `capacity` slots from `class`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(registry: &mut ArenaRegistry, class: ArenaClass, capacity: usize) -> Self {
        Self {
            keys: new_keys(registry, class, capacity),
            values: Arr::new(registry, class, capacity),
            count: 0,
        }
    }

    /// Returns the slot for `key`, claiming an empty one if the key is new.
    ///
    /// A new slot's value is zeroed. Inserting an existing key returns its
    /// slot and leaves the count unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `key` is new and the map is full, or if `key` is `u64::MAX`.
    pub fn insert(&mut self, registry: &mut ArenaRegistry, key: u64) -> usize {
        assert!(key != EMPTY, "u64::MAX is reserved for empty slots");
        if let Some(slot) = find(self.keys, registry, key) {
            return slot;
        }
        assert!(
            self.count < self.keys.len(),
            "hash map is full ({} entries)",
            self.count
        );
        let Some(slot) = vacant(self.keys, registry, key) else {
            unreachable!("a map below capacity has an empty slot")
        };

        self.keys.set(registry, slot, key);
        self.values.set(registry, slot, V::zeroed());
        self.count += 1;
        slot
    }

    /// Inserts or overwrites the value for `key`, returning its slot.
    ///
    /// # Panics
    ///
    /// Same as [`Self::insert`].
    pub fn insert_value(&mut self, registry: &mut ArenaRegistry, key: u64, value: V) -> usize {
        let slot = self.insert(registry, key);
        self.values.set(registry, slot, value);
        slot
    }

    /// The value for `key`, if present.
    #[must_use]
    pub fn contains(&self, registry: &ArenaRegistry, key: u64) -> Option<V> {
        self.slot(registry, key).map(|slot| self.values.get(registry, slot))
    }

    /// The slot holding `key`, if present.
    #[must_use]
    pub fn slot(&self, registry: &ArenaRegistry, key: u64) -> Option<usize> {
        if key == EMPTY {
            return None;
        }
        find(self.keys, registry, key)
    }

    /// Key stored in `slot`, if occupied.
    #[must_use]
    pub fn key_at(&self, registry: &ArenaRegistry, slot: usize) -> Option<u64> {
        Some(self.keys.get(registry, slot)).filter(|&k| k != EMPTY)
    }

    /// Value stored in `slot`.
    #[must_use]
    pub fn value_at(&self, registry: &ArenaRegistry, slot: usize) -> V {
        self.values.get(registry, slot)
    }

    /// Overwrites the value stored in `slot`.
    pub fn set_value_at(&self, registry: &mut ArenaRegistry, slot: usize, value: V) {
        self.values.set(registry, slot, value);
    }

    /// Applies `f` to the value for `key`. Returns false if the key is absent.
    pub fn update(&self, registry: &mut ArenaRegistry, key: u64, f: impl FnOnce(&mut V)) -> bool {
        match self.slot(registry, key) {
            Some(slot) => {
                self.values.update(registry, slot, f);
                true
            }
            None => false,
        }
    }

    /// Removes `key`, returning its value.
    pub fn erase(&mut self, registry: &mut ArenaRegistry, key: u64) -> Option<V> {
        let mut hole = self.slot(registry, key)?;
        let removed = self.values.get(registry, hole);
        let capacity = self.keys.len();

        let mut next = hole;
        for _ in 1..capacity {
            next = (next + 1) % capacity;
            let k = self.keys.get(registry, next);
            if k == EMPTY {
                break;
            }
            // An entry may fill the hole only if the hole lies on its probe
            // path, i.e. between its home slot and where it sits now.
            let from_home = (next + capacity - home(k, capacity)) % capacity;
            let from_hole = (next + capacity - hole) % capacity;
            if from_home >= from_hole {
                let v = self.values.get(registry, next);
                self.keys.set(registry, hole, k);
                self.values.set(registry, hole, v);
                hole = next;
            }
        }

        self.keys.set(registry, hole, EMPTY);
        self.values.set(registry, hole, V::zeroed());
        self.count -= 1;
        Some(removed)
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the map has no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.keys.len()
    }

    /// Iterates over `(key, value)` pairs in slot order.
    pub fn iter<'a>(&self, registry: &'a ArenaRegistry) -> impl Iterator<Item = (u64, V)> + 'a {
        let values = self.values;
        self.keys
            .iter(registry)
            .enumerate()
            .filter(|&(_, k)| k != EMPTY)
            .map(move |(slot, k)| (k, values.get(registry, slot)))
    }
}
