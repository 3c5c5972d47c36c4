//! Property tests for bump allocation, scope rollback and hash map lookups.

use std::collections::HashMap;

use proptest::prelude::*;
use vkclicker_mem::memory::arena::align4;
use vkclicker_mem::{Arena, ArenaClass, ArenaCreateInfo, ArenaRegistry, Map, RegistryConfig};

const META: u32 = vkclicker_mem::memory::META_BYTES;

#[derive(Clone, Debug)]
enum MapOp {
    Insert(u64, u32),
    Erase(u64),
}

fn arb_map_op() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        (0u64..48, any::<u32>()).prop_map(|(k, v)| MapOp::Insert(k, v)),
        (0u64..48).prop_map(MapOp::Erase),
    ]
}

proptest! {
    #[test]
    fn offsets_are_prefix_sums_within_one_slab(sizes in prop::collection::vec(1u32..64, 1..40)) {
        let mut arena = Arena::create(ArenaCreateInfo::with_memory_size(4096));
        let mut expected = 0;
        for size in sizes {
            let allocation = arena.alloc(size);
            prop_assert_eq!(allocation.depth(), 0);
            prop_assert_eq!(allocation.offset(), expected);
            expected += align4(size) + META;
        }
        prop_assert_eq!(arena.front(), expected);
    }

    #[test]
    fn scope_restore_is_exact_inverse(
        before in prop::collection::vec(1u32..200, 0..6),
        inside in prop::collection::vec(1u32..400, 0..20),
    ) {
        let mut arena = Arena::create(ArenaCreateInfo::with_memory_size(256));
        for size in before {
            arena.alloc(size);
        }
        let depth = arena.depth();
        let front = arena.front();
        let used = arena.used_bytes();

        let scope = arena.create_scope();
        for size in inside {
            arena.alloc(size);
        }
        arena.destroy_scope(scope);

        prop_assert_eq!(arena.depth(), depth);
        prop_assert_eq!(arena.front(), front);
        prop_assert_eq!(arena.used_bytes(), used);
        for d in depth + 1..arena.slab_count() {
            prop_assert_eq!(arena.front_at(d), Some(0));
        }
    }

    #[test]
    fn chained_slab_is_large_enough(size in 1u32..2000) {
        let mut arena = Arena::create(ArenaCreateInfo::with_memory_size(128));
        arena.alloc(100);
        let allocation = arena.alloc(size);
        let capacity = arena.capacity_at(allocation.depth() as usize);
        prop_assert!(capacity.is_some_and(|c| c >= align4(size) + 8));
        if allocation.depth() > 0 {
            prop_assert_eq!(capacity, Some(128u32.max(align4(size) + 8)));
        }
    }

    #[test]
    fn map_agrees_with_hashmap(ops in prop::collection::vec(arb_map_op(), 1..80)) {
        let config = RegistryConfig::default().with_frame_size(4096);
        let mut mem = ArenaRegistry::init(&config).unwrap();
        let mut map: Map<u32> = Map::new(&mut mem, ArenaClass::Frame, 16);
        let mut model = HashMap::new();

        for op in ops {
            match op {
                MapOp::Insert(key, value) => {
                    if model.len() < 16 || model.contains_key(&key) {
                        map.insert_value(&mut mem, key, value);
                        model.insert(key, value);
                    }
                }
                MapOp::Erase(key) => {
                    prop_assert_eq!(map.erase(&mut mem, key), model.remove(&key));
                }
            }
            prop_assert_eq!(map.len(), model.len());
            for key in 0u64..48 {
                prop_assert_eq!(map.contains(&mem, key), model.get(&key).copied());
            }
        }
    }
}
