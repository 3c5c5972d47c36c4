//! End-to-end use of the registry the way a render loop drives it.

use std::cell::RefCell;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use vkclicker_mem::{
    Arr, ArenaClass, ArenaRegistry, DynArr, Link, Map, Queue, RegistryConfig, ScopedResource, Set,
    Str,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 3],
}

struct DeviceObject {
    name: &'static str,
    destroyed: Rc<RefCell<Vec<&'static str>>>,
}

impl ScopedResource for DeviceObject {
    fn on_scope_clear(&mut self) {
        self.destroyed.borrow_mut().push(self.name);
    }
}

fn registry() -> ArenaRegistry {
    let config = RegistryConfig::from_toml_str(
        r"
        scratch_size = 4096
        frame_size = 4096
        long_lived_count = 2
        long_lived_default_size = 8192
        ",
    )
    .unwrap();
    ArenaRegistry::init(&config).unwrap()
}

#[test]
fn frame_values_do_not_survive_frame() {
    let mut mem = registry();
    let timings: Arr<f32> = Arr::new(&mut mem, ArenaClass::Frame, 16);
    timings.fill(&mut mem, 16.6);
    assert!(timings.is_live(&mem));

    mem.frame();

    assert!(!timings.is_live(&mem));
    assert_eq!(mem.arena(ArenaClass::Frame).front(), 0);
    let reused: Arr<f32> = Arr::new(&mut mem, ArenaClass::Frame, 16);
    assert_eq!(reused.allocation().offset(), timings.allocation().offset());
    assert!(reused.iter(&mem).all(|t| t == 0.0));
}

#[test]
fn many_frames_keep_long_lived_state() {
    let mut mem = registry();
    let mut history = Queue::new(&mut mem, ArenaClass::PERSISTENT, 4);

    for frame in 0..10u32 {
        {
            let mut scratch = mem.scope(ArenaClass::Scratch);
            let mut visible = DynArr::new(&mut scratch, ArenaClass::Scratch, 32);
            for i in 0..=frame {
                visible.add(&mut scratch, i);
            }
            let total: u32 = visible.iter(&scratch).sum();
            history.add(&mut scratch, total);
        }
        mem.frame();
    }

    assert_eq!(mem.frame_index(), 10);
    assert_eq!(history.iter(&mem).collect::<Vec<_>>(), vec![21, 28, 36, 45]);
    mem.end();
}

#[test]
fn application_lifetime_scope_tears_down_device_objects() {
    let destroyed = Rc::new(RefCell::new(Vec::new()));
    let mut mem = registry();

    let mut app = mem.manual_scope(ArenaClass::PERSISTENT);
    let vertices: Arr<Vertex> = Arr::new(&mut mem, ArenaClass::PERSISTENT, 3);
    vertices.set(
        &mut mem,
        1,
        Vertex {
            position: [0.5, -0.5],
            color: [0.0, 1.0, 0.0],
        },
    );
    for name in ["instance", "device", "swapchain"] {
        app.bind(DeviceObject {
            name,
            destroyed: Rc::clone(&destroyed),
        });
    }

    for _ in 0..3 {
        let mut frame_scope = mem.scope(ArenaClass::Scratch);
        let label = Str::concat(&mut frame_scope, ArenaClass::Scratch, &["draw ", "quad"]);
        assert_eq!(label.as_str(&frame_scope).unwrap(), "draw quad");
        assert_eq!(vertices.get(&frame_scope, 1).color, [0.0, 1.0, 0.0]);
        drop(frame_scope);
        mem.frame();
    }

    assert!(destroyed.borrow().is_empty());
    app.clear(&mut mem);
    assert_eq!(*destroyed.borrow(), vec!["swapchain", "device", "instance"]);
    assert!(mem.arena(ArenaClass::PERSISTENT).is_unwound());
    assert!(!vertices.is_live(&mem));
}

#[test]
fn filtered_device_list_from_link_and_set() {
    let mut mem = registry();
    let mut scope = mem.scope(ArenaClass::LongLived(1));

    // Queue family indices reported per device, with duplicates.
    let mut reported = Link::new(ArenaClass::LongLived(1));
    for family in [0u32, 2, 2, 1, 0, 3] {
        reported.add(&mut scope, family);
    }
    let families = reported.to_arr(&mut scope, ArenaClass::LongLived(1));

    let mut unique = Set::new(&mut scope, ArenaClass::LongLived(1), 8);
    for family in families.iter(&scope).collect::<Vec<_>>() {
        unique.insert(&mut scope, u64::from(family));
    }
    assert_eq!(unique.keys().to_vec(&scope), vec![0, 2, 1, 3]);

    let graphics = families.filter(&mut scope, ArenaClass::LongLived(1), |&f, _| f != 0);
    assert_eq!(graphics.to_vec(&scope), vec![2, 2, 1, 3]);

    let mut scores: Map<u32> = Map::new(&mut scope, ArenaClass::LongLived(1), 8);
    for family in graphics.iter(&scope).collect::<Vec<_>>() {
        let slot = scores.insert(&mut scope, u64::from(family));
        let count = scores.value_at(&scope, slot);
        scores.set_value_at(&mut scope, slot, count + 1);
    }
    assert_eq!(scores.contains(&scope, 2), Some(2));
    assert_eq!(scores.contains(&scope, 0), None);
    assert_eq!(scores.len(), 3);

    drop(scope);
    assert!(mem.arena(ArenaClass::LongLived(1)).is_unwound());
}
