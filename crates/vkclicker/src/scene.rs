//! # Scene
//!
//! The per-frame workload of the headless loop: lay out a grid of quads,
//! cull the ones outside the viewport and sort the rest back to front.
//!
//! Working sets live in the scratch arena; the draw list lives in the frame
//! arena and is gone after [`ArenaRegistry::frame`].

use bytemuck::{Pod, Zeroable};
use vkclicker_mem::{Arr, ArenaClass, ArenaRegistry, DynArr, Map, Set, Str};

/// Viewport edge length in world units.
pub const VIEWPORT: f32 = 64.0;

/// A screen-aligned quad.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Quad {
    /// Stable identifier.
    pub id: u32,
    /// Distance from the camera.
    pub depth: f32,
    /// Lower-left corner.
    pub min: [f32; 2],
    /// Upper-right corner.
    pub max: [f32; 2],
}

impl Quad {
    /// Returns true if any part of the quad lies inside the viewport.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.max[0] > 0.0 && self.max[1] > 0.0 && self.min[0] < VIEWPORT && self.min[1] < VIEWPORT
    }
}

/// One frame's sorted, culled quads.
#[derive(Debug)]
pub struct DrawList {
    /// Visible quads, farthest first.
    pub quads: Arr<Quad>,
    /// Quad id to position in [`Self::quads`].
    pub index: Map<u32>,
    /// Number of visible quads, as text.
    pub label: Str,
}

/// Position of quad `id` in `frame`. Deterministic so runs are repeatable.
fn layout(id: u32, frame: u64) -> Quad {
    let drift = (frame % 97) as f32;
    let x = ((id * 37) % 100) as f32 - 20.0 + drift * 0.5;
    let y = ((id * 53) % 100) as f32 - 20.0;
    Quad {
        id,
        depth: ((id * 11) % 17) as f32,
        min: [x, y],
        max: [x + 4.0, y + 4.0],
    }
}

/// Lays out `count` quads and builds the draw list for `frame`.
///
/// `registry` should be inside a scratch scope; everything allocated from
/// scratch here is left for that scope to rewind.
pub fn build_draw_list(registry: &mut ArenaRegistry, frame: u64, count: u32) -> DrawList {
    let mut all = DynArr::new(registry, ArenaClass::Scratch, count as usize);
    for id in 0..count {
        all.add(registry, layout(id, frame));
    }

    let quads = all.arr().filter(registry, ArenaClass::Frame, |q, _| q.is_visible());
    quads.sort_by(registry, |a, b| a.depth > b.depth);

    let mut index = Map::new(registry, ArenaClass::Frame, quads.len().max(1) * 2);
    let mut layers = Set::new(registry, ArenaClass::Scratch, 17);
    for i in 0..quads.len() {
        let quad = quads.get(registry, i);
        index.insert_value(registry, u64::from(quad.id), i as u32);
        layers.insert(registry, quad.depth as u64);
    }

    let visible = i32::try_from(quads.len()).unwrap_or(i32::MAX);
    let label = Str::from_i32(registry, ArenaClass::Frame, visible);

    tracing::trace!(
        frame,
        visible = quads.len(),
        layers = layers.len(),
        "draw list built"
    );

    DrawList {
        quads,
        index,
        label,
    }
}
