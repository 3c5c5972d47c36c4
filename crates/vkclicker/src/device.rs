//! # Stand-in Device Objects
//!
//! Headless placeholders for the graphics objects a real renderer creates
//! once and keeps for the application's lifetime. Each one is bound to a
//! [`ManualScope`] so it is destroyed, newest first, before the long-lived
//! arena is rewound.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use vkclicker_mem::{ArenaClass, ArenaRegistry, ManualScope, ScopedResource, Str};

/// Kind of a stand-in device object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// Driver instance.
    Instance,
    /// Logical device.
    Device,
    /// Presentation swapchain.
    Swapchain,
    /// Graphics pipeline.
    Pipeline,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Instance => "instance",
            Self::Device => "device",
            Self::Swapchain => "swapchain",
            Self::Pipeline => "pipeline",
        };
        f.write_str(name)
    }
}

/// A device object with an external handle that must be released.
#[derive(Debug)]
pub struct DeviceObject {
    kind: ObjectKind,
    handle: u64,
    live: Rc<Cell<usize>>,
}

impl DeviceObject {
    fn create(kind: ObjectKind, handle: u64, live: &Rc<Cell<usize>>) -> Self {
        live.set(live.get() + 1);
        tracing::debug!(%kind, handle, "device object created");
        Self {
            kind,
            handle,
            live: Rc::clone(live),
        }
    }
}

impl ScopedResource for DeviceObject {
    fn on_scope_clear(&mut self) {
        self.live.set(self.live.get() - 1);
        tracing::debug!(kind = %self.kind, handle = self.handle, "device object destroyed");
    }
}

/// Handles to the application-lifetime objects.
#[derive(Debug)]
pub struct GpuCore {
    /// Scope the objects are bound to. Rewinds the persistent arena when
    /// cleared.
    pub scope: ManualScope,
    /// Application name, kept in the persistent arena.
    pub app_name: Str,
    live: Rc<Cell<usize>>,
}

impl GpuCore {
    /// Creates the instance, device, swapchain and pipeline in dependency
    /// order and binds them to a persistent manual scope.
    pub fn create(registry: &mut ArenaRegistry, app_name: &str) -> Self {
        let mut scope = registry.manual_scope(ArenaClass::PERSISTENT);
        let app_name = Str::concat(registry, ArenaClass::PERSISTENT, &[app_name, " (headless)"]);
        let live = Rc::new(Cell::new(0));

        for (handle, kind) in [
            ObjectKind::Instance,
            ObjectKind::Device,
            ObjectKind::Swapchain,
            ObjectKind::Pipeline,
        ]
        .into_iter()
        .enumerate()
        {
            scope.bind(DeviceObject::create(kind, handle as u64 + 1, &live));
        }

        tracing::info!(objects = live.get(), "gpu core created");
        Self {
            scope,
            app_name,
            live,
        }
    }

    /// Number of device objects not yet destroyed.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.live.get()
    }

    /// Destroys every device object and rewinds the persistent arena.
    ///
    /// Returns the number of objects still alive afterwards.
    pub fn destroy(self, registry: &mut ArenaRegistry) -> usize {
        self.scope.clear(registry);
        tracing::info!(remaining = self.live.get(), "gpu core destroyed");
        self.live.get()
    }
}
