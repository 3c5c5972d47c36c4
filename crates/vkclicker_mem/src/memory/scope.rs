//! # Scope Guards
//!
//! Checkpoints that rewind an arena class and tear down bound resources.
//!
//! A [`Scope`] rewinds on drop, whatever the exit path: normal return,
//! early return, `?`, or a panic unwinding through it. It mutably borrows
//! the registry and derefs to it, so allocations go through the scope and
//! inner scopes can only close before outer ones.
//!
//! A [`ManualScope`] borrows nothing and is rewound only by
//! [`ManualScope::clear`]. It is meant for memory that outlives the function
//! that created it, e.g. device objects bound for the application's lifetime.
//!
//! In both cases bound resources are torn down in reverse registration
//! order, before the memory is rewound.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::memory::arena::ScopeHandle;
use crate::memory::registry::{ArenaClass, ArenaRegistry};

/// An externally-owned resource whose handles must be released when the
/// scope that holds it is cleared.
pub trait ScopedResource {
    /// Releases the resource's external handles.
    fn on_scope_clear(&mut self);
}

impl<T: ScopedResource + ?Sized> ScopedResource for Box<T> {
    fn on_scope_clear(&mut self) {
        (**self).on_scope_clear();
    }
}

impl<T: ScopedResource + ?Sized> ScopedResource for &mut T {
    fn on_scope_clear(&mut self) {
        (**self).on_scope_clear();
    }
}

impl<T: ScopedResource + ?Sized> ScopedResource for Rc<RefCell<T>> {
    fn on_scope_clear(&mut self) {
        self.borrow_mut().on_scope_clear();
    }
}

/// Teardown callbacks, run last-in first-out.
struct Teardowns<'a> {
    stack: Vec<Box<dyn FnOnce() + 'a>>,
}

impl<'a> Teardowns<'a> {
    const fn new() -> Self {
        Self { stack: Vec::new() }
    }

    fn push(&mut self, teardown: impl FnOnce() + 'a) {
        self.stack.push(Box::new(teardown));
    }

    fn push_resource<R: ScopedResource + 'a>(&mut self, mut resource: R) {
        self.push(move || resource.on_scope_clear());
    }

    fn len(&self) -> usize {
        self.stack.len()
    }

    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn run(&mut self) {
        while let Some(teardown) = self.stack.pop() {
            teardown();
        }
    }
}

/// A scope that rewinds its arena class when dropped.
///
/// Created by [`ArenaRegistry::scope`].
#[must_use = "a scope rewinds its arena as soon as it is dropped"]
pub struct Scope<'r> {
    registry: &'r mut ArenaRegistry,
    class: ArenaClass,
    handle: ScopeHandle,
    bound: Teardowns<'r>,
}

impl<'r> Scope<'r> {
    pub(crate) fn new(registry: &'r mut ArenaRegistry, class: ArenaClass, handle: ScopeHandle) -> Self {
        Self {
            registry,
            class,
            handle,
            bound: Teardowns::new(),
        }
    }

    /// Class this scope rewinds.
    #[must_use]
    pub const fn class(&self) -> ArenaClass {
        self.class
    }

    /// Checkpoint this scope rewinds to.
    pub const fn handle(&self) -> ScopeHandle {
        self.handle
    }

    /// Number of bound resources not yet torn down.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }

    /// Registers a resource to be torn down when the scope clears.
    pub fn bind<R: ScopedResource + 'r>(&mut self, resource: R) {
        self.bound.push_resource(resource);
    }

    /// Registers a callback to run when the scope clears.
    pub fn defer(&mut self, teardown: impl FnOnce() + 'r) {
        self.bound.push(teardown);
    }

    /// Tears down bound resources and rewinds the arena now.
    pub fn clear(self) {
        drop(self);
    }
}

impl Deref for Scope<'_> {
    type Target = ArenaRegistry;

    fn deref(&self) -> &ArenaRegistry {
        self.registry
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut ArenaRegistry {
        self.registry
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("class", &self.class)
            .field("handle", &self.handle)
            .field("bound", &self.bound.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.bound.run();
        self.registry.arena_mut(self.class).destroy_scope(self.handle);
    }
}

/// A scope that rewinds its arena class only when cleared.
///
/// Created by [`ArenaRegistry::manual_scope`]. Dropping a manual scope
/// without clearing it leaves its memory and bound resources alone.
#[must_use = "a manual scope does nothing until it is cleared"]
pub struct ManualScope {
    class: ArenaClass,
    handle: ScopeHandle,
    bound: Teardowns<'static>,
}

impl ManualScope {
    pub(crate) const fn new(class: ArenaClass, handle: ScopeHandle) -> Self {
        Self {
            class,
            handle,
            bound: Teardowns::new(),
        }
    }

    /// Class this scope rewinds.
    #[must_use]
    pub const fn class(&self) -> ArenaClass {
        self.class
    }

    /// Checkpoint this scope rewinds to.
    pub const fn handle(&self) -> ScopeHandle {
        self.handle
    }

    /// Number of bound resources not yet torn down.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }

    /// Registers a resource to be torn down when the scope clears.
    pub fn bind<R: ScopedResource + 'static>(&mut self, resource: R) {
        self.bound.push_resource(resource);
    }

    /// Registers a callback to run when the scope clears.
    pub fn defer(&mut self, teardown: impl FnOnce() + 'static) {
        self.bound.push(teardown);
    }

    /// Tears down bound resources, then rewinds the arena.
    ///
    /// # Panics
    ///
    /// Panics if a scope of the same class that was opened before this one
    /// has already been cleared.
    pub fn clear(mut self, registry: &mut ArenaRegistry) {
        self.bound.run();
        registry.arena_mut(self.class).destroy_scope(self.handle);
    }
}

impl fmt::Debug for ManualScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScope")
            .field("class", &self.class)
            .field("handle", &self.handle)
            .field("bound", &self.bound.len())
            .finish()
    }
}

impl Drop for ManualScope {
    fn drop(&mut self) {
        if !self.bound.is_empty() {
            tracing::warn!(
                class = %self.class,
                bound = self.bound.len(),
                "manual scope dropped without clear; bound resources were not torn down"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::containers::Arr;

    fn registry() -> ArenaRegistry {
        let config = RegistryConfig::default()
            .with_scratch_size(128)
            .with_frame_size(128)
            .with_long_lived(1, 128);
        ArenaRegistry::init(&config).unwrap()
    }

    struct Handle {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl ScopedResource for Handle {
        fn on_scope_clear(&mut self) {
            self.log.borrow_mut().push(self.name);
        }
    }

    #[test]
    fn test_scope_rewinds_on_drop() {
        let mut mem = registry();
        mem.alloc_bytes(ArenaClass::PERSISTENT, 8);
        let before = mem.arena(ArenaClass::PERSISTENT).front();
        {
            let mut scope = mem.scope(ArenaClass::PERSISTENT);
            for _ in 0..10 {
                scope.alloc_bytes(ArenaClass::PERSISTENT, 40);
            }
            assert!(scope.arena(ArenaClass::PERSISTENT).slab_count() > 1);
        }
        assert_eq!(mem.arena(ArenaClass::PERSISTENT).depth(), 0);
        assert_eq!(mem.arena(ArenaClass::PERSISTENT).front(), before);
    }

    #[test]
    fn test_nested_scopes_restore_in_order() {
        let mut mem = registry();
        let mut outer = mem.scope(ArenaClass::Scratch);
        outer.alloc_bytes(ArenaClass::Scratch, 8);
        {
            let mut inner = outer.scope(ArenaClass::Scratch);
            inner.alloc_bytes(ArenaClass::Scratch, 8);
            assert_eq!(inner.arena(ArenaClass::Scratch).front(), 24);
        }
        assert_eq!(outer.arena(ArenaClass::Scratch).front(), 12);
        drop(outer);
        assert!(mem.arena(ArenaClass::Scratch).is_unwound());
    }

    #[test]
    fn test_bound_resources_torn_down_lifo_before_rewind() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut mem = registry();
        {
            let mut scope = mem.scope(ArenaClass::PERSISTENT);
            scope.bind(Handle { name: "device", log: Rc::clone(&log) });
            scope.bind(Handle { name: "swapchain", log: Rc::clone(&log) });
            let inner_log = Rc::clone(&log);
            scope.defer(move || inner_log.borrow_mut().push("pipeline"));
            assert_eq!(scope.bound_count(), 3);
            assert!(log.borrow().is_empty());
        }
        assert_eq!(*log.borrow(), vec!["pipeline", "swapchain", "device"]);
    }

    #[test]
    fn test_borrowed_resource_can_be_bound() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut window = Handle { name: "window", log: Rc::clone(&log) };
        let mut mem = registry();
        {
            let mut scope = mem.scope(ArenaClass::Frame);
            scope.bind(&mut window);
        }
        assert_eq!(*log.borrow(), vec!["window"]);
        assert_eq!(window.name, "window");
    }

    #[test]
    fn test_scope_rewinds_on_early_return() {
        fn build(mem: &mut ArenaRegistry, fail: bool) -> Result<(), &'static str> {
            let mut scope = mem.scope(ArenaClass::Scratch);
            scope.alloc_bytes(ArenaClass::Scratch, 32);
            if fail {
                return Err("device lost");
            }
            scope.alloc_bytes(ArenaClass::Scratch, 32);
            Ok(())
        }

        let mut mem = registry();
        assert!(build(&mut mem, true).is_err());
        assert!(mem.arena(ArenaClass::Scratch).is_unwound());
        assert!(build(&mut mem, false).is_ok());
        assert!(mem.arena(ArenaClass::Scratch).is_unwound());
    }

    #[test]
    fn test_scope_rewinds_during_panic_unwind() {
        let mut mem = registry();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut scope = mem.scope(ArenaClass::Scratch);
            scope.alloc_bytes(ArenaClass::Scratch, 64);
            panic!("pipeline creation failed");
        }));
        assert!(result.is_err());
        assert!(mem.arena(ArenaClass::Scratch).is_unwound());
    }

    #[test]
    fn test_manual_scope_outlives_creator() {
        fn open(mem: &mut ArenaRegistry) -> ManualScope {
            let scope = mem.manual_scope(ArenaClass::PERSISTENT);
            mem.alloc_bytes(ArenaClass::PERSISTENT, 16);
            scope
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut mem = registry();
        let mut scope = open(&mut mem);
        scope.bind(Handle { name: "core", log: Rc::clone(&log) });
        assert_eq!(mem.arena(ArenaClass::PERSISTENT).front(), 20);

        scope.clear(&mut mem);
        assert_eq!(*log.borrow(), vec!["core"]);
        assert!(mem.arena(ArenaClass::PERSISTENT).is_unwound());
    }

    #[test]
    fn test_dropped_manual_scope_does_not_rewind_or_tear_down() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut mem = registry();
        {
            let mut scope = mem.manual_scope(ArenaClass::PERSISTENT);
            scope.bind(Handle { name: "core", log: Rc::clone(&log) });
            mem.alloc_bytes(ArenaClass::PERSISTENT, 16);
        }
        assert!(log.borrow().is_empty());
        assert_eq!(mem.arena(ArenaClass::PERSISTENT).front(), 20);
    }

    #[test]
    fn test_shared_resource_binding() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let shared = Rc::new(RefCell::new(Handle { name: "allocators", log: Rc::clone(&log) }));
        let mut mem = registry();
        let mut scope = mem.manual_scope(ArenaClass::PERSISTENT);
        scope.bind(Rc::clone(&shared));
        scope.clear(&mut mem);
        assert_eq!(*log.borrow(), vec!["allocators"]);
        assert_eq!(Rc::strong_count(&shared), 1);
    }

    #[test]
    #[should_panic(expected = "restored out of order")]
    fn test_manual_scope_cleared_after_outer_panics() {
        let mut mem = registry();
        let outer = mem.manual_scope(ArenaClass::PERSISTENT);
        mem.alloc_bytes(ArenaClass::PERSISTENT, 8);
        let inner = mem.manual_scope(ArenaClass::PERSISTENT);
        mem.alloc_bytes(ArenaClass::PERSISTENT, 8);
        outer.clear(&mut mem);
        inner.clear(&mut mem);
    }

    #[test]
    #[should_panic(expected = "restored out of order")]
    fn test_manual_scope_cleared_after_outer_space_reused_panics() {
        let mut mem = registry();
        let outer = mem.manual_scope(ArenaClass::PERSISTENT);
        mem.alloc_bytes(ArenaClass::PERSISTENT, 8);
        let inner = mem.manual_scope(ArenaClass::PERSISTENT);
        outer.clear(&mut mem);

        let live: Arr<u32> = mem.alloc(ArenaClass::PERSISTENT, 8);
        assert!(live.is_live(&mem));
        inner.clear(&mut mem);
    }
}
