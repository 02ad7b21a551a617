// ============================================================================
// spark-hooks - Hook Scope
//
// Component-level lifecycle: group the hooks of one component so they can be
// deactivated, reactivated and disposed together.
// ============================================================================
//
// A HookScope stands in for "the component". Hooks created inside
// `scope.run(..)` are collected by the scope, which keeps them alive:
// - pause()  - the component became inactive: every hook detaches
// - resume() - the component is active again: every hook re-attaches
// - stop()   - the component is gone: detach, run cleanups, drop the hooks
// Nested scopes are stopped with their parent unless created detached.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::primitives::lifecycle::Lifecycle;

// =============================================================================
// THREAD-LOCAL SCOPE STATE
// =============================================================================

thread_local! {
    /// Currently active scope (if any)
    static ACTIVE_SCOPE: RefCell<Option<Rc<HookScopeInner>>> = const { RefCell::new(None) };
}

fn get_active_scope() -> Option<Rc<HookScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.borrow().clone())
}

fn set_active_scope(scope: Option<Rc<HookScopeInner>>) -> Option<Rc<HookScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.replace(scope))
}

/// Cleanup function type for scope disposal
pub type ScopeCleanupFn = Box<dyn FnOnce()>;

// =============================================================================
// HOOK SCOPE INNER
// =============================================================================

/// Internal scope implementation
pub struct HookScopeInner {
    /// Whether the scope is still alive (not stopped)
    active: Cell<bool>,

    /// Whether the component is currently inactive
    paused: Cell<bool>,

    /// Hooks created within this scope
    hooks: RefCell<Vec<Rc<dyn Lifecycle>>>,

    /// Cleanup functions to run on stop
    cleanups: RefCell<Vec<ScopeCleanupFn>>,

    /// Parent scope (for nested scopes)
    parent: RefCell<Option<Weak<HookScopeInner>>>,

    /// Child scopes
    scopes: RefCell<Vec<Rc<HookScopeInner>>>,

    /// Self-reference for run()
    self_weak: RefCell<Weak<HookScopeInner>>,
}

impl HookScopeInner {
    fn new(detached: bool) -> Rc<Self> {
        let parent = if detached { None } else { get_active_scope() };

        let scope = Rc::new(Self {
            active: Cell::new(true),
            paused: Cell::new(false),
            hooks: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            parent: RefCell::new(parent.as_ref().map(Rc::downgrade)),
            scopes: RefCell::new(Vec::new()),
            self_weak: RefCell::new(Weak::new()),
        });

        *scope.self_weak.borrow_mut() = Rc::downgrade(&scope);

        if let Some(ref parent_scope) = parent {
            parent_scope.scopes.borrow_mut().push(scope.clone());
            if parent_scope.paused.get() {
                scope.paused.set(true);
            }
        }

        scope
    }

    fn run<R, F: FnOnce() -> R>(&self, f: F) -> Option<R> {
        if !self.active.get() {
            return None;
        }
        let self_rc = self.self_weak.borrow().upgrade()?;

        // Restore the previous scope even if `f` panics
        struct Restore(Option<Option<Rc<HookScopeInner>>>);
        impl Drop for Restore {
            fn drop(&mut self) {
                if let Some(prev) = self.0.take() {
                    set_active_scope(prev);
                }
            }
        }

        let _restore = Restore(Some(set_active_scope(Some(self_rc))));
        Some(f())
    }

    fn stop(&self) {
        if !self.active.get() {
            return;
        }
        self.active.set(false);
        tracing::trace!(hooks = self.hooks.borrow().len(), "stopping hook scope");

        // Detach every hook, then release them
        let hooks: Vec<_> = self.hooks.borrow_mut().drain(..).collect();
        for hook in &hooks {
            hook.deactivate();
        }
        drop(hooks);

        // Cleanups in reverse registration order; a panicking cleanup must not
        // prevent the others from running
        let cleanups: Vec<_> = self.cleanups.borrow_mut().drain(..).collect();
        for cleanup in cleanups.into_iter().rev() {
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(cleanup)).is_err() {
                tracing::warn!("scope cleanup panicked");
            }
        }

        let child_scopes: Vec<_> = self.scopes.borrow_mut().drain(..).collect();
        for child in child_scopes {
            child.stop();
        }

        if let Some(parent) = self.parent.borrow().as_ref().and_then(|w| w.upgrade()) {
            if let Some(self_rc) = self.self_weak.borrow().upgrade() {
                parent.scopes.borrow_mut().retain(|s| !Rc::ptr_eq(s, &self_rc));
            }
        }
    }

    fn pause(&self) {
        if !self.active.get() || self.paused.get() {
            return;
        }
        self.paused.set(true);

        let hooks: Vec<_> = self.hooks.borrow().clone();
        for hook in hooks {
            hook.deactivate();
        }
        let children: Vec<_> = self.scopes.borrow().clone();
        for child in children {
            child.pause();
        }
    }

    fn resume(&self) {
        if !self.active.get() || !self.paused.get() {
            return;
        }
        self.paused.set(false);

        let hooks: Vec<_> = self.hooks.borrow().clone();
        for hook in hooks {
            hook.activate();
        }
        let children: Vec<_> = self.scopes.borrow().clone();
        for child in children {
            child.resume();
        }
    }

    fn add_hook(&self, hook: Rc<dyn Lifecycle>) {
        if self.paused.get() {
            hook.deactivate();
        }
        self.hooks.borrow_mut().push(hook);
    }

    fn add_cleanup(&self, cleanup: ScopeCleanupFn) {
        self.cleanups.borrow_mut().push(cleanup);
    }
}

impl Drop for HookScopeInner {
    fn drop(&mut self) {
        if self.active.get() {
            self.stop();
        }
    }
}

// =============================================================================
// HOOK SCOPE (Public wrapper)
// =============================================================================

/// A component lifecycle grouping hooks for collective (de)activation.
///
/// # Example
///
/// ```
/// use spark_hooks::{hook_scope, use_window_size, MemoryHost};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let component = hook_scope(false);
/// let size = component.run(|| use_window_size()).unwrap();
///
/// component.pause(); // inactive: listeners detached
/// host.window().resize_to(640.0, 480.0);
/// assert_ne!(size.get().width, 640.0);
///
/// component.resume(); // re-attached and re-synced
/// assert_eq!(size.get().width, 640.0);
/// ```
#[derive(Clone)]
pub struct HookScope {
    inner: Rc<HookScopeInner>,
}

impl HookScope {
    fn from_inner(inner: Rc<HookScopeInner>) -> Self {
        Self { inner }
    }

    /// Whether the scope is alive (not stopped)
    pub fn active(&self) -> bool {
        self.inner.active.get()
    }

    /// Whether the scope is paused (component inactive)
    pub fn paused(&self) -> bool {
        self.inner.paused.get()
    }

    /// Number of hooks owned by this scope
    pub fn hook_count(&self) -> usize {
        self.inner.hooks.borrow().len()
    }

    /// Run `f` with this scope active; hooks created inside are collected.
    ///
    /// Returns `None` once the scope has been stopped.
    pub fn run<R, F: FnOnce() -> R>(&self, f: F) -> Option<R> {
        self.inner.run(f)
    }

    /// Deactivate and release every hook, run cleanups (newest first) and
    /// stop child scopes.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Deactivate every hook; values keep their last state.
    pub fn pause(&self) {
        self.inner.pause();
    }

    /// Reactivate every hook; each re-syncs from its source.
    pub fn resume(&self) {
        self.inner.resume();
    }
}

impl Drop for HookScope {
    fn drop(&mut self) {
        // Last handle: the component is gone
        if Rc::strong_count(&self.inner) == 1 {
            self.inner.stop();
        }
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create a hook scope.
///
/// * `detached` - if true, the scope is not collected by the active scope
pub fn hook_scope(detached: bool) -> HookScope {
    HookScope::from_inner(HookScopeInner::new(detached))
}

/// The scope whose `run` is executing, if any.
pub fn get_current_scope() -> Option<HookScope> {
    get_active_scope().map(HookScope::from_inner)
}

/// Register a cleanup on the active scope; runs when the scope stops.
pub fn on_scope_dispose<F: FnOnce() + 'static>(f: F) {
    match get_active_scope() {
        Some(scope) => scope.add_cleanup(Box::new(f)),
        None => tracing::debug!("on_scope_dispose() called outside of a hook scope"),
    }
}

/// Hand a freshly activated hook to the active scope, if any.
pub(crate) fn register_with_scope(hook: Rc<dyn Lifecycle>) {
    if let Some(scope) = get_active_scope() {
        scope.add_hook(hook);
    }
}

// =============================================================================
// TESTS
// =============================================================================
