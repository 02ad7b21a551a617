// ============================================================================
// spark-hooks - Lifecycle
// Attach/detach bookkeeping shared by every hook bridge
// ============================================================================
//
// A hook attaches native resources (listener registrations, observers,
// timers, cell subscriptions) when it activates and must release every one
// of them when it deactivates. `Teardown` records the release steps as they
// are created; `Attachment` owns at most one live teardown and guarantees it
// runs exactly once on whatever path ends the attachment.
// ============================================================================

use std::cell::RefCell;
use std::fmt;

use crate::core::types::CleanupFn;

// =============================================================================
// LIFECYCLE TRAIT
// =============================================================================

/// Activation control implemented by every hook handle.
///
/// Activation attaches native listeners and re-syncs the value from its
/// source; deactivation detaches everything. Both are idempotent.
pub trait Lifecycle {
    /// Attach to the external source. No-op when already active.
    fn activate(&self);

    /// Detach from the external source. No-op when already inactive.
    fn deactivate(&self);

    /// Whether native resources are currently attached.
    fn is_active(&self) -> bool;
}

// =============================================================================
// TEARDOWN
// =============================================================================

/// Ordered list of release steps, run last-in first-out.
#[derive(Default)]
pub struct Teardown {
    cleanups: Vec<CleanupFn>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a release step.
    pub fn push(&mut self, cleanup: impl FnOnce() + 'static) {
        self.cleanups.push(Box::new(cleanup));
    }

    /// Keep an RAII guard alive until teardown; dropping it is the release.
    pub fn hold<G: 'static>(&mut self, guard: G) {
        self.push(move || drop(guard));
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.cleanups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cleanups.is_empty()
    }

    /// Run every step, newest first.
    pub fn run(mut self) {
        self.run_all();
    }

    fn run_all(&mut self) {
        while let Some(cleanup) = self.cleanups.pop() {
            cleanup();
        }
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.run_all();
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("steps", &self.cleanups.len())
            .finish()
    }
}

// =============================================================================
// ATTACHMENT
// =============================================================================

/// Slot holding the teardown of the current attachment, if any.
#[derive(Default)]
pub struct Attachment {
    live: RefCell<Option<Teardown>>,
}

impl Attachment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an attachment is live.
    pub fn is_attached(&self) -> bool {
        self.live.borrow().is_some()
    }

    /// Build a new attachment unless one is already live.
    ///
    /// Returns `false` when already attached.
    pub fn attach(&self, build: impl FnOnce(&mut Teardown)) -> bool {
        if self.is_attached() {
            return false;
        }
        let mut teardown = Teardown::new();
        build(&mut teardown);
        *self.live.borrow_mut() = Some(teardown);
        true
    }

    /// Tear down the live attachment, if any.
    ///
    /// The teardown is taken out of the slot before it runs, so cleanups may
    /// safely query or re-enter this attachment.
    pub fn detach(&self) -> bool {
        let live = self.live.borrow_mut().take();
        match live {
            Some(teardown) => {
                teardown.run();
                true
            }
            None => false,
        }
    }

    /// Detach, then attach with `build`: old registrations are always
    /// released before new ones are created.
    pub fn reattach(&self, build: impl FnOnce(&mut Teardown)) {
        self.detach();
        self.attach(build);
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("attached", &self.is_attached())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
