// ============================================================================
// spark-hooks - Type Definitions
// Identifiers and callback aliases shared by the host and the hooks
// ============================================================================

use std::fmt;
use std::rc::Rc;

// =============================================================================
// IDENTIFIERS
// =============================================================================
//
// Native resources (timers, listener registrations, cell subscriptions) are
// referred to by opaque ids. Ids are never reused within one host, so a stale
// id can only ever miss, never cancel somebody else's resource.
// =============================================================================

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u64);

        impl $name {
            /// Raw numeric value (stable for the lifetime of the host)
            pub fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

opaque_id!(
    /// Handle to a scheduled timeout, interval or animation frame.
    TimerId
);

opaque_id!(
    /// Handle to one event-listener registration on an `EventTarget`.
    ListenerId
);

opaque_id!(
    /// Handle to one subscriber of a `ValueCell`.
    SubscriberId
);

// =============================================================================
// EQUALITY
// =============================================================================

/// Equality function used by value cells to decide whether a write changed
/// anything. Returning `true` means "equal, do not notify".
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Default equality: `PartialEq`.
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// CALLBACKS
// =============================================================================

/// Cleanup run when a hook detaches
pub type CleanupFn = Box<dyn FnOnce()>;

/// Shared zero-argument callback
pub type Callback = Rc<dyn Fn()>;

/// One-shot scheduled task
pub type TaskFn = Box<dyn FnOnce()>;

/// Repeating scheduled task
pub type RepeatFn = Rc<dyn Fn()>;

/// Animation-frame task, receives the frame timestamp in ms
pub type FrameFn = Box<dyn FnOnce(f64)>;

// =============================================================================
// TESTS
// =============================================================================
