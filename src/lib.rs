// ============================================================================
// spark-hooks - Reactive Hooks over Browser Primitives
// ============================================================================
//
// Each hook mirrors one browser primitive (web storage, cookies, the URL
// query, DOM events, resize/intersection observers, media queries, timers)
// into a value cell, and keeps the two in sync while it is active.
// The browser itself sits behind the `host` traits; `MemoryHost` is the
// in-memory implementation used by tests and doc examples.
// ============================================================================

#[macro_use]
mod macros;

pub mod core;
pub mod hooks;
pub mod host;
pub mod primitives;
pub mod reactivity;

// Re-export core items at crate root for ergonomic access
pub use crate::core::constants;
pub use crate::core::context::{has_window, install_window, take_window, window, with_window, WindowGuard};
pub use crate::core::error::{HookError, Result};
pub use crate::core::types::{default_equals, Callback, CleanupFn, EqualsFn, ListenerId, SubscriberId, TimerId};

// Re-export primitives
pub use primitives::cell::{ReadCell, Subscription, ValueCell};
pub use primitives::latest::Latest;
pub use primitives::lifecycle::{Attachment, Lifecycle, Teardown};
pub use primitives::node_ref::NodeRef;
pub use primitives::pending::PendingTimer;
pub use primitives::scope::{get_current_scope, hook_scope, on_scope_dispose, HookScope, ScopeCleanupFn};

// Re-export the host surface tests and adapters need
pub use host::{
    CookieJar, Document, Element, Event, EventKind, History, IntersectionEntry,
    IntersectionOptions, ListenerOptions, ListenerRegistration, Location, MediaMatcher,
    MediaQueryList, MemoryHost, ObserverFactory, ResizeEntry, Scheduler, ScrollMetrics, Storage,
    StorageArea, Window, WindowBuilder,
};

// Re-export every hook
pub use hooks::*;
