// ============================================================================
// spark-hooks - Core Module
// Shared identifiers, defaults, errors and the thread-local host context
// ============================================================================

pub mod constants;
pub mod context;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use context::{has_window, install_window, take_window, window, with_window, WindowGuard};
pub use error::{HookError, Result};
pub use types::{default_equals, Callback, CleanupFn, EqualsFn, ListenerId, SubscriberId, TimerId};
