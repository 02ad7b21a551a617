// ============================================================================
// spark-hooks - Primitives Module
// Value cells, lifecycle bookkeeping, scopes and the small slots hooks share
// ============================================================================

pub mod cell;
pub mod latest;
pub mod lifecycle;
pub mod node_ref;
pub mod pending;
pub mod scope;

// Re-export for convenience
pub use cell::{ReadCell, Subscription, ValueCell};
pub use latest::Latest;
pub use lifecycle::{Attachment, Lifecycle, Teardown};
pub use node_ref::NodeRef;
pub use pending::PendingTimer;
pub use scope::{get_current_scope, hook_scope, on_scope_dispose, HookScope, ScopeCleanupFn};
