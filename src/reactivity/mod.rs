// ============================================================================
// spark-hooks - Reactivity Module
// Change detection for value cells
// ============================================================================

pub mod equality;

pub use equality::{equals, never_equals, safe_equals_f64, safe_equals_pair, same_node};
