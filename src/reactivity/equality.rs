// ============================================================================
// spark-hooks - Equality Functions
// Decide whether a bridge write is a change worth notifying subscribers about
// ============================================================================

use crate::host::dom::Element;

// =============================================================================
// STRICT EQUALITY (Default)
// =============================================================================

/// Strict equality using `PartialEq`. Default for `ValueCell::new`.
///
/// # Example
/// ```
/// use spark_hooks::reactivity::equality::equals;
///
/// assert!(equals(&42, &42));
/// assert!(!equals(&"light", &"dark"));
/// ```
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// FLOAT EQUALITY
// =============================================================================
//
// Sizes and scroll offsets are f64. A host may report NaN for a detached
// element; NaN must compare equal to itself or every resize notification of
// a detached node would look like a change.
// =============================================================================

/// NaN-safe equality for f64: `NaN == NaN`.
///
/// # Example
/// ```
/// use spark_hooks::reactivity::equality::safe_equals_f64;
///
/// assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
/// assert!(!safe_equals_f64(&f64::NAN, &1.0));
/// assert!(safe_equals_f64(&-0.0, &0.0));
/// ```
pub fn safe_equals_f64(a: &f64, b: &f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

/// NaN-safe equality for a pair of f64 (width/height, x/y).
pub fn safe_equals_pair(a: &(f64, f64), b: &(f64, f64)) -> bool {
    safe_equals_f64(&a.0, &b.0) && safe_equals_f64(&a.1, &b.1)
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Node identity: two element slots are equal only when they hold the very
/// same node (or are both empty). Structural equality is meaningless for
/// target handles.
pub fn same_node(a: &Option<Element>, b: &Option<Element>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ptr_eq(b),
        _ => false,
    }
}

// =============================================================================
// FORCED NOTIFICATION
// =============================================================================

/// Never equal: every write notifies. For payloads without a meaningful
/// `PartialEq` (observer entries, async status carrying errors).
///
/// # Example
/// ```
/// use spark_hooks::reactivity::equality::never_equals;
///
/// assert!(!never_equals(&1, &1));
/// ```
pub fn never_equals<T>(_a: &T, _b: &T) -> bool {
    false
}

// =============================================================================
// TESTS
// =============================================================================
