// ============================================================================
// spark-hooks - Node Ref
// Target handle compared by node identity
// ============================================================================

use std::fmt;

use crate::host::dom::Element;
use crate::primitives::cell::{Subscription, ValueCell};
use crate::reactivity::equality::same_node;

/// Clonable handle to an optional element.
///
/// Hooks that bind to an element subscribe to the ref: pointing it at a
/// different node tears down the old registrations before new ones are
/// created. Re-setting the same node is not a change.
///
/// # Example
///
/// ```
/// use spark_hooks::{MemoryHost, NodeRef};
///
/// let host = MemoryHost::new();
/// let node = host.document().create_element("div");
///
/// let r = NodeRef::new();
/// assert!(r.is_empty());
/// r.set(node.clone());
/// assert!(!r.set(node)); // same node, no change
/// ```
#[derive(Clone)]
pub struct NodeRef {
    cell: ValueCell<Option<Element>>,
}

impl NodeRef {
    /// An empty ref.
    pub fn new() -> Self {
        Self {
            cell: ValueCell::new_with_equals(None, same_node),
        }
    }

    /// A ref already pointing at `element`.
    pub fn with_element(element: Element) -> Self {
        Self {
            cell: ValueCell::new_with_equals(Some(element), same_node),
        }
    }

    pub fn get(&self) -> Option<Element> {
        self.cell.get()
    }

    /// Point the ref at `element`. Returns `true` if the target changed.
    pub fn set(&self, element: Element) -> bool {
        self.cell.set(Some(element))
    }

    /// Empty the ref. Returns `true` if it held a node.
    pub fn clear(&self) -> bool {
        self.cell.set(None)
    }

    pub fn is_empty(&self) -> bool {
        self.cell.with(|e| e.is_none())
    }

    /// Number of target changes so far.
    pub fn version(&self) -> u64 {
        self.cell.version()
    }

    /// Observe target changes.
    pub fn subscribe(&self, f: impl Fn(&Option<Element>) + 'static) -> Subscription {
        self.cell.subscribe(f)
    }

    /// Whether both handles are the same ref (not merely the same target).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.cell.ptr_eq(&other.cell)
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Element> for NodeRef {
    fn from(element: Element) -> Self {
        Self::with_element(element)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("target", &self.get().map(|e| e.tag_name().to_string()))
            .finish()
    }
}
