// ============================================================================
// spark-hooks - Value Cell
// The reactive slot every hook surfaces to its component
// ============================================================================
//
// A `ValueCell<T>` holds the "current value" of one hook instance. The hook's
// bridge is the only writer; components read it and subscribe to changes.
// Writes are equality-gated: a write that does not change the value does not
// bump the version and does not notify.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::types::{default_equals, EqualsFn, SubscriberId};

type SubscriberFn<T> = Rc<dyn Fn(&T)>;

// =============================================================================
// CELL INNER
// =============================================================================

/// Shared state behind every handle of one cell.
pub struct CellInner<T> {
    value: RefCell<T>,
    equals: EqualsFn<T>,
    /// Incremented on every effective write
    version: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriberId, SubscriberFn<T>)>>,
    next_subscriber: Cell<u64>,
}

impl<T> CellInner<T> {
    fn new(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            value: RefCell::new(value),
            equals,
            version: Cell::new(0),
            subscribers: RefCell::new(Vec::new()),
            next_subscriber: Cell::new(1),
        }
    }

    fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.subscribers.borrow().iter().any(|(sid, _)| *sid == id)
    }

    fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
    }
}

// =============================================================================
// VALUE CELL
// =============================================================================

/// A reactive cell holding a value of type `T`.
///
/// # Example
///
/// ```
/// use spark_hooks::ValueCell;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let theme = ValueCell::new(String::from("light"));
/// let seen = Rc::new(Cell::new(0));
///
/// let _sub = theme.subscribe({
///     let seen = seen.clone();
///     move |_| seen.set(seen.get() + 1)
/// });
///
/// assert!(theme.set("dark".to_string()));
/// assert!(!theme.set("dark".to_string())); // equal, not notified
/// assert_eq!(seen.get(), 1);
/// ```
pub struct ValueCell<T> {
    inner: Rc<CellInner<T>>,
}

impl<T> Clone for ValueCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> ValueCell<T> {
    /// Create a cell compared with `PartialEq`.
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::new_with_equals(value, default_equals::<T>)
    }

    /// Create a cell with a custom equality function.
    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Rc::new(CellInner::new(value, equals)),
        }
    }

    /// Get the current value (cloning).
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Access the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Write a new value.
    ///
    /// Returns `true` if the value changed (and subscribers were notified).
    pub fn set(&self, value: T) -> bool {
        let unchanged = (self.inner.equals)(&self.inner.value.borrow(), &value);
        if unchanged {
            return false;
        }
        *self.inner.value.borrow_mut() = value;
        self.inner.version.set(self.inner.version.get() + 1);
        self.notify();
        true
    }

    /// Derive the next value from the current one.
    ///
    /// Equality-gated like `set`.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Number of effective writes so far.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Subscribe to changes. The subscriber receives a snapshot of the new
    /// value and may write back into this cell.
    ///
    /// Dropping the returned `Subscription` unsubscribes.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> Subscription {
        let id = SubscriberId(self.inner.next_subscriber.get());
        self.inner.next_subscriber.set(id.0 + 1);
        self.inner.subscribers.borrow_mut().push((id, Rc::new(f)));

        let weak: Weak<CellInner<T>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.unsubscribe(id);
            }
        })
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// A read-only view sharing this cell.
    pub fn read_only(&self) -> ReadCell<T> {
        ReadCell { cell: self.clone() }
    }

    /// Whether two handles share the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------
    // Notification
    // -------------------------------------------------------------------------

    /// Notify subscribers of the current value.
    ///
    /// Collect-then-call: the subscriber list is snapshotted so subscribers may
    /// subscribe, unsubscribe or write while being notified. A nested write
    /// notifies everyone with the newer value, so the outer round stops.
    fn notify(&self) {
        let subscribers: Vec<(SubscriberId, SubscriberFn<T>)> =
            self.inner.subscribers.borrow().iter().cloned().collect();
        if subscribers.is_empty() {
            return;
        }

        let version = self.inner.version.get();
        let snapshot = self.get();
        for (id, subscriber) in subscribers {
            if self.inner.version.get() != version {
                break;
            }
            if !self.inner.is_subscribed(id) {
                continue;
            }
            subscriber(&snapshot);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCell")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

// =============================================================================
// READ CELL
// =============================================================================

/// Read-only view of a `ValueCell`, handed out by hooks so components cannot
/// write bridge-owned state.
pub struct ReadCell<T> {
    cell: ValueCell<T>,
}

impl<T> Clone for ReadCell<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Clone + 'static> ReadCell<T> {
    /// Get the current value (cloning).
    pub fn get(&self) -> T {
        self.cell.get()
    }

    /// Access the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    /// Number of effective writes so far.
    pub fn version(&self) -> u64 {
        self.cell.version()
    }

    /// Subscribe to changes.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> Subscription {
        self.cell.subscribe(f)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.cell.subscriber_count()
    }

    /// Whether both views share one cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.cell.ptr_eq(&other.cell)
    }
}

impl<T: Clone + 'static> From<ValueCell<T>> for ReadCell<T> {
    fn from(cell: ValueCell<T>) -> Self {
        Self { cell }
    }
}

impl<T: Clone + 'static> From<&ValueCell<T>> for ReadCell<T> {
    fn from(cell: &ValueCell<T>) -> Self {
        cell.read_only()
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadCell").field(&self.cell).finish()
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// RAII subscription handle; unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unsubscribe now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the subscription alive for as long as the cell lives.
    pub fn forget(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
