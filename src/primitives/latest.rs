// ============================================================================
// spark-hooks - Latest
// Stable slot holding the most recent callback
// ============================================================================
//
// Native listeners are registered once per target and indirect through a
// `Latest` slot. Handing a hook a new closure overwrites the slot; it never
// re-registers anything, and a scheduled tick always reads the newest value.
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Single-writer slot shared between a hook handle and its native listeners.
///
/// # Example
///
/// ```
/// use spark_hooks::primitives::latest::Latest;
/// use std::rc::Rc;
///
/// let slot: Latest<Rc<dyn Fn() -> &'static str>> = Latest::new(Rc::new(|| "first"));
/// let listener = slot.clone();
///
/// slot.set(Rc::new(|| "second"));
/// assert_eq!((listener.get())(), "second");
/// ```
pub struct Latest<T> {
    slot: Rc<RefCell<T>>,
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T: Clone> Latest<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(value)),
        }
    }

    /// Replace the stored value.
    pub fn set(&self, value: T) {
        *self.slot.borrow_mut() = value;
    }

    /// Clone the stored value out of the slot.
    ///
    /// The borrow ends before the caller uses the value, so a callback may
    /// replace itself while running.
    pub fn get(&self) -> T {
        self.slot.borrow().clone()
    }
}

impl<T: Default + Clone> Default for Latest<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Latest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latest")
            .field("handles", &Rc::strong_count(&self.slot))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn clones_share_the_slot() {
        let a = Latest::new(1);
        let b = a.clone();
        a.set(2);
        assert_eq!(b.get(), 2);
    }

    #[test]
    fn callback_may_replace_itself() {
        let calls = Rc::new(Cell::new(0));
        let slot: Latest<Option<Rc<dyn Fn()>>> = Latest::default();

        let inner = slot.clone();
        let c = calls.clone();
        slot.set(Some(Rc::new(move || {
            c.set(c.get() + 1);
            inner.set(None);
        })));

        if let Some(f) = slot.get() {
            f();
        }
        assert_eq!(calls.get(), 1);
        assert!(slot.get().is_none());
    }
}
