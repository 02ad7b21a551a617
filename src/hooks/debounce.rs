// ============================================================================
// spark-hooks - Debounce
// Commit a source value only after it stays unchanged for `delay`
// ============================================================================

use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::core::context;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::Attachment;
use crate::primitives::pending::PendingTimer;

struct DebounceInner<T> {
    source: ReadCell<T>,
    delay: Duration,
    committed: ValueCell<T>,
    pending: Option<PendingTimer>,
    attachment: Attachment,
}

impl<T: Clone + PartialEq + 'static> DebounceInner<T> {
    /// Restart the wait; whatever the source holds when it ends is committed.
    fn restart(self: &Rc<Self>) {
        let Some(pending) = &self.pending else {
            return;
        };
        let weak: Weak<Self> = Rc::downgrade(self);
        pending.schedule(self.delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.committed.set(inner.source.get());
            }
        });
    }

    fn attach(self: &Rc<Self>) {
        if self.pending.is_none() {
            return;
        }
        let weak: Weak<Self> = Rc::downgrade(self);

        self.attachment.attach(|teardown| {
            // The source may have moved on while detached
            if self.source.with(|v| *v != self.committed.get()) {
                self.restart();
            }

            teardown.hold(self.source.subscribe({
                let weak = weak.clone();
                move |_| {
                    if let Some(inner) = weak.upgrade() {
                        inner.restart();
                    }
                }
            }));
            teardown.push(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if let Some(pending) = &inner.pending {
                    pending.cancel();
                }
            });
        });
    }
}

/// The debounced view of a source cell.
pub struct Debounced<T> {
    inner: Rc<DebounceInner<T>>,
}

impl<T> Clone for Debounced<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Debounced<T> {
    pub fn get(&self) -> T {
        self.inner.committed.get()
    }

    pub fn value(&self) -> ReadCell<T> {
        self.inner.committed.read_only()
    }

    /// Whether a commit is scheduled.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.as_ref().is_some_and(PendingTimer::is_pending)
    }
}

impl<T: fmt::Debug> fmt::Debug for Debounced<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounced")
            .field("delay", &self.inner.delay)
            .field("committed", &self.inner.committed)
            .finish()
    }
}

impl_lifecycle!(Debounced<T>, [T: Clone + PartialEq + 'static]);

/// Follow `source`, committing a value once no change arrived for `delay`.
///
/// Starts at the source's current value. Without a window there is no timer
/// and the value never moves.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_debounce, MemoryHost, ValueCell};
/// use std::time::Duration;
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let query = ValueCell::new(String::new());
/// let debounced = use_debounce(&query.read_only(), Duration::from_millis(300));
///
/// query.set("r".into());
/// host.advance_ms(100);
/// query.set("rust".into());
/// host.advance_ms(299);
/// assert_eq!(debounced.get(), "");
/// host.advance_ms(1);
/// assert_eq!(debounced.get(), "rust");
/// ```
pub fn use_debounce<T: Clone + PartialEq + 'static>(source: &ReadCell<T>, delay: Duration) -> Debounced<T> {
    let pending = context::window().map(|window| PendingTimer::new(window.scheduler().clone()));
    super::mount(Debounced {
        inner: Rc::new(DebounceInner {
            source: source.clone(),
            delay,
            committed: ValueCell::new(source.get()),
            pending,
            attachment: Attachment::new(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use crate::host::scheduler::Scheduler;
    use crate::primitives::lifecycle::Lifecycle;
    use std::cell::RefCell;

    #[test]
    fn rapid_inputs_commit_only_the_last() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let input = ValueCell::new('_');
        let debounced = use_debounce(&input.read_only(), Duration::from_millis(500));

        let commits = Rc::new(RefCell::new(Vec::new()));
        let _sub = debounced.value().subscribe({
            let commits = commits.clone();
            move |v| commits.borrow_mut().push(*v)
        });

        input.set('a');
        host.advance_ms(100);
        input.set('b');
        host.advance_ms(100);
        input.set('c');
        host.advance_ms(499);
        assert!(commits.borrow().is_empty());

        host.advance_ms(1);
        assert_eq!(*commits.borrow(), vec!['c']);
        assert!(!debounced.is_pending());
    }

    #[test]
    fn starts_at_source_value() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let input = ValueCell::new(3);

        let debounced = use_debounce(&input.read_only(), Duration::from_millis(10));
        assert_eq!(debounced.get(), 3);
        assert_eq!(host.scheduler().pending_count(), 0);
    }

    #[test]
    fn deactivation_cancels_pending_commit() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let input = ValueCell::new(0);
        let debounced = use_debounce(&input.read_only(), Duration::from_millis(50));

        input.set(1);
        debounced.deactivate();
        host.advance_ms(100);
        assert_eq!(debounced.get(), 0);
        assert_eq!(input.subscriber_count(), 0);

        debounced.activate();
        host.advance_ms(50);
        assert_eq!(debounced.get(), 1);
    }

    #[test]
    fn without_window_never_commits() {
        let input = ValueCell::new(0);
        let debounced = use_debounce(&input.read_only(), Duration::from_millis(1));
        input.set(5);
        assert_eq!(debounced.get(), 0);
        assert!(!debounced.is_active());
    }
}
