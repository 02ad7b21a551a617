// ============================================================================
// spark-hooks - Throttle
// At most one commit of a source value per interval
// ============================================================================
//
// Trailing-edge throttle. An input arriving `interval` or more after the
// last commit is committed at once. An earlier input schedules one commit
// for the end of the window; inputs arriving before it fires do not move it,
// and it commits whatever the source holds at that moment.
// ============================================================================

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::core::context;
use crate::host::scheduler::duration_ms;
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::Attachment;
use crate::primitives::pending::PendingTimer;

struct ThrottleInner<T> {
    window: Option<Window>,
    source: ReadCell<T>,
    interval: Duration,
    committed: ValueCell<T>,
    /// Clock reading of the last commit (creation counts as one)
    last_commit: Cell<i64>,
    pending: Option<PendingTimer>,
    attachment: Attachment,
}

impl<T: Clone + PartialEq + 'static> ThrottleInner<T> {
    fn commit(&self, now: i64) {
        self.committed.set(self.source.get());
        self.last_commit.set(now);
    }

    fn on_input(self: &Rc<Self>) {
        let (Some(window), Some(pending)) = (&self.window, &self.pending) else {
            return;
        };
        let now = window.now();
        let elapsed = now - self.last_commit.get();
        let interval = duration_ms(self.interval);

        if elapsed >= interval {
            pending.cancel();
            self.commit(now);
            return;
        }
        if pending.is_pending() {
            return;
        }

        let weak: Weak<Self> = Rc::downgrade(self);
        let remaining = u64::try_from(interval - elapsed).unwrap_or_default();
        pending.schedule(Duration::from_millis(remaining), move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Some(window) = &inner.window {
                inner.commit(window.now());
            }
        });
    }

    fn attach(self: &Rc<Self>) {
        if self.window.is_none() {
            return;
        }
        let weak: Weak<Self> = Rc::downgrade(self);

        self.attachment.attach(|teardown| {
            if self.source.with(|v| *v != self.committed.get()) {
                self.on_input();
            }

            teardown.hold(self.source.subscribe({
                let weak = weak.clone();
                move |_| {
                    if let Some(inner) = weak.upgrade() {
                        inner.on_input();
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

/// The throttled view of a source cell.
pub struct Throttled<T> {
    inner: Rc<ThrottleInner<T>>,
}

impl<T> Clone for Throttled<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Throttled<T> {
    pub fn get(&self) -> T {
        self.inner.committed.get()
    }

    pub fn value(&self) -> ReadCell<T> {
        self.inner.committed.read_only()
    }

    /// Whether a trailing commit is scheduled.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.as_ref().is_some_and(PendingTimer::is_pending)
    }
}

impl<T: fmt::Debug> fmt::Debug for Throttled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttled")
            .field("interval", &self.inner.interval)
            .field("committed", &self.inner.committed)
            .finish()
    }
}

impl_lifecycle!(Throttled<T>, [T: Clone + PartialEq + 'static]);

/// Follow `source`, committing at most once per `interval`.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_throttle, MemoryHost, ValueCell};
/// use std::time::Duration;
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let pointer = ValueCell::new(0);
/// let throttled = use_throttle(&pointer.read_only(), Duration::from_millis(100));
///
/// pointer.set(1);
/// pointer.set(2);
/// assert_eq!(throttled.get(), 0);
///
/// host.advance_ms(100);
/// assert_eq!(throttled.get(), 2);
/// ```
pub fn use_throttle<T: Clone + PartialEq + 'static>(source: &ReadCell<T>, interval: Duration) -> Throttled<T> {
    let window = context::window();
    let pending = window
        .as_ref()
        .map(|window| PendingTimer::new(window.scheduler().clone()));
    let now = window.as_ref().map(Window::now).unwrap_or_default();

    super::mount(Throttled {
        inner: Rc::new(ThrottleInner {
            window,
            source: source.clone(),
            interval,
            committed: ValueCell::new(source.get()),
            last_commit: Cell::new(now),
            pending,
            attachment: Attachment::new(),
        }),
    })
}
