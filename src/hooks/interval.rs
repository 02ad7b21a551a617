// ============================================================================
// spark-hooks - Interval
// `setInterval` that always calls the latest callback
// ============================================================================

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::core::context;
use crate::core::types::Callback;
use crate::host::scheduler::{duration_ms, Scheduler};
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::latest::Latest;
use crate::primitives::lifecycle::Attachment;

struct IntervalInner {
    window: Option<Window>,
    delay: Cell<Option<Duration>>,
    callback: Latest<Callback>,
    attachment: Attachment,
}

impl IntervalInner {
    fn attach(self: &Rc<Self>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        self.attachment.attach(|teardown| {
            // No delay: suspended, no native timer at all
            let Some(delay) = self.delay.get() else {
                return;
            };
            let callback = self.callback.clone();
            let scheduler = window.scheduler().clone();
            let id = scheduler.set_interval(delay, Rc::new(move || (callback.get())()));
            tracing::trace!(delay_ms = duration_ms(delay), "interval armed");
            teardown.push(move || {
                scheduler.cancel(id);
            });
        });
    }
}

/// A running (or suspended) interval.
#[derive(Clone)]
pub struct Interval {
    inner: Rc<IntervalInner>,
}

impl Interval {
    /// Change the cadence; `None` suspends. Re-arms only if the delay
    /// actually changed.
    pub fn set_delay(&self, delay: Option<Duration>) {
        if self.inner.delay.replace(delay) == delay {
            return;
        }
        if self.inner.attachment.detach() {
            self.inner.attach();
        }
    }

    pub fn delay(&self) -> Option<Duration> {
        self.inner.delay.get()
    }

    /// Replace the callback; the next tick calls it, the timer is untouched.
    pub fn set_callback(&self, callback: impl Fn() + 'static) {
        self.inner.callback.set(Rc::new(callback));
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interval")
            .field("delay", &self.inner.delay.get())
            .field("attached", &self.inner.attachment.is_attached())
            .finish()
    }
}

impl_lifecycle!(Interval);

/// Call `callback` every `delay`; `None` creates no timer until a delay is
/// set with [`Interval::set_delay`].
pub fn use_interval(callback: impl Fn() + 'static, delay: Option<Duration>) -> Interval {
    let callback: Callback = Rc::new(callback);
    super::mount(Interval {
        inner: Rc::new(IntervalInner {
            window: context::window(),
            delay: Cell::new(delay),
            callback: Latest::new(callback),
            attachment: Attachment::new(),
        }),
    })
}
