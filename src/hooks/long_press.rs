// ============================================================================
// spark-hooks - Long Press
// Press/release state machine with an optional progress fraction
// ============================================================================
//
// idle --press--> pressing --delay elapses--> long (callback fired once)
//   ^                |                          |
//   +----release/cancel (short path)------------+--release (long path)
//
// Release while pressing fires `on_end`, plus `on_short_press` when the
// delay had not elapsed. Cancel fires `on_cancel` only. The long-press
// callback never fires after a release or cancel.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::core::constants::{
    DEFAULT_LONG_PRESS_DELAY, EVENT_MOUSEDOWN, EVENT_MOUSELEAVE, EVENT_MOUSEUP, EVENT_TOUCHCANCEL,
    EVENT_TOUCHEND, EVENT_TOUCHSTART,
};
use crate::core::context;
use crate::core::types::{Callback, TimerId};
use crate::host::dom::{Element, ListenerOptions};
use crate::host::scheduler::{duration_ms, Scheduler};
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::latest::Latest;
use crate::primitives::lifecycle::{Attachment, Teardown};
use crate::primitives::node_ref::NodeRef;
use crate::primitives::pending::PendingTimer;
use crate::reactivity::equality::safe_equals_f64;

/// Long-press configuration.
#[derive(Clone)]
pub struct LongPressOptions {
    /// How long the press must be held
    pub delay: Duration,
    /// Fired when the delay elapses, right before the long-press callback
    pub on_start: Option<Callback>,
    /// Fired on every release of a press
    pub on_end: Option<Callback>,
    pub on_cancel: Option<Callback>,
    pub on_short_press: Option<Callback>,
    /// Sample a 0..=1 progress fraction on every animation frame
    pub track_progress: bool,
}

impl Default for LongPressOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_LONG_PRESS_DELAY,
            on_start: None,
            on_end: None,
            on_cancel: None,
            on_short_press: None,
            track_progress: false,
        }
    }
}

impl LongPressOptions {
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn on_start(mut self, f: impl Fn() + 'static) -> Self {
        self.on_start = Some(Rc::new(f));
        self
    }

    pub fn on_end(mut self, f: impl Fn() + 'static) -> Self {
        self.on_end = Some(Rc::new(f));
        self
    }

    pub fn on_cancel(mut self, f: impl Fn() + 'static) -> Self {
        self.on_cancel = Some(Rc::new(f));
        self
    }

    pub fn on_short_press(mut self, f: impl Fn() + 'static) -> Self {
        self.on_short_press = Some(Rc::new(f));
        self
    }

    pub fn track_progress(mut self, track: bool) -> Self {
        self.track_progress = track;
        self
    }
}

impl fmt::Debug for LongPressOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LongPressOptions")
            .field("delay", &self.delay)
            .field("on_start", &self.on_start.is_some())
            .field("on_end", &self.on_end.is_some())
            .field("on_cancel", &self.on_cancel.is_some())
            .field("on_short_press", &self.on_short_press.is_some())
            .field("track_progress", &self.track_progress)
            .finish()
    }
}

fn fire(callback: &Option<Callback>) {
    if let Some(callback) = callback {
        callback();
    }
}

// =============================================================================
// BRIDGE
// =============================================================================

struct LongPressInner {
    window: Option<Window>,
    callback: Latest<Callback>,
    options: LongPressOptions,
    pressing: Cell<bool>,
    is_long: ValueCell<bool>,
    started_at: Cell<i64>,
    progress: ValueCell<f64>,
    timer: Option<PendingTimer>,
    frame: Cell<Option<TimerId>>,
    node_ref: RefCell<NodeRef>,
    attachment: Attachment,
    binding: Attachment,
}

impl LongPressInner {
    fn binding(&self) -> &Attachment {
        &self.binding
    }

    fn press(self: &Rc<Self>) {
        let (Some(window), Some(timer)) = (&self.window, &self.timer) else {
            return;
        };
        if self.pressing.get() || !self.attachment.is_attached() {
            return;
        }
        self.pressing.set(true);
        self.is_long.set(false);
        self.started_at.set(window.now());

        let weak: Weak<Self> = Rc::downgrade(self);
        timer.schedule(self.options.delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.elapsed();
            }
        });

        if self.options.track_progress {
            self.progress.set(0.0);
            self.request_frame();
        }
    }

    /// The delay passed while still pressed.
    fn elapsed(&self) {
        if !self.pressing.get() {
            return;
        }
        self.stop_frames();
        if self.options.track_progress {
            self.progress.set(1.0);
        }
        fire(&self.options.on_start);
        (self.callback.get())();
        self.is_long.set(true);
    }

    fn release(&self) {
        if !self.finish() {
            return;
        }
        fire(&self.options.on_end);
        if !self.is_long.get() {
            fire(&self.options.on_short_press);
        }
    }

    fn cancel(&self) {
        if self.finish() {
            fire(&self.options.on_cancel);
        }
    }

    /// Leave the pressing state. Returns `false` if there was no press.
    fn finish(&self) -> bool {
        if !self.pressing.replace(false) {
            return false;
        }
        if let Some(timer) = &self.timer {
            timer.cancel();
        }
        self.stop_frames();
        self.progress.set(0.0);
        true
    }

    fn request_frame(self: &Rc<Self>) {
        let Some(window) = &self.window else {
            return;
        };
        let weak: Weak<Self> = Rc::downgrade(self);
        let id = window.scheduler().request_animation_frame(Box::new(move |_: f64| {
            if let Some(inner) = weak.upgrade() {
                inner.frame.set(None);
                inner.sample_progress();
            }
        }));
        self.frame.set(Some(id));
    }

    fn sample_progress(self: &Rc<Self>) {
        let Some(window) = &self.window else {
            return;
        };
        if !self.pressing.get() {
            return;
        }
        let elapsed = (window.now() - self.started_at.get()) as f64;
        let delay = duration_ms(self.options.delay).max(1) as f64;
        let fraction = (elapsed / delay).clamp(0.0, 1.0);
        self.progress.set(fraction);
        if fraction < 1.0 {
            self.request_frame();
        }
    }

    fn stop_frames(&self) {
        if let (Some(id), Some(window)) = (self.frame.take(), &self.window) {
            window.scheduler().cancel(id);
        }
    }

    fn bind(self: &Rc<Self>, node: &Element, teardown: &mut Teardown) {
        let handlers: [(&str, fn(&Rc<Self>)); 6] = [
            (EVENT_MOUSEDOWN, Self::press),
            (EVENT_TOUCHSTART, Self::press),
            (EVENT_MOUSEUP, |inner| inner.release()),
            (EVENT_TOUCHEND, |inner| inner.release()),
            (EVENT_MOUSELEAVE, |inner| inner.cancel()),
            (EVENT_TOUCHCANCEL, |inner| inner.cancel()),
        ];
        for (event_type, handler) in handlers {
            let weak: Weak<Self> = Rc::downgrade(self);
            teardown.hold(node.add_event_listener(
                event_type,
                move |_| {
                    if let Some(inner) = weak.upgrade() {
                        handler(&inner);
                    }
                },
                ListenerOptions::default(),
            ));
        }
    }

    fn attach(self: &Rc<Self>) {
        if self.window.is_none() {
            return;
        }
        let weak: Weak<Self> = Rc::downgrade(self);
        let node_ref = self.node_ref.borrow().clone();
        self.attachment.attach(|teardown| {
            super::track_node(self, teardown, &node_ref, Self::binding, Self::bind);
            // A press in flight is abandoned silently
            teardown.push(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.finish();
                }
            });
        });
    }
}

impl Drop for LongPressInner {
    fn drop(&mut self) {
        self.stop_frames();
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Long-press detector. Drive it with `press`/`release`/`cancel`, or attach
/// it to an element ref with `bind`.
#[derive(Clone)]
pub struct LongPress {
    inner: Rc<LongPressInner>,
}

impl LongPress {
    /// Start a press (`mousedown` / `touchstart`).
    pub fn press(&self) {
        self.inner.press();
    }

    /// End a press (`mouseup` / `touchend`).
    pub fn release(&self) {
        self.inner.release();
    }

    /// Abandon a press (`mouseleave` / `touchcancel`).
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_pressing(&self) -> bool {
        self.inner.pressing.get()
    }

    /// Whether the current (or last) press reached the delay.
    pub fn is_long_press(&self) -> ReadCell<bool> {
        self.inner.is_long.read_only()
    }

    /// Fraction of the delay held so far; only moves with `track_progress`.
    pub fn progress(&self) -> ReadCell<f64> {
        self.inner.progress.read_only()
    }

    /// Wire mouse and touch listeners of the element behind `node_ref` to
    /// this detector, following the ref as it changes. Replaces any previous
    /// binding and abandons a press in flight.
    pub fn bind(&self, node_ref: &NodeRef) {
        self.retarget(node_ref.clone());
    }

    /// Remove the element listeners.
    pub fn unbind(&self) {
        self.retarget(NodeRef::new());
    }

    fn retarget(&self, node_ref: NodeRef) {
        *self.inner.node_ref.borrow_mut() = node_ref;
        if self.inner.attachment.detach() {
            self.inner.attach();
        }
    }

    /// The ref currently bound; empty until `bind`.
    pub fn node_ref(&self) -> NodeRef {
        self.inner.node_ref.borrow().clone()
    }

    pub fn set_callback(&self, callback: impl Fn() + 'static) {
        self.inner.callback.set(Rc::new(callback));
    }
}

impl fmt::Debug for LongPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LongPress")
            .field("options", &self.inner.options)
            .field("pressing", &self.inner.pressing.get())
            .field("is_long", &self.inner.is_long.get())
            .finish()
    }
}

impl_lifecycle!(LongPress);

/// Fire `callback` once a press is held for `options.delay`.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_long_press, LongPressOptions, MemoryHost, ValueCell};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let fired = ValueCell::new(false);
/// let f = fired.clone();
/// let press = use_long_press(move || { f.set(true); }, LongPressOptions::default());
///
/// press.press();
/// host.advance_ms(400);
/// press.release();
/// assert!(fired.get());
/// ```
pub fn use_long_press(callback: impl Fn() + 'static, options: LongPressOptions) -> LongPress {
    let window = context::window();
    let timer = window
        .as_ref()
        .map(|window| PendingTimer::new(window.scheduler().clone()));
    let callback: Callback = Rc::new(callback);

    super::mount(LongPress {
        inner: Rc::new(LongPressInner {
            window,
            callback: Latest::new(callback),
            options,
            pressing: Cell::new(false),
            is_long: ValueCell::new(false),
            started_at: Cell::new(0),
            progress: ValueCell::new_with_equals(0.0, safe_equals_f64),
            timer,
            frame: Cell::new(None),
            node_ref: RefCell::new(NodeRef::new()),
            attachment: Attachment::new(),
            binding: Attachment::new(),
        }),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::dom::Event;
    use crate::host::memory::MemoryHost;
    use crate::primitives::lifecycle::Lifecycle;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn logged(log: &Log, name: &'static str) -> impl Fn() + 'static {
        let log = log.clone();
        move || log.borrow_mut().push(name)
    }

    fn detector(log: &Log, options: LongPressOptions) -> LongPress {
        let options = options
            .on_start(logged(log, "start"))
            .on_end(logged(log, "end"))
            .on_cancel(logged(log, "cancel"))
            .on_short_press(logged(log, "short"));
        use_long_press(logged(log, "long"), options)
    }

    #[test]
    fn release_just_before_delay_is_a_short_press() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let log = Log::default();
        let lp = detector(&log, LongPressOptions::default());

        lp.press();
        host.advance(DEFAULT_LONG_PRESS_DELAY - Duration::from_millis(1));
        lp.release();
        host.advance_ms(1_000);
        assert_eq!(*log.borrow(), vec!["end", "short"]);
    }

    #[test]
    fn holding_for_delay_fires_long_press_once() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let log = Log::default();
        let lp = detector(&log, LongPressOptions::default());

        lp.press();
        host.advance(DEFAULT_LONG_PRESS_DELAY);
        assert!(lp.is_long_press().get());
        host.advance_ms(1_000);
        lp.release();
        assert_eq!(*log.borrow(), vec!["start", "long", "end"]);
    }

    #[test]
    fn cancel_never_fires_long_press() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let log = Log::default();
        let lp = detector(&log, LongPressOptions::default().delay(Duration::from_millis(100)));

        lp.press();
        host.advance_ms(50);
        lp.cancel();
        host.advance_ms(500);
        lp.release();
        assert_eq!(*log.borrow(), vec!["cancel"]);
    }

    #[test]
    fn press_while_pressing_is_ignored() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let log = Log::default();
        let lp = detector(&log, LongPressOptions::default().delay(Duration::from_millis(100)));

        lp.press();
        host.advance_ms(60);
        lp.press();
        host.advance_ms(40);
        assert_eq!(*log.borrow(), vec!["start", "long"]);
    }

    #[test]
    fn progress_follows_animation_frames() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let log = Log::default();
        let lp = detector(
            &log,
            LongPressOptions::default()
                .delay(Duration::from_millis(160))
                .track_progress(true),
        );

        lp.press();
        host.advance_ms(80);
        let half = lp.progress().get();
        assert!(half > 0.3 && half < 0.7, "progress was {half}");

        host.advance_ms(80);
        assert_eq!(lp.progress().get(), 1.0);

        lp.release();
        assert_eq!(lp.progress().get(), 0.0);
        assert_eq!(host.scheduler().pending_count(), 0);
    }

    #[test]
    fn progress_is_static_without_tracking() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let lp = use_long_press(|| {}, LongPressOptions::default());

        lp.press();
        host.advance_ms(200);
        assert_eq!(lp.progress().get(), 0.0);
        assert_eq!(host.scheduler().pending_count(), 1);
    }

    #[test]
    fn bound_element_drives_the_detector() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let log = Log::default();
        let button = host.document().create_element("button");
        let lp = detector(&log, LongPressOptions::default());

        let node = NodeRef::with_element(button.clone());
        lp.bind(&node);
        assert_eq!(button.event_target().listener_count(), 6);

        button.dispatch_event(Event::new(EVENT_TOUCHSTART));
        host.advance_ms(500);
        button.dispatch_event(Event::new(EVENT_TOUCHEND));
        assert_eq!(*log.borrow(), vec!["start", "long", "end"]);

        button.dispatch_event(Event::new(EVENT_MOUSEDOWN));
        button.dispatch_event(Event::new(EVENT_MOUSELEAVE).bubbling(false));
        assert_eq!(log.borrow().last(), Some(&"cancel"));

        let other = host.document().create_element("button");
        node.set(other.clone());
        assert_eq!(button.event_target().listener_count(), 0);
        assert_eq!(other.event_target().listener_count(), 6);

        lp.unbind();
        assert_eq!(other.event_target().listener_count(), 0);
        assert!(lp.node_ref().is_empty());
    }

    #[test]
    fn deactivation_abandons_press() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let log = Log::default();
        let lp = detector(&log, LongPressOptions::default());

        lp.press();
        lp.deactivate();
        host.advance_ms(1_000);
        assert!(log.borrow().is_empty());
        assert!(!lp.is_pressing());

        lp.press();
        assert!(!lp.is_pressing());
    }
}
