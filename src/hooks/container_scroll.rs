// ============================================================================
// spark-hooks - Container Scroll
// Scroll geometry of one element plus an "is scrolling" flag
// ============================================================================

use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::core::constants::{DEFAULT_SCROLL_IDLE, EVENT_SCROLL};
use crate::core::context;
use crate::host::dom::{Element, ListenerOptions, ScrollMetrics};
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::{Attachment, Teardown};
use crate::primitives::node_ref::NodeRef;
use crate::primitives::pending::PendingTimer;

/// Scroll geometry of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainerScrollState {
    pub scroll_top: f64,
    pub scroll_left: f64,
    pub scroll_width: f64,
    pub scroll_height: f64,
    pub client_width: f64,
    pub client_height: f64,
    /// True from a scroll event until `delay` passes without another one
    pub is_scrolling: bool,
}

impl ContainerScrollState {
    fn scrolling(metrics: ScrollMetrics) -> Self {
        Self {
            scroll_top: metrics.scroll_top,
            scroll_left: metrics.scroll_left,
            scroll_width: metrics.scroll_width,
            scroll_height: metrics.scroll_height,
            client_width: metrics.client_width,
            client_height: metrics.client_height,
            is_scrolling: true,
        }
    }
}

struct ContainerScrollInner {
    window: Option<Window>,
    node_ref: NodeRef,
    delay: Duration,
    state: ValueCell<ContainerScrollState>,
    idle: Option<PendingTimer>,
    attachment: Attachment,
    binding: Attachment,
}

impl ContainerScrollInner {
    fn binding(&self) -> &Attachment {
        &self.binding
    }

    fn on_scroll(self: &Rc<Self>, node: &Element) {
        self.state.set(ContainerScrollState::scrolling(node.scroll_metrics()));

        let Some(idle) = &self.idle else {
            return;
        };
        let weak: Weak<Self> = Rc::downgrade(self);
        idle.schedule(self.delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.state.update(|s| s.is_scrolling = false);
            }
        });
    }

    fn bind(self: &Rc<Self>, node: &Element, teardown: &mut Teardown) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let source = node.clone();
        teardown.hold(node.add_event_listener(
            EVENT_SCROLL,
            move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_scroll(&source);
                }
            },
            ListenerOptions::passive(),
        ));

        let weak: Weak<Self> = Rc::downgrade(self);
        teardown.push(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Some(idle) = &inner.idle {
                idle.cancel();
            }
        });

        // Pick up the current geometry right away
        self.on_scroll(node);
    }

    fn attach(self: &Rc<Self>) {
        if self.window.is_none() {
            return;
        }
        self.attachment.attach(|teardown| {
            super::track_node(self, teardown, &self.node_ref, Self::binding, Self::bind);
        });
    }
}

/// Scroll state of the element behind a ref.
#[derive(Clone)]
pub struct ContainerScroll {
    inner: Rc<ContainerScrollInner>,
}

impl ContainerScroll {
    pub fn get(&self) -> ContainerScrollState {
        self.inner.state.get()
    }

    pub fn value(&self) -> ReadCell<ContainerScrollState> {
        self.inner.state.read_only()
    }

    pub fn is_scrolling(&self) -> bool {
        self.inner.state.with(|s| s.is_scrolling)
    }

    pub fn node_ref(&self) -> &NodeRef {
        &self.inner.node_ref
    }
}

impl fmt::Debug for ContainerScroll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerScroll")
            .field("node_ref", &self.inner.node_ref)
            .field("delay", &self.inner.delay)
            .field("state", &self.inner.state.get())
            .finish()
    }
}

impl_lifecycle!(ContainerScroll);

/// Track scrolling of the element behind `node_ref`; `is_scrolling` clears
/// 150 ms after the last scroll event.
pub fn use_container_scroll(node_ref: &NodeRef) -> ContainerScroll {
    use_container_scroll_with_delay(node_ref, DEFAULT_SCROLL_IDLE)
}

/// Like [`use_container_scroll`] with a custom idle delay.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_container_scroll_with_delay, MemoryHost, NodeRef};
/// use std::time::Duration;
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
/// let list = host.document().create_element("ul");
///
/// let scroll = use_container_scroll_with_delay(&NodeRef::with_element(list.clone()), Duration::from_millis(50));
/// list.scroll_to(0.0, 120.0);
/// assert_eq!(scroll.get().scroll_top, 120.0);
/// assert!(scroll.is_scrolling());
///
/// host.advance_ms(50);
/// assert!(!scroll.is_scrolling());
/// ```
pub fn use_container_scroll_with_delay(node_ref: &NodeRef, delay: Duration) -> ContainerScroll {
    let window = context::window();
    let idle = window
        .as_ref()
        .map(|window| PendingTimer::new(window.scheduler().clone()));
    super::mount(ContainerScroll {
        inner: Rc::new(ContainerScrollInner {
            window,
            node_ref: node_ref.clone(),
            delay,
            state: ValueCell::new(ContainerScrollState::default()),
            idle,
            attachment: Attachment::new(),
            binding: Attachment::new(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use crate::host::scheduler::Scheduler;
    use crate::primitives::lifecycle::Lifecycle;

    fn list(host: &MemoryHost) -> Element {
        let el = host.document().create_element("ul");
        el.set_scroll_metrics(ScrollMetrics {
            scroll_height: 2000.0,
            scroll_width: 300.0,
            client_height: 400.0,
            client_width: 300.0,
            ..ScrollMetrics::default()
        });
        el
    }

    #[test]
    fn reads_geometry_when_bound() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let el = list(&host);

        let scroll = use_container_scroll(&NodeRef::with_element(el));
        let state = scroll.get();
        assert_eq!(state.scroll_height, 2000.0);
        assert_eq!(state.client_height, 400.0);
        assert!(state.is_scrolling);

        host.advance(DEFAULT_SCROLL_IDLE);
        assert!(!scroll.is_scrolling());
    }

    #[test]
    fn idle_timer_restarts_on_every_scroll() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let el = list(&host);
        let scroll = use_container_scroll(&NodeRef::with_element(el.clone()));

        host.advance_ms(100);
        el.scroll_to(0.0, 50.0);
        host.advance_ms(100);
        el.scroll_to(0.0, 90.0);
        host.advance_ms(149);
        assert!(scroll.is_scrolling());
        assert_eq!(scroll.get().scroll_top, 90.0);

        host.advance_ms(1);
        assert!(!scroll.is_scrolling());
        assert_eq!(scroll.get().scroll_top, 90.0);
    }

    #[test]
    fn deactivation_cancels_idle_timer_and_listener() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let el = list(&host);
        let scroll = use_container_scroll(&NodeRef::with_element(el.clone()));
        assert_eq!(host.scheduler().pending_count(), 1);

        scroll.deactivate();
        assert_eq!(host.scheduler().pending_count(), 0);
        assert_eq!(el.event_target().listener_count(), 0);
    }

    #[test]
    fn empty_ref_stays_at_defaults() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let scroll = use_container_scroll(&NodeRef::new());
        assert_eq!(scroll.get(), ContainerScrollState::default());
        assert_eq!(host.scheduler().pending_count(), 0);
    }
}
