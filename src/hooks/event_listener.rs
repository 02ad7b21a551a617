// ============================================================================
// spark-hooks - Event Listener Bridges
// Generic event listener and click-outside detection
// ============================================================================

use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::constants::{EVENT_MOUSEDOWN, EVENT_TOUCHSTART};
use crate::core::context;
use crate::host::dom::{Element, Event, ListenerOptions};
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::latest::Latest;
use crate::primitives::lifecycle::{Attachment, Teardown};
use crate::primitives::node_ref::NodeRef;

type Handler = Rc<dyn Fn(&Event)>;

/// Where a listener is attached.
#[derive(Debug, Clone, Default)]
pub enum ListenTarget {
    /// The global scope
    #[default]
    Window,
    Document,
    /// An element; inert while the ref is empty, rebinds when it changes
    Node(NodeRef),
}

impl From<NodeRef> for ListenTarget {
    fn from(node_ref: NodeRef) -> Self {
        Self::Node(node_ref)
    }
}

/// Native listener forwarding to whatever handler is current.
fn forward(handler: &Latest<Handler>) -> impl Fn(&Event) + 'static {
    let handler = handler.clone();
    move |event| (handler.get())(event)
}

// =============================================================================
// EVENT LISTENER
// =============================================================================

struct EventListenerInner {
    window: Option<Window>,
    event_type: String,
    target: ListenTarget,
    options: ListenerOptions,
    handler: Latest<Handler>,
    attachment: Attachment,
    binding: Attachment,
}

impl EventListenerInner {
    fn binding(&self) -> &Attachment {
        &self.binding
    }

    fn bind(self: &Rc<Self>, node: &Element, teardown: &mut Teardown) {
        teardown.hold(node.add_event_listener(&self.event_type, forward(&self.handler), self.options));
    }

    fn attach(self: &Rc<Self>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        self.attachment.attach(|teardown| match &self.target {
            ListenTarget::Window => teardown.hold(window.add_event_listener(
                &self.event_type,
                forward(&self.handler),
                self.options,
            )),
            ListenTarget::Document => teardown.hold(window.document().add_event_listener(
                &self.event_type,
                forward(&self.handler),
                self.options,
            )),
            ListenTarget::Node(node_ref) => {
                super::track_node(self, teardown, node_ref, Self::binding, Self::bind);
            }
        });
    }
}

/// A listener registration that survives handler changes.
#[derive(Clone)]
pub struct EventListener {
    inner: Rc<EventListenerInner>,
}

impl EventListener {
    /// Replace the handler without touching the native registration.
    pub fn set_handler(&self, handler: impl Fn(&Event) + 'static) {
        self.inner.handler.set(Rc::new(handler));
    }

    pub fn event_type(&self) -> &str {
        &self.inner.event_type
    }
}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener")
            .field("event_type", &self.inner.event_type)
            .field("target", &self.inner.target)
            .field("attached", &self.inner.attachment.is_attached())
            .finish()
    }
}

impl_lifecycle!(EventListener);

/// Listen for `event_type` on `target`.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_event_listener, Event, ListenTarget, MemoryHost, ValueCell};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let presses = ValueCell::new(0);
/// let p = presses.clone();
/// let _listener = use_event_listener(
///     "keydown",
///     move |_| { p.update(|n| *n += 1); },
///     ListenTarget::Window,
///     Default::default(),
/// );
///
/// host.window().dispatch_event(Event::key("keydown", "Enter"));
/// assert_eq!(presses.get(), 1);
/// ```
pub fn use_event_listener(
    event_type: &str,
    handler: impl Fn(&Event) + 'static,
    target: ListenTarget,
    options: ListenerOptions,
) -> EventListener {
    let handler: Handler = Rc::new(handler);
    super::mount(EventListener {
        inner: Rc::new(EventListenerInner {
            window: context::window(),
            event_type: event_type.to_string(),
            target,
            options,
            handler: Latest::new(handler),
            attachment: Attachment::new(),
            binding: Attachment::new(),
        }),
    })
}

// =============================================================================
// CLICK OUTSIDE
// =============================================================================

struct ClickOutsideInner {
    window: Option<Window>,
    node_ref: NodeRef,
    handler: Latest<Handler>,
    attachment: Attachment,
}

impl ClickOutsideInner {
    fn attach(self: &Rc<Self>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let weak: Weak<Self> = Rc::downgrade(self);

        self.attachment.attach(|teardown| {
            for event_type in [EVENT_MOUSEDOWN, EVENT_TOUCHSTART] {
                let weak = weak.clone();
                teardown.hold(window.document().add_event_listener(
                    event_type,
                    move |event| {
                        if let Some(inner) = weak.upgrade() {
                            inner.on_pointer_down(event);
                        }
                    },
                    ListenerOptions::default(),
                ));
            }
        });
    }

    fn on_pointer_down(&self, event: &Event) {
        let Some(node) = self.node_ref.get() else {
            return;
        };
        let inside = event.target().is_some_and(|target| node.contains(target));
        if !inside {
            (self.handler.get())(event);
        }
    }
}

/// Click/touch-outside detector.
#[derive(Clone)]
pub struct ClickOutside {
    inner: Rc<ClickOutsideInner>,
}

impl ClickOutside {
    pub fn set_handler(&self, handler: impl Fn(&Event) + 'static) {
        self.inner.handler.set(Rc::new(handler));
    }

    pub fn node_ref(&self) -> &NodeRef {
        &self.inner.node_ref
    }
}

impl fmt::Debug for ClickOutside {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickOutside")
            .field("node_ref", &self.inner.node_ref)
            .field("attached", &self.inner.attachment.is_attached())
            .finish()
    }
}

impl_lifecycle!(ClickOutside);

/// Call `handler` for every `mousedown`/`touchstart` that starts outside the
/// subtree of `node_ref`. Nothing fires while the ref is empty.
pub fn use_click_outside(node_ref: &NodeRef, handler: impl Fn(&Event) + 'static) -> ClickOutside {
    let handler: Handler = Rc::new(handler);
    super::mount(ClickOutside {
        inner: Rc::new(ClickOutsideInner {
            window: context::window(),
            node_ref: node_ref.clone(),
            handler: Latest::new(handler),
            attachment: Attachment::new(),
        }),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use crate::primitives::lifecycle::Lifecycle;
    use std::cell::{Cell, RefCell};

    fn counter() -> (Rc<Cell<u32>>, impl Fn(&Event) + 'static) {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        (hits, move |_: &Event| h.set(h.get() + 1))
    }

    #[test]
    fn window_listener_receives_events() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let (hits, handler) = counter();

        let _l = use_event_listener("resize", handler, ListenTarget::Window, ListenerOptions::default());
        host.window().resize_to(10.0, 10.0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn document_listener_receives_bubbled_events() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let (hits, handler) = counter();
        let button = host.document().create_element("button");

        let _l = use_event_listener("mousedown", handler, ListenTarget::Document, ListenerOptions::default());
        button.dispatch_event(Event::new("mousedown"));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn new_handler_does_not_reregister() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let target = host.window().event_target().clone();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let l = use_event_listener(
            "scroll",
            {
                let seen = seen.clone();
                move |_| seen.borrow_mut().push("old")
            },
            ListenTarget::Window,
            ListenerOptions::passive(),
        );
        l.set_handler({
            let seen = seen.clone();
            move |_| seen.borrow_mut().push("new")
        });

        host.window().scroll_to(0.0, 5.0);
        assert_eq!(*seen.borrow(), vec!["new"]);
        assert_eq!(target.added_count(), 1);
        assert_eq!(target.removed_count(), 0);
    }

    #[test]
    fn node_target_is_inert_until_populated_and_rebinds() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let (hits, handler) = counter();
        let a = host.document().create_element("div");
        let b = host.document().create_element("div");

        let node_ref = NodeRef::new();
        let _l = use_event_listener("click", handler, node_ref.clone().into(), ListenerOptions::default());
        a.dispatch_event(Event::new("click"));
        assert_eq!(hits.get(), 0);

        node_ref.set(a.clone());
        a.dispatch_event(Event::new("click"));
        assert_eq!(hits.get(), 1);

        node_ref.set(b.clone());
        assert_eq!(a.event_target().listener_count(), 0);
        a.dispatch_event(Event::new("click"));
        b.dispatch_event(Event::new("click"));
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn deactivate_removes_node_listener() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let (_hits, handler) = counter();
        let el = host.document().create_element("div");

        let l = use_event_listener(
            "click",
            handler,
            ListenTarget::Node(NodeRef::with_element(el.clone())),
            ListenerOptions::default(),
        );
        assert_eq!(el.event_target().listener_count(), 1);
        l.deactivate();
        assert_eq!(el.event_target().listener_count(), 0);
        l.activate();
        assert_eq!(el.event_target().listener_count(), 1);
    }

    #[test]
    fn click_outside_ignores_inside_and_fires_outside() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let (hits, handler) = counter();

        let menu = host.document().create_element("ul");
        let item = host.document().create_element("li");
        let elsewhere = host.document().create_element("main");
        menu.append_child(&item);

        let node_ref = NodeRef::with_element(menu.clone());
        let _c = use_click_outside(&node_ref, handler);

        item.dispatch_event(Event::new("mousedown"));
        menu.dispatch_event(Event::new("touchstart"));
        assert_eq!(hits.get(), 0);

        elsewhere.dispatch_event(Event::new("mousedown"));
        elsewhere.dispatch_event(Event::new("touchstart"));
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn click_outside_with_empty_ref_never_fires() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let (hits, handler) = counter();

        let _c = use_click_outside(&NodeRef::new(), handler);
        host.document().create_element("div").dispatch_event(Event::new("mousedown"));
        host.document().dispatch_event(Event::new("mousedown"));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn click_outside_attaches_to_document_only() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let (_hits, handler) = counter();
        let menu = host.document().create_element("ul");

        let c = use_click_outside(&NodeRef::with_element(menu.clone()), handler);
        let doc = host.document().event_target().clone();
        assert_eq!(doc.listener_count_for("mousedown"), 1);
        assert_eq!(doc.listener_count_for("touchstart"), 1);
        assert_eq!(menu.event_target().listener_count(), 0);

        drop(c);
        assert_eq!(doc.listener_count(), 0);
    }
}
