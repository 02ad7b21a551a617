// ============================================================================
// spark-hooks - DOM
// Event targets, events, elements and the document
// ============================================================================
//
// Just enough of the DOM for the hooks: listener registration with exact
// removal, event dispatch with bubbling through the element tree into the
// owner document, and the geometry (offset size, scroll metrics) that the
// size and scroll hooks read.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::constants::EVENT_SCROLL;
use crate::core::types::ListenerId;
use crate::host::storage::StorageArea;

// =============================================================================
// EVENTS
// =============================================================================

/// Payload carried by an event, by event family.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Plain,
    /// `keydown` / `keyup`
    Key { key: String },
    /// `storage`: another document wrote to a storage area
    Storage {
        area: StorageArea,
        key: Option<String>,
        new_value: Option<String>,
    },
    /// `change` on a media query list
    MediaChange { matches: bool },
    /// `popstate`
    PopState,
}

/// A dispatched event.
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    kind: EventKind,
    bubbles: bool,
    target: Option<Element>,
}

impl Event {
    /// A bubbling event without payload.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            kind: EventKind::Plain,
            bubbles: true,
            target: None,
        }
    }

    pub fn key(event_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Key { key: key.into() },
            ..Self::new(event_type)
        }
    }

    pub fn storage(area: StorageArea, key: Option<&str>, new_value: Option<&str>) -> Self {
        Self {
            kind: EventKind::Storage {
                area,
                key: key.map(str::to_string),
                new_value: new_value.map(str::to_string),
            },
            bubbles: false,
            ..Self::new(crate::core::constants::EVENT_STORAGE)
        }
    }

    pub fn media_change(matches: bool) -> Self {
        Self {
            kind: EventKind::MediaChange { matches },
            bubbles: false,
            ..Self::new(crate::core::constants::EVENT_CHANGE)
        }
    }

    pub fn popstate() -> Self {
        Self {
            kind: EventKind::PopState,
            bubbles: false,
            ..Self::new(crate::core::constants::EVENT_POPSTATE)
        }
    }

    /// Set whether the event bubbles to ancestors and the document.
    pub fn bubbling(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// Key name of a keyboard event.
    pub fn key_name(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Key { key } => Some(key),
            _ => None,
        }
    }

    /// The element the event was dispatched on; `None` for window and
    /// document level events.
    pub fn target(&self) -> Option<&Element> {
        self.target.as_ref()
    }
}

// =============================================================================
// EVENT TARGET
// =============================================================================

/// Native listener callback
pub type Listener = Rc<dyn Fn(&Event)>;

/// Options of `addEventListener`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub capture: bool,
    /// Remove the listener after its first invocation
    pub once: bool,
    pub passive: bool,
}

impl ListenerOptions {
    pub fn passive() -> Self {
        Self {
            passive: true,
            ..Self::default()
        }
    }
}

struct ListenerEntry {
    id: ListenerId,
    event_type: String,
    options: ListenerOptions,
    listener: Listener,
}

struct EventTargetInner {
    listeners: RefCell<Vec<ListenerEntry>>,
    next_id: Cell<u64>,
    added: Cell<usize>,
    removed: Cell<usize>,
}

impl EventTargetInner {
    fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        let removed = listeners.len() != before;
        if removed {
            self.removed.set(self.removed.get() + 1);
        }
        removed
    }

    fn contains(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|entry| entry.id == id)
    }
}

/// Something listeners can be attached to: the window, the document, an
/// element or a media query list.
///
/// Counts every registration and removal so tests can assert that a hook
/// removed exactly what it added.
#[derive(Clone)]
pub struct EventTarget {
    inner: Rc<EventTargetInner>,
}

impl EventTarget {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EventTargetInner {
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
                added: Cell::new(0),
                removed: Cell::new(0),
            }),
        }
    }

    /// Register `listener` for `event_type`.
    ///
    /// Dropping the returned registration removes exactly this listener.
    pub fn add_event_listener(
        &self,
        event_type: &str,
        listener: impl Fn(&Event) + 'static,
        options: ListenerOptions,
    ) -> ListenerRegistration {
        let id = ListenerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push(ListenerEntry {
            id,
            event_type: event_type.to_string(),
            options,
            listener: Rc::new(listener),
        });
        self.inner.added.set(self.inner.added.get() + 1);

        ListenerRegistration {
            target: Rc::downgrade(&self.inner),
            id,
            event_type: event_type.to_string(),
        }
    }

    /// Deliver `event` to the listeners registered for its type.
    ///
    /// Listeners are snapshotted first; one removed by an earlier listener of
    /// the same round is skipped.
    pub fn dispatch_event(&self, event: &Event) {
        let matching: Vec<(ListenerId, bool, Listener)> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.event_type == event.event_type)
            .map(|entry| (entry.id, entry.options.once, entry.listener.clone()))
            .collect();

        for (id, once, listener) in matching {
            if !self.inner.contains(id) {
                continue;
            }
            if once {
                self.inner.remove(id);
            }
            listener(event);
        }
    }

    /// Live listeners of every type.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Live listeners for `event_type`.
    pub fn listener_count_for(&self, event_type: &str) -> usize {
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.event_type == event_type)
            .count()
    }

    /// Registrations made since creation.
    pub fn added_count(&self) -> usize {
        self.inner.added.get()
    }

    /// Removals made since creation.
    pub fn removed_count(&self) -> usize {
        self.inner.removed.get()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for EventTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTarget")
            .field("listeners", &self.listener_count())
            .field("added", &self.added_count())
            .field("removed", &self.removed_count())
            .finish()
    }
}

// =============================================================================
// LISTENER REGISTRATION
// =============================================================================

/// One `(target, type, listener, options)` registration.
///
/// Removal happens exactly once: on `remove()` or on drop, whichever comes
/// first. A registration outliving its target is inert.
#[must_use = "dropping a ListenerRegistration removes the listener"]
pub struct ListenerRegistration {
    target: Weak<EventTargetInner>,
    id: ListenerId,
    event_type: String,
}

impl ListenerRegistration {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Whether the listener is still registered.
    pub fn is_live(&self) -> bool {
        self.target
            .upgrade()
            .is_some_and(|target| target.contains(self.id))
    }

    /// Remove the listener now.
    pub fn remove(self) {
        drop(self);
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        if let Some(target) = self.target.upgrade() {
            target.remove(self.id);
        }
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .finish()
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

/// Scroll geometry of a scrollable element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_left: f64,
    pub scroll_height: f64,
    pub scroll_width: f64,
    pub client_height: f64,
    pub client_width: f64,
}

struct ElementInner {
    tag: String,
    target: EventTarget,
    document: Weak<DocumentInner>,
    parent: RefCell<Weak<ElementInner>>,
    children: RefCell<Vec<Element>>,
    offset_size: Cell<(f64, f64)>,
    scroll: Cell<ScrollMetrics>,
}

/// A DOM element. Clones are the same node.
#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

impl Element {
    pub fn tag_name(&self) -> &str {
        &self.inner.tag
    }

    pub fn event_target(&self) -> &EventTarget {
        &self.inner.target
    }

    pub fn add_event_listener(
        &self,
        event_type: &str,
        listener: impl Fn(&Event) + 'static,
        options: ListenerOptions,
    ) -> ListenerRegistration {
        self.inner
            .target
            .add_event_listener(event_type, listener, options)
    }

    /// The document that created this element, while it is alive.
    pub fn owner_document(&self) -> Option<Document> {
        self.inner.document.upgrade().map(|inner| Document { inner })
    }

    pub fn parent(&self) -> Option<Element> {
        self.inner.parent.borrow().upgrade().map(|inner| Element { inner })
    }

    pub fn children(&self) -> Vec<Element> {
        self.inner.children.borrow().clone()
    }

    /// Append `child`, detaching it from its previous parent first.
    pub fn append_child(&self, child: &Element) {
        if let Some(previous) = child.parent() {
            previous.remove_child(child);
        }
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        self.inner.children.borrow_mut().push(child.clone());
    }

    /// Remove `child`. Returns `false` if it was not a child of this node.
    pub fn remove_child(&self, child: &Element) -> bool {
        let mut children = self.inner.children.borrow_mut();
        let before = children.len();
        children.retain(|c| !c.ptr_eq(child));
        let removed = children.len() != before;
        if removed {
            *child.inner.parent.borrow_mut() = Weak::new();
        }
        removed
    }

    /// Whether `other` is this node or one of its descendants.
    pub fn contains(&self, other: &Element) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    pub fn offset_width(&self) -> f64 {
        self.inner.offset_size.get().0
    }

    pub fn offset_height(&self) -> f64 {
        self.inner.offset_size.get().1
    }

    /// Lay the element out at `width` x `height`. Observers are not notified;
    /// the host's observer registry delivers resize entries.
    pub fn set_offset_size(&self, width: f64, height: f64) {
        self.inner.offset_size.set((width, height));
    }

    pub fn scroll_metrics(&self) -> ScrollMetrics {
        self.inner.scroll.get()
    }

    /// Replace the scroll geometry without dispatching anything.
    pub fn set_scroll_metrics(&self, metrics: ScrollMetrics) {
        self.inner.scroll.set(metrics);
    }

    /// Scroll to (`left`, `top`) and dispatch a non-bubbling `scroll` event.
    pub fn scroll_to(&self, left: f64, top: f64) {
        let mut metrics = self.inner.scroll.get();
        metrics.scroll_left = left;
        metrics.scroll_top = top;
        self.inner.scroll.set(metrics);
        self.dispatch_event(Event::new(EVENT_SCROLL).bubbling(false));
    }

    /// Dispatch `event` with this element as target: the element first,
    /// then (if the event bubbles) each ancestor, then the owner document.
    pub fn dispatch_event(&self, mut event: Event) {
        event.target = Some(self.clone());
        self.inner.target.dispatch_event(&event);
        if !event.bubbles {
            return;
        }

        let mut current = self.parent();
        while let Some(node) = current {
            node.inner.target.dispatch_event(&event);
            current = node.parent();
        }
        if let Some(document) = self.owner_document() {
            document.inner.target.dispatch_event(&event);
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Node identity.
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.inner.tag)
            .field("children", &self.inner.children.borrow().len())
            .finish()
    }
}

// =============================================================================
// DOCUMENT
// =============================================================================

struct DocumentInner {
    target: EventTarget,
}

/// The document: creates elements and receives bubbled events.
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DocumentInner {
                target: EventTarget::new(),
            }),
        }
    }

    pub fn create_element(&self, tag: &str) -> Element {
        Element {
            inner: Rc::new(ElementInner {
                tag: tag.to_string(),
                target: EventTarget::new(),
                document: Rc::downgrade(&self.inner),
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
                offset_size: Cell::new((0.0, 0.0)),
                scroll: Cell::new(ScrollMetrics::default()),
            }),
        }
    }

    pub fn event_target(&self) -> &EventTarget {
        &self.inner.target
    }

    pub fn add_event_listener(
        &self,
        event_type: &str,
        listener: impl Fn(&Event) + 'static,
        options: ListenerOptions,
    ) -> ListenerRegistration {
        self.inner
            .target
            .add_event_listener(event_type, listener, options)
    }

    /// Dispatch `event` on the document itself (no element target).
    pub fn dispatch_event(&self, event: Event) {
        self.inner.target.dispatch_event(&event);
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("target", &self.inner.target)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&Event)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = log.clone();
            move |label: &str| -> Box<dyn Fn(&Event)> {
                let log = log.clone();
                let label = label.to_string();
                Box::new(move |_| log.borrow_mut().push(label.clone()))
            }
        };
        (log, make)
    }

    #[test]
    fn registration_drop_removes_exactly_one_listener() {
        let target = EventTarget::new();
        let a = target.add_event_listener("click", |_| {}, ListenerOptions::default());
        let _b = target.add_event_listener("click", |_| {}, ListenerOptions::default());

        assert_eq!(target.listener_count_for("click"), 2);
        drop(a);
        assert_eq!(target.listener_count_for("click"), 1);
        assert_eq!(target.added_count(), 2);
        assert_eq!(target.removed_count(), 1);
    }

    #[test]
    fn once_listener_fires_once() {
        let target = EventTarget::new();
        let hits = Rc::new(Cell::new(0));
        let reg = target.add_event_listener(
            "ping",
            {
                let hits = hits.clone();
                move |_| hits.set(hits.get() + 1)
            },
            ListenerOptions {
                once: true,
                ..ListenerOptions::default()
            },
        );

        target.dispatch_event(&Event::new("ping"));
        target.dispatch_event(&Event::new("ping"));
        assert_eq!(hits.get(), 1);
        assert!(!reg.is_live());

        // Already removed by dispatch: dropping does not count twice
        drop(reg);
        assert_eq!(target.removed_count(), 1);
    }

    #[test]
    fn events_bubble_to_ancestors_then_document() {
        let document = Document::new();
        let outer = document.create_element("div");
        let inner = document.create_element("span");
        outer.append_child(&inner);

        let (log, make) = recorder();
        let _r1 = inner.add_event_listener("mousedown", make("inner"), ListenerOptions::default());
        let _r2 = outer.add_event_listener("mousedown", make("outer"), ListenerOptions::default());
        let _r3 = document.add_event_listener("mousedown", make("document"), ListenerOptions::default());

        inner.dispatch_event(Event::new("mousedown"));
        assert_eq!(*log.borrow(), vec!["inner", "outer", "document"]);
    }

    #[test]
    fn non_bubbling_event_stays_on_target() {
        let document = Document::new();
        let el = document.create_element("div");

        let (log, make) = recorder();
        let _r1 = el.add_event_listener("mouseenter", make("el"), ListenerOptions::default());
        let _r2 = document.add_event_listener("mouseenter", make("document"), ListenerOptions::default());

        el.dispatch_event(Event::new("mouseenter").bubbling(false));
        assert_eq!(*log.borrow(), vec!["el"]);
    }

    #[test]
    fn contains_is_inclusive_and_follows_tree() {
        let document = Document::new();
        let root = document.create_element("div");
        let child = document.create_element("p");
        let stranger = document.create_element("p");
        root.append_child(&child);

        assert!(root.contains(&root));
        assert!(root.contains(&child));
        assert!(!root.contains(&stranger));
        assert!(!child.contains(&root));

        root.remove_child(&child);
        assert!(!root.contains(&child));
    }

    #[test]
    fn target_is_set_on_dispatch() {
        let document = Document::new();
        let el = document.create_element("button");
        let seen = Rc::new(RefCell::new(None));

        let _r = document.add_event_listener(
            "mousedown",
            {
                let seen = seen.clone();
                move |e| *seen.borrow_mut() = e.target().cloned()
            },
            ListenerOptions::default(),
        );
        el.dispatch_event(Event::new("mousedown"));
        assert!(seen.borrow().as_ref().is_some_and(|t| t.ptr_eq(&el)));
    }

    #[test]
    fn listener_removed_mid_dispatch_is_skipped() {
        let target = EventTarget::new();
        let hits = Rc::new(Cell::new(0));
        let victim: Rc<RefCell<Option<ListenerRegistration>>> = Rc::new(RefCell::new(None));

        let _killer = target.add_event_listener(
            "x",
            {
                let victim = victim.clone();
                move |_| {
                    victim.borrow_mut().take();
                }
            },
            ListenerOptions::default(),
        );
        *victim.borrow_mut() = Some(target.add_event_listener(
            "x",
            {
                let hits = hits.clone();
                move |_| hits.set(hits.get() + 1)
            },
            ListenerOptions::default(),
        ));

        target.dispatch_event(&Event::new("x"));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn scroll_to_updates_metrics_and_dispatches() {
        let document = Document::new();
        let el = document.create_element("div");
        let hits = Rc::new(Cell::new(0));
        let _r = el.add_event_listener(
            "scroll",
            {
                let hits = hits.clone();
                move |_| hits.set(hits.get() + 1)
            },
            ListenerOptions::passive(),
        );

        el.scroll_to(0.0, 120.0);
        assert_eq!(el.scroll_metrics().scroll_top, 120.0);
        assert_eq!(hits.get(), 1);
    }
}
