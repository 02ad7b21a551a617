// ============================================================================
// spark-hooks - Element Size
// `ResizeObserver` bridges: raw entries and a width/height cell
// ============================================================================
//
// Each hook owns at most one observer, created for the current target and
// dropped (disconnecting it) before a replacement is created for a new one.
// ============================================================================

use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::context;
use crate::host::dom::Element;
use crate::host::observer::{ResizeCallback, ResizeEntry};
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::latest::Latest;
use crate::primitives::lifecycle::{Attachment, Teardown};
use crate::primitives::node_ref::NodeRef;
use crate::reactivity::equality::never_equals;

/// Width and height in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Create a resize observer for `node` that forwards entries to `on_entry`
/// while the owner lives. Without observer support nothing is created.
fn observe_resize<S: 'static>(
    window: &Window,
    owner: &Rc<S>,
    node: &Element,
    teardown: &mut Teardown,
    on_entry: fn(&S, &ResizeEntry),
) {
    let Some(factory) = window.observers() else {
        tracing::debug!("ResizeObserver unavailable");
        return;
    };
    let weak: Weak<S> = Rc::downgrade(owner);
    let callback: ResizeCallback = Rc::new(move |entries| {
        let Some(owner) = weak.upgrade() else {
            return;
        };
        for entry in entries {
            on_entry(&owner, entry);
        }
    });

    let observer = factory.resize_observer(callback);
    observer.observe(node);
    tracing::trace!(tag = node.tag_name(), "resize observer created");
    teardown.hold(observer);
}

// =============================================================================
// RESIZE OBSERVER
// =============================================================================

type EntryFn = Rc<dyn Fn(&ResizeEntry)>;

struct ResizeInner {
    window: Option<Window>,
    node_ref: NodeRef,
    /// Latest entry; kept when the target changes
    entry: ValueCell<Option<ResizeEntry>>,
    callback: Latest<EntryFn>,
    attachment: Attachment,
    binding: Attachment,
}

impl ResizeInner {
    fn binding(&self) -> &Attachment {
        &self.binding
    }

    fn on_entry(&self, entry: &ResizeEntry) {
        self.entry.set(Some(entry.clone()));
        (self.callback.get())(entry);
    }

    fn bind(self: &Rc<Self>, node: &Element, teardown: &mut Teardown) {
        if let Some(window) = &self.window {
            observe_resize(window, self, node, teardown, Self::on_entry);
        }
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

/// A resize observer on the element behind a ref.
#[derive(Clone)]
pub struct ResizeObservation {
    inner: Rc<ResizeInner>,
}

impl ResizeObservation {
    /// The most recent entry; `None` until the first one arrives.
    pub fn entry(&self) -> ReadCell<Option<ResizeEntry>> {
        self.inner.entry.read_only()
    }

    /// Swap the entry callback; the observer is kept.
    pub fn set_callback(&self, callback: impl Fn(&ResizeEntry) + 'static) {
        self.inner.callback.set(Rc::new(callback));
    }

    pub fn node_ref(&self) -> &NodeRef {
        &self.inner.node_ref
    }
}

impl fmt::Debug for ResizeObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeObservation")
            .field("node_ref", &self.inner.node_ref)
            .field("attached", &self.inner.attachment.is_attached())
            .finish()
    }
}

impl_lifecycle!(ResizeObservation);

/// Call `callback` with every resize entry of the element behind `node_ref`
/// and keep the latest one in [`ResizeObservation::entry`].
pub fn use_resize_observer(
    node_ref: &NodeRef,
    callback: impl Fn(&ResizeEntry) + 'static,
) -> ResizeObservation {
    let callback: EntryFn = Rc::new(callback);
    super::mount(ResizeObservation {
        inner: Rc::new(ResizeInner {
            window: context::window(),
            node_ref: node_ref.clone(),
            entry: ValueCell::new_with_equals(None, never_equals),
            callback: Latest::new(callback),
            attachment: Attachment::new(),
            binding: Attachment::new(),
        }),
    })
}

// =============================================================================
// ELEMENT SIZE
// =============================================================================

struct ElementSizeInner {
    window: Option<Window>,
    node_ref: NodeRef,
    size: ValueCell<Size>,
    attachment: Attachment,
    binding: Attachment,
}

impl ElementSizeInner {
    fn binding(&self) -> &Attachment {
        &self.binding
    }

    fn on_entry(&self, entry: &ResizeEntry) {
        self.size.set(Size {
            width: entry.content_rect.width,
            height: entry.content_rect.height,
        });
    }

    fn bind(self: &Rc<Self>, node: &Element, teardown: &mut Teardown) {
        // Layout is known before the first observer callback
        self.size.set(offset_size(node));
        if let Some(window) = &self.window {
            observe_resize(window, self, node, teardown, Self::on_entry);
        }
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

fn offset_size(node: &Element) -> Size {
    Size {
        width: node.offset_width(),
        height: node.offset_height(),
    }
}

/// Size of the element behind a ref.
#[derive(Clone)]
pub struct ElementSize {
    inner: Rc<ElementSizeInner>,
}

impl ElementSize {
    pub fn get(&self) -> Size {
        self.inner.size.get()
    }

    pub fn value(&self) -> ReadCell<Size> {
        self.inner.size.read_only()
    }

    pub fn node_ref(&self) -> &NodeRef {
        &self.inner.node_ref
    }
}

impl fmt::Debug for ElementSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementSize")
            .field("node_ref", &self.inner.node_ref)
            .field("size", &self.inner.size.get())
            .finish()
    }
}

impl_lifecycle!(ElementSize);

/// Track the content size of the element behind `node_ref`.
///
/// The value is seeded from the element's offset size and then follows the
/// resize observer.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_element_size, MemoryHost, NodeRef};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let panel = host.document().create_element("aside");
/// panel.set_offset_size(300.0, 200.0);
///
/// let size = use_element_size(&NodeRef::with_element(panel.clone()));
/// assert_eq!(size.get().width, 300.0);
///
/// host.observers().unwrap().resize(&panel, 280.0, 200.0);
/// assert_eq!(size.get().width, 280.0);
/// ```
pub fn use_element_size(node_ref: &NodeRef) -> ElementSize {
    let size = node_ref.get().map(|node| offset_size(&node)).unwrap_or_default();
    super::mount(ElementSize {
        inner: Rc::new(ElementSizeInner {
            window: context::window(),
            node_ref: node_ref.clone(),
            size: ValueCell::new(size),
            attachment: Attachment::new(),
            binding: Attachment::new(),
        }),
    })
}
