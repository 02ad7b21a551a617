// ============================================================================
// spark-hooks - Hover
// `mouseenter` / `mouseleave` tracking on one element
// ============================================================================

use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::constants::{EVENT_MOUSEENTER, EVENT_MOUSELEAVE};
use crate::core::context;
use crate::host::dom::{Element, ListenerOptions};
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::{Attachment, Teardown};
use crate::primitives::node_ref::NodeRef;

struct HoverInner {
    window: Option<Window>,
    node_ref: NodeRef,
    hovered: ValueCell<bool>,
    attachment: Attachment,
    binding: Attachment,
}

impl HoverInner {
    fn binding(&self) -> &Attachment {
        &self.binding
    }

    fn bind(self: &Rc<Self>, node: &Element, teardown: &mut Teardown) {
        // A new target starts out not hovered
        self.hovered.set(false);

        for (event_type, hovered) in [(EVENT_MOUSEENTER, true), (EVENT_MOUSELEAVE, false)] {
            let weak: Weak<Self> = Rc::downgrade(self);
            teardown.hold(node.add_event_listener(
                event_type,
                move |_| {
                    if let Some(inner) = weak.upgrade() {
                        inner.hovered.set(hovered);
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
        self.attachment.attach(|teardown| {
            super::track_node(self, teardown, &self.node_ref, Self::binding, Self::bind);
        });
    }
}

/// Hover state of the element behind `node_ref`.
#[derive(Clone)]
pub struct Hover {
    inner: Rc<HoverInner>,
}

impl Hover {
    /// The ref to populate with the hovered element.
    pub fn node_ref(&self) -> &NodeRef {
        &self.inner.node_ref
    }

    pub fn hovered(&self) -> ReadCell<bool> {
        self.inner.hovered.read_only()
    }

    pub fn is_hovered(&self) -> bool {
        self.inner.hovered.get()
    }
}

impl fmt::Debug for Hover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hover")
            .field("node_ref", &self.inner.node_ref)
            .field("hovered", &self.inner.hovered.get())
            .finish()
    }
}

impl_lifecycle!(Hover);

/// Hover tracking on a ref created by the hook; set it with
/// `hover.node_ref().set(element)`.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_hover, Event, MemoryHost};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let card = host.document().create_element("div");
/// let hover = use_hover();
/// hover.node_ref().set(card.clone());
///
/// card.dispatch_event(Event::new("mouseenter").bubbling(false));
/// assert!(hover.is_hovered());
/// ```
pub fn use_hover() -> Hover {
    use_hover_ref(&NodeRef::new())
}

/// Hover tracking on an element ref owned by the caller.
pub fn use_hover_ref(node_ref: &NodeRef) -> Hover {
    super::mount(Hover {
        inner: Rc::new(HoverInner {
            window: context::window(),
            node_ref: node_ref.clone(),
            hovered: ValueCell::new(false),
            attachment: Attachment::new(),
            binding: Attachment::new(),
        }),
    })
}
