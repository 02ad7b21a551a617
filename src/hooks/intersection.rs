// ============================================================================
// spark-hooks - Intersection Observer
// Latest `IntersectionObserverEntry` of one element
// ============================================================================

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::context;
use crate::host::dom::Element;
use crate::host::observer::{IntersectionCallback, IntersectionEntry, IntersectionOptions};
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::{Attachment, Teardown};
use crate::primitives::node_ref::NodeRef;
use crate::reactivity::equality::never_equals;

struct IntersectionInner {
    window: Option<Window>,
    node_ref: NodeRef,
    options: IntersectionOptions,
    entry: ValueCell<Option<IntersectionEntry>>,
    /// Set once a visible entry arrived with `freeze_once_visible`
    frozen: Cell<bool>,
    attachment: Attachment,
    binding: Attachment,
}

impl IntersectionInner {
    fn binding(&self) -> &Attachment {
        &self.binding
    }

    fn on_entry(&self, entry: &IntersectionEntry) {
        if self.frozen.get() {
            return;
        }
        self.entry.set(Some(entry.clone()));

        if entry.is_intersecting && self.options.freeze_once_visible {
            tracing::debug!(tag = entry.target.tag_name(), "intersection frozen");
            self.frozen.set(true);
            self.binding.detach();
        }
    }

    fn bind(self: &Rc<Self>, node: &Element, teardown: &mut Teardown) {
        if self.frozen.get() {
            return;
        }
        let Some(factory) = self.window.as_ref().and_then(Window::observers) else {
            tracing::debug!("IntersectionObserver unavailable");
            return;
        };

        let weak: Weak<Self> = Rc::downgrade(self);
        let callback: IntersectionCallback = Rc::new(move |entries| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            for entry in entries {
                inner.on_entry(entry);
            }
        });

        let observer = factory.intersection_observer(callback, &self.options);
        observer.observe(node);
        teardown.hold(observer);
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

/// Visibility of the element behind a ref.
#[derive(Clone)]
pub struct IntersectionObservation {
    inner: Rc<IntersectionInner>,
}

impl IntersectionObservation {
    /// The most recent entry; `None` until the first one arrives.
    pub fn entry(&self) -> ReadCell<Option<IntersectionEntry>> {
        self.inner.entry.read_only()
    }

    pub fn is_intersecting(&self) -> bool {
        self.inner.entry.with(|e| e.as_ref().is_some_and(|e| e.is_intersecting))
    }

    /// Whether updates stopped after the element became visible.
    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.get()
    }

    pub fn node_ref(&self) -> &NodeRef {
        &self.inner.node_ref
    }
}

impl fmt::Debug for IntersectionObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntersectionObservation")
            .field("node_ref", &self.inner.node_ref)
            .field("is_intersecting", &self.is_intersecting())
            .field("frozen", &self.inner.frozen.get())
            .finish()
    }
}

impl_lifecycle!(IntersectionObservation);

/// Observe the element behind `node_ref` with `options`.
///
/// With `freeze_once_visible`, the first intersecting entry is kept for good
/// and the observer is disconnected.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_intersection_observer, IntersectionOptions, MemoryHost, NodeRef};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
/// let image = host.document().create_element("img");
///
/// let seen = use_intersection_observer(
///     &NodeRef::with_element(image.clone()),
///     IntersectionOptions { freeze_once_visible: true, ..Default::default() },
/// );
/// host.observers().unwrap().intersect(&image, true, 1.0);
/// host.observers().unwrap().intersect(&image, false, 0.0);
/// assert!(seen.is_intersecting());
/// ```
pub fn use_intersection_observer(
    node_ref: &NodeRef,
    options: IntersectionOptions,
) -> IntersectionObservation {
    super::mount(IntersectionObservation {
        inner: Rc::new(IntersectionInner {
            window: context::window(),
            node_ref: node_ref.clone(),
            options,
            entry: ValueCell::new_with_equals(None, never_equals),
            frozen: Cell::new(false),
            attachment: Attachment::new(),
            binding: Attachment::new(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use crate::primitives::lifecycle::Lifecycle;

    #[test]
    fn tracks_latest_entry() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let observers = host.observers().unwrap();
        let el = host.document().create_element("section");

        let io = use_intersection_observer(&NodeRef::with_element(el.clone()), IntersectionOptions::default());
        assert!(io.entry().get().is_none());

        observers.intersect(&el, true, 0.5);
        assert!(io.is_intersecting());
        assert_eq!(io.entry().get().map(|e| e.intersection_ratio), Some(0.5));

        observers.intersect(&el, false, 0.0);
        assert!(!io.is_intersecting());
    }

    #[test]
    fn passes_options_to_the_observer() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let el = host.document().create_element("section");
        let options = IntersectionOptions {
            threshold: vec![0.25, 0.75],
            root_margin: "10px".to_string(),
            ..IntersectionOptions::default()
        };

        let _io = use_intersection_observer(&NodeRef::with_element(el.clone()), options.clone());
        assert_eq!(host.observers().unwrap().intersection_options(&el), Some(options));
    }

    #[test]
    fn freeze_keeps_first_visible_entry_and_disconnects() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let observers = host.observers().unwrap();
        let el = host.document().create_element("section");
        let options = IntersectionOptions {
            freeze_once_visible: true,
            ..IntersectionOptions::default()
        };

        let io = use_intersection_observer(&NodeRef::with_element(el.clone()), options);
        observers.intersect(&el, false, 0.0);
        assert!(!io.is_frozen());

        observers.intersect(&el, true, 0.3);
        assert!(io.is_frozen());
        assert_eq!(observers.observing_count(&el), 0);

        observers.intersect(&el, false, 0.0);
        assert!(io.is_intersecting());
    }

    #[test]
    fn frozen_observation_ignores_new_targets_and_reactivation() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let observers = host.observers().unwrap();
        let a = host.document().create_element("section");
        let b = host.document().create_element("section");
        let node_ref = NodeRef::with_element(a.clone());

        let io = use_intersection_observer(
            &node_ref,
            IntersectionOptions {
                freeze_once_visible: true,
                ..IntersectionOptions::default()
            },
        );
        observers.intersect(&a, true, 1.0);
        let created = observers.created_count();

        node_ref.set(b.clone());
        io.deactivate();
        io.activate();
        assert_eq!(observers.created_count(), created);
        assert!(io.is_intersecting());
    }

    #[test]
    fn retarget_replaces_observer() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let observers = host.observers().unwrap();
        let a = host.document().create_element("section");
        let b = host.document().create_element("section");
        let node_ref = NodeRef::with_element(a.clone());

        let io = use_intersection_observer(&node_ref, IntersectionOptions::default());
        node_ref.set(b.clone());
        assert_eq!(observers.live_count(), 1);
        assert_eq!(observers.observing_count(&b), 1);

        observers.intersect(&a, true, 1.0);
        assert!(!io.is_intersecting());
        observers.intersect(&b, true, 1.0);
        assert!(io.is_intersecting());
    }

    #[test]
    fn no_window_never_intersects() {
        let io = use_intersection_observer(&NodeRef::new(), IntersectionOptions::default());
        assert!(!io.is_intersecting());
        assert!(!io.is_active());
    }
}
