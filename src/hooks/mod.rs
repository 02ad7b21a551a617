// ============================================================================
// spark-hooks - Hooks Module
// One synchronization bridge per browser primitive
// ============================================================================
//
// Every hook follows the same shape:
// - read the installed window once, at creation
// - build the bridge state (`..Inner`) and its value cell
// - activate: attach native listeners and re-sync the cell from the source
// - hand out a clonable handle; the bridge lives while a handle (or the
//   hook scope that collected it) does
// Native callbacks capture the bridge weakly, so dropping the last handle
// always tears everything down.
// ============================================================================

pub mod async_state;
pub mod container_scroll;
pub mod cookie;
pub mod countdown;
pub mod debounce;
pub mod element_size;
pub mod event_listener;
pub mod hover;
pub mod intersection;
pub mod interval;
pub mod keyboard;
pub mod long_press;
pub mod media_query;
pub mod query;
pub mod storage;
pub mod throttle;
pub mod timer;
pub mod viewport;

use std::rc::Rc;

use crate::host::dom::Element;
use crate::primitives::lifecycle::{Attachment, Lifecycle, Teardown};
use crate::primitives::node_ref::NodeRef;
use crate::primitives::scope::register_with_scope;

/// Activate a freshly built hook and hand it to the active scope.
pub(crate) fn mount<H: Lifecycle + Clone + 'static>(handle: H) -> H {
    handle.activate();
    register_with_scope(Rc::new(handle.clone()));
    handle
}

/// Keep per-node registrations in step with `node_ref`.
///
/// `bind` runs for the current node and again for every new node; whatever
/// it records lands in `binding`, which is released before the next bind and
/// when `teardown` runs. An empty ref binds nothing.
pub(crate) fn track_node<S: 'static>(
    owner: &Rc<S>,
    teardown: &mut Teardown,
    node_ref: &NodeRef,
    binding: fn(&S) -> &Attachment,
    bind: fn(&Rc<S>, &Element, &mut Teardown),
) {
    let rebind = move |owner: &Rc<S>, node: Option<Element>| {
        binding(owner).reattach(|t| {
            if let Some(node) = &node {
                tracing::trace!(tag = node.tag_name(), "binding to node");
                bind(owner, node, t);
            }
        });
    };
    rebind(owner, node_ref.get());

    let weak = Rc::downgrade(owner);
    teardown.hold(node_ref.subscribe({
        let weak = weak.clone();
        move |node| {
            if let Some(owner) = weak.upgrade() {
                rebind(&owner, node.clone());
            }
        }
    }));
    teardown.push(move || {
        if let Some(owner) = weak.upgrade() {
            binding(&owner).detach();
        }
    });
}

pub use async_state::{use_async, AsyncState, AsyncStatus};
pub use container_scroll::{use_container_scroll, use_container_scroll_with_delay, ContainerScroll, ContainerScrollState};
pub use cookie::{use_cookie_state, CookieOptions, CookieState, SameSite};
pub use countdown::{use_countdown, use_countdown_until, Countdown, CountdownParts};
pub use debounce::{use_debounce, Debounced};
pub use element_size::{use_element_size, use_resize_observer, ElementSize, ResizeObservation, Size};
pub use event_listener::{
    use_click_outside, use_event_listener, ClickOutside, EventListener, ListenTarget,
};
pub use hover::{use_hover, use_hover_ref, Hover};
pub use intersection::{use_intersection_observer, IntersectionObservation};
pub use interval::{use_interval, Interval};
pub use keyboard::{use_key_combo, use_key_press, KeyCombo, KeyPress};
pub use long_press::{use_long_press, LongPress, LongPressOptions};
pub use media_query::{use_media_query, MediaQuery};
pub use query::{use_query_state, use_query_state_with, Codec, FnCodec, JsonCodec, QueryState};
pub use storage::{
    use_local_storage_state, use_session_storage_state, use_storage_state, StorageState,
    StorageValue,
};
pub use throttle::{use_throttle, Throttled};
pub use timer::{use_timer, Timer, TimerOptions};
pub use viewport::{use_scroll_position, use_window_size, Offset, ScrollPosition, WindowSize};
