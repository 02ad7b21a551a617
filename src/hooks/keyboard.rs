// ============================================================================
// spark-hooks - Keyboard
// Single-key press state and key-combination detection
// ============================================================================
//
// Both hooks listen for `keydown`/`keyup` on the window and match key names
// exactly (`"a"` is not `"A"`). A combination is active while every one of
// its keys is down, in any order; extra keys held alongside do not matter.
// ============================================================================

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::constants::{EVENT_KEYDOWN, EVENT_KEYUP};
use crate::core::context;
use crate::host::dom::{Event, ListenerOptions};
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::{Attachment, Teardown};

/// Register `keydown`/`keyup` listeners that forward to `on_key(inner, key, down)`.
fn listen_keys<S: 'static>(
    owner: &Rc<S>,
    window: &Window,
    teardown: &mut Teardown,
    on_key: fn(&S, &str, bool),
) {
    for (event_type, down) in [(EVENT_KEYDOWN, true), (EVENT_KEYUP, false)] {
        let weak: Weak<S> = Rc::downgrade(owner);
        teardown.hold(window.add_event_listener(
            event_type,
            move |event: &Event| {
                let (Some(inner), Some(key)) = (weak.upgrade(), event.key_name()) else {
                    return;
                };
                on_key(&inner, key, down);
            },
            ListenerOptions::default(),
        ));
    }
}

// =============================================================================
// KEY PRESS
// =============================================================================

struct KeyPressInner {
    window: Option<Window>,
    key: String,
    pressed: ValueCell<bool>,
    attachment: Attachment,
}

impl KeyPressInner {
    fn on_key(&self, key: &str, down: bool) {
        if key == self.key {
            self.pressed.set(down);
        }
    }

    fn attach(self: &Rc<Self>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        self.attachment.attach(|teardown| {
            // Key-ups missed while detached would leave the key stuck down
            self.pressed.set(false);
            listen_keys(self, &window, teardown, Self::on_key);
        });
    }
}

/// Whether one key is currently held down.
#[derive(Clone)]
pub struct KeyPress {
    inner: Rc<KeyPressInner>,
}

impl KeyPress {
    pub fn pressed(&self) -> ReadCell<bool> {
        self.inner.pressed.read_only()
    }

    pub fn is_pressed(&self) -> bool {
        self.inner.pressed.get()
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }
}

impl fmt::Debug for KeyPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPress")
            .field("key", &self.inner.key)
            .field("pressed", &self.inner.pressed.get())
            .finish()
    }
}

impl_lifecycle!(KeyPress);

/// Track whether `key` is held down.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_key_press, Event, MemoryHost};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let escape = use_key_press("Escape");
/// host.window().dispatch_event(Event::key("keydown", "Escape"));
/// assert!(escape.is_pressed());
/// host.window().dispatch_event(Event::key("keyup", "Escape"));
/// assert!(!escape.is_pressed());
/// ```
pub fn use_key_press(key: &str) -> KeyPress {
    super::mount(KeyPress {
        inner: Rc::new(KeyPressInner {
            window: context::window(),
            key: key.to_string(),
            pressed: ValueCell::new(false),
            attachment: Attachment::new(),
        }),
    })
}

// =============================================================================
// KEY COMBO
// =============================================================================

struct KeyComboInner {
    window: Option<Window>,
    combo: BTreeSet<String>,
    down: RefCell<BTreeSet<String>>,
    active: ValueCell<bool>,
    attachment: Attachment,
}

impl KeyComboInner {
    fn on_key(&self, key: &str, down: bool) {
        let active = {
            let mut held = self.down.borrow_mut();
            if down {
                held.insert(key.to_string());
            } else {
                held.remove(key);
            }
            combo_active(&self.combo, &held)
        };
        self.active.set(active);
    }

    fn attach(self: &Rc<Self>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        self.attachment.attach(|teardown| {
            self.down.borrow_mut().clear();
            self.active.set(self.combo.is_empty());
            listen_keys(self, &window, teardown, Self::on_key);
        });
    }
}

/// Whether every key of `combo` is in `held`. An empty combination is
/// always active.
pub(crate) fn combo_active(combo: &BTreeSet<String>, held: &BTreeSet<String>) -> bool {
    combo.is_subset(held)
}

/// Whether a combination of keys is currently held down.
#[derive(Clone)]
pub struct KeyCombo {
    inner: Rc<KeyComboInner>,
}

impl KeyCombo {
    pub fn active(&self) -> ReadCell<bool> {
        self.inner.active.read_only()
    }

    pub fn is_active_combo(&self) -> bool {
        self.inner.active.get()
    }

    /// Keys currently held, in sorted order.
    pub fn held_keys(&self) -> Vec<String> {
        self.inner.down.borrow().iter().cloned().collect()
    }
}

impl fmt::Debug for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCombo")
            .field("combo", &self.inner.combo)
            .field("active", &self.inner.active.get())
            .finish()
    }
}

impl_lifecycle!(KeyCombo);

/// Track whether all of `keys` are held down at once. An empty list is
/// active from the start.
pub fn use_key_combo<S: AsRef<str>>(keys: &[S]) -> KeyCombo {
    let combo: BTreeSet<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
    let active = combo.is_empty();
    super::mount(KeyCombo {
        inner: Rc::new(KeyComboInner {
            window: context::window(),
            combo,
            down: RefCell::new(BTreeSet::new()),
            active: ValueCell::new(active),
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
    use rstest::rstest;

    fn down(host: &MemoryHost, key: &str) {
        host.window().dispatch_event(Event::key(EVENT_KEYDOWN, key));
    }

    fn up(host: &MemoryHost, key: &str) {
        host.window().dispatch_event(Event::key(EVENT_KEYUP, key));
    }

    #[test]
    fn key_press_matches_exact_name() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let a = use_key_press("a");
        down(&host, "A");
        assert!(!a.is_pressed());
        down(&host, "a");
        assert!(a.is_pressed());
        up(&host, "b");
        assert!(a.is_pressed());
        up(&host, "a");
        assert!(!a.is_pressed());
    }

    #[test]
    fn key_press_ignores_keyless_events() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let enter = use_key_press("Enter");
        host.window().dispatch_event(Event::new(EVENT_KEYDOWN));
        assert!(!enter.is_pressed());
    }

    #[test]
    fn combo_is_order_independent() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let save = use_key_combo(&["Control", "s"]);
        down(&host, "s");
        assert!(!save.is_active_combo());
        down(&host, "Control");
        assert!(save.is_active_combo());
    }

    #[test]
    fn partial_combo_is_inactive_and_release_deactivates_immediately() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let combo = use_key_combo(&["Control", "Shift", "a"]);
        down(&host, "Control");
        down(&host, "Shift");
        assert!(!combo.is_active_combo());

        down(&host, "a");
        assert!(combo.is_active_combo());

        up(&host, "Shift");
        assert!(!combo.is_active_combo());
        assert_eq!(combo.held_keys(), vec!["Control".to_string(), "a".to_string()]);
    }

    #[rstest]
    #[case(&[], &[], true)]
    #[case(&[], &["x"], true)]
    #[case(&["a"], &["a"], true)]
    #[case(&["a", "b"], &["a"], false)]
    #[case(&["a", "b"], &["b", "a", "c"], true)]
    #[case(&["A"], &["a"], false)]
    fn combo_subset_logic(#[case] combo: &[&str], #[case] held: &[&str], #[case] expected: bool) {
        let combo: BTreeSet<String> = combo.iter().map(|s| s.to_string()).collect();
        let held: BTreeSet<String> = held.iter().map(|s| s.to_string()).collect();
        assert_eq!(combo_active(&combo, &held), expected);
    }

    #[test]
    fn reactivation_forgets_held_keys() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let combo = use_key_combo(&["Alt"]);
        down(&host, "Alt");
        assert!(combo.is_active_combo());

        combo.deactivate();
        up(&host, "Alt");
        combo.activate();
        assert!(!combo.is_active_combo());
        assert!(combo.held_keys().is_empty());
    }

    #[test]
    fn empty_combo_is_always_active() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let combo = use_key_combo::<&str>(&[]);
        assert!(combo.is_active_combo());
        down(&host, "x");
        assert!(combo.is_active_combo());
        up(&host, "x");
        assert!(combo.is_active_combo());

        combo.deactivate();
        combo.activate();
        assert!(combo.is_active_combo());
    }

    #[test]
    fn listeners_are_symmetric() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let target = host.window().event_target().clone();

        let press = use_key_press("x");
        let combo = use_key_combo(&["x", "y"]);
        assert_eq!(target.added_count(), 4);

        drop(press);
        drop(combo);
        assert_eq!(target.removed_count(), 4);
        assert_eq!(target.listener_count(), 0);
    }
}
