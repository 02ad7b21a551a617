// ============================================================================
// spark-hooks - Host Context
// Thread-local "global scope" that hooks read their browser primitives from
// ============================================================================
//
// In a browser every hook reaches for `window`. Here the window is a
// thread-local slot: a host (the real browser adapter or the in-memory host
// used by tests) installs a `Window`, and every hook created on that thread
// picks it up. When nothing is installed the hooks behave as they would
// during server-side rendering: they report their initial value and attach
// nothing.
// ============================================================================

use std::cell::RefCell;

use crate::host::window::Window;

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    /// The installed window, if any
    static WINDOW: RefCell<Option<Window>> = const { RefCell::new(None) };
}

/// The window installed on this thread, if any.
pub fn window() -> Option<Window> {
    WINDOW.with(|w| w.borrow().clone())
}

/// Whether a window is installed on this thread.
pub fn has_window() -> bool {
    WINDOW.with(|w| w.borrow().is_some())
}

/// Run `f` against the installed window.
///
/// Returns `None` without calling `f` when no window is installed.
pub fn with_window<R>(f: impl FnOnce(&Window) -> R) -> Option<R> {
    // Clone out of the slot so `f` may itself install or read the window.
    let window = window()?;
    Some(f(&window))
}

/// Install `window` as this thread's global, returning a guard that restores
/// the previously installed window (or none) when dropped.
///
/// # Example
///
/// ```
/// use spark_hooks::{has_window, install_window, MemoryHost};
///
/// let host = MemoryHost::new();
/// {
///     let _guard = install_window(host.window().clone());
///     assert!(has_window());
/// }
/// assert!(!has_window());
/// ```
pub fn install_window(window: Window) -> WindowGuard {
    let previous = WINDOW.with(|w| w.borrow_mut().replace(window));
    WindowGuard { previous }
}

/// Remove the installed window, returning it.
pub fn take_window() -> Option<Window> {
    WINDOW.with(|w| w.borrow_mut().take())
}

/// Restores the previously installed window on drop.
#[must_use = "the window is uninstalled as soon as the guard drops"]
pub struct WindowGuard {
    previous: Option<Window>,
}

impl Drop for WindowGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        WINDOW.with(|w| *w.borrow_mut() = previous);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;

    #[test]
    fn nothing_installed_by_default() {
        assert!(!has_window());
        assert!(with_window(|_| 1).is_none());
    }

    #[test]
    fn guard_restores_previous_window() {
        let outer = MemoryHost::new();
        let inner = MemoryHost::new();

        let _outer_guard = install_window(outer.window().clone());
        {
            let _inner_guard = install_window(inner.window().clone());
            let current = window().unwrap();
            assert!(current.ptr_eq(inner.window()));
        }
        let current = window().unwrap();
        assert!(current.ptr_eq(outer.window()));
    }

    #[test]
    fn take_window_empties_slot() {
        let host = MemoryHost::new();
        let guard = install_window(host.window().clone());
        assert!(take_window().is_some());
        assert!(!has_window());
        drop(guard);
        assert!(!has_window());
    }
}
