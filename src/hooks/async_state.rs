// ============================================================================
// spark-hooks - Async State
// Loading / error / value status around a future
// ============================================================================
//
// Every run bumps a generation counter before awaiting. When the future
// resolves, its result is committed only if no newer run started (and the
// hook was not deactivated) in the meantime.
// ============================================================================

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::Attachment;
use crate::reactivity::equality::never_equals;

/// Snapshot of an async operation.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncStatus<T, E> {
    pub is_loading: bool,
    pub error: Option<E>,
    pub value: Option<T>,
}

impl<T, E> Default for AsyncStatus<T, E> {
    fn default() -> Self {
        Self {
            is_loading: false,
            error: None,
            value: None,
        }
    }
}

impl<T, E> AsyncStatus<T, E> {
    fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    fn settled(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self {
                value: Some(value),
                ..Self::default()
            },
            Err(error) => Self {
                error: Some(error),
                ..Self::default()
            },
        }
    }
}

struct AsyncInner<T, E> {
    status: ValueCell<AsyncStatus<T, E>>,
    generation: Cell<u64>,
    attachment: Attachment,
}

impl<T: Clone + 'static, E: Clone + 'static> AsyncInner<T, E> {
    fn attach(self: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(self);
        self.attachment.attach(|teardown| {
            teardown.push(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                // Orphan whatever is in flight
                inner.generation.set(inner.generation.get() + 1);
                if inner.status.with(|s| s.is_loading) {
                    inner.status.update(|s| s.is_loading = false);
                }
            });
        });
    }
}

/// Handle over one async operation slot.
pub struct AsyncState<T, E> {
    inner: Rc<AsyncInner<T, E>>,
}

impl<T, E> Clone for AsyncState<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> AsyncState<T, E> {
    pub fn status(&self) -> ReadCell<AsyncStatus<T, E>> {
        self.inner.status.read_only()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.status.with(|s| s.is_loading)
    }

    /// Drive `future` to completion and record its outcome.
    ///
    /// Returns `true` if this run's result was committed. A run started
    /// while the hook is inactive never polls `future`.
    pub async fn run<F>(&self, future: F) -> bool
    where
        F: Future<Output = Result<T, E>>,
    {
        let inner = &self.inner;
        if !inner.attachment.is_attached() {
            return false;
        }

        let generation = inner.generation.get() + 1;
        inner.generation.set(generation);
        inner.status.set(AsyncStatus::loading());

        let result = future.await;

        if inner.generation.get() != generation {
            tracing::trace!(generation, "stale async result dropped");
            return false;
        }
        inner.status.set(AsyncStatus::settled(result));
        true
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for AsyncState<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncState")
            .field("status", &self.inner.status)
            .field("generation", &self.inner.generation.get())
            .finish()
    }
}

impl_lifecycle!(AsyncState<T, E>, [T: Clone + 'static, E: Clone + 'static]);

/// An idle async slot: not loading, no error, no value.
///
/// Needs no host; the caller's executor drives the futures.
pub fn use_async<T: Clone + 'static, E: Clone + 'static>() -> AsyncState<T, E> {
    super::mount(AsyncState {
        inner: Rc::new(AsyncInner {
            status: ValueCell::new_with_equals(AsyncStatus::default(), never_equals),
            generation: Cell::new(0),
            attachment: Attachment::new(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::lifecycle::Lifecycle;
    use std::cell::RefCell;
    use tokio::task::yield_now;

    async fn after_yields<T>(n: usize, result: T) -> T {
        for _ in 0..n {
            yield_now().await;
        }
        result
    }

    #[tokio::test]
    async fn success_goes_through_loading() {
        let op = use_async::<u32, String>();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _sub = op.status().subscribe({
            let seen = seen.clone();
            move |s: &AsyncStatus<u32, String>| seen.borrow_mut().push(s.clone())
        });

        assert!(op.run(after_yields(2, Ok(7))).await);
        assert_eq!(
            *seen.borrow(),
            vec![
                AsyncStatus { is_loading: true, error: None, value: None },
                AsyncStatus { is_loading: false, error: None, value: Some(7) },
            ]
        );
    }

    #[tokio::test]
    async fn failure_records_error_and_clears_value() {
        let op = use_async::<u32, String>();
        op.run(async { Ok(1) }).await;
        op.run(async { Err("boom".to_string()) }).await;

        let status = op.status().get();
        assert!(!status.is_loading);
        assert_eq!(status.error.as_deref(), Some("boom"));
        assert_eq!(status.value, None);
    }

    #[tokio::test]
    async fn only_the_latest_run_commits() {
        let op = use_async::<&'static str, ()>();

        let (slow, fast) = tokio::join!(
            op.run(after_yields(3, Ok("slow"))),
            op.run(after_yields(1, Ok("fast"))),
        );
        assert!(!slow);
        assert!(fast);
        assert_eq!(op.status().get().value, Some("fast"));
    }

    #[tokio::test]
    async fn deactivation_orphans_in_flight_run() {
        let op = use_async::<u32, ()>();
        let handle = op.clone();

        let (committed, ()) = tokio::join!(op.run(after_yields(2, Ok(5))), async move {
            yield_now().await;
            handle.deactivate();
        });
        assert!(!committed);
        assert_eq!(op.status().get(), AsyncStatus::default());

        assert!(!op.run(async { Ok(9) }).await);
        op.activate();
        assert!(op.run(async { Ok(9) }).await);
        assert_eq!(op.status().get().value, Some(9));
    }
}
