// ============================================================================
// spark-hooks - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// Handy for the callbacks handed to hooks, which usually capture cells.
///
/// # Usage
///
/// ```rust
/// use spark_hooks::{cloned, use_interval, MemoryHost, ValueCell};
/// use std::time::Duration;
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let ticks = ValueCell::new(0);
/// let _interval = use_interval(
///     cloned!(ticks => move || { ticks.update(|n| *n += 1); }),
///     Some(Duration::from_millis(100)),
/// );
///
/// host.advance_ms(300);
/// assert_eq!(ticks.get(), 3);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Implement `Lifecycle` for a hook handle whose `inner: Rc<..>` owns an
/// `attachment: Attachment` and an `attach(self: &Rc<Self>)` method.
///
/// # Usage
///
/// ```ignore
/// impl_lifecycle!(StorageState<T>, [T: StorageValue]);
/// impl_lifecycle!(WindowSize);
/// ```
macro_rules! impl_lifecycle {
    ($ty:ty $(, [$($generics:tt)*])?) => {
        impl $(<$($generics)*>)? $crate::primitives::lifecycle::Lifecycle for $ty {
            fn activate(&self) {
                self.inner.attach();
            }

            fn deactivate(&self) {
                if self.inner.attachment.detach() {
                    tracing::trace!(hook = stringify!($ty), "detached");
                }
            }

            fn is_active(&self) -> bool {
                self.inner.attachment.is_attached()
            }
        }
    };
}

pub(crate) use impl_lifecycle;
