// ============================================================================
// spark-hooks - URL-Query-Backed State
// One query parameter mirrored into a value cell, synced with navigation
// ============================================================================
//
// Writes update the cell first, then push `pathname?query` onto the session
// history. Traversal (`popstate`) re-derives the value from whichever entry
// is now current, including entries written by somebody else.
// ============================================================================

use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use url::form_urlencoded;

use crate::core::constants::EVENT_POPSTATE;
use crate::core::context;
use crate::core::error::{HookError, Result};
use crate::host::dom::ListenerOptions;
use crate::host::window::Window;
use crate::hooks::storage::StorageValue;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::Attachment;

// =============================================================================
// CODECS
// =============================================================================

/// Text form of a query value. `decode(encode(v))` must give back `v`.
pub trait Codec<T> {
    fn encode(&self, key: &str, value: &T) -> Result<String>;

    fn decode(&self, key: &str, text: &str) -> Result<T>;
}

/// JSON text (the default).
pub struct JsonCodec;

impl<T: StorageValue> Codec<T> for JsonCodec {
    fn encode(&self, key: &str, value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(|source| HookError::Encode {
            key: key.to_string(),
            source,
        })
    }

    fn decode(&self, key: &str, text: &str) -> Result<T> {
        serde_json::from_str(text).map_err(|source| HookError::Decode {
            key: key.to_string(),
            source,
        })
    }
}

/// Codec built from a pair of closures; the decoder reports failures as
/// text.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_query_state_with, FnCodec, MemoryHost};
///
/// let host = MemoryHost::with_url("/list?page=3");
/// let _guard = host.install();
///
/// let codec = FnCodec::new(|n: &u32| n.to_string(), |s: &str| s.parse::<u32>().map_err(|e| e.to_string()));
/// let page = use_query_state_with("page", 1u32, codec);
/// assert_eq!(page.get(), 3);
///
/// page.set(4);
/// assert_eq!(host.window().location().search, "?page=4");
/// ```
pub struct FnCodec<T, E, D> {
    encode: E,
    decode: D,
    _value: PhantomData<fn(T) -> T>,
}

impl<T, E, D> FnCodec<T, E, D>
where
    E: Fn(&T) -> String,
    D: Fn(&str) -> std::result::Result<T, String>,
{
    pub fn new(encode: E, decode: D) -> Self {
        Self {
            encode,
            decode,
            _value: PhantomData,
        }
    }
}

impl<T, E, D> Codec<T> for FnCodec<T, E, D>
where
    E: Fn(&T) -> String,
    D: Fn(&str) -> std::result::Result<T, String>,
{
    fn encode(&self, _key: &str, value: &T) -> Result<String> {
        Ok((self.encode)(value))
    }

    fn decode(&self, key: &str, text: &str) -> Result<T> {
        (self.decode)(text).map_err(|reason| HookError::codec(key, reason))
    }
}

/// Value of the first `key` parameter in `search` (with or without `?`).
fn query_param(search: &str, key: &str) -> Option<String> {
    let query = search.strip_prefix('?').unwrap_or(search);
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// `search` with every `key` parameter replaced by a single `key=value`
/// (appended if absent), serialized without the leading `?`.
fn with_param(search: &str, key: &str, value: &str) -> String {
    let query = search.strip_prefix('?').unwrap_or(search);
    let mut replaced = false;
    let mut out = form_urlencoded::Serializer::new(String::new());
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        if k == key {
            if !replaced {
                out.append_pair(key, value);
                replaced = true;
            }
        } else {
            out.append_pair(&k, &v);
        }
    }
    if !replaced {
        out.append_pair(key, value);
    }
    out.finish()
}

// =============================================================================
// BRIDGE
// =============================================================================

struct QueryInner<T, C> {
    key: String,
    initial: T,
    codec: C,
    window: Option<Window>,
    value: ValueCell<T>,
    attachment: Attachment,
}

impl<T, C> QueryInner<T, C>
where
    T: Clone + PartialEq + 'static,
    C: Codec<T> + 'static,
{
    fn read(&self) -> T {
        let Some(window) = &self.window else {
            return self.initial.clone();
        };
        let text = match query_param(&window.location().search, &self.key) {
            Some(text) if !text.is_empty() => text,
            _ => return self.initial.clone(),
        };
        match self.codec.decode(&self.key, &text) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "error reading query parameter");
                self.initial.clone()
            }
        }
    }

    fn write(&self, value: T) {
        let text = match self.codec.encode(&self.key, &value) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "error setting query parameter");
                return;
            }
        };
        self.value.set(value);

        let Some(window) = &self.window else {
            return;
        };
        let location = window.location();
        let url = format!(
            "{}?{}",
            location.pathname,
            with_param(&location.search, &self.key, &text)
        );
        if let Err(err) = window.history().push_state(&url) {
            tracing::warn!(key = %self.key, error = %err, "error setting query parameter");
        }
    }

    fn attach(self: &Rc<Self>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let weak: Weak<Self> = Rc::downgrade(self);

        self.attachment.attach(|teardown| {
            self.value.set(self.read());
            teardown.hold(window.add_event_listener(
                EVENT_POPSTATE,
                move |_| {
                    if let Some(inner) = weak.upgrade() {
                        inner.value.set(inner.read());
                    }
                },
                ListenerOptions::default(),
            ));
        });
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// State stored in one URL query parameter.
pub struct QueryState<T, C = JsonCodec> {
    inner: Rc<QueryInner<T, C>>,
}

impl<T, C> Clone for QueryState<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, C> QueryState<T, C>
where
    T: Clone + PartialEq + 'static,
    C: Codec<T> + 'static,
{
    pub fn get(&self) -> T {
        self.inner.value.get()
    }

    pub fn value(&self) -> ReadCell<T> {
        self.inner.value.read_only()
    }

    /// Update the cell and push a history entry carrying the new value.
    pub fn set(&self, value: T) {
        self.inner.write(value);
    }

    /// Derive the next value from the current one, then `set` it.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = self.inner.value.with(f);
        self.inner.write(next);
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }
}

impl<T: fmt::Debug, C> fmt::Debug for QueryState<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryState")
            .field("key", &self.inner.key)
            .field("value", &self.inner.value)
            .finish()
    }
}

impl_lifecycle!(QueryState<T, C>, [T: Clone + PartialEq + 'static, C: Codec<T> + 'static]);

// =============================================================================
// PUBLIC API
// =============================================================================

/// State stored as JSON in the query parameter `key`.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_query_state, MemoryHost};
///
/// let host = MemoryHost::with_url("/search");
/// let _guard = host.install();
///
/// let q = use_query_state("q", String::new());
/// q.set("rust hooks".to_string());
/// assert_eq!(host.window().location().href(), "/search?q=%22rust+hooks%22");
///
/// host.history().back();
/// assert_eq!(q.get(), "");
/// ```
pub fn use_query_state<T: StorageValue>(key: &str, initial: T) -> QueryState<T> {
    use_query_state_with(key, initial, JsonCodec)
}

/// State stored in the query parameter `key` using a custom codec.
pub fn use_query_state_with<T, C>(key: &str, initial: T, codec: C) -> QueryState<T, C>
where
    T: Clone + PartialEq + 'static,
    C: Codec<T> + 'static,
{
    let inner = QueryInner {
        key: key.to_string(),
        value: ValueCell::new(initial.clone()),
        initial,
        codec,
        window: context::window(),
        attachment: Attachment::new(),
    };
    let seeded = inner.read();
    inner.value.set(seeded);

    super::mount(QueryState {
        inner: Rc::new(inner),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::history::History;
    use crate::host::memory::MemoryHost;
    use rstest::rstest;
    use serde::{Deserialize, Serialize};
    use tracing_test::traced_test;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Filters {
        category: String,
        max_price: u32,
    }

    #[rstest]
    #[case("?a=1&b=2", "a", Some("1"))]
    #[case("a=1&a=2", "a", Some("1"))]
    #[case("?q=two+words", "q", Some("two words"))]
    #[case("?q=%22x%22", "q", Some("\"x\""))]
    #[case("", "a", None)]
    fn query_param_follows_search_params(
        #[case] search: &str,
        #[case] key: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(query_param(search, key).as_deref(), expected);
    }

    #[test]
    fn with_param_replaces_all_occurrences_in_place() {
        assert_eq!(with_param("?a=1&b=2&a=3", "a", "9"), "a=9&b=2");
        assert_eq!(with_param("", "a", "x y"), "a=x+y");
        assert_eq!(with_param("?b=2", "a", "1"), "b=2&a=1");
    }

    #[test]
    fn reads_json_from_url() {
        let host = MemoryHost::with_url("/shop?filters=%7B%22category%22%3A%22books%22%2C%22max_price%22%3A20%7D");
        let _guard = host.install();

        let filters = use_query_state(
            "filters",
            Filters {
                category: "all".into(),
                max_price: 0,
            },
        );
        assert_eq!(filters.get().category, "books");
        assert_eq!(filters.get().max_price, 20);
    }

    #[test]
    fn set_pushes_new_entry_keeping_path_and_other_params() {
        let host = MemoryHost::with_url("/shop?sort=price");
        let _guard = host.install();

        let page = use_query_state("page", 1);
        page.set(2);

        assert_eq!(page.get(), 2);
        assert_eq!(host.history().len(), 2);
        assert_eq!(host.window().location().href(), "/shop?sort=price&page=2");
    }

    #[test]
    fn popstate_rederives_from_current_entry() {
        let host = MemoryHost::with_url("/");
        let _guard = host.install();

        let page = use_query_state("page", 1);
        page.set(2);
        page.set(3);

        host.history().back();
        assert_eq!(page.get(), 2);
        host.history().back();
        assert_eq!(page.get(), 1);
        host.history().forward();
        assert_eq!(page.get(), 2);
    }

    #[test]
    fn values_set_outside_the_hook_are_picked_up() {
        let host = MemoryHost::with_url("/");
        let _guard = host.install();

        let tab = use_query_state("tab", "home".to_string());
        host.history().push_state("/?tab=%22settings%22").unwrap();
        host.history().push_state("/?tab=%22profile%22").unwrap();
        host.history().back();
        assert_eq!(tab.get(), "settings");
    }

    #[test]
    fn update_uses_previous_value() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let count = use_query_state("n", 10);
        count.update(|n| n + 5);
        assert_eq!(count.get(), 15);
        assert_eq!(host.window().location().search, "?n=15");
    }

    #[test]
    #[traced_test]
    fn malformed_value_falls_back_to_initial() {
        let host = MemoryHost::with_url("/?page=notjson");
        let _guard = host.install();

        let page = use_query_state("page", 1);
        assert_eq!(page.get(), 1);
        assert!(logs_contain("error reading query parameter"));
    }

    #[test]
    #[traced_test]
    fn fn_codec_errors_are_reported() {
        let host = MemoryHost::with_url("/?page=abc");
        let _guard = host.install();

        let codec = FnCodec::new(
            |n: &u32| n.to_string(),
            |s: &str| s.parse::<u32>().map_err(|e| e.to_string()),
        );
        let page = use_query_state_with("page", 1u32, codec);
        assert_eq!(page.get(), 1);
        assert!(logs_contain("codec rejected value"));
    }

    #[test]
    fn without_window_set_only_updates_cell() {
        let page = use_query_state("page", 1);
        page.set(5);
        assert_eq!(page.get(), 5);
    }
}
