// ============================================================================
// spark-hooks - Errors
// Failure taxonomy of the bridges; reported, never thrown
// ============================================================================
//
// Every failure in this crate is recoverable: the bridge logs it through
// `tracing` and falls back to the initial value (reads) or skips the
// persistence step (writes). `HookError` exists so host adapters and codecs
// can describe *what* went wrong; hook operations themselves never return it.
// ============================================================================

/// All errors produced by host adapters and codecs.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    // ─────────────────────────────────────────────────────────────────────
    // Serialization
    // ─────────────────────────────────────────────────────────────────────
    #[error("failed to decode value for {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("codec rejected value for {key:?}: {reason}")]
    Codec { key: String, reason: String },

    #[error("cookie {name:?} is not valid percent-encoded text: {source}")]
    CookieDecode {
        name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Host
    // ─────────────────────────────────────────────────────────────────────
    #[error("{area} rejected {operation} for {key:?}: {reason}")]
    Storage {
        area: &'static str,
        operation: &'static str,
        key: String,
        reason: String,
    },

    #[error("navigation to {url:?} rejected: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{0} is not available in this environment")]
    HostUnavailable(&'static str),
}

/// Result alias for host adapters and codecs.
pub type Result<T> = std::result::Result<T, HookError>;

impl HookError {
    /// Build a `Codec` error from any displayable reason.
    pub fn codec(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Codec {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from malformed persisted text.
    pub fn is_serialization(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::Encode { .. } | Self::Codec { .. } | Self::CookieDecode { .. }
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_mentions_key() {
        let source = serde_json::from_str::<i32>("{oops").unwrap_err();
        let err = HookError::Decode {
            key: "theme".into(),
            source,
        };
        assert!(err.to_string().contains("\"theme\""));
        assert!(err.is_serialization());
    }

    #[test]
    fn storage_error_is_not_serialization() {
        let err = HookError::Storage {
            area: "localStorage",
            operation: "setItem",
            key: "big".into(),
            reason: "quota exceeded".into(),
        };
        assert_eq!(
            err.to_string(),
            "localStorage rejected setItem for \"big\": quota exceeded"
        );
        assert!(!err.is_serialization());
    }

    #[test]
    fn codec_helper_formats_reason() {
        let err = HookError::codec("page", "not a number");
        assert_eq!(err.to_string(), "codec rejected value for \"page\": not a number");
    }
}
