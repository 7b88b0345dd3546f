//! Error type shared by the cache core and its peer transport.

use std::fmt;

/// The boxed source of a loader or peer failure.
///
/// Getters and peer fetchers are defined over arbitrary caller error types;
/// boxing here keeps `GcacheError` itself a plain, `'static` enum.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the cache core.
///
/// Peer-fetch failures are deliberately *not* a variant callers ever see from
/// `Group::get` in the current design: they are logged and the group falls
/// back to the local loader (see `Group::load`). The variant still exists so
/// a future design that wants to surface the failure has somewhere to put it.
#[derive(Debug, thiserror::Error)]
pub enum GcacheError {
    /// Caller passed an empty key to `Group::get`.
    #[error("key is required")]
    KeyRequired,

    /// The caller-supplied `Getter` failed to produce a value.
    #[error("loader failed for key {key:?}")]
    LoaderFailed {
        key: String,
        #[source]
        source: BoxError,
    },

    /// All configured peer attempts failed. Not currently returned to
    /// callers; kept for a future design that surfaces it instead of
    /// silently falling back to the local loader.
    #[error("peer fetch failed for group {group:?} key {key:?}")]
    PeerFetchFailed {
        group: String,
        key: String,
        #[source]
        source: BoxError,
    },

    /// `GetGroup` (or the HTTP collaborator) looked up a name with no
    /// registered group.
    #[error("no group named {0:?}")]
    GroupUnknown(String),

    /// `NewGroup` was called twice with the same name.
    #[error("group {0:?} is already registered")]
    GroupAlreadyRegistered(String),
}

impl GcacheError {
    /// The message a plain `Display` of the root cause would produce, with
    /// no context wrapping. Useful for transport layers that want a short
    /// error string in a response body.
    pub fn root_cause_message(&self) -> String {
        match self {
            GcacheError::LoaderFailed { source, .. } | GcacheError::PeerFetchFailed { source, .. } => {
                source.to_string()
            }
            other => other.to_string(),
        }
    }
}

/// A convenience result alias for fallible cache operations.
pub type GcacheResult<T> = Result<T, GcacheError>;

/// Wraps a plain string as a `BoxError`, for getters whose failure mode is
/// just "no such key" rather than a structured error type.
#[derive(Debug)]
pub struct StringError(pub String);

impl fmt::Display for StringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for StringError {}

impl From<String> for StringError {
    fn from(value: String) -> Self {
        StringError(value)
    }
}

impl From<&str> for StringError {
    fn from(value: &str) -> Self {
        StringError(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_failed_displays_key_and_preserves_source() {
        let err = GcacheError::LoaderFailed {
            key: "Tom".to_string(),
            source: Box::new(StringError::from("Tom not exist")),
        };
        assert_eq!(err.to_string(), "loader failed for key \"Tom\"");
        assert_eq!(err.root_cause_message(), "Tom not exist");
    }

    #[test]
    fn group_unknown_carries_the_name() {
        let err = GcacheError::GroupUnknown("scores".to_string());
        assert_eq!(err.to_string(), "no group named \"scores\"");
    }
}
