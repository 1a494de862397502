// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::fmt;

use ohno::EnrichableExt;

/// The category of a cache [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The value is confirmed absent, either by a cached placeholder or by the loader.
    NotFound,
    /// The backing store failed for a reason other than absence.
    Store,
    /// The loader failed for a reason other than absence.
    Loader,
    /// A field map could not be decoded into the requested record type.
    Decode,
    /// A record declares a malformed cache field tag.
    Codec,
    /// The call leading the coalesced request was dropped before producing a result.
    Cancelled,
}

impl ErrorKind {
    /// Returns a short, stable name for the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::Store => "store failure",
            Self::Loader => "loader failure",
            Self::Decode => "decode failure",
            Self::Codec => "invalid field tag",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a cache operation.
///
/// [`ErrorKind::NotFound`] is an ordinary outcome of [`CacheNode::take`](crate::CacheNode::take)
/// and should be handled like any other result. Store and loader failures carry the original
/// error as their source, retrievable with [`ohno::ErrorExt::find_source`].
///
/// Errors are cheap to clone so a single outcome can be handed to every coalesced caller.
///
/// # Examples
///
/// ```
/// use takecache::{Error, ErrorKind};
///
/// fn describe(result: Result<u32, Error>) -> String {
///     match result {
///         Ok(value) => format!("value {value}"),
///         Err(e) if e.is_not_found() => "nothing there".to_string(),
///         Err(e) => format!("failed: {}", e.kind()),
///     }
/// }
/// ```
#[ohno::error]
#[derive(Clone)]
#[display("cache {kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` if the value is confirmed absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub(crate) fn not_found(key: &str) -> Self {
        Self::caused_by(ErrorKind::NotFound, format!("no value for key '{key}'"))
    }

    pub(crate) fn store(key: &str, cause: takecache_store::Error) -> Self {
        Self::caused_by(ErrorKind::Store, cause).enrich(format!("key '{key}'"))
    }

    pub(crate) fn loader(key: &str, cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Loader, cause).enrich(format!("key '{key}'"))
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::caused_by(ErrorKind::Decode, message.into())
    }

    pub(crate) fn codec(message: impl Into<String>) -> Self {
        Self::caused_by(ErrorKind::Codec, message.into())
    }

    pub(crate) fn cancelled(cause: crate::coalesce::Abandoned) -> Self {
        Self::caused_by(ErrorKind::Cancelled, cause)
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use ohno::ErrorExt;

    use super::*;

    #[test]
    fn display_names_kind_and_cause() {
        let error = Error::not_found("user:1");
        let display = error.to_string();
        assert!(display.contains("cache not found"), "got: {display}");
        assert!(display.contains("user:1"), "got: {display}");
    }

    #[test]
    fn store_error_keeps_source() {
        let error = Error::store("user:1", takecache_store::Error::from_message("connection reset"));

        assert_eq!(error.kind(), ErrorKind::Store);
        let source = error.find_source::<takecache_store::Error>().expect("store error should be the source");
        assert!(source.to_string().contains("connection reset"));
    }

    #[test]
    fn clone_preserves_kind() {
        let error = Error::decode("bad field");
        let cloned = error.clone();
        assert_eq!(cloned.kind(), ErrorKind::Decode);
        assert_eq!(error.to_string(), cloned.to_string());
    }

    #[test]
    fn only_not_found_is_not_found() {
        assert!(Error::not_found("k").is_not_found());
        assert!(!Error::codec("k").is_not_found());
        assert!(!Error::loader("k", "boom").is_not_found());
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(ErrorKind::NotFound.as_str(), "not found");
        assert_eq!(ErrorKind::Store.as_str(), "store failure");
        assert_eq!(ErrorKind::Loader.as_str(), "loader failure");
        assert_eq!(ErrorKind::Decode.as_str(), "decode failure");
        assert_eq!(ErrorKind::Codec.as_str(), "invalid field tag");
        assert_eq!(ErrorKind::Cancelled.as_str(), "cancelled");
    }
}
