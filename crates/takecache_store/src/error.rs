// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for store operations.

/// An error from a key-value store operation.
///
/// Key absence is never reported through this type: reads return `None`, an empty
/// [`FieldMap`](crate::FieldMap) or [`Probe::Absent`](crate::Probe::Absent) instead. Anything that
/// surfaces as an `Error` is a genuine backend failure (connection loss, protocol or type errors)
/// and callers must not treat it as a miss.
///
/// # Example
///
/// ```
/// use takecache_store::Error;
///
/// let error = Error::from_message("connection reset");
/// assert!(error.to_string().contains("connection reset"));
/// ```
#[ohno::error]
#[derive(Clone)]
pub struct Error {}

impl Error {
    /// Creates a new error from any type that can be converted to an error.
    ///
    /// Store implementations use this to wrap their client library errors.
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// A specialized [`Result`] type for store operations.
pub type Result<T> = std::result::Result<T, Error>;
