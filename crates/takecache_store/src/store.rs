// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for key-value store backends.

use std::time::Duration;

use crate::{Error, FieldMap, Probe};

/// A narrow command contract against a remote key-value store.
///
/// Implementations hold a single shared client and must be safe to call concurrently; callers
/// make no ordering assumptions across keys. Absence is a normal outcome (`None`, an empty map,
/// `false`) and never an [`Error`].
///
/// Only [`probe`](Self::probe) has a default implementation, built from
/// [`hash_get_all`](Self::hash_get_all) and [`get`](Self::get).
pub trait KeyValueStore: Send + Sync {
    /// Reads a scalar value.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    /// Reads every field of a hash. Returns an empty map when the key is absent or does not
    /// hold a hash.
    fn hash_get_all(&self, key: &str) -> impl Future<Output = Result<FieldMap, Error>> + Send;

    /// Reads a single field of a hash.
    fn hash_get(&self, key: &str, field: &str) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    /// Stores a scalar value that expires after `ttl`.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> impl Future<Output = Result<(), Error>> + Send;

    /// Replaces whatever is stored under `key` with a hash of `fields`.
    ///
    /// With `ttl` set the entry expires after that duration, otherwise it persists until deleted
    /// or overwritten.
    fn hash_set(&self, key: &str, fields: &FieldMap, ttl: Option<Duration>) -> impl Future<Output = Result<(), Error>> + Send;

    /// Deletes the given keys and returns how many existed.
    fn delete(&self, keys: &[&str]) -> impl Future<Output = Result<u64, Error>> + Send;

    /// Returns `true` if anything is stored under `key`.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Pushes `value` onto the head of a list. Returns `true` when the list holds exactly
    /// that one element afterwards.
    fn list_push(&self, key: &str, value: &str) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Pops a value from the tail of a list.
    fn list_pop(&self, key: &str) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    /// Looks up a cache slot that may hold either a record hash or a scalar marker.
    ///
    /// The hash is read first; when it is empty the scalar value is read. Store failures are
    /// returned unchanged and are never folded into [`Probe::Absent`].
    fn probe(&self, key: &str) -> impl Future<Output = Result<Probe, Error>> + Send {
        async move {
            let fields = self.hash_get_all(key).await?;
            if !fields.is_empty() {
                return Ok(Probe::Fields(fields));
            }

            Ok(self.get(key).await?.map_or(Probe::Absent, Probe::Scalar))
        }
    }
}
