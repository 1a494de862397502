// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lifetimes of the entries a cache node writes.

use std::time::Duration;

const DEFAULT_DATA_EXPIRY: Duration = Duration::from_secs(60);
const DEFAULT_NOT_FOUND_EXPIRY: Duration = Duration::from_secs(60);

/// How long entries written by a [`CacheNode`](crate::CacheNode) live in the store.
///
/// Both lifetimes default to 60 seconds. A `data` expiry of `None` keeps loaded records until
/// they are deleted or replaced.
///
/// With the `serde` feature the policy can be read from configuration; missing fields take their
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExpiryPolicy {
    /// Lifetime of records written back after a successful load.
    pub data: Option<Duration>,
    /// Lifetime of the placeholder written when the loader reports no value.
    pub not_found: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            data: Some(DEFAULT_DATA_EXPIRY),
            not_found: DEFAULT_NOT_FOUND_EXPIRY,
        }
    }
}
