// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

/// A flat mapping of field names to string values, the stored form of a record.
pub type FieldMap = BTreeMap<String, String>;

/// What a combined lookup found under a key.
///
/// Records are stored as hashes and negative-cache markers as plain strings, so a single
/// lookup has to distinguish three shapes.
///
/// # Examples
///
/// ```
/// use takecache_store::{FieldMap, Probe};
///
/// let probe = Probe::Scalar("*".to_string());
/// assert!(probe.is_found());
/// assert!(!Probe::Absent.is_found());
/// assert!(Probe::Fields(FieldMap::new()).fields().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// The key holds a non-empty hash.
    Fields(FieldMap),
    /// The key holds a plain string value.
    Scalar(String),
    /// Nothing is stored under the key.
    Absent,
}

impl Probe {
    /// Returns `true` unless the probe is [`Probe::Absent`].
    #[must_use]
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Returns the field map if the key holds a hash.
    #[must_use]
    pub fn fields(&self) -> Option<&FieldMap> {
        match self {
            Self::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    /// Returns the string value if the key holds a scalar.
    #[must_use]
    pub fn scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }
}
