// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory store implementation for testing.
//!
//! This module provides `MockStore`, a [`KeyValueStore`] that keeps everything in memory,
//! honors expirations against a [`Clock`], records all operations and supports failure
//! injection for testing error paths.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tick::Clock;

use crate::{Error, FieldMap, KeyValueStore};

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

/// Recorded store operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// A scalar read of the given key.
    Get(String),
    /// A full hash read of the given key.
    HashGetAll(String),
    /// A single field read of a hash.
    HashGet {
        /// The key that was read.
        key: String,
        /// The field that was read.
        field: String,
    },
    /// A scalar write with expiry.
    Set {
        /// The key that was written.
        key: String,
        /// The value that was written.
        value: String,
        /// The expiry of the written value.
        ttl: Duration,
    },
    /// A hash write.
    HashSet {
        /// The key that was written.
        key: String,
        /// The fields that were written.
        fields: FieldMap,
        /// The expiry of the written hash, if any.
        ttl: Option<Duration>,
    },
    /// A delete of one or more keys.
    Delete(Vec<String>),
    /// An existence check.
    Exists(String),
    /// A push onto a list.
    ListPush {
        /// The list key.
        key: String,
        /// The pushed value.
        value: String,
    },
    /// A pop from a list.
    ListPop(String),
}

impl StoreOp {
    /// Returns the first key the operation touches.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Get(key) | Self::HashGetAll(key) | Self::Exists(key) | Self::ListPop(key) => key,
            Self::HashGet { key, .. } | Self::Set { key, .. } | Self::HashSet { key, .. } | Self::ListPush { key, .. } => key,
            Self::Delete(keys) => keys.first().map_or("", String::as_str),
        }
    }
}

#[derive(Debug, Clone)]
enum Value {
    Scalar(String),
    Fields(FieldMap),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Stored {
    value: Value,
    expires_at: Option<Instant>,
}

type FailPredicate = Box<dyn Fn(&StoreOp) -> bool + Send + Sync>;

/// A configurable in-memory store for testing.
///
/// Values expire according to the [`Clock`] the store was created with, so tests can use a
/// `tick::ClockControl` to move time forward deterministically. Reads of a key holding the wrong
/// kind of value behave like a Redis server: `hash_get_all` sees no fields and `get` fails.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use takecache_store::{KeyValueStore, Probe, testing::{MockStore, StoreOp}};
/// use tick::ClockControl;
/// # futures::executor::block_on(async {
///
/// let control = ClockControl::new();
/// let store = MockStore::with_clock(control.to_clock());
///
/// store.set("user:9", "*", Duration::from_secs(60)).await?;
/// assert_eq!(store.probe("user:9").await?, Probe::Scalar("*".to_string()));
///
/// control.advance(Duration::from_secs(61));
/// assert_eq!(store.probe("user:9").await?, Probe::Absent);
///
/// // Fail every delete
/// store.fail_when(|op| matches!(op, StoreOp::Delete(_)));
/// assert!(store.delete(&["user:9"]).await.is_err());
/// # Ok::<(), takecache_store::Error>(())
/// # });
/// ```
pub struct MockStore {
    data: Arc<Mutex<HashMap<String, Stored>>>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
    clock: Clock,
}

impl std::fmt::Debug for MockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl Clone for MockStore {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            clock: self.clock.clone(),
        }
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Creates an empty store whose clock never advances.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::new_frozen())
    }

    /// Creates an empty store that evaluates expirations against `clock`.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            clock,
        }
    }

    /// Sets a predicate that determines which operations fail.
    ///
    /// Failing operations are still recorded but leave the data untouched.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        let now = self.clock.instant();
        self.data.lock().values().filter(|stored| is_live(stored, now)).count()
    }

    /// Returns the live scalar stored under `key`, bypassing recording and failure injection.
    #[must_use]
    pub fn scalar(&self, key: &str) -> Option<String> {
        match self.peek(key)? {
            Value::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the live hash stored under `key`, bypassing recording and failure injection.
    #[must_use]
    pub fn fields(&self, key: &str) -> Option<FieldMap> {
        match self.peek(key)? {
            Value::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    /// Returns the remaining time to live of `key`, if it is live and has an expiry.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.instant();
        let data = self.data.lock();
        let stored = data.get(key).filter(|stored| is_live(stored, now))?;
        stored.expires_at.map(|at| at.saturating_duration_since(now))
    }

    /// Stores a hash directly, bypassing recording and failure injection.
    ///
    /// Useful for seeding malformed entries.
    pub fn seed_fields<I, F, V>(&self, key: &str, fields: I)
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        let fields = fields.into_iter().map(|(f, v)| (f.into(), v.into())).collect();
        self.put(key, Value::Fields(fields), None);
    }

    /// Stores a scalar directly, bypassing recording and failure injection.
    pub fn seed_scalar(&self, key: &str, value: impl Into<String>) {
        self.put(key, Value::Scalar(value.into()), None);
    }

    fn peek(&self, key: &str) -> Option<Value> {
        let now = self.clock.instant();
        self.data.lock().get(key).filter(|stored| is_live(stored, now)).map(|stored| stored.value.clone())
    }

    fn put(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| self.clock.instant() + ttl);
        self.data.lock().insert(key.to_owned(), Stored { value, expires_at });
    }

    fn live(&self, key: &str) -> Option<Value> {
        let now = self.clock.instant();
        let mut data = self.data.lock();
        if data.get(key).is_some_and(|stored| !is_live(stored, now)) {
            data.remove(key);
        }
        data.get(key).map(|stored| stored.value.clone())
    }

    fn begin(&self, op: StoreOp) -> Result<(), Error> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let message = format!("mock: {op:?} failed");
        self.operations.lock().push(op);
        if fail { Err(Error::from_message(message)) } else { Ok(()) }
    }
}

fn is_live(stored: &Stored, now: Instant) -> bool {
    stored.expires_at.is_none_or(|at| at > now)
}

impl KeyValueStore for MockStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.begin(StoreOp::Get(key.to_owned()))?;
        match self.live(key) {
            None => Ok(None),
            Some(Value::Scalar(value)) => Ok(Some(value)),
            Some(_) => Err(Error::from_message(WRONG_TYPE)),
        }
    }

    async fn hash_get_all(&self, key: &str) -> Result<FieldMap, Error> {
        self.begin(StoreOp::HashGetAll(key.to_owned()))?;
        match self.live(key) {
            Some(Value::Fields(fields)) => Ok(fields),
            _ => Ok(FieldMap::new()),
        }
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, Error> {
        self.begin(StoreOp::HashGet {
            key: key.to_owned(),
            field: field.to_owned(),
        })?;
        match self.live(key) {
            None => Ok(None),
            Some(Value::Fields(fields)) => Ok(fields.get(field).cloned()),
            Some(_) => Err(Error::from_message(WRONG_TYPE)),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        self.begin(StoreOp::Set {
            key: key.to_owned(),
            value: value.to_owned(),
            ttl,
        })?;
        self.put(key, Value::Scalar(value.to_owned()), Some(ttl));
        Ok(())
    }

    async fn hash_set(&self, key: &str, fields: &FieldMap, ttl: Option<Duration>) -> Result<(), Error> {
        self.begin(StoreOp::HashSet {
            key: key.to_owned(),
            fields: fields.clone(),
            ttl,
        })?;
        // Redis has no empty hashes: writing no fields leaves the key absent.
        if fields.is_empty() {
            self.data.lock().remove(key);
        } else {
            self.put(key, Value::Fields(fields.clone()), ttl);
        }
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<u64, Error> {
        self.begin(StoreOp::Delete(keys.iter().map(|key| (*key).to_owned()).collect()))?;
        let now = self.clock.instant();
        let mut data = self.data.lock();
        let removed = keys
            .iter()
            .filter_map(|key| data.remove(*key))
            .filter(|stored| is_live(stored, now))
            .count();
        Ok(removed as u64)
    }

    async fn exists(&self, key: &str) -> Result<bool, Error> {
        self.begin(StoreOp::Exists(key.to_owned()))?;
        Ok(self.live(key).is_some())
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<bool, Error> {
        self.begin(StoreOp::ListPush {
            key: key.to_owned(),
            value: value.to_owned(),
        })?;
        let mut list = match self.live(key) {
            None => VecDeque::new(),
            Some(Value::List(list)) => list,
            Some(_) => return Err(Error::from_message(WRONG_TYPE)),
        };
        list.push_front(value.to_owned());
        let len = list.len();
        self.put(key, Value::List(list), None);
        Ok(len == 1)
    }

    async fn list_pop(&self, key: &str) -> Result<Option<String>, Error> {
        self.begin(StoreOp::ListPop(key.to_owned()))?;
        let mut list = match self.live(key) {
            None => return Ok(None),
            Some(Value::List(list)) => list,
            Some(_) => return Err(Error::from_message(WRONG_TYPE)),
        };
        let popped = list.pop_back();
        let mut data = self.data.lock();
        if list.is_empty() {
            data.remove(key);
        } else if let Some(stored) = data.get_mut(key) {
            stored.value = Value::List(list);
        }
        Ok(popped)
    }
}
