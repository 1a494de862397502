// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The read-through cache coordinator.

use std::fmt;
use std::sync::Arc;

use takecache_store::{FieldMap, KeyValueStore, Probe};
use tick::Clock;

use crate::builder::CacheNodeBuilder;
use crate::codec::{self, Record};
use crate::coalesce::Coalescer;
use crate::telemetry::{CacheActivity, CacheOperation, CacheTelemetry};
use crate::{Error, ErrorKind, ExpiryPolicy, Usage};

/// Static name identifying a cache node in telemetry.
pub type CacheName = &'static str;

type SharedOutcome = Result<Arc<FieldMap>, Error>;

/// What a store probe says about a key.
enum Lookup {
    Hit(FieldMap),
    Placeholder,
    Miss,
}

/// A read-through cache in front of a [`KeyValueStore`].
///
/// [`take`](Self::take) returns the record stored under a key, or runs the caller's loader and
/// stores its result. Concurrent calls for the same key share one store lookup and at most one
/// loader run. When the loader reports that no value exists, a placeholder is cached so the next
/// calls fail fast with [`ErrorKind::NotFound`] until the placeholder expires.
///
/// Entries that can no longer be decoded are deleted and reloaded.
///
/// # Examples
///
/// ```
/// use takecache::CacheNode;
/// use takecache::codec::{FieldDescriptor, Record};
/// use takecache_store::testing::MockStore;
/// use tick::Clock;
///
/// #[derive(Debug, Default, Clone, PartialEq)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl Record for User {
///     const FIELDS: &'static [FieldDescriptor<Self>] = &[
///         FieldDescriptor::int("id", |u: &User| u.id, |u: &mut User, v| u.id = v),
///         FieldDescriptor::string("name", |u: &User| u.name.clone(), |u: &mut User, v| u.name = v),
///     ];
/// }
///
/// # futures::executor::block_on(async {
/// let node = CacheNode::builder(MockStore::new(), Clock::new_frozen()).build();
///
/// let user: User = node
///     .take("user:1", || async {
///         Ok::<_, std::io::Error>(Some(User { id: 1, name: "a".into() }))
///     })
///     .await?;
/// assert_eq!(user.name, "a");
///
/// // Served from the store; the loader is not called again.
/// let again: User = node
///     .take("user:1", || async { Ok::<Option<User>, std::io::Error>(None) })
///     .await?;
/// assert_eq!(again, user);
/// assert_eq!(node.usage().hit_count("user:1"), 1);
/// # Ok::<(), takecache::Error>(())
/// # });
/// ```
pub struct CacheNode<S> {
    pub(crate) name: CacheName,
    pub(crate) store: S,
    pub(crate) expiry: ExpiryPolicy,
    pub(crate) usage: Arc<Usage>,
    pub(crate) flights: Coalescer<String, SharedOutcome>,
    pub(crate) telemetry: CacheTelemetry,
}

impl<S> CacheNode<S> {
    /// Starts building a cache node over `store`.
    ///
    /// The clock times operations for telemetry.
    #[must_use]
    pub fn builder(store: S, clock: Clock) -> CacheNodeBuilder<S> {
        CacheNodeBuilder::new(store, clock)
    }

    /// Returns the name reported in telemetry.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.name
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the expiry policy applied to written entries.
    #[must_use]
    pub fn expiry(&self) -> ExpiryPolicy {
        self.expiry
    }

    /// Returns the registry charged with hits and misses.
    #[must_use]
    pub fn usage(&self) -> &Arc<Usage> {
        &self.usage
    }
}

impl<S> fmt::Debug for CacheNode<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheNode")
            .field("name", &self.name)
            .field("expiry", &self.expiry)
            .field("flights", &self.flights)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> CacheNode<S> {
    /// Returns the record cached under `key`, loading and caching it on a miss.
    ///
    /// The loader returns `Ok(Some(record))` for a value, `Ok(None)` when no value exists, or an
    /// error. It is only called when the store holds neither a record nor a placeholder for the
    /// key, and only by one of any set of concurrent callers.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotFound`] when a placeholder is cached or the loader returned `Ok(None)`.
    /// - [`ErrorKind::Store`] when the store lookup fails.
    /// - [`ErrorKind::Loader`] when the loader fails; nothing is cached.
    /// - [`ErrorKind::Decode`] when the shared result cannot be decoded into `R`.
    /// - [`ErrorKind::Codec`] when `R` declares a malformed field tag.
    /// - [`ErrorKind::Cancelled`] when the call serving this one was dropped.
    pub async fn take<R, F, Fut, E>(&self, key: &str, loader: F) -> Result<R, Error>
    where
        R: Record,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<R>, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let stopwatch = self.telemetry.clock().stopwatch();

        let shared = match self.flights.work(key.to_owned(), || self.lead(key, loader)).await {
            Ok(outcome) => outcome,
            Err(abandoned) => Err(Error::cancelled(abandoned)),
        };
        let result = shared.and_then(|fields| {
            let mut record = R::default();
            codec::decode(&fields, &mut record)?;
            Ok(record)
        });

        let activity = match &result {
            Ok(_) => CacheActivity::Ok,
            Err(e) if e.is_not_found() => CacheActivity::NotFound,
            Err(_) => CacheActivity::Error,
        };
        self.telemetry
            .record(self.name, CacheOperation::Take, activity, Some(stopwatch.elapsed()));

        result
    }

    /// Like [`take`](Self::take), but writes the record into `target`.
    ///
    /// `target` is left untouched when an error is returned.
    ///
    /// # Errors
    ///
    /// Same as [`take`](Self::take).
    pub async fn take_into<R, F, Fut, E>(&self, key: &str, target: &mut R, loader: F) -> Result<(), Error>
    where
        R: Record,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<R>, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        *target = self.take(key, loader).await?;
        Ok(())
    }

    async fn lead<R, F, Fut, E>(&self, key: &str, loader: F) -> SharedOutcome
    where
        R: Record,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<R>, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match self.lookup::<R>(key).await? {
            Lookup::Hit(fields) => Ok(Arc::new(fields)),
            Lookup::Placeholder => Err(Error::not_found(key)),
            Lookup::Miss => self.load(key, loader).await.map(Arc::new),
        }
    }

    async fn lookup<R: Record>(&self, key: &str) -> Result<Lookup, Error> {
        let probe = match self.store.probe(key).await {
            Ok(probe) => probe,
            Err(e) => {
                self.usage.incr_miss(key);
                self.record(CacheOperation::Lookup, CacheActivity::Error);
                return Err(Error::store(key, e));
            }
        };

        match probe {
            Probe::Fields(fields) => {
                let mut scratch = R::default();
                match codec::decode(&fields, &mut scratch) {
                    Ok(()) => {
                        let fields = codec::encode(&scratch)?;
                        self.usage.incr_hit(key);
                        self.record(CacheOperation::Lookup, CacheActivity::Hit);
                        Ok(Lookup::Hit(fields))
                    }
                    Err(e) if e.kind() == ErrorKind::Decode => {
                        self.heal(key, &e).await;
                        self.miss(key);
                        Ok(Lookup::Miss)
                    }
                    Err(e) => Err(e),
                }
            }
            Probe::Scalar(value) if codec::is_placeholder(&value) => {
                self.record(CacheOperation::Lookup, CacheActivity::Placeholder);
                Ok(Lookup::Placeholder)
            }
            Probe::Scalar(value) => {
                let e = Error::decode(format!("unexpected scalar '{value}' in place of a record"));
                self.heal(key, &e).await;
                self.miss(key);
                Ok(Lookup::Miss)
            }
            Probe::Absent => {
                self.miss(key);
                Ok(Lookup::Miss)
            }
        }
    }

    async fn load<R, F, Fut, E>(&self, key: &str, loader: F) -> Result<FieldMap, Error>
    where
        R: Record,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<R>, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let loaded = match loader().await {
            Ok(loaded) => loaded,
            Err(e) => {
                self.record(CacheOperation::Load, CacheActivity::Error);
                return Err(Error::loader(key, e));
            }
        };

        let Some(record) = loaded else {
            match self.store.set(key, codec::PLACEHOLDER, self.expiry.not_found).await {
                Ok(()) => self.record(CacheOperation::Load, CacheActivity::NotFound),
                Err(e) => {
                    tracing::warn!(cache.name = self.name, cache.key = key, error = %e, "failed to cache not-found placeholder");
                    self.record(CacheOperation::Load, CacheActivity::Error);
                }
            }
            return Err(Error::not_found(key));
        };

        let fields = codec::encode(&record)?;
        match self.store.hash_set(key, &fields, self.expiry.data).await {
            Ok(()) => self.record(CacheOperation::Load, CacheActivity::Loaded),
            Err(e) => {
                tracing::warn!(cache.name = self.name, cache.key = key, error = %e, "failed to write loaded record back to the store");
                self.record(CacheOperation::Load, CacheActivity::Error);
            }
        }
        Ok(fields)
    }

    /// Deletes an entry that cannot be decoded. A failed delete is logged; the following
    /// write-back replaces the entry anyway.
    async fn heal(&self, key: &str, cause: &Error) {
        match self.store.delete(&[key]).await {
            Ok(_) => {
                tracing::debug!(cache.name = self.name, cache.key = key, cause = %cause, "deleted corrupt cache entry");
                self.record(CacheOperation::Heal, CacheActivity::Healed);
            }
            Err(e) => {
                tracing::warn!(cache.name = self.name, cache.key = key, error = %e, "failed to delete corrupt cache entry");
                self.record(CacheOperation::Heal, CacheActivity::Error);
            }
        }
    }

    fn miss(&self, key: &str) {
        self.usage.incr_miss(key);
        self.record(CacheOperation::Lookup, CacheActivity::Miss);
    }

    fn record(&self, operation: CacheOperation, activity: CacheActivity) {
        self.telemetry.record(self.name, operation, activity, None);
    }
}
