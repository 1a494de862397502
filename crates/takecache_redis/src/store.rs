// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZeroUsize;
use std::time::Duration;

use redis::{AsyncCommands, RedisError, aio::ConnectionManager};
use takecache_store::{Error, FieldMap, KeyValueStore};

/// Redis reply code for commands issued against a key of another type.
const WRONG_TYPE: &str = "WRONGTYPE";

/// A [`KeyValueStore`] backed by Redis.
///
/// Records are stored as hashes, scalar markers as strings with a millisecond expiry. Writing a
/// hash replaces whatever the key held before in one atomic `MULTI` block.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Wraps an existing connection manager.
    #[must_use]
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    /// Opens a connection manager for the given Redis URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the initial connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url).map_err(store_error)?;
        let manager = client.get_connection_manager().await.map_err(store_error)?;
        tracing::debug!(redis.url = url, "redis store connected");
        Ok(Self::new(manager))
    }

    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.connection().get(key).await.map_err(store_error)
    }

    async fn hash_get_all(&self, key: &str) -> Result<FieldMap, Error> {
        match self.connection().hgetall(key).await {
            Ok(fields) => Ok(fields),
            // A negative-cache marker is a plain string; it simply holds no fields.
            Err(e) if is_wrong_type(&e) => Ok(FieldMap::new()),
            Err(e) => Err(store_error(e)),
        }
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, Error> {
        self.connection().hget(key, field).await.map_err(store_error)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        self.connection().pset_ex(key, value, ttl_millis(ttl)).await.map_err(store_error)
    }

    async fn hash_set(&self, key: &str, fields: &FieldMap, ttl: Option<Duration>) -> Result<(), Error> {
        let items: Vec<(&str, &str)> = fields.iter().map(|(f, v)| (f.as_str(), v.as_str())).collect();

        let mut pipe = redis::pipe();
        pipe.atomic().del(key).ignore();
        if !items.is_empty() {
            pipe.hset_multiple(key, &items).ignore();
            if let Some(ttl) = ttl {
                pipe.pexpire(key, i64::try_from(ttl_millis(ttl)).unwrap_or(i64::MAX)).ignore();
            }
        }

        let (): () = pipe.query_async(&mut self.connection()).await.map_err(store_error)?;
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<u64, Error> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.connection().del(keys).await.map_err(store_error)
    }

    async fn exists(&self, key: &str) -> Result<bool, Error> {
        self.connection().exists(key).await.map_err(store_error)
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<bool, Error> {
        let len: u64 = self.connection().lpush(key, value).await.map_err(store_error)?;
        Ok(len == 1)
    }

    async fn list_pop(&self, key: &str) -> Result<Option<String>, Error> {
        self.connection().rpop(key, None::<NonZeroUsize>).await.map_err(store_error)
    }
}

fn store_error(error: RedisError) -> Error {
    Error::from_message(error)
}

fn is_wrong_type(error: &RedisError) -> bool {
    error.code() == Some(WRONG_TYPE)
}

/// Converts a TTL to whole milliseconds, never below one so the key always expires.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}
