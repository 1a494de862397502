// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A Redis implementation of the `takecache` key-value store contract.
//!
//! [`RedisStore`] maps each [`KeyValueStore`](takecache_store::KeyValueStore) command onto its
//! Redis counterpart over a single multiplexed [`ConnectionManager`](redis::aio::ConnectionManager),
//! which reconnects on its own and is cheap to clone.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use takecache_redis::RedisStore;
//! use takecache_store::KeyValueStore;
//!
//! # async fn example() -> Result<(), takecache_store::Error> {
//! let store = RedisStore::connect("redis://localhost:6379").await?;
//!
//! store.set("user:9", "*", Duration::from_secs(60)).await?;
//! let probe = store.probe("user:9").await?;
//! assert_eq!(probe.scalar(), Some("*"));
//! # Ok(())
//! # }
//! ```

mod store;

#[doc(inline)]
pub use store::RedisStore;
