// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Read-through caching over a remote key-value store.
//!
//! A [`CacheNode`] answers `take(key, loader)`: it returns the record stored under `key`, or, on
//! a miss, runs the loader and writes its result back. On top of that plain read-through flow it
//! adds:
//!
//! - **Coalescing**: concurrent calls for one key share a single store lookup and at most one
//!   loader run ([`coalesce`]).
//! - **Negative caching**: when the loader reports that no value exists, a placeholder is stored
//!   and later calls return [`ErrorKind::NotFound`] without calling the loader until it expires.
//! - **Self-healing**: an entry that can no longer be decoded is deleted and reloaded.
//! - **Usage accounting**: per-key hit and miss counters in a shareable [`Usage`] registry.
//!
//! Records are stored as flat string maps. A type opts in by implementing [`Record`](codec::Record)
//! with one descriptor per cached field; see [`codec`].
//!
//! The store is anything implementing [`KeyValueStore`]. The `takecache_redis` crate provides a
//! Redis implementation, and the `test-util` feature exposes an in-memory [`MockStore`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use takecache::codec::{FieldDescriptor, Record};
//! use takecache::{CacheNode, Usage};
//! use takecache_store::testing::MockStore;
//! use tick::Clock;
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Record for User {
//!     const FIELDS: &'static [FieldDescriptor<Self>] = &[
//!         FieldDescriptor::int("id", |u: &User| u.id, |u: &mut User, v| u.id = v),
//!         FieldDescriptor::string("name", |u: &User| u.name.clone(), |u: &mut User, v| u.name = v),
//!     ];
//! }
//!
//! # futures::executor::block_on(async {
//! let usage = Arc::new(Usage::new());
//! let node = CacheNode::builder(MockStore::new(), Clock::new_frozen())
//!     .usage(Arc::clone(&usage))
//!     .build();
//!
//! // Nobody has user 2: the miss is cached as a placeholder.
//! let missing = node
//!     .take("user:2", || async { Ok::<Option<User>, std::io::Error>(None) })
//!     .await
//!     .unwrap_err();
//! assert!(missing.is_not_found());
//! assert_eq!(node.store().scalar("user:2").as_deref(), Some("*"));
//!
//! // The second call is answered by the placeholder.
//! let again = node
//!     .take("user:2", || async { Ok::<_, std::io::Error>(Some(User::default())) })
//!     .await
//!     .unwrap_err();
//! assert!(again.is_not_found());
//! assert_eq!(usage.miss_count("user:2"), 1);
//! # });
//! ```
//!
//! # Features
//!
//! - `metrics`: OpenTelemetry event counters and take durations via
//!   [`CacheNodeBuilder::metrics`].
//! - `serde`: `Serialize` and `Deserialize` for [`ExpiryPolicy`].
//! - `test-util`: re-exports [`MockStore`] and [`StoreOp`].

mod builder;
pub mod codec;
pub mod coalesce;
mod error;
mod expiry;
pub mod node;
mod telemetry;
pub mod usage;

#[doc(inline)]
pub use builder::CacheNodeBuilder;
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use expiry::ExpiryPolicy;
#[doc(inline)]
pub use node::CacheNode;
#[doc(inline)]
pub use takecache_store::{FieldMap, KeyValueStore, Probe};
#[doc(inline)]
pub use usage::{Usage, UsageSnapshot};

#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use takecache_store::testing::{MockStore, StoreOp};
