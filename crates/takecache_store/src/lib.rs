// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! The key-value store contract behind a `takecache` read-through cache.
//!
//! This crate defines the [`KeyValueStore`] trait, a deliberately narrow command set against a
//! remote key-value store (scalar get/set-with-expiry, hash get/set, delete, exists and list
//! push/pop), along with the [`Probe`] union returned by the combined cache lookup and the
//! [`Error`] type for store failures.
//!
//! The wire protocol and connection handling of the backing store live in the implementations,
//! for example `takecache_redis`.
//!
//! # Implementing a Store
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//! use std::time::Duration;
//!
//! use takecache_store::{Error, FieldMap, KeyValueStore};
//!
//! #[derive(Default)]
//! struct Scalars(Mutex<HashMap<String, String>>);
//!
//! impl KeyValueStore for Scalars {
//!     async fn get(&self, key: &str) -> Result<Option<String>, Error> {
//!         Ok(self.0.lock().unwrap().get(key).cloned())
//!     }
//!
//!     async fn hash_get_all(&self, _key: &str) -> Result<FieldMap, Error> {
//!         Ok(FieldMap::new())
//!     }
//!
//!     async fn hash_get(&self, _key: &str, _field: &str) -> Result<Option<String>, Error> {
//!         Ok(None)
//!     }
//!
//!     async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), Error> {
//!         self.0.lock().unwrap().insert(key.to_owned(), value.to_owned());
//!         Ok(())
//!     }
//!
//!     async fn hash_set(&self, _key: &str, _fields: &FieldMap, _ttl: Option<Duration>) -> Result<(), Error> {
//!         Err(Error::from_message("hashes are not supported"))
//!     }
//!
//!     async fn delete(&self, keys: &[&str]) -> Result<u64, Error> {
//!         let mut map = self.0.lock().unwrap();
//!         Ok(keys.iter().filter(|key| map.remove(**key).is_some()).count() as u64)
//!     }
//!
//!     async fn exists(&self, key: &str) -> Result<bool, Error> {
//!         Ok(self.0.lock().unwrap().contains_key(key))
//!     }
//!
//!     async fn list_push(&self, _key: &str, _value: &str) -> Result<bool, Error> {
//!         Err(Error::from_message("lists are not supported"))
//!     }
//!
//!     async fn list_pop(&self, _key: &str) -> Result<Option<String>, Error> {
//!         Ok(None)
//!     }
//! }
//! ```

pub mod error;
mod probe;
pub(crate) mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use probe::{FieldMap, Probe};
#[doc(inline)]
pub use store::KeyValueStore;
