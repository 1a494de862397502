// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for [`CacheNode`].

use std::sync::Arc;
use std::time::Duration;

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::{Meter, MeterProvider};
use tick::Clock;

use crate::coalesce::Coalescer;
use crate::node::{CacheName, CacheNode};
use crate::telemetry::CacheTelemetry;
use crate::{ExpiryPolicy, Usage};

const DEFAULT_NAME: CacheName = "takecache";

/// Configures and creates a [`CacheNode`].
///
/// Created by [`CacheNode::builder`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use takecache::{CacheNode, Usage};
/// use takecache_store::testing::MockStore;
/// use tick::Clock;
///
/// let usage = Arc::new(Usage::new());
/// let node = CacheNode::builder(MockStore::new(), Clock::new_frozen())
///     .name("users")
///     .data_expiry(Duration::from_secs(300))
///     .not_found_expiry(Duration::from_secs(10))
///     .usage(Arc::clone(&usage))
///     .logs()
///     .build();
///
/// assert_eq!(node.name(), "users");
/// assert_eq!(node.expiry().not_found, Duration::from_secs(10));
/// ```
#[derive(Debug)]
pub struct CacheNodeBuilder<S> {
    store: S,
    clock: Clock,
    name: CacheName,
    expiry: ExpiryPolicy,
    usage: Option<Arc<Usage>>,
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<Meter>,
}

impl<S> CacheNodeBuilder<S> {
    pub(crate) fn new(store: S, clock: Clock) -> Self {
        Self {
            store,
            clock,
            name: DEFAULT_NAME,
            expiry: ExpiryPolicy::default(),
            usage: None,
            logs_enabled: false,
            #[cfg(any(feature = "metrics", test))]
            meter: None,
        }
    }

    /// Sets the name reported in logs and metrics. Defaults to `takecache`.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Replaces the whole expiry policy.
    #[must_use]
    pub fn expiry(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    /// Sets how long loaded records live in the store.
    #[must_use]
    pub fn data_expiry(mut self, ttl: Duration) -> Self {
        self.expiry.data = Some(ttl);
        self
    }

    /// Stores loaded records without an expiry.
    #[must_use]
    pub fn persistent_data(mut self) -> Self {
        self.expiry.data = None;
        self
    }

    /// Sets how long the not-found placeholder lives in the store.
    #[must_use]
    pub fn not_found_expiry(mut self, ttl: Duration) -> Self {
        self.expiry.not_found = ttl;
        self
    }

    /// Charges hits and misses to a shared registry instead of a private one.
    #[must_use]
    pub fn usage(mut self, usage: Arc<Usage>) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Emits a structured `tracing` event for every cache activity.
    #[must_use]
    pub fn logs(mut self) -> Self {
        self.logs_enabled = true;
        self
    }

    /// Records event counts and take durations with the given meter provider.
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.meter = Some(crate::telemetry::metrics::create_meter(provider));
        self
    }

    /// Creates the cache node.
    #[must_use]
    pub fn build(self) -> CacheNode<S> {
        let telemetry = CacheTelemetry::new(self.logs_enabled, self.clock);
        #[cfg(any(feature = "metrics", test))]
        let telemetry = telemetry.with_meter(self.meter.as_ref());

        CacheNode {
            name: self.name,
            store: self.store,
            expiry: self.expiry,
            usage: self.usage.unwrap_or_default(),
            flights: Coalescer::new(),
            telemetry,
        }
    }
}
