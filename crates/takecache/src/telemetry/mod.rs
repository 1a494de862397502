// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logs and OpenTelemetry metrics for cache operations.
//!
//! Every step of a read-through lookup is reported as an activity on an operation. Logs go
//! through `tracing` when enabled on the builder; metrics are recorded when the `metrics` feature
//! is on and a meter provider was supplied.

use std::time::Duration;

#[cfg(any(feature = "metrics", test))]
use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram, Meter},
};
use tick::Clock;
use tracing::Level;

use crate::node::CacheName;

pub(crate) mod attributes;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(test)]
pub(crate) mod testing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Take,
    Lookup,
    Load,
    Heal,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Take => "cache.take",
            Self::Lookup => "cache.lookup",
            Self::Load => "cache.load",
            Self::Heal => "cache.heal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    Miss,
    Placeholder,
    Loaded,
    NotFound,
    Healed,
    Ok,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Placeholder => "cache.placeholder",
            Self::Loaded => "cache.loaded",
            Self::NotFound => "cache.not_found",
            Self::Healed => "cache.healed",
            Self::Ok => "cache.ok",
            Self::Error => "cache.error",
        }
    }

    pub fn severity(self) -> Level {
        match self {
            Self::Hit | Self::Miss | Self::Placeholder | Self::Ok => Level::DEBUG,
            Self::Loaded | Self::NotFound | Self::Healed => Level::INFO,
            Self::Error => Level::ERROR,
        }
    }
}

/// Records cache activities as logs and metrics.
#[derive(Clone, Debug)]
pub(crate) struct CacheTelemetry {
    clock: Clock,
    logging_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    event_counter: Option<Counter<u64>>,
    #[cfg(any(feature = "metrics", test))]
    take_duration: Option<Histogram<f64>>,
}

impl CacheTelemetry {
    pub fn new(logging_enabled: bool, clock: Clock) -> Self {
        Self {
            clock,
            logging_enabled,
            #[cfg(any(feature = "metrics", test))]
            event_counter: None,
            #[cfg(any(feature = "metrics", test))]
            take_duration: None,
        }
    }

    #[cfg(any(feature = "metrics", test))]
    pub fn with_meter(self, meter: Option<&Meter>) -> Self {
        Self {
            event_counter: meter.map(metrics::create_event_counter),
            take_duration: meter.map(metrics::create_take_duration_histogram),
            ..self
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn record(&self, cache_name: CacheName, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        #[cfg(any(feature = "metrics", test))]
        {
            let attrs = [
                KeyValue::new(attributes::CACHE_NAME, cache_name),
                KeyValue::new(attributes::CACHE_OPERATION_NAME, operation.as_str()),
                KeyValue::new(attributes::CACHE_ACTIVITY_NAME, activity.as_str()),
            ];

            if let Some(c) = &self.event_counter {
                c.add(1, &attrs);
            }

            if let (Some(d), Some(h)) = (duration, &self.take_duration) {
                h.record(d.as_secs_f64(), &attrs);
            }
        }

        if self.logging_enabled {
            Self::emit(cache_name, operation, activity, duration);
        }
    }

    fn emit(cache_name: CacheName, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        let op = operation.as_str();
        let act = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());

        // Field names must match the constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = cache_name,
                    cache.operation = op,
                    cache.activity = act,
                    cache.duration_ns = ?duration_ns,
                    "cache.event"
                )
            };
        }

        let level = activity.severity();
        if level == Level::ERROR {
            emit_event!(error);
        } else if level == Level::INFO {
            emit_event!(info);
        } else {
            emit_event!(debug);
        }
    }
}
