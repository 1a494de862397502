// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Duplicate suppression for concurrent work on the same key.
//!
//! [`Coalescer::work`] runs the producer for the first caller of a key (the leader). Callers that
//! arrive while the leader is still running (followers) wait for the leader and receive a clone
//! of its output. Once the leader finishes, the key is free again and the next caller leads a
//! fresh execution.
//!
//! # Cancellation
//!
//! Followers never take over abandoned work. If the leader's future is dropped or its producer
//! panics, every follower waiting at that moment receives [`Abandoned`].
//!
//! # Examples
//!
//! ```
//! use takecache::coalesce::Coalescer;
//!
//! # futures::executor::block_on(async {
//! let flights: Coalescer<String, u32> = Coalescer::new();
//!
//! let value = flights.work("answer".to_string(), || async { 42 }).await.unwrap();
//! assert_eq!(value, 42);
//! assert_eq!(flights.in_flight(), 0);
//! # });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use futures::channel::oneshot;
use parking_lot::Mutex;

type Waiters<T> = Vec<oneshot::Sender<T>>;

/// The leader of a coalesced call went away before producing a result.
#[ohno::error]
#[display("coalesced work was abandoned by its leader")]
pub struct Abandoned {}

/// Runs at most one producer per key at a time and shares its output.
pub struct Coalescer<K, T> {
    flights: Mutex<HashMap<K, Waiters<T>>>,
}

impl<K, T> Default for Coalescer<K, T> {
    fn default() -> Self {
        Self {
            flights: Mutex::default(),
        }
    }
}

impl<K, T> fmt::Debug for Coalescer<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coalescer")
            .field("in_flight", &self.flights.lock().len())
            .finish()
    }
}

enum Role<T> {
    Leader,
    Follower(oneshot::Receiver<T>),
}

impl<K, T> Coalescer<K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    /// Creates an empty coalescer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `func` for `key` unless another call for the same key is already in flight, in which
    /// case waits for that call and returns a clone of its output.
    ///
    /// # Errors
    ///
    /// Returns [`Abandoned`] to a follower whose leader was dropped or panicked.
    pub async fn work<F, Fut>(&self, key: K, func: F) -> Result<T, Abandoned>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let role = {
            let mut flights = self.flights.lock();
            if let Some(waiters) = flights.get_mut(&key) {
                let (sender, receiver) = oneshot::channel();
                waiters.push(sender);
                Role::Follower(receiver)
            } else {
                flights.insert(key.clone(), Vec::new());
                Role::Leader
            }
        };

        match role {
            Role::Follower(receiver) => receiver.await.map_err(Abandoned::caused_by),
            Role::Leader => {
                let flight = Flight {
                    key: Some(key),
                    flights: &self.flights,
                };
                let value = func().await;
                flight.land(&value);
                Ok(value)
            }
        }
    }

    /// Returns the number of keys with a leader currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }
}

/// Retires the leader's slot, delivering the result when there is one.
///
/// Dropping the flight without landing it drops the followers' senders, which wakes them with a
/// cancellation.
struct Flight<'a, K: Hash + Eq, T> {
    key: Option<K>,
    flights: &'a Mutex<HashMap<K, Waiters<T>>>,
}

impl<K: Hash + Eq, T: Clone> Flight<'_, K, T> {
    fn land(mut self, value: &T) {
        for waiter in self.retire() {
            if waiter.send(value.clone()).is_err() {
                tracing::trace!("coalesced follower dropped before the result arrived");
            }
        }
    }
}

impl<K: Hash + Eq, T> Flight<'_, K, T> {
    fn retire(&mut self) -> Waiters<T> {
        self.key
            .take()
            .and_then(|key| self.flights.lock().remove(&key))
            .unwrap_or_default()
    }
}

impl<K: Hash + Eq, T> Drop for Flight<'_, K, T> {
    fn drop(&mut self) {
        let abandoned = self.retire();
        if !abandoned.is_empty() {
            tracing::debug!(followers = abandoned.len(), "coalesced leader dropped before completing");
        }
    }
}
