// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `Coalescer::work()`.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use takecache::coalesce::Coalescer;

#[tokio::test]
async fn direct_call() {
    let flights = Coalescer::new();
    let result = flights
        .work("key", || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            "Result".to_string()
        })
        .await
        .unwrap();
    assert_eq!(result, "Result");
}

#[tokio::test]
async fn parallel_calls_run_once() {
    let calls = AtomicUsize::new(0);
    let flights = Coalescer::new();

    let results = join_all((0..10).map(|_| {
        flights.work("key", || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            calls.fetch_add(1, Ordering::SeqCst);
            "Result".to_string()
        })
    }))
    .await;

    assert!(results.into_iter().all(|r| r.unwrap() == "Result"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(flights.in_flight(), 0);
}

#[tokio::test]
async fn followers_receive_the_leaders_value() {
    let flights = Coalescer::new();

    let leader = flights.work("key", || async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        1_u32
    });
    let follower = flights.work("key", || async { 2_u32 });

    let (a, b) = tokio::join!(leader, follower);
    assert_eq!(a.unwrap(), 1);
    assert_eq!(b.unwrap(), 1);
}

#[tokio::test]
async fn distinct_keys_do_not_coalesce() {
    let calls = AtomicUsize::new(0);
    let flights = Coalescer::new();

    let results = join_all(["a", "b", "c"].map(|key| {
        let calls = &calls;
        flights.work(key, move || async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            calls.fetch_add(1, Ordering::SeqCst);
            key.to_uppercase()
        })
    }))
    .await;

    let values: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    assert_eq!(values, ["A", "B", "C"]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn sequential_calls_run_each_time() {
    let calls = AtomicUsize::new(0);
    let flights = Coalescer::new();

    for expected in 1..=3 {
        let value = flights
            .work("key", || async { calls.fetch_add(1, Ordering::SeqCst) + 1 })
            .await
            .unwrap();
        assert_eq!(value, expected);
    }
}

#[tokio::test]
async fn dropped_leader_abandons_followers() {
    let calls = AtomicUsize::new(0);
    let flights: Coalescer<&str, u32> = Coalescer::new();

    let mut leader = Box::pin(flights.work("key", || std::future::pending::<u32>()));
    assert!((&mut leader).now_or_never().is_none());

    let mut follower = Box::pin(flights.work("key", || async {
        calls.fetch_add(1, Ordering::SeqCst);
        7
    }));
    assert!((&mut follower).now_or_never().is_none());

    drop(leader);

    let error = follower.await.unwrap_err();
    assert!(error.to_string().contains("abandoned"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(flights.in_flight(), 0);

    // The next call leads a fresh execution.
    assert_eq!(flights.work("key", || async { 8 }).await.unwrap(), 8);
}

#[tokio::test]
async fn panicking_leader_abandons_followers() {
    let flights: Coalescer<&str, u32> = Coalescer::new();
    let (release, released) = futures::channel::oneshot::channel::<()>();

    let mut leader = Box::pin(flights.work("key", || async move {
        released.await.unwrap();
        panic!("producer failed");
    }));
    assert!((&mut leader).now_or_never().is_none());

    let mut follower = Box::pin(flights.work("key", || async { 1 }));
    assert!((&mut follower).now_or_never().is_none());

    release.send(()).unwrap();
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| (&mut leader).now_or_never()));
    assert!(outcome.is_err());
    drop(leader);

    assert!(follower.await.is_err());
    assert_eq!(flights.in_flight(), 0);
}
