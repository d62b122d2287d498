// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{Observable, RivuletError};
use rivulet_operators::prelude::*;
use rivulet_schedulers::NewThreadScheduler;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn blocking_first_returns_the_head() {
    assert_eq!(Observable::of(vec![1, 2, 3]).blocking_first().unwrap(), 1);
}

#[test]
fn blocking_first_on_empty_raises_no_such_element() {
    let result = Observable::<i32>::empty().blocking_first();
    assert!(matches!(result, Err(RivuletError::NoSuchElement)));
}

#[test]
fn blocking_first_or_substitutes_the_default() {
    assert_eq!(Observable::<i32>::empty().blocking_first_or(9).unwrap(), 9);
}

#[test]
fn blocking_last_returns_the_tail() {
    assert_eq!(Observable::of(vec![1, 2, 3]).blocking_last().unwrap(), 3);
    assert_eq!(Observable::<i32>::empty().blocking_last_or(-1).unwrap(), -1);
}

#[test]
fn blocking_bridges_work_across_scheduler_hops() {
    // the value is produced on another thread; the bridge must wait for it
    let scheduler: Arc<dyn rivulet_core::Scheduler> = Arc::new(NewThreadScheduler::new());
    let value = Observable::of(vec![5, 6])
        .subscribe_on(Arc::clone(&scheduler))
        .observe_on(scheduler)
        .blocking_first()
        .unwrap();
    assert_eq!(value, 5);
}

#[test]
fn blocking_iter_yields_until_completion() {
    let collected: Vec<i32> = Observable::of(vec![1, 2, 3])
        .blocking_iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(collected, vec![1, 2, 3]);
}

#[test]
fn blocking_iter_surfaces_the_error_last() {
    let mut iter = Observable::of(vec![1])
        .concat_with(&Observable::error(RivuletError::custom("boom")))
        .blocking_iter();

    assert_eq!(iter.next().unwrap().unwrap(), 1);
    assert!(iter.next().unwrap().is_err());
    assert!(iter.next().is_none());
}

#[test]
fn blocking_iter_pulls_from_an_async_producer() {
    let scheduler: Arc<dyn rivulet_core::Scheduler> = Arc::new(NewThreadScheduler::new());
    let collected: Vec<u64> = Observable::range(0, 5)
        .subscribe_on(scheduler)
        .blocking_iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(collected, vec![0, 1, 2, 3, 4]);
}

#[test]
fn to_future_resolves_with_the_first_value() {
    let future = Observable::of(vec![7, 8]).to_future();
    let value = futures::executor::block_on(future).unwrap();
    assert_eq!(value, 7);
}

#[test]
fn to_future_resolves_with_the_error_for_failing_sources() {
    let future = Observable::<i32>::error(RivuletError::custom("boom")).to_future();
    assert!(futures::executor::block_on(future).is_err());
}

#[test]
fn to_future_on_empty_raises_no_such_element() {
    let future = Observable::<i32>::empty().to_future();
    let result = futures::executor::block_on(future);
    assert!(matches!(result, Err(RivuletError::NoSuchElement)));
}

#[test]
fn tap_side_effects_observe_without_altering() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    let seen = Arc::new(AtomicUsize::new(0));
    let finally = Arc::new(AtomicUsize::new(0));

    let seen_probe = Arc::clone(&seen);
    let finally_probe = Arc::clone(&finally);
    let values = Observable::of(vec![1, 2, 3])
        .do_on_next(move |_| {
            seen_probe.fetch_add(1, Ordering::SeqCst);
        })
        .do_finally(move || {
            finally_probe.fetch_add(1, Ordering::SeqCst);
        })
        .to_list()
        .blocking_get()
        .unwrap();

    assert_eq!(values, vec![1, 2, 3]);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
    assert_eq!(finally.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_tap_is_swallowed_and_the_stream_proceeds() {
    let values = Observable::of(vec![1, 2])
        .do_on_next(|_| panic!("side effect failed"))
        .to_list()
        .blocking_get()
        .unwrap();
    assert_eq!(values, vec![1, 2]);
}

#[test]
fn observe_on_delivers_on_a_worker_thread() {
    let scheduler: Arc<dyn rivulet_core::Scheduler> = Arc::new(NewThreadScheduler::new());
    let observer = rivulet_test_utils::TestObserver::new();
    Observable::of(vec![1, 2, 3])
        .observe_on(scheduler)
        .subscribe(observer.arc());

    assert!(observer.await_terminal(Duration::from_secs(5)));
    observer.assert_values(&[1, 2, 3]);
    observer.assert_completed();
}
