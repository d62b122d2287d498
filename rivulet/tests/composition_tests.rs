// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! End-to-end pipelines across the whole facade.

use rivulet_rx::prelude::*;
use rivulet_test_utils::{TestObserver, TestSubscriber};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn transformation_pipeline_round_trips() {
    // range | filter | map | scan | to_list, all in one chain
    let result = Observable::range(1, 10)
        .filter(|n| n % 2 == 1)
        .map(|n| n * n)
        .scan(0, |acc, n| acc + n)
        .to_list()
        .blocking_get()
        .unwrap();

    // odd squares 1, 9, 25, 49, 81 accumulated
    assert_eq!(result, vec![1, 10, 35, 84, 165]);
}

#[test]
fn hot_subject_through_operators_to_multiple_observers() {
    let subject = PublishSubject::new();
    let doubled = subject.as_observable().map(|n: i32| n * 2);

    let first = TestObserver::new();
    let second = TestObserver::new();
    doubled.subscribe(first.arc());
    doubled.subscribe(second.arc());

    use rivulet_rx::Observer;
    subject.on_next(1);
    subject.on_next(2);
    subject.on_complete();

    first.assert_values(&[2, 4]);
    second.assert_values(&[2, 4]);
    first.assert_completed();
    second.assert_completed();
}

#[test]
fn cold_source_shared_through_ref_count_runs_once() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    let runs = Arc::new(AtomicUsize::new(0));
    let run_probe = Arc::clone(&runs);

    let shared = Observable::defer(move || {
        run_probe.fetch_add(1, Ordering::SeqCst);
        Observable::range(1, 3)
    })
    .replay()
    .ref_count();

    let first = TestObserver::new();
    shared.subscribe(first.arc());
    let second = TestObserver::new();
    shared.subscribe(second.arc());

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    first.assert_values(&[1, 2, 3]);
    second.assert_values(&[1, 2, 3]);
}

#[test]
fn virtual_time_pipeline_with_interval_and_switch() {
    let scheduler = Arc::new(TestScheduler::new());
    let ts: Arc<dyn Scheduler> = Arc::clone(&scheduler) as Arc<dyn Scheduler>;

    let observer = TestObserver::new();
    interval_on(Duration::from_millis(10), Arc::clone(&ts))
        .take(3)
        .switch_map({
            let ts = Arc::clone(&ts);
            move |n| timer_on(Duration::from_millis(5), Arc::clone(&ts)).map(move |_| n)
        })
        .subscribe(observer.arc());

    scheduler.advance_time_by(Duration::from_millis(100));
    // every inner gets its 5ms of quiet before the next outer tick
    observer.assert_values(&[0, 1, 2]);
    observer.assert_completed();
}

#[test]
fn error_recovery_composes_with_retry() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempt_probe = Arc::clone(&attempts);

    let result = Observable::defer(move || {
        if attempt_probe.fetch_add(1, Ordering::SeqCst) < 2 {
            Observable::error(RivuletError::custom("transient"))
        } else {
            Observable::of(vec![1, 2, 3])
        }
    })
    .retry(5)
    .on_error_return(|_| -1)
    .to_list()
    .blocking_get()
    .unwrap();

    assert_eq!(result, vec![1, 2, 3]);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[test]
fn observable_to_flowable_to_stream_and_back() {
    // push source -> demand channel -> futures stream -> collected
    let flowable = Observable::range(0, 50).to_flowable(OverflowPolicy::Buffer);
    let subscriber = TestSubscriber::with_initial_request(u64::MAX);
    flowable.subscribe(subscriber.arc());

    assert_eq!(subscriber.value_count(), 50);
    subscriber.assert_completed();
}

#[test]
fn multi_threaded_pipeline_settles_deterministically() {
    let scheduler: Arc<dyn Scheduler> = Arc::new(NewThreadScheduler::new());
    let observer = TestObserver::new();

    Observable::range(1, 100)
        .subscribe_on(Arc::clone(&scheduler))
        .map(|n| n * 2)
        .observe_on(scheduler)
        .subscribe(observer.arc());

    assert!(observer.await_terminal(Duration::from_secs(5)));
    assert_eq!(observer.value_count(), 100);
    observer.assert_completed();
    let values = observer.values();
    assert_eq!(values.first(), Some(&2));
    assert_eq!(values.last(), Some(&200));
}

#[test]
fn behavior_subject_drives_combine_latest() {
    use rivulet_rx::Observer;
    let temperature = BehaviorSubject::with_default(20);
    let humidity = BehaviorSubject::with_default(50);
    let observer = TestObserver::new();

    combine_latest(
        &temperature.as_observable(),
        &humidity.as_observable(),
        |t: &i32, h: &i32| (*t, *h),
    )
    .subscribe(observer.arc());

    temperature.on_next(21);
    humidity.on_next(55);

    observer.assert_values(&[(20, 50), (21, 50), (21, 55)]);
}
