// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{Observable, Observer, RivuletError, Scheduler};
use rivulet_operators::prelude::*;
use rivulet_schedulers::TestScheduler;
use rivulet_subjects::PublishSubject;
use rivulet_test_utils::TestObserver;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn flat_map_merges_inner_emissions() {
    let observer = TestObserver::new();
    Observable::of(vec![1, 2, 3])
        .flat_map(|n| Observable::of(vec![n * 10, n * 10 + 1]))
        .subscribe(observer.arc());

    // synchronous inners preserve outer order end-to-end
    observer.assert_values(&[10, 11, 20, 21, 30, 31]);
    observer.assert_completed();
}

#[test]
fn flat_map_completes_only_after_outer_and_all_inners() {
    // Arrange - keep one inner open past the outer completion
    let outer = PublishSubject::new();
    let inner = PublishSubject::new();
    let observer = TestObserver::new();

    let inner_for_map = inner.clone();
    outer
        .as_observable()
        .flat_map(move |_: i32| inner_for_map.as_observable())
        .subscribe(observer.arc());

    // Act
    outer.on_next(1);
    outer.on_complete();
    observer.assert_not_terminated();

    inner.on_next(7);
    inner.on_complete();

    // Assert
    observer.assert_values(&[7]);
    observer.assert_completed();
}

#[test]
fn flat_map_surfaces_exactly_one_error() {
    let observer = TestObserver::<i32>::new();
    Observable::of(vec![1, 2, 3])
        .flat_map(|_| Observable::<i32>::error(RivuletError::custom("inner boom")))
        .subscribe(observer.arc());

    observer.assert_error();
}

#[test]
fn concat_map_preserves_outer_order_end_to_end() {
    let observer = TestObserver::new();
    Observable::of(vec![1, 2, 3])
        .concat_map(|n| Observable::of(vec![n, n * 100]))
        .subscribe(observer.arc());

    observer.assert_values(&[1, 100, 2, 200, 3, 300]);
    observer.assert_completed();
}

#[test]
fn concat_map_subscribes_inners_strictly_sequentially() {
    // Arrange - the first inner stays open; the second must not start
    let first_inner = PublishSubject::new();
    let second_started = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let observer = TestObserver::new();

    let first_for_map = first_inner.clone();
    let started_probe = Arc::clone(&second_started);
    Observable::of(vec![1, 2])
        .concat_map(move |n| {
            if n == 1 {
                first_for_map.as_observable()
            } else {
                let started = Arc::clone(&started_probe);
                Observable::defer(move || {
                    started.store(true, std::sync::atomic::Ordering::SeqCst);
                    Observable::of(vec![99])
                })
            }
        })
        .subscribe(observer.arc());

    // Act & Assert
    assert!(!second_started.load(std::sync::atomic::Ordering::SeqCst));
    first_inner.on_next(10);
    first_inner.on_complete();
    assert!(second_started.load(std::sync::atomic::Ordering::SeqCst));

    observer.assert_values(&[10, 99]);
    observer.assert_completed();
}

#[test]
fn concat_map_completion_racing_new_values_is_not_lost() {
    // outer completes while the last inner is still open
    let outer = PublishSubject::new();
    let inner = PublishSubject::new();
    let observer = TestObserver::new();

    let inner_for_map = inner.clone();
    outer
        .as_observable()
        .concat_map(move |_: i32| inner_for_map.as_observable())
        .subscribe(observer.arc());

    outer.on_next(1);
    outer.on_complete();
    observer.assert_not_terminated();

    inner.on_next(5);
    inner.on_complete();
    observer.assert_values(&[5]);
    observer.assert_completed();
}

#[test]
fn switch_map_cancels_the_previous_inner() {
    let outer = PublishSubject::new();
    let first_inner = PublishSubject::new();
    let second_inner = PublishSubject::new();
    let observer = TestObserver::new();

    let first = first_inner.clone();
    let second = second_inner.clone();
    outer
        .as_observable()
        .switch_map(move |n: i32| {
            if n == 1 {
                first.as_observable()
            } else {
                second.as_observable()
            }
        })
        .subscribe(observer.arc());

    outer.on_next(1);
    first_inner.on_next(10);
    outer.on_next(2);
    // a stale inner may not deliver anymore
    first_inner.on_next(11);
    second_inner.on_next(20);

    observer.assert_values(&[10, 20]);
}

#[test]
fn switch_map_completes_with_outer_and_latest_inner() {
    let outer = PublishSubject::new();
    let inner = PublishSubject::new();
    let observer = TestObserver::new();

    let inner_for_map = inner.clone();
    outer
        .as_observable()
        .switch_map(move |_: i32| inner_for_map.as_observable())
        .subscribe(observer.arc());

    outer.on_next(1);
    outer.on_complete();
    observer.assert_not_terminated();

    inner.on_next(1);
    inner.on_complete();
    observer.assert_completed();
}

#[test]
fn switch_map_under_virtual_time_keeps_only_the_last_inner() {
    // outer emits 1@t0, 2@t10, 3@t20; inner(x) emits x*10 at +15.
    // After advancing 50 the only survivor is inner(3), firing at t35.
    let scheduler = Arc::new(TestScheduler::new());
    let ts: Arc<dyn Scheduler> = Arc::clone(&scheduler) as Arc<dyn Scheduler>;

    let outer = merge(vec![
        timer_on(Duration::from_millis(0), Arc::clone(&ts)).map(|_| 1u64),
        timer_on(Duration::from_millis(10), Arc::clone(&ts)).map(|_| 2u64),
        timer_on(Duration::from_millis(20), Arc::clone(&ts)).map(|_| 3u64),
    ]);

    let inner_ts = Arc::clone(&ts);
    let observer = TestObserver::new();
    outer
        .switch_map(move |x| {
            timer_on(Duration::from_millis(15), Arc::clone(&inner_ts)).map(move |_| x * 10)
        })
        .subscribe(observer.arc());

    scheduler.advance_time_by(Duration::from_millis(50));

    observer.assert_values(&[30]);
    observer.assert_completed();
}
