// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::Observable;
use rivulet_operators::prelude::*;
use rivulet_test_utils::TestObserver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A cold source counting how many times its recipe ran.
fn counted_source(runs: &Arc<AtomicUsize>) -> Observable<i32> {
    let runs = Arc::clone(runs);
    Observable::defer(move || {
        runs.fetch_add(1, Ordering::SeqCst);
        Observable::of(vec![1, 2, 3])
    })
}

#[test]
fn connectable_stays_cold_until_connect() {
    // Arrange
    let runs = Arc::new(AtomicUsize::new(0));
    let connectable = counted_source(&runs).publish();
    let observer = TestObserver::new();

    // Act - subscribing alone must not start the source
    connectable.subscribe(observer.arc());
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(observer.value_count(), 0);

    connectable.connect();

    // Assert
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    observer.assert_values(&[1, 2, 3]);
    observer.assert_completed();
}

#[test]
fn one_connection_fans_out_to_every_subscriber() {
    let runs = Arc::new(AtomicUsize::new(0));
    let connectable = counted_source(&runs).publish();
    let first = TestObserver::new();
    let second = TestObserver::new();

    connectable.subscribe(first.arc());
    connectable.subscribe(second.arc());
    connectable.connect();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    first.assert_values(&[1, 2, 3]);
    second.assert_values(&[1, 2, 3]);
}

#[test]
fn subscribers_arriving_after_a_publish_run_miss_its_values() {
    let runs = Arc::new(AtomicUsize::new(0));
    let connectable = counted_source(&runs).publish();
    connectable.connect();

    let late = TestObserver::new();
    connectable.subscribe(late.arc());
    assert_eq!(late.value_count(), 0);
}

#[test]
fn replay_connectable_hands_history_to_late_subscribers() {
    let runs = Arc::new(AtomicUsize::new(0));
    let connectable = counted_source(&runs).replay();
    connectable.connect();

    let late = TestObserver::new();
    connectable.subscribe(late.arc());
    late.assert_values(&[1, 2, 3]);
    late.assert_completed();
}

#[test]
fn bounded_replay_connectable_hands_out_the_suffix() {
    let runs = Arc::new(AtomicUsize::new(0));
    let connectable = counted_source(&runs).replay_with_capacity(2);
    connectable.connect();

    let late = TestObserver::new();
    connectable.subscribe(late.arc());
    late.assert_values(&[2, 3]);
}

#[test]
fn ref_count_connects_on_first_subscriber() {
    let runs = Arc::new(AtomicUsize::new(0));
    let shared = counted_source(&runs).publish().ref_count();

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    let observer = TestObserver::new();
    shared.subscribe(observer.arc());

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    observer.assert_values(&[1, 2, 3]);
    observer.assert_completed();
}

#[test]
fn ref_count_reconnects_after_full_disconnect() {
    // Arrange - a source that never terminates on its own, so disconnect is
    // driven purely by the subscriber count
    let runs = Arc::new(AtomicUsize::new(0));
    let source = {
        let runs = Arc::clone(&runs);
        Observable::create(move |emitter: rivulet_core::Emitter<i32>| {
            runs.fetch_add(1, Ordering::SeqCst);
            emitter.next(1);
            // stays open; cancellation tears it down
        })
    };
    let shared = source.publish().ref_count();

    // Act - first generation of subscribers
    let first = TestObserver::new();
    shared.subscribe(first.arc());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    first.assert_values(&[1]);

    first.cancel();

    // second generation triggers a fresh connection
    let second = TestObserver::new();
    shared.subscribe(second.arc());
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    second.assert_values(&[1]);
}

#[test]
fn share_multicasts_between_concurrent_subscribers() {
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_probe = Arc::clone(&runs);
    let subject = rivulet_subjects::PublishSubject::new();
    let upstream = subject.clone();

    let source = Observable::defer(move || {
        runs_probe.fetch_add(1, Ordering::SeqCst);
        upstream.as_observable()
    });
    let shared = source.share();

    let first = TestObserver::new();
    let second = TestObserver::new();
    shared.subscribe(first.arc());
    shared.subscribe(second.arc());

    use rivulet_core::Observer;
    subject.on_next(5);

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    first.assert_values(&[5]);
    second.assert_values(&[5]);
}
