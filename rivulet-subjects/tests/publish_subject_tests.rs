// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{Observer, RivuletError};
use rivulet_subjects::PublishSubject;
use rivulet_test_utils::TestObserver;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn subscribers_see_only_values_emitted_after_subscription() {
    // Arrange
    let subject = PublishSubject::new();
    let early = TestObserver::new();
    subject.subscribe(early.arc());

    // Act
    subject.on_next(1);
    let late = TestObserver::new();
    subject.subscribe(late.arc());
    subject.on_next(2);

    // Assert
    early.assert_values(&[1, 2]);
    late.assert_values(&[2]);
}

#[test]
fn terminal_fans_out_and_freezes_the_subject() {
    let subject = PublishSubject::new();
    let observer = TestObserver::new();
    subject.subscribe(observer.arc());

    subject.on_next(1);
    subject.on_complete();
    subject.on_next(2);
    subject.on_complete();

    observer.assert_values(&[1]);
    observer.assert_completed();
    assert!(subject.is_terminated());
}

#[test]
fn late_subscriber_receives_recorded_terminal() {
    let subject = PublishSubject::<i32>::new();
    subject.on_error(RivuletError::custom("boom"));

    let late = TestObserver::new();
    subject.subscribe(late.arc());
    late.assert_error();
    assert_eq!(late.value_count(), 0);
}

#[test]
fn cancelled_entry_stops_receiving_and_leaves_the_registry() {
    let subject = PublishSubject::new();
    let observer = TestObserver::new();
    subject.subscribe(observer.arc());
    assert_eq!(subject.observer_count(), 1);

    subject.on_next(1);
    observer.cancel();
    subject.on_next(2);

    observer.assert_values(&[1]);
    assert_eq!(subject.observer_count(), 0);
}

#[test]
fn fan_out_reaches_every_registered_observer() {
    let subject = PublishSubject::new();
    let observers: Vec<TestObserver<i32>> = (0..5).map(|_| TestObserver::new()).collect();
    for observer in &observers {
        subject.subscribe(observer.arc());
    }

    subject.on_next(7);
    subject.on_complete();

    for observer in &observers {
        observer.assert_values(&[7]);
        observer.assert_completed();
    }
}

#[test]
fn concurrent_emission_and_subscription_preserve_the_protocol() {
    // Arrange - one writer thread, many racing subscribers
    let subject = PublishSubject::new();
    let writer_subject = subject.clone();
    let writer = std::thread::spawn(move || {
        for value in 0..500u32 {
            writer_subject.on_next(value);
        }
        writer_subject.on_complete();
    });

    let subscribers: Vec<TestObserver<u32>> = (0..4).map(|_| TestObserver::new()).collect();
    let handles: Vec<_> = subscribers
        .iter()
        .map(|observer| {
            let subject = subject.clone();
            let observer = observer.clone();
            std::thread::spawn(move || subject.subscribe(observer.arc()))
        })
        .collect();

    // Act
    for handle in handles {
        handle.join().expect("subscriber thread");
    }
    writer.join().expect("writer thread");

    // Assert - whatever each subscriber saw is an in-order suffix-free run
    for observer in &subscribers {
        assert!(observer.await_terminal(Duration::from_secs(5)));
        let values = observer.values();
        for pair in values.windows(2) {
            assert!(pair[0] < pair[1], "out-of-order delivery: {values:?}");
        }
        observer.assert_completed();
    }
}

#[test]
fn as_observable_supports_operator_chaining() {
    let subject = PublishSubject::new();
    let observer = TestObserver::new();
    subject.as_observable().subscribe(observer.arc());

    subject.on_next(3);
    subject.on_complete();
    observer.assert_values(&[3]);
    observer.assert_completed();
}

#[test]
fn subject_acts_as_observer_of_an_upstream_source() {
    let subject = PublishSubject::new();
    let observer = TestObserver::new();
    subject.subscribe(observer.arc());

    rivulet_core::Observable::of(vec![1, 2, 3]).subscribe(Arc::new(subject.clone()));

    observer.assert_values(&[1, 2, 3]);
    observer.assert_completed();
}
