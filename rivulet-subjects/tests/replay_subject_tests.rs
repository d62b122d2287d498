// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{Observer, RivuletError};
use rivulet_subjects::ReplaySubject;
use rivulet_test_utils::TestObserver;

#[test]
fn unbounded_replay_delivers_full_history_in_order() {
    // Arrange
    let subject = ReplaySubject::new();
    subject.on_next('a');
    subject.on_next('b');
    subject.on_next('c');

    // Act
    let observer = TestObserver::new();
    subject.subscribe(observer.arc());
    subject.on_next('d');

    // Assert
    observer.assert_values(&['a', 'b', 'c', 'd']);
}

#[test]
fn bounded_replay_keeps_only_the_last_n() {
    // Arrange - capacity 2, emit A B C
    let subject = ReplaySubject::with_capacity(2);
    subject.on_next("A");
    subject.on_next("B");
    subject.on_next("C");

    // Act
    let observer = TestObserver::new();
    subject.subscribe(observer.arc());

    // Assert - only the surviving suffix
    observer.assert_values(&["B", "C"]);

    // live tail keeps flowing
    subject.on_next("D");
    observer.assert_values(&["B", "C", "D"]);

    subject.on_complete();
    observer.assert_completed();
}

#[test]
fn late_subscriber_after_completion_gets_buffer_then_terminal() {
    let subject = ReplaySubject::new();
    subject.on_next(1);
    subject.on_next(2);
    subject.on_complete();

    let late = TestObserver::new();
    subject.subscribe(late.arc());
    late.assert_values(&[1, 2]);
    late.assert_completed();
}

#[test]
fn late_subscriber_after_error_gets_surviving_buffer_then_error() {
    let subject = ReplaySubject::with_capacity(1);
    subject.on_next(1);
    subject.on_next(2);
    subject.on_error(RivuletError::custom("boom"));

    let late = TestObserver::new();
    subject.subscribe(late.arc());
    late.assert_values(&[2]);
    late.assert_error();
}

#[test]
fn eviction_never_grows_past_capacity() {
    let subject = ReplaySubject::with_capacity(3);
    for value in 0..100 {
        subject.on_next(value);
    }

    let observer = TestObserver::new();
    subject.subscribe(observer.arc());
    observer.assert_values(&[97, 98, 99]);
}

#[test]
fn two_subscribers_at_different_times_replay_independently() {
    let subject = ReplaySubject::new();
    subject.on_next(1);

    let first = TestObserver::new();
    subject.subscribe(first.arc());
    subject.on_next(2);

    let second = TestObserver::new();
    subject.subscribe(second.arc());
    subject.on_next(3);

    first.assert_values(&[1, 2, 3]);
    second.assert_values(&[1, 2, 3]);
}

#[test]
fn concurrent_emissions_reach_subscribers_in_buffer_order() {
    let subject = ReplaySubject::new();
    let observer = TestObserver::new();
    subject.subscribe(observer.arc());

    let writers: Vec<_> = (0..4)
        .map(|worker| {
            let subject = subject.clone();
            std::thread::spawn(move || {
                for step in 0..100u32 {
                    subject.on_next(worker * 1000 + step);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer thread");
    }
    subject.on_complete();

    assert!(observer.await_terminal(std::time::Duration::from_secs(5)));
    // delivery must match buffer order exactly for every subscriber
    let late = TestObserver::new();
    subject.subscribe(late.arc());
    assert_eq!(late.values(), observer.values());
    assert_eq!(observer.value_count(), 400);
}
