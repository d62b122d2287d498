// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{Observer, RivuletError};
use rivulet_subjects::AsyncSubject;
use rivulet_test_utils::TestObserver;

#[test]
fn no_value_is_delivered_before_completion() {
    // Arrange
    let subject = AsyncSubject::new();
    let observer = TestObserver::new();
    subject.subscribe(observer.arc());

    // Act
    subject.on_next(1);
    subject.on_next(2);

    // Assert
    assert_eq!(observer.value_count(), 0);
    observer.assert_not_terminated();
}

#[test]
fn completion_delivers_the_last_stored_value() {
    let subject = AsyncSubject::new();
    let observer = TestObserver::new();
    subject.subscribe(observer.arc());

    subject.on_next(1);
    subject.on_next(2);
    subject.on_next(3);
    subject.on_complete();

    observer.assert_values(&[3]);
    observer.assert_completed();
}

#[test]
fn completion_without_values_is_just_completion() {
    let subject = AsyncSubject::<i32>::new();
    let observer = TestObserver::new();
    subject.subscribe(observer.arc());

    subject.on_complete();

    assert_eq!(observer.value_count(), 0);
    observer.assert_completed();
}

#[test]
fn late_subscriber_after_completion_receives_value_then_completion() {
    let subject = AsyncSubject::new();
    subject.on_next(41);
    subject.on_next(42);
    subject.on_complete();

    let late = TestObserver::new();
    subject.subscribe(late.arc());
    late.assert_values(&[42]);
    late.assert_completed();
}

#[test]
fn error_discards_the_stored_value() {
    let subject = AsyncSubject::new();
    let observer = TestObserver::new();
    subject.subscribe(observer.arc());

    subject.on_next(1);
    subject.on_error(RivuletError::custom("boom"));

    assert_eq!(observer.value_count(), 0);
    observer.assert_error();

    let late = TestObserver::<i32>::new();
    subject.subscribe(late.arc());
    assert_eq!(late.value_count(), 0);
    late.assert_error();
}

#[test]
fn values_after_terminal_are_ignored() {
    let subject = AsyncSubject::new();
    subject.on_next(1);
    subject.on_complete();
    subject.on_next(99);

    let late = TestObserver::new();
    subject.subscribe(late.arc());
    late.assert_values(&[1]);
}
