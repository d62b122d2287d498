// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{Observable, RivuletError};
use rivulet_operators::prelude::*;
use rivulet_test_utils::TestObserver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A source failing for the first `failures` subscriptions, then emitting
/// `values`.
fn flaky(failures: u64, values: Vec<i32>) -> Observable<i32> {
    let attempts = Arc::new(AtomicU64::new(0));
    Observable::defer(move || {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < failures {
            Observable::error(RivuletError::custom(format!("attempt {attempt} failed")))
        } else {
            Observable::of(values.clone())
        }
    })
}

#[test]
fn on_error_return_substitutes_a_final_value() {
    let observer = TestObserver::new();
    Observable::of(vec![1, 2])
        .concat_with(&Observable::error(RivuletError::custom("boom")))
        .on_error_return(|_| -1)
        .subscribe(observer.arc());

    observer.assert_values(&[1, 2, -1]);
    observer.assert_completed();
}

#[test]
fn on_error_resume_next_switches_to_the_fallback() {
    let observer = TestObserver::new();
    Observable::of(vec![1])
        .concat_with(&Observable::error(RivuletError::custom("boom")))
        .on_error_resume_next(|_| Observable::of(vec![8, 9]))
        .subscribe(observer.arc());

    observer.assert_values(&[1, 8, 9]);
    observer.assert_completed();
}

#[test]
fn on_error_complete_swallows_the_failure() {
    let observer = TestObserver::new();
    Observable::of(vec![1])
        .concat_with(&Observable::error(RivuletError::custom("boom")))
        .on_error_complete()
        .subscribe(observer.arc());

    observer.assert_values(&[1]);
    observer.assert_completed();
}

#[test]
fn retry_recovers_within_budget() {
    // fails twice, succeeds on the third subscription; retry(3) sees [42]
    let observer = TestObserver::new();
    flaky(2, vec![42]).retry(3).subscribe(observer.arc());

    observer.assert_values(&[42]);
    observer.assert_completed();
}

#[test]
fn retry_forwards_the_error_once_the_budget_is_spent() {
    let observer = TestObserver::new();
    flaky(2, vec![42]).retry(1).subscribe(observer.arc());

    assert_eq!(observer.value_count(), 0);
    observer.assert_error();
}

#[test]
fn retry_zero_is_a_plain_passthrough() {
    let observer = TestObserver::new();
    flaky(1, vec![42]).retry(0).subscribe(observer.arc());
    observer.assert_error();
}

#[test]
fn retry_handles_deep_synchronous_failure_storms() {
    // a thousand immediate failures must not overflow the stack
    let observer = TestObserver::new();
    flaky(1000, vec![7]).retry(1000).subscribe(observer.arc());
    observer.assert_values(&[7]);
    observer.assert_completed();
}

#[test]
fn values_before_the_error_are_replayed_per_attempt() {
    // first attempt: 1 then error; second attempt: 1, 2, complete
    let attempts = Arc::new(AtomicU64::new(0));
    let source = Observable::defer(move || {
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            Observable::of(vec![1]).concat_with(&Observable::error(RivuletError::custom("flake")))
        } else {
            Observable::of(vec![1, 2])
        }
    });

    let observer = TestObserver::new();
    source.retry(1).subscribe(observer.arc());
    observer.assert_values(&[1, 1, 2]);
    observer.assert_completed();
}

#[test]
fn retry_when_resubscribes_per_handler_signal() {
    let observer = TestObserver::new();
    flaky(2, vec![5])
        .retry_when(|errors| errors.take(5))
        .subscribe(observer.arc());

    observer.assert_values(&[5]);
    observer.assert_completed();
}

#[test]
fn retry_when_completion_of_the_handler_completes_the_stream() {
    let observer = TestObserver::new();
    flaky(10, vec![5])
        .retry_when(|errors| errors.take(2))
        .subscribe(observer.arc());

    // two resubscriptions happen, the third error completes the handler
    assert_eq!(observer.value_count(), 0);
    observer.assert_completed();
}

#[test]
fn retry_when_error_from_the_handler_is_forwarded() {
    let observer = TestObserver::<i32>::new();
    flaky(10, vec![5])
        .retry_when(|errors| {
            errors.flat_map(|_| Observable::<RivuletError>::error(RivuletError::custom("give up")))
        })
        .subscribe(observer.arc());

    observer.assert_error();
}
