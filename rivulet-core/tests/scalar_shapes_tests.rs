// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rivulet_core::{Completable, Maybe, Observable, RivuletError, Single};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn single_just_succeeds_once() {
    let seen: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    Single::just(5).subscribe_all(
        move |value| sink.lock().push(value),
        |error| panic!("unexpected error: {error}"),
    );
    assert_eq!(*seen.lock(), vec![5]);
}

#[test]
fn single_map_transforms_and_flat_map_chains() {
    let result = Single::just(2)
        .map(|n| n * 3)
        .flat_map(|n| Single::just(n + 1))
        .blocking_get()
        .unwrap();
    assert_eq!(result, 7);
}

#[test]
fn single_map_panic_becomes_error() {
    let result = Single::just(2)
        .map(|_: i32| -> i32 { panic!("mapper failed") })
        .blocking_get();
    assert!(matches!(result, Err(RivuletError::Callback { .. })));
}

#[test]
fn single_from_observable_takes_first_value() {
    let result = Single::from_observable(&Observable::of(vec![9, 10, 11]))
        .blocking_get()
        .unwrap();
    assert_eq!(result, 9);
}

#[test]
fn single_from_empty_observable_fails_with_no_such_element() {
    let result = Single::from_observable(&Observable::<i32>::empty()).blocking_get();
    assert!(matches!(result, Err(RivuletError::NoSuchElement)));
}

#[test]
fn single_filter_rejection_becomes_empty_maybe() {
    let rejected = Single::just(3).filter(|n| *n > 10).blocking_get().unwrap();
    assert_eq!(rejected, None);

    let accepted = Single::just(30).filter(|n| *n > 10).blocking_get().unwrap();
    assert_eq!(accepted, Some(30));
}

#[test]
fn single_on_error_return_recovers() {
    let result = Single::<i32>::error(RivuletError::custom("boom"))
        .on_error_return(|_| -1)
        .blocking_get()
        .unwrap();
    assert_eq!(result, -1);
}

#[test]
fn maybe_to_single_raises_no_such_element_when_empty() {
    let result = Maybe::<i32>::empty().to_single().blocking_get();
    assert!(matches!(result, Err(RivuletError::NoSuchElement)));
}

#[test]
fn maybe_default_if_empty_substitutes() {
    let result = Maybe::<i32>::empty()
        .default_if_empty(99)
        .blocking_get()
        .unwrap();
    assert_eq!(result, 99);
}

#[test]
fn maybe_from_observable_completes_empty_on_empty_source() {
    let result = Maybe::from_observable(&Observable::<i32>::empty())
        .blocking_get()
        .unwrap();
    assert_eq!(result, None);
}

#[test]
fn maybe_filter_and_map_compose() {
    let result = Maybe::just(4)
        .filter(|n| n % 2 == 0)
        .map(|n| n * 10)
        .blocking_get()
        .unwrap();
    assert_eq!(result, Some(40));
}

#[test]
fn completable_and_then_runs_in_order() {
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&order);
    let second = Arc::clone(&order);

    let head = Completable::from_action(move || {
        first.lock().push("head");
        Ok(())
    });
    let tail = Completable::from_action(move || {
        second.lock().push("tail");
        Ok(())
    });

    head.and_then(tail).blocking_await().unwrap();
    assert_eq!(*order.lock(), vec!["head", "tail"]);
}

#[test]
fn completable_error_propagates_and_on_error_complete_swallows() {
    let failing = Completable::error(RivuletError::custom("boom"));
    assert!(failing.blocking_await().is_err());
    assert!(failing.on_error_complete().blocking_await().is_ok());
}

#[test]
fn completable_from_observable_ignores_elements() {
    let values_seen = Arc::new(AtomicUsize::new(0));
    let source = Observable::of(vec![1, 2, 3]);
    Completable::from_observable(&source).blocking_await().unwrap();
    assert_eq!(values_seen.load(Ordering::SeqCst), 0);
}

#[test]
fn lambda_observers_enforce_single_terminal() {
    // a raw source that double-terminates; the lambda layer must drop the
    // second terminal
    let completions = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let complete_count = Arc::clone(&completions);
    let error_count = Arc::clone(&errors);

    let rogue = Observable::<i32>::new(|observer| {
        observer.on_subscribe(rivulet_core::Cancellable::flag());
        observer.on_complete();
        observer.on_error(RivuletError::custom("late"));
        observer.on_complete();
    });

    rogue.subscribe_all(
        |_| {},
        move |_| {
            error_count.fetch_add(1, Ordering::SeqCst);
        },
        move || {
            complete_count.fetch_add(1, Ordering::SeqCst);
        },
    );

    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}
