// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{Cancellable, Emitter, Observable, Observer, RivuletError};
use rivulet_test_utils::TestObserver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn of_replays_values_then_completes() {
    // Arrange
    let observer = TestObserver::new();

    // Act
    Observable::of(vec![1, 2, 3]).subscribe(observer.arc());

    // Assert
    observer.assert_values(&[1, 2, 3]);
    observer.assert_completed();
}

#[test]
fn every_subscription_reruns_the_recipe() {
    // Arrange
    let source = Observable::of(vec![7, 8]);
    let first = TestObserver::new();
    let second = TestObserver::new();

    // Act
    source.subscribe(first.arc());
    source.subscribe(second.arc());

    // Assert - both subscribers see the complete, independent pass
    first.assert_values(&[7, 8]);
    second.assert_values(&[7, 8]);
}

#[test]
fn on_subscribe_arrives_strictly_first() {
    // Arrange
    struct OrderProbe {
        subscribed_before_value: Arc<AtomicUsize>,
    }

    impl Observer<i32> for OrderProbe {
        fn on_subscribe(&self, _cancellable: Cancellable) {
            self.subscribed_before_value.store(1, Ordering::SeqCst);
        }

        fn on_next(&self, _value: i32) {
            assert_eq!(
                self.subscribed_before_value.load(Ordering::SeqCst),
                1,
                "value delivered before on_subscribe"
            );
        }

        fn on_error(&self, _error: RivuletError) {}

        fn on_complete(&self) {
            assert_eq!(self.subscribed_before_value.load(Ordering::SeqCst), 1);
        }
    }

    // Act & Assert (inside the probe)
    Observable::of(vec![1]).subscribe(Arc::new(OrderProbe {
        subscribed_before_value: Arc::new(AtomicUsize::new(0)),
    }));
}

#[test]
fn range_emits_the_arithmetic_sequence() {
    let observer = TestObserver::new();
    Observable::range(5, 4).subscribe(observer.arc());
    observer.assert_values(&[5, 6, 7, 8]);
    observer.assert_completed();
}

#[test]
fn empty_completes_without_values() {
    let observer = TestObserver::<i32>::new();
    Observable::empty().subscribe(observer.arc());
    assert_eq!(observer.value_count(), 0);
    observer.assert_completed();
}

#[test]
fn never_stays_silent() {
    let observer = TestObserver::<i32>::new();
    Observable::never().subscribe(observer.arc());
    assert_eq!(observer.value_count(), 0);
    observer.assert_not_terminated();
}

#[test]
fn error_terminates_immediately() {
    let observer = TestObserver::<i32>::new();
    Observable::error(RivuletError::custom("boom")).subscribe(observer.arc());
    let error = observer.assert_error();
    assert!(matches!(error, RivuletError::Custom { .. }));
}

#[test]
fn from_callable_emits_result_then_completes() {
    let observer = TestObserver::new();
    Observable::from_callable(|| Ok(41 + 1)).subscribe(observer.arc());
    observer.assert_values(&[42]);
    observer.assert_completed();
}

#[test]
fn from_callable_routes_panics_to_on_error() {
    let observer = TestObserver::<i32>::new();
    Observable::from_callable(|| panic!("supplier failed")).subscribe(observer.arc());
    let error = observer.assert_error();
    assert!(error.is_callback());
}

#[test]
fn defer_builds_a_fresh_upstream_per_subscription() {
    // Arrange
    let invocations = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&invocations);
    let source = Observable::defer(move || {
        let run = counted.fetch_add(1, Ordering::SeqCst);
        Observable::of(vec![run])
    });

    // Act
    let first = TestObserver::new();
    let second = TestObserver::new();
    source.subscribe(first.arc());
    source.subscribe(second.arc());

    // Assert
    first.assert_values(&[0]);
    second.assert_values(&[1]);
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[test]
fn cancelled_subscription_stops_synchronous_emission() {
    // Arrange - cancel from inside the first on_next
    let seen = Arc::new(AtomicUsize::new(0));

    struct CancelAfterFirst {
        seen: Arc<AtomicUsize>,
        subscription: parking_lot::Mutex<Option<Cancellable>>,
    }

    impl Observer<i32> for CancelAfterFirst {
        fn on_subscribe(&self, cancellable: Cancellable) {
            *self.subscription.lock() = Some(cancellable);
        }

        fn on_next(&self, _value: i32) {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if let Some(subscription) = &*self.subscription.lock() {
                subscription.cancel();
            }
        }

        fn on_error(&self, _error: RivuletError) {
            panic!("unexpected error");
        }

        fn on_complete(&self) {
            panic!("completion after cancellation");
        }
    }

    // Act
    Observable::of(vec![1, 2, 3, 4]).subscribe(Arc::new(CancelAfterFirst {
        seen: Arc::clone(&seen),
        subscription: parking_lot::Mutex::new(None),
    }));

    // Assert - emission loop observed the cancel
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn create_emitter_enforces_single_terminal() {
    // Arrange - a misbehaving emitter delivering after completion
    let observer = TestObserver::new();

    // Act
    Observable::create(|emitter: Emitter<i32>| {
        emitter.next(1);
        emitter.complete();
        emitter.next(2);
        emitter.error(RivuletError::custom("late"));
        emitter.complete();
    })
    .subscribe(observer.arc());

    // Assert
    observer.assert_values(&[1]);
    observer.assert_completed();
}

#[test]
fn create_routes_emitter_panics_to_on_error() {
    let observer = TestObserver::<i32>::new();
    Observable::create(|_emitter: Emitter<i32>| panic!("producer blew up")).subscribe(observer.arc());
    let error = observer.assert_error();
    assert!(error.is_callback());
}

#[test]
fn create_set_cancellable_releases_resource_on_cancel() {
    // Arrange
    let released = Arc::new(AtomicUsize::new(0));
    let observer = TestObserver::<i32>::new();
    let resource = Arc::clone(&released);

    // Act
    Observable::create(move |emitter: Emitter<i32>| {
        let released = Arc::clone(&resource);
        emitter.set_cancellable(Cancellable::from_action(move || {
            released.fetch_add(1, Ordering::SeqCst);
        }));
    })
    .subscribe(observer.arc());
    observer.cancel();
    observer.cancel();

    // Assert - idempotent release
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn subscribe_all_routes_each_notification_kind() {
    // Arrange
    let nexts = Arc::new(AtomicUsize::new(0));
    let completes = Arc::new(AtomicUsize::new(0));
    let next_count = Arc::clone(&nexts);
    let complete_count = Arc::clone(&completes);

    // Act
    Observable::of(vec![1, 2]).subscribe_all(
        move |_| {
            next_count.fetch_add(1, Ordering::SeqCst);
        },
        |error| panic!("unexpected error: {error}"),
        move || {
            complete_count.fetch_add(1, Ordering::SeqCst);
        },
    );

    // Assert
    assert_eq!(nexts.load(Ordering::SeqCst), 2);
    assert_eq!(completes.load(Ordering::SeqCst), 1);
}
