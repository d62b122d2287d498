// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Downstream thread hand-off.

use rivulet_core::{
    Cancellable, Notification, Observable, Observer, RivuletError, Scheduler, SwapCancellable,
    Worker,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing the `observe_on` operator.
pub trait ObserveOnExt<T: Send + 'static> {
    /// Deliver every downstream notification on a worker of `scheduler`.
    ///
    /// The worker executes its tasks sequentially in submission order, so
    /// per-subscription ordering and serialization are preserved across the
    /// thread hand-off.
    fn observe_on(&self, scheduler: Arc<dyn Scheduler>) -> Observable<T>;
}

impl<T: Send + 'static> ObserveOnExt<T> for Observable<T> {
    fn observe_on(&self, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let source = self.clone();
        let scheduler = Arc::clone(&scheduler);
        Observable::new(move |observer| {
            let worker = scheduler.create_worker();
            source.subscribe(Arc::new(ObserveOnObserver {
                downstream: observer,
                worker,
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }
}

struct ObserveOnObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    worker: Arc<dyn Worker>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send + 'static> ObserveOnObserver<T> {
    fn hand_off(&self, notification: Notification<T>) {
        let downstream = Arc::clone(&self.downstream);
        self.worker.schedule_after(
            Duration::ZERO,
            Box::new(move || notification.dispatch(downstream.as_ref())),
        );
    }
}

impl<T: Send + 'static> Observer<T> for ObserveOnObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        let upstream = self.upstream.clone();
        let worker = Arc::clone(&self.worker);
        self.downstream.on_subscribe(Cancellable::from_action(move || {
            upstream.cancel();
            worker.cancel();
        }));
    }

    fn on_next(&self, value: T) {
        if !self.done.load(Ordering::Acquire) {
            self.hand_off(Notification::Next(value));
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.hand_off(Notification::Error(error));
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.hand_off(Notification::Complete);
        }
    }
}
