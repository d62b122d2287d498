// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Time-shifting operator.

use rivulet_core::{
    Cancellable, Notification, Observable, Observer, RivuletError, Scheduler, SwapCancellable,
    Worker,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing the `delay` operator.
pub trait DelayExt<T: Send + 'static> {
    /// Re-schedule every notification (values and the terminal) `delay`
    /// later on `scheduler`. Relative order is preserved: deliveries ride a
    /// single worker, which executes its tasks FIFO per deadline.
    fn delay(&self, delay: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T>;
}

impl<T: Send + 'static> DelayExt<T> for Observable<T> {
    fn delay(&self, delay: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let source = self.clone();
        let scheduler = Arc::clone(&scheduler);
        Observable::new(move |observer| {
            let worker = scheduler.create_worker();
            source.subscribe(Arc::new(DelayObserver {
                downstream: observer,
                worker,
                delay,
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }
}

struct DelayObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    worker: Arc<dyn Worker>,
    delay: Duration,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send + 'static> DelayObserver<T> {
    fn push_later(&self, notification: Notification<T>) {
        let downstream = Arc::clone(&self.downstream);
        self.worker.schedule_after(
            self.delay,
            Box::new(move || notification.dispatch(downstream.as_ref())),
        );
    }
}

impl<T: Send + 'static> Observer<T> for DelayObserver<T> {
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
            self.push_later(Notification::Next(value));
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.push_later(Notification::Error(error));
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.push_later(Notification::Complete);
        }
    }
}
