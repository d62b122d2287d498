// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Upstream thread hand-off.

use rivulet_core::{Cancellable, CompositeCancellable, Observable, Observer, RivuletError, Scheduler};
use std::sync::Arc;

/// Extension trait providing the `subscribe_on` operator.
pub trait SubscribeOnExt<T: Send + 'static> {
    /// Run the upstream subscription (the source's recipe) on `scheduler`.
    ///
    /// Downstream receives its cancellation handle immediately; cancelling
    /// before the scheduled subscription ran simply drops it.
    fn subscribe_on(&self, scheduler: Arc<dyn Scheduler>) -> Observable<T>;
}

impl<T: Send + 'static> SubscribeOnExt<T> for Observable<T> {
    fn subscribe_on(&self, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let source = self.clone();
        let scheduler = Arc::clone(&scheduler);
        Observable::new(move |observer| {
            let subscriptions = CompositeCancellable::new();
            observer.on_subscribe(subscriptions.as_cancellable());

            let task_source = source.clone();
            let task_subscriptions = subscriptions.clone();
            let task = scheduler.schedule(Box::new(move || {
                task_source.subscribe(Arc::new(SubscribeOnObserver {
                    downstream: observer,
                    subscriptions: task_subscriptions,
                }));
            }));
            subscriptions.add(task);
        })
    }
}

struct SubscribeOnObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    subscriptions: CompositeCancellable,
}

impl<T: Send> Observer<T> for SubscribeOnObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        // downstream already holds the composite; just route the real
        // upstream into it
        self.subscriptions.add(cancellable);
    }

    fn on_next(&self, value: T) {
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}
