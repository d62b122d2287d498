// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Resubscription on failure.
//!
//! Resubscription never recurses: a failed attempt requests the next one
//! through a work-in-progress counter, so synchronous failure storms
//! (`error(..).retry(1000)`) unwind as a loop.

use rivulet_core::{
    Cancellable, Observable, Observer, RivuletError, SerializedObserver, SwapCancellable,
};
use rivulet_subjects::PublishSubject;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Extension trait providing the retry operators.
pub trait RetryExt<T: Send + 'static> {
    /// On error, resubscribe the upstream up to `attempts` times; once the
    /// budget is exhausted the last error is forwarded.
    fn retry(&self, attempts: u64) -> Observable<T>;

    /// Pipe upstream errors through `handler`: each value the handler's
    /// output emits triggers a resubscription, its completion completes the
    /// stream, its error is forwarded.
    fn retry_when<U: Send + 'static>(
        &self,
        handler: impl Fn(Observable<RivuletError>) -> Observable<U> + Send + Sync + 'static,
    ) -> Observable<T>;
}

impl<T: Send + 'static> RetryExt<T> for Observable<T> {
    fn retry(&self, attempts: u64) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |observer| {
            let coordinator = Arc::new(RetryCoordinator {
                source: source.clone(),
                downstream: observer,
                remaining: AtomicU64::new(attempts),
                upstream: SwapCancellable::new(),
                wip: AtomicUsize::new(0),
                done: AtomicBool::new(false),
            });
            coordinator
                .downstream
                .on_subscribe(coordinator.upstream.as_cancellable());
            RetryCoordinator::resubscribe(&coordinator);
        })
    }

    fn retry_when<U: Send + 'static>(
        &self,
        handler: impl Fn(Observable<RivuletError>) -> Observable<U> + Send + Sync + 'static,
    ) -> Observable<T> {
        let source = self.clone();
        let handler: Arc<dyn Fn(Observable<RivuletError>) -> Observable<U> + Send + Sync> =
            Arc::new(handler);
        Observable::new(move |observer| {
            let errors = PublishSubject::<RivuletError>::new();
            let state = Arc::new(RetryWhenState {
                source: source.clone(),
                downstream: Arc::new(SerializedObserver::new(observer)),
                errors: errors.clone(),
                upstream: SwapCancellable::new(),
                signals: SwapCancellable::new(),
                wip: AtomicUsize::new(0),
                resubscribe_requested: AtomicBool::new(false),
                done: AtomicBool::new(false),
            });

            let subscription = {
                let cancel_state = Arc::clone(&state);
                Cancellable::from_action(move || {
                    cancel_state.upstream.cancel();
                    cancel_state.signals.cancel();
                })
            };
            state.downstream.on_subscribe(subscription);

            // handler output drives resubscription
            let signal_source = match rivulet_core::guarded("retry_when handler", || {
                (handler)(errors.as_observable())
            }) {
                Ok(signal_source) => signal_source,
                Err(error) => {
                    state.done.store(true, Ordering::Release);
                    state.downstream.on_error(error);
                    return;
                }
            };
            signal_source.subscribe(Arc::new(RetrySignalObserver {
                state: Arc::clone(&state),
                _marker: std::marker::PhantomData,
            }));

            RetryWhenState::resubscribe(&state);
        })
    }
}

struct RetryCoordinator<T> {
    source: Observable<T>,
    downstream: Arc<dyn Observer<T>>,
    remaining: AtomicU64,
    upstream: SwapCancellable,
    wip: AtomicUsize,
    done: AtomicBool,
}

impl<T: Send + 'static> RetryCoordinator<T> {
    fn resubscribe(this: &Arc<Self>) {
        if this.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        let mut missed = 1usize;
        loop {
            if this.upstream.is_cancelled() || this.done.load(Ordering::Acquire) {
                return;
            }
            this.source.subscribe(Arc::new(RetryAttemptObserver {
                coordinator: Arc::clone(this),
            }));
            missed = this.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if missed == 0 {
                return;
            }
        }
    }
}

struct RetryAttemptObserver<T> {
    coordinator: Arc<RetryCoordinator<T>>,
}

impl<T: Send + 'static> Observer<T> for RetryAttemptObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.coordinator.upstream.replace(cancellable);
    }

    fn on_next(&self, value: T) {
        if !self.coordinator.done.load(Ordering::Acquire) {
            self.coordinator.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if self.coordinator.done.load(Ordering::Acquire) {
            return;
        }
        let budget = self.coordinator.remaining.load(Ordering::Acquire);
        if budget == 0 {
            if !self.coordinator.done.swap(true, Ordering::AcqRel) {
                self.coordinator.downstream.on_error(error);
            }
            return;
        }
        self.coordinator.remaining.store(budget - 1, Ordering::Release);
        RetryCoordinator::resubscribe(&self.coordinator);
    }

    fn on_complete(&self) {
        if !self.coordinator.done.swap(true, Ordering::AcqRel) {
            self.coordinator.downstream.on_complete();
        }
    }
}

struct RetryWhenState<T> {
    source: Observable<T>,
    downstream: Arc<SerializedObserver<T>>,
    errors: PublishSubject<RivuletError>,
    upstream: SwapCancellable,
    signals: SwapCancellable,
    wip: AtomicUsize,
    resubscribe_requested: AtomicBool,
    done: AtomicBool,
}

impl<T: Send + 'static> RetryWhenState<T> {
    /// Drain resubscription requests one attempt at a time.
    fn resubscribe(this: &Arc<Self>) {
        this.resubscribe_requested.store(true, Ordering::Release);
        if this.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        let mut missed = 1usize;
        loop {
            if !this.upstream.is_cancelled()
                && !this.done.load(Ordering::Acquire)
                && this.resubscribe_requested.swap(false, Ordering::AcqRel)
            {
                this.source.subscribe(Arc::new(RetryWhenAttemptObserver {
                    state: Arc::clone(this),
                }));
            }
            missed = this.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if missed == 0 {
                return;
            }
        }
    }
}

struct RetryWhenAttemptObserver<T> {
    state: Arc<RetryWhenState<T>>,
}

impl<T: Send + 'static> Observer<T> for RetryWhenAttemptObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.upstream.replace(cancellable);
    }

    fn on_next(&self, value: T) {
        if !self.state.done.load(Ordering::Acquire) {
            self.state.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.state.done.load(Ordering::Acquire) {
            // hand the failure to the handler; it decides what happens next
            self.state.errors.on_next(error);
        }
    }

    fn on_complete(&self) {
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.signals.cancel();
            self.state.downstream.on_complete();
        }
    }
}

struct RetrySignalObserver<T, U> {
    state: Arc<RetryWhenState<T>>,
    _marker: std::marker::PhantomData<fn(U)>,
}

impl<T: Send + 'static, U: Send + 'static> Observer<U> for RetrySignalObserver<T, U> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.signals.replace(cancellable);
    }

    fn on_next(&self, _signal: U) {
        if !self.state.done.load(Ordering::Acquire) {
            RetryWhenState::resubscribe(&self.state);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.upstream.cancel();
            self.state.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.upstream.cancel();
            self.state.downstream.on_complete();
        }
    }
}
