// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Inactivity watchdog.

use rivulet_core::{
    Cancellable, Observable, Observer, RivuletError, Scheduler, SerializedObserver,
    SwapCancellable,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing the `timeout` operator.
pub trait TimeoutExt<T: Send + 'static> {
    /// Fail with [`RivuletError::Timeout`] unless the upstream produces a
    /// value (or terminates) within `window` of subscription and of each
    /// preceding value.
    ///
    /// The watchdog and the upstream race through a single-winner flag:
    /// exactly one of value, completion, error or timeout reaches
    /// downstream.
    fn timeout(&self, window: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T>;
}

impl<T: Send + 'static> TimeoutExt<T> for Observable<T> {
    fn timeout(&self, window: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let source = self.clone();
        let scheduler = Arc::clone(&scheduler);
        Observable::new(move |observer| {
            let state = Arc::new(TimeoutState {
                downstream: SerializedObserver::new(observer),
                generation: AtomicU64::new(0),
                done: AtomicBool::new(false),
                upstream: SwapCancellable::new(),
                watchdog: SwapCancellable::new(),
                scheduler: Arc::clone(&scheduler),
                window,
            });
            let subscription = {
                let cancel_state = Arc::clone(&state);
                Cancellable::from_action(move || {
                    cancel_state.upstream.cancel();
                    cancel_state.watchdog.cancel();
                })
            };
            state.downstream.on_subscribe(subscription);
            TimeoutState::arm(&state, state.generation.load(Ordering::Acquire));
            source.subscribe(Arc::new(TimeoutObserver {
                state: Arc::clone(&state),
            }));
        })
    }
}

struct TimeoutState<T> {
    downstream: SerializedObserver<T>,
    generation: AtomicU64,
    done: AtomicBool,
    upstream: SwapCancellable,
    watchdog: SwapCancellable,
    scheduler: Arc<dyn Scheduler>,
    window: Duration,
}

impl<T: Send + 'static> TimeoutState<T> {
    /// Start (or restart) the watchdog for `generation`.
    fn arm(this: &Arc<Self>, generation: u64) {
        if this.done.load(Ordering::Acquire) {
            return;
        }
        let state = Arc::clone(this);
        let handle = this.scheduler.schedule_after(
            this.window,
            Box::new(move || {
                // fire only if no newer activity claimed this generation
                if state.generation.load(Ordering::Acquire) == generation
                    && !state.done.swap(true, Ordering::AcqRel)
                {
                    state.upstream.cancel();
                    state
                        .downstream
                        .on_error(RivuletError::timeout(state.window));
                }
            }),
        );
        this.watchdog.replace(handle);
    }
}

struct TimeoutObserver<T> {
    state: Arc<TimeoutState<T>>,
}

impl<T: Send + 'static> Observer<T> for TimeoutObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.upstream.replace(cancellable);
    }

    fn on_next(&self, value: T) {
        if self.state.done.load(Ordering::Acquire) {
            return;
        }
        let generation = self.state.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.downstream.on_next(value);
        TimeoutState::arm(&self.state, generation);
    }

    fn on_error(&self, error: RivuletError) {
        self.state.generation.fetch_add(1, Ordering::AcqRel);
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.watchdog.cancel();
            self.state.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        self.state.generation.fetch_add(1, Ordering::AcqRel);
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.watchdog.cancel();
            self.state.downstream.on_complete();
        }
    }
}
