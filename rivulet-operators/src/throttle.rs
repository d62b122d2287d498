// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Rate limiting: leading-edge and trailing-edge throttles.

use parking_lot::Mutex;
use rivulet_core::{
    Cancellable, Observable, Observer, RivuletError, Scheduler, SerializedObserver,
    SwapCancellable,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing the throttle operators.
pub trait ThrottleExt<T: Send + 'static> {
    /// Leading-edge throttle: emit the value that arrives while no window is
    /// open, then open a `window`-long window during which arrivals are
    /// dropped.
    fn throttle_first(&self, window: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T>;

    /// Trailing-edge throttle: a periodic timer at `period` emits the most
    /// recent value that arrived since the previous tick (ticks with no new
    /// value emit nothing).
    fn throttle_last(&self, period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T>;

    /// Alias of [`throttle_last`](Self::throttle_last): periodic sampling of
    /// the latest value.
    fn sample(&self, period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        self.throttle_last(period, scheduler)
    }
}

impl<T: Send + 'static> ThrottleExt<T> for Observable<T> {
    fn throttle_first(&self, window: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let source = self.clone();
        let scheduler = Arc::clone(&scheduler);
        Observable::new(move |observer| {
            source.subscribe(Arc::new(ThrottleFirstObserver {
                downstream: observer,
                window_open: Arc::new(AtomicBool::new(false)),
                scheduler: Arc::clone(&scheduler),
                window,
                upstream: SwapCancellable::new(),
                gate_timer: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }

    fn throttle_last(&self, period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let source = self.clone();
        let scheduler = Arc::clone(&scheduler);
        Observable::new(move |observer| {
            let state = Arc::new(ThrottleLastState {
                downstream: SerializedObserver::new(observer),
                latest: Mutex::new(None),
                upstream: SwapCancellable::new(),
                ticker: SwapCancellable::new(),
                done: AtomicBool::new(false),
            });
            let subscription = {
                let cancel_state = Arc::clone(&state);
                Cancellable::from_action(move || {
                    cancel_state.upstream.cancel();
                    cancel_state.ticker.cancel();
                })
            };
            state.downstream.on_subscribe(subscription);

            let tick_state = Arc::clone(&state);
            let ticker = scheduler.schedule_periodic(
                period,
                period,
                Box::new(move || {
                    if !tick_state.done.load(Ordering::Acquire) {
                        let latest = tick_state.latest.lock().take();
                        if let Some(value) = latest {
                            tick_state.downstream.on_next(value);
                        }
                    }
                }),
            );
            state.ticker.replace(ticker);

            source.subscribe(Arc::new(ThrottleLastObserver {
                state: Arc::clone(&state),
            }));
        })
    }
}

struct ThrottleFirstObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    window_open: Arc<AtomicBool>,
    scheduler: Arc<dyn Scheduler>,
    window: Duration,
    upstream: SwapCancellable,
    gate_timer: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send + 'static> Observer<T> for ThrottleFirstObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        let upstream = self.upstream.clone();
        let gate_timer = self.gate_timer.clone();
        self.downstream.on_subscribe(Cancellable::from_action(move || {
            upstream.cancel();
            gate_timer.cancel();
        }));
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        if !self.window_open.swap(true, Ordering::AcqRel) {
            self.downstream.on_next(value);
            let window_open = Arc::clone(&self.window_open);
            let handle = self.scheduler.schedule_after(
                self.window,
                Box::new(move || window_open.store(false, Ordering::Release)),
            );
            self.gate_timer.replace(handle);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.gate_timer.cancel();
            self.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.gate_timer.cancel();
            self.downstream.on_complete();
        }
    }
}

struct ThrottleLastState<T> {
    downstream: SerializedObserver<T>,
    latest: Mutex<Option<T>>,
    upstream: SwapCancellable,
    ticker: SwapCancellable,
    done: AtomicBool,
}

struct ThrottleLastObserver<T> {
    state: Arc<ThrottleLastState<T>>,
}

impl<T: Send + 'static> Observer<T> for ThrottleLastObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.upstream.replace(cancellable);
    }

    fn on_next(&self, value: T) {
        if !self.state.done.load(Ordering::Acquire) {
            *self.state.latest.lock() = Some(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.ticker.cancel();
            *self.state.latest.lock() = None;
            self.state.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.ticker.cancel();
            self.state.downstream.on_complete();
        }
    }
}
