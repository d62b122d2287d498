// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Trailing debounce.

use parking_lot::Mutex;
use rivulet_core::{
    Cancellable, Observable, Observer, RivuletError, Scheduler, SerializedObserver,
    SwapCancellable,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing the `debounce` operator.
pub trait DebounceExt<T: Send + 'static> {
    /// Emit a value only after `quiet` elapsed with no newer value.
    ///
    /// Every arrival replaces the pending value and restarts the timer.
    /// Upstream completion flushes the pending value (if any) before the
    /// completion; errors propagate immediately, dropping the pending value.
    fn debounce(&self, quiet: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T>;
}

impl<T: Send + 'static> DebounceExt<T> for Observable<T> {
    fn debounce(&self, quiet: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let source = self.clone();
        let scheduler = Arc::clone(&scheduler);
        Observable::new(move |observer| {
            let state = Arc::new(DebounceState {
                downstream: SerializedObserver::new(observer),
                pending: Mutex::new(None),
                timer: SwapCancellable::new(),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            });
            let subscription = {
                let cancel_state = Arc::clone(&state);
                Cancellable::from_action(move || {
                    cancel_state.upstream.cancel();
                    cancel_state.timer.cancel();
                })
            };
            state.downstream.on_subscribe(subscription);
            source.subscribe(Arc::new(DebounceObserver {
                state: Arc::clone(&state),
                scheduler: Arc::clone(&scheduler),
                quiet,
            }));
        })
    }
}

struct DebounceState<T> {
    downstream: SerializedObserver<T>,
    pending: Mutex<Option<T>>,
    timer: SwapCancellable,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send + 'static> DebounceState<T> {
    fn flush(&self) {
        let pending = self.pending.lock().take();
        if let Some(value) = pending {
            self.downstream.on_next(value);
        }
    }
}

struct DebounceObserver<T> {
    state: Arc<DebounceState<T>>,
    scheduler: Arc<dyn Scheduler>,
    quiet: Duration,
}

impl<T: Send + 'static> Observer<T> for DebounceObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.upstream.replace(cancellable);
    }

    fn on_next(&self, value: T) {
        if self.state.done.load(Ordering::Acquire) {
            return;
        }
        *self.state.pending.lock() = Some(value);
        let state = Arc::clone(&self.state);
        // replacing the timer cancels the previous pending emission
        let handle = self.scheduler.schedule_after(
            self.quiet,
            Box::new(move || {
                if !state.done.load(Ordering::Acquire) {
                    state.flush();
                }
            }),
        );
        self.state.timer.replace(handle);
    }

    fn on_error(&self, error: RivuletError) {
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.timer.cancel();
            *self.state.pending.lock() = None;
            self.state.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.timer.cancel();
            self.state.flush();
            self.state.downstream.on_complete();
        }
    }
}
