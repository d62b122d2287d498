// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Cancel-previous flattening (switch semantics).
//!
//! Each outer value maps to a new inner source, cancelling the previous
//! inner. Inners carry a generation number; only the latest generation may
//! deliver downstream, so a stale inner unwinding concurrently with a switch
//! can neither emit nor terminate the stream. Completion requires both the
//! outer completion and the completion of the latest-generation inner.

use parking_lot::Mutex;
use rivulet_core::{
    guarded, Cancellable, Observable, Observer, RivuletError, SerializedObserver, SwapCancellable,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the `switch_map` operator.
pub trait SwitchMapExt<T: Send + 'static> {
    /// Map each value to an inner source, cancelling the previously active
    /// inner; downstream sees only the latest inner's emissions.
    fn switch_map<R: Send + 'static>(
        &self,
        f: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R>;
}

impl<T: Send + 'static> SwitchMapExt<T> for Observable<T> {
    fn switch_map<R: Send + 'static>(
        &self,
        f: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R> {
        let source = self.clone();
        let f: Arc<dyn Fn(T) -> Observable<R> + Send + Sync> = Arc::new(f);
        Observable::new(move |observer| {
            let state = Arc::new(SwitchState {
                downstream: SerializedObserver::new(observer),
                f: Arc::clone(&f),
                generations: Mutex::new(Generations {
                    current: 0,
                    has_inner: false,
                    inner_completed: false,
                }),
                outer_done: AtomicBool::new(false),
                errored: AtomicBool::new(false),
                upstream: SwapCancellable::new(),
                inner: SwapCancellable::new(),
            });

            let subscription = {
                let cancel_state = Arc::clone(&state);
                Cancellable::from_action(move || {
                    cancel_state.upstream.cancel();
                    cancel_state.inner.cancel();
                })
            };
            state.downstream.on_subscribe(subscription);
            source.subscribe(Arc::new(SwitchOuterObserver {
                state: Arc::clone(&state),
            }));
        })
    }
}

struct Generations {
    current: u64,
    has_inner: bool,
    inner_completed: bool,
}

struct SwitchState<T, R> {
    downstream: SerializedObserver<R>,
    f: Arc<dyn Fn(T) -> Observable<R> + Send + Sync>,
    generations: Mutex<Generations>,
    outer_done: AtomicBool,
    errored: AtomicBool,
    upstream: SwapCancellable,
    inner: SwapCancellable,
}

impl<T: Send + 'static, R: Send + 'static> SwitchState<T, R> {
    fn fail(&self, error: RivuletError) {
        if !self.errored.swap(true, Ordering::AcqRel) {
            self.upstream.cancel();
            self.inner.cancel();
            self.downstream.on_error(error);
        }
    }
}

struct SwitchOuterObserver<T, R> {
    state: Arc<SwitchState<T, R>>,
}

impl<T: Send + 'static, R: Send + 'static> Observer<T> for SwitchOuterObserver<T, R> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.upstream.replace(cancellable);
    }

    fn on_next(&self, value: T) {
        if self.state.errored.load(Ordering::Acquire) {
            return;
        }
        let generation = {
            let mut generations = self.state.generations.lock();
            generations.current += 1;
            generations.has_inner = true;
            generations.inner_completed = false;
            generations.current
        };
        match guarded("switch_map", || (self.state.f)(value)) {
            Ok(inner) => {
                inner.subscribe(Arc::new(SwitchInnerObserver {
                    state: Arc::clone(&self.state),
                    generation,
                }));
            }
            Err(error) => self.state.fail(error),
        }
    }

    fn on_error(&self, error: RivuletError) {
        self.state.fail(error);
    }

    fn on_complete(&self) {
        self.state.outer_done.store(true, Ordering::Release);
        let complete = {
            let generations = self.state.generations.lock();
            !generations.has_inner || generations.inner_completed
        };
        if complete && !self.state.errored.load(Ordering::Acquire) {
            self.state.downstream.on_complete();
        }
    }
}

struct SwitchInnerObserver<T, R> {
    state: Arc<SwitchState<T, R>>,
    generation: u64,
}

impl<T: Send + 'static, R: Send + 'static> SwitchInnerObserver<T, R> {
    fn is_current(&self) -> bool {
        self.state.generations.lock().current == self.generation
    }
}

impl<T: Send + 'static, R: Send + 'static> Observer<R> for SwitchInnerObserver<T, R> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        if self.is_current() {
            // evicts (and cancels) the previous generation's subscription
            self.state.inner.replace(cancellable);
        } else {
            cancellable.cancel();
        }
    }

    fn on_next(&self, value: R) {
        if self.is_current() && !self.state.errored.load(Ordering::Acquire) {
            self.state.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if self.is_current() {
            self.state.fail(error);
        }
    }

    fn on_complete(&self) {
        let complete = {
            let mut generations = self.state.generations.lock();
            if generations.current != self.generation {
                return;
            }
            generations.inner_completed = true;
            self.state.outer_done.load(Ordering::Acquire)
        };
        if complete && !self.state.errored.load(Ordering::Acquire) {
            self.state.downstream.on_complete();
        }
    }
}
