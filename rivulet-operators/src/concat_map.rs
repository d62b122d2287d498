// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Sequential flattening (concat semantics).
//!
//! Outer values queue up as pending work; at most one inner source is
//! subscribed at a time, and the next pending value is mapped only after the
//! previous inner completed. The drain is a state machine behind a
//! work-in-progress counter, so a completion signal racing a new outer value
//! is never lost: both paths funnel into the same drain and whichever enters
//! second is picked up by the loop of whichever entered first.

use parking_lot::Mutex;
use rivulet_core::{
    guarded, Cancellable, Observable, Observer, RivuletError, SerializedObserver, SwapCancellable,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Extension trait providing the `concat_map` operator.
pub trait ConcatMapExt<T: Send + 'static> {
    /// Map each value to an inner source, subscribing strictly one at a
    /// time; output preserves outer order end-to-end.
    fn concat_map<R: Send + 'static>(
        &self,
        f: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R>;
}

impl<T: Send + 'static> ConcatMapExt<T> for Observable<T> {
    fn concat_map<R: Send + 'static>(
        &self,
        f: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R> {
        let source = self.clone();
        let f: Arc<dyn Fn(T) -> Observable<R> + Send + Sync> = Arc::new(f);
        Observable::new(move |observer| {
            let state = Arc::new(ConcatState {
                downstream: SerializedObserver::new(observer),
                f: Arc::clone(&f),
                pending: Mutex::new(VecDeque::new()),
                inner_active: AtomicBool::new(false),
                outer_done: AtomicBool::new(false),
                errored: AtomicBool::new(false),
                wip: AtomicUsize::new(0),
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
            source.subscribe(Arc::new(ConcatOuterObserver {
                state: Arc::clone(&state),
            }));
        })
    }
}

struct ConcatState<T, R> {
    downstream: SerializedObserver<R>,
    f: Arc<dyn Fn(T) -> Observable<R> + Send + Sync>,
    pending: Mutex<VecDeque<T>>,
    inner_active: AtomicBool,
    outer_done: AtomicBool,
    errored: AtomicBool,
    wip: AtomicUsize,
    upstream: SwapCancellable,
    inner: SwapCancellable,
}

impl<T: Send + 'static, R: Send + 'static> ConcatState<T, R> {
    fn fail(this: &Arc<Self>, error: RivuletError) {
        if !this.errored.swap(true, Ordering::AcqRel) {
            this.upstream.cancel();
            this.inner.cancel();
            this.pending.lock().clear();
            this.downstream.on_error(error);
        }
    }

    /// Enter-once drain: subscribes the next inner when none is active.
    fn drain(this: &Arc<Self>) {
        if this.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        let mut missed = 1usize;
        loop {
            loop {
                if this.errored.load(Ordering::Acquire) {
                    break;
                }
                if this.inner_active.load(Ordering::Acquire) {
                    break;
                }
                let next = this.pending.lock().pop_front();
                match next {
                    Some(value) => match guarded("concat_map", || (this.f)(value)) {
                        Ok(inner) => {
                            this.inner_active.store(true, Ordering::Release);
                            inner.subscribe(Arc::new(ConcatInnerObserver {
                                state: Arc::clone(this),
                            }));
                            // the inner may have completed synchronously;
                            // loop to re-check inner_active
                        }
                        Err(error) => {
                            Self::fail(this, error);
                            break;
                        }
                    },
                    None => {
                        if this.outer_done.load(Ordering::Acquire) {
                            this.downstream.on_complete();
                        }
                        break;
                    }
                }
            }
            missed = this.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if missed == 0 {
                return;
            }
        }
    }
}

struct ConcatOuterObserver<T, R> {
    state: Arc<ConcatState<T, R>>,
}

impl<T: Send + 'static, R: Send + 'static> Observer<T> for ConcatOuterObserver<T, R> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.upstream.replace(cancellable);
    }

    fn on_next(&self, value: T) {
        if self.state.errored.load(Ordering::Acquire) {
            return;
        }
        self.state.pending.lock().push_back(value);
        ConcatState::drain(&self.state);
    }

    fn on_error(&self, error: RivuletError) {
        ConcatState::fail(&self.state, error);
    }

    fn on_complete(&self) {
        self.state.outer_done.store(true, Ordering::Release);
        ConcatState::drain(&self.state);
    }
}

struct ConcatInnerObserver<T, R> {
    state: Arc<ConcatState<T, R>>,
}

impl<T: Send + 'static, R: Send + 'static> Observer<R> for ConcatInnerObserver<T, R> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.inner.replace(cancellable);
    }

    fn on_next(&self, value: R) {
        if !self.state.errored.load(Ordering::Acquire) {
            self.state.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        ConcatState::fail(&self.state, error);
    }

    fn on_complete(&self) {
        self.state.inner_active.store(false, Ordering::Release);
        ConcatState::drain(&self.state);
    }
}
