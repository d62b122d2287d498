// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Concurrent flattening (merge semantics).
//!
//! Each outer value is mapped to an inner source and subscribed immediately;
//! inner emissions interleave in arrival order. The active count starts at
//! one for the outer subscription and is decremented on outer completion and
//! on each inner completion; the stream completes when it reaches zero. The
//! first error from any participant wins, cancels all other work and is the
//! only terminal delivered.

use rivulet_core::{
    guarded, Cancellable, CompositeCancellable, Observable, Observer, RivuletError,
    SerializedObserver,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Extension trait providing the `flat_map` (merge-map) operator.
pub trait FlatMapExt<T: Send + 'static> {
    /// Map each value to an inner source and merge all inner emissions.
    ///
    /// Inner sources run concurrently; output order across inners is
    /// arrival order, not outer order.
    fn flat_map<R: Send + 'static>(
        &self,
        f: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R>;
}

impl<T: Send + 'static> FlatMapExt<T> for Observable<T> {
    fn flat_map<R: Send + 'static>(
        &self,
        f: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R> {
        let source = self.clone();
        let f: Arc<dyn Fn(T) -> Observable<R> + Send + Sync> = Arc::new(f);
        Observable::new(move |observer| {
            let state = Arc::new(FlatMapState {
                downstream: SerializedObserver::new(observer),
                active: AtomicUsize::new(1),
                errored: AtomicBool::new(false),
                subscriptions: CompositeCancellable::new(),
            });
            state
                .downstream
                .on_subscribe(state.subscriptions.as_cancellable());
            source.subscribe(Arc::new(FlatMapOuterObserver {
                state: Arc::clone(&state),
                f: Arc::clone(&f),
            }));
        })
    }
}

struct FlatMapState<R> {
    downstream: SerializedObserver<R>,
    active: AtomicUsize,
    errored: AtomicBool,
    subscriptions: CompositeCancellable,
}

impl<R: Send> FlatMapState<R> {
    fn settle_one(&self) {
        if self.active.fetch_sub(1, Ordering::AcqRel) == 1
            && !self.errored.load(Ordering::Acquire)
        {
            self.downstream.on_complete();
        }
    }

    fn fail(&self, error: RivuletError) {
        if !self.errored.swap(true, Ordering::AcqRel) {
            self.subscriptions.cancel();
            self.downstream.on_error(error);
        }
    }
}

struct FlatMapOuterObserver<T, R> {
    state: Arc<FlatMapState<R>>,
    f: Arc<dyn Fn(T) -> Observable<R> + Send + Sync>,
}

impl<T: Send + 'static, R: Send + 'static> Observer<T> for FlatMapOuterObserver<T, R> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.subscriptions.add(cancellable);
    }

    fn on_next(&self, value: T) {
        if self.state.errored.load(Ordering::Acquire) {
            return;
        }
        match guarded("flat_map", || (self.f)(value)) {
            Ok(inner) => {
                self.state.active.fetch_add(1, Ordering::AcqRel);
                inner.subscribe(Arc::new(FlatMapInnerObserver {
                    state: Arc::clone(&self.state),
                }));
            }
            Err(error) => self.state.fail(error),
        }
    }

    fn on_error(&self, error: RivuletError) {
        self.state.fail(error);
    }

    fn on_complete(&self) {
        self.state.settle_one();
    }
}

struct FlatMapInnerObserver<R> {
    state: Arc<FlatMapState<R>>,
}

impl<R: Send + 'static> Observer<R> for FlatMapInnerObserver<R> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.subscriptions.add(cancellable);
    }

    fn on_next(&self, value: R) {
        if !self.state.errored.load(Ordering::Acquire) {
            self.state.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        self.state.fail(error);
    }

    fn on_complete(&self) {
        self.state.settle_one();
    }
}
