// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Latest-value combination of two sources.

use parking_lot::Mutex;
use rivulet_core::{
    guarded, Cancellable, CompositeCancellable, Observable, Observer, RivuletError,
    SerializedObserver,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Combine the most recent values of both sources.
///
/// Nothing is emitted until each source has produced at least one value;
/// afterwards every arrival from either side triggers the combiner with both
/// latest values. Completes when both sources completed; the first error
/// cancels everything.
pub fn combine_latest<A, B, R>(
    left: &Observable<A>,
    right: &Observable<B>,
    combiner: impl Fn(&A, &B) -> R + Send + Sync + 'static,
) -> Observable<R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    R: Send + 'static,
{
    let left = left.clone();
    let right = right.clone();
    let combiner: Arc<dyn Fn(&A, &B) -> R + Send + Sync> = Arc::new(combiner);
    Observable::new(move |observer| {
        let state = Arc::new(CombineState {
            downstream: SerializedObserver::new(observer),
            combiner: Arc::clone(&combiner),
            latest: Mutex::new((None, None)),
            remaining: AtomicUsize::new(2),
            terminated: AtomicBool::new(false),
            subscriptions: CompositeCancellable::new(),
        });
        state
            .downstream
            .on_subscribe(state.subscriptions.as_cancellable());

        left.subscribe(Arc::new(CombineLeftObserver {
            state: Arc::clone(&state),
        }));
        right.subscribe(Arc::new(CombineRightObserver {
            state: Arc::clone(&state),
        }));
    })
}

/// Extension trait providing method-style `combine_latest_with`.
pub trait CombineLatestExt<T: Clone + Send + 'static> {
    /// Combine this stream's latest value with `other`'s latest value.
    fn combine_latest_with<B: Clone + Send + 'static, R: Send + 'static>(
        &self,
        other: &Observable<B>,
        combiner: impl Fn(&T, &B) -> R + Send + Sync + 'static,
    ) -> Observable<R>;
}

impl<T: Clone + Send + 'static> CombineLatestExt<T> for Observable<T> {
    fn combine_latest_with<B: Clone + Send + 'static, R: Send + 'static>(
        &self,
        other: &Observable<B>,
        combiner: impl Fn(&T, &B) -> R + Send + Sync + 'static,
    ) -> Observable<R> {
        combine_latest(self, other, combiner)
    }
}

struct CombineState<A, B, R> {
    downstream: SerializedObserver<R>,
    combiner: Arc<dyn Fn(&A, &B) -> R + Send + Sync>,
    latest: Mutex<(Option<A>, Option<B>)>,
    remaining: AtomicUsize,
    terminated: AtomicBool,
    subscriptions: CompositeCancellable,
}

impl<A: Clone + Send, B: Clone + Send, R: Send> CombineState<A, B, R> {
    fn emit_if_ready(&self) {
        if self.terminated.load(Ordering::Acquire) {
            return;
        }
        let snapshot = {
            let latest = self.latest.lock();
            match (&latest.0, &latest.1) {
                (Some(a), Some(b)) => Some((a.clone(), b.clone())),
                _ => None,
            }
        };
        if let Some((a, b)) = snapshot {
            match guarded("combine_latest", || (self.combiner)(&a, &b)) {
                Ok(combined) => self.downstream.on_next(combined),
                Err(error) => self.fail(error),
            }
        }
    }

    fn settle_one(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1
            && !self.terminated.swap(true, Ordering::AcqRel)
        {
            self.downstream.on_complete();
        }
    }

    fn fail(&self, error: RivuletError) {
        if !self.terminated.swap(true, Ordering::AcqRel) {
            self.subscriptions.cancel();
            self.downstream.on_error(error);
        }
    }
}

struct CombineLeftObserver<A, B, R> {
    state: Arc<CombineState<A, B, R>>,
}

impl<A, B, R> Observer<A> for CombineLeftObserver<A, B, R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    R: Send + 'static,
{
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.subscriptions.add(cancellable);
    }

    fn on_next(&self, value: A) {
        self.state.latest.lock().0 = Some(value);
        self.state.emit_if_ready();
    }

    fn on_error(&self, error: RivuletError) {
        self.state.fail(error);
    }

    fn on_complete(&self) {
        self.state.settle_one();
    }
}

struct CombineRightObserver<A, B, R> {
    state: Arc<CombineState<A, B, R>>,
}

impl<A, B, R> Observer<B> for CombineRightObserver<A, B, R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    R: Send + 'static,
{
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.subscriptions.add(cancellable);
    }

    fn on_next(&self, value: B) {
        self.state.latest.lock().1 = Some(value);
        self.state.emit_if_ready();
    }

    fn on_error(&self, error: RivuletError) {
        self.state.fail(error);
    }

    fn on_complete(&self) {
        self.state.settle_one();
    }
}
