// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Primary-driven sampling of a secondary source.

use parking_lot::Mutex;
use rivulet_core::{
    guarded, Cancellable, CompositeCancellable, Observable, Observer, RivuletError,
    SerializedObserver,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the `with_latest_from` operator.
pub trait WithLatestFromExt<T: Send + 'static> {
    /// On each value of `self`, attach the latest value of `other`.
    ///
    /// Emissions are driven by `self` alone; ticks arriving before `other`
    /// produced its first value are dropped. `other`'s completion is
    /// ignored, its error terminates the stream.
    fn with_latest_from<B: Clone + Send + 'static, R: Send + 'static>(
        &self,
        other: &Observable<B>,
        combiner: impl Fn(T, &B) -> R + Send + Sync + 'static,
    ) -> Observable<R>;
}

impl<T: Send + 'static> WithLatestFromExt<T> for Observable<T> {
    fn with_latest_from<B: Clone + Send + 'static, R: Send + 'static>(
        &self,
        other: &Observable<B>,
        combiner: impl Fn(T, &B) -> R + Send + Sync + 'static,
    ) -> Observable<R> {
        let source = self.clone();
        let other = other.clone();
        let combiner: Arc<dyn Fn(T, &B) -> R + Send + Sync> = Arc::new(combiner);
        Observable::new(move |observer| {
            let state = Arc::new(WithLatestState {
                downstream: SerializedObserver::new(observer),
                combiner: Arc::clone(&combiner),
                latest: Mutex::new(None),
                terminated: AtomicBool::new(false),
                subscriptions: CompositeCancellable::new(),
            });
            state
                .downstream
                .on_subscribe(state.subscriptions.as_cancellable());

            // secondary first so early primary ticks can observe its values
            other.subscribe(Arc::new(SecondaryObserver {
                state: Arc::clone(&state),
            }));
            source.subscribe(Arc::new(PrimaryObserver {
                state: Arc::clone(&state),
            }));
        })
    }
}

struct WithLatestState<T, B, R> {
    downstream: SerializedObserver<R>,
    combiner: Arc<dyn Fn(T, &B) -> R + Send + Sync>,
    latest: Mutex<Option<B>>,
    terminated: AtomicBool,
    subscriptions: CompositeCancellable,
}

impl<T: Send, B: Clone + Send, R: Send> WithLatestState<T, B, R> {
    fn fail(&self, error: RivuletError) {
        if !self.terminated.swap(true, Ordering::AcqRel) {
            self.subscriptions.cancel();
            self.downstream.on_error(error);
        }
    }
}

struct PrimaryObserver<T, B, R> {
    state: Arc<WithLatestState<T, B, R>>,
}

impl<T, B, R> Observer<T> for PrimaryObserver<T, B, R>
where
    T: Send + 'static,
    B: Clone + Send + 'static,
    R: Send + 'static,
{
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.subscriptions.add(cancellable);
    }

    fn on_next(&self, value: T) {
        if self.state.terminated.load(Ordering::Acquire) {
            return;
        }
        let latest = self.state.latest.lock().clone();
        if let Some(latest) = latest {
            match guarded("with_latest_from", || (self.state.combiner)(value, &latest)) {
                Ok(combined) => self.state.downstream.on_next(combined),
                Err(error) => self.state.fail(error),
            }
        }
    }

    fn on_error(&self, error: RivuletError) {
        self.state.fail(error);
    }

    fn on_complete(&self) {
        if !self.state.terminated.swap(true, Ordering::AcqRel) {
            self.state.subscriptions.cancel();
            self.state.downstream.on_complete();
        }
    }
}

struct SecondaryObserver<T, B, R> {
    state: Arc<WithLatestState<T, B, R>>,
}

impl<T, B, R> Observer<B> for SecondaryObserver<T, B, R>
where
    T: Send + 'static,
    B: Clone + Send + 'static,
    R: Send + 'static,
{
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.subscriptions.add(cancellable);
    }

    fn on_next(&self, value: B) {
        *self.state.latest.lock() = Some(value);
    }

    fn on_error(&self, error: RivuletError) {
        self.state.fail(error);
    }

    fn on_complete(&self) {
        // the primary keeps driving with the last stored value
    }
}
