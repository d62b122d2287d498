// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Terminal fold into a single value.

use parking_lot::Mutex;
use rivulet_core::{
    guarded, Cancellable, Observable, Observer, RivuletError, Single, SwapCancellable,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the `reduce` operator.
pub trait ReduceExt<T: Send + 'static> {
    /// Fold every value into an accumulator, emitting the final accumulator
    /// once the upstream completes.
    ///
    /// The seed is cloned per subscription, so the fold restarts cleanly on
    /// resubscription (retry, repeat).
    fn reduce<A: Clone + Send + Sync + 'static>(
        &self,
        seed: A,
        f: impl Fn(A, T) -> A + Send + Sync + 'static,
    ) -> Single<A>;
}

impl<T: Send + 'static> ReduceExt<T> for Observable<T> {
    fn reduce<A: Clone + Send + Sync + 'static>(
        &self,
        seed: A,
        f: impl Fn(A, T) -> A + Send + Sync + 'static,
    ) -> Single<A> {
        let source = self.clone();
        let f: Arc<dyn Fn(A, T) -> A + Send + Sync> = Arc::new(f);
        Single::new(move |observer| {
            let initial = seed.clone();
            source.subscribe(Arc::new(ReduceObserver {
                downstream: observer,
                f: Arc::clone(&f),
                accumulator: Mutex::new(Some(initial)),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }
}

struct ReduceObserver<T, A> {
    downstream: Arc<dyn rivulet_core::SingleObserver<A>>,
    f: Arc<dyn Fn(A, T) -> A + Send + Sync>,
    accumulator: Mutex<Option<A>>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send, A: Send> Observer<T> for ReduceObserver<T, A> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        let current = self
            .accumulator
            .lock()
            .take()
            .expect("accumulator taken while reducing");
        match guarded("reduce", || (self.f)(current, value)) {
            Ok(updated) => *self.accumulator.lock() = Some(updated),
            Err(error) => {
                if !self.done.swap(true, Ordering::AcqRel) {
                    self.upstream.cancel();
                    self.downstream.on_error(error);
                }
            }
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            if let Some(result) = self.accumulator.lock().take() {
                self.downstream.on_success(result);
            }
        }
    }
}
