// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Running accumulation operators.

use parking_lot::Mutex;
use rivulet_core::{guarded, Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the `scan` family.
pub trait ScanExt<T: Send + 'static> {
    /// Fold values into an accumulator, emitting each update.
    ///
    /// The seed itself is not emitted; the first emission is
    /// `f(seed, first_value)`.
    fn scan<A: Clone + Send + Sync + 'static>(
        &self,
        seed: A,
        f: impl Fn(A, T) -> A + Send + Sync + 'static,
    ) -> Observable<A>;

    /// Like [`scan`](Self::scan), but emits the seed first, then every
    /// intermediate accumulator value.
    fn scan_with<A: Clone + Send + Sync + 'static>(
        &self,
        seed: A,
        f: impl Fn(A, T) -> A + Send + Sync + 'static,
    ) -> Observable<A>;
}

impl<T: Send + 'static> ScanExt<T> for Observable<T> {
    fn scan<A: Clone + Send + Sync + 'static>(
        &self,
        seed: A,
        f: impl Fn(A, T) -> A + Send + Sync + 'static,
    ) -> Observable<A> {
        scan_observable(self, seed, f, false)
    }

    fn scan_with<A: Clone + Send + Sync + 'static>(
        &self,
        seed: A,
        f: impl Fn(A, T) -> A + Send + Sync + 'static,
    ) -> Observable<A> {
        scan_observable(self, seed, f, true)
    }
}

fn scan_observable<T: Send + 'static, A: Clone + Send + Sync + 'static>(
    source: &Observable<T>,
    seed: A,
    f: impl Fn(A, T) -> A + Send + Sync + 'static,
    emit_seed: bool,
) -> Observable<A> {
    let source = source.clone();
    let f: Arc<dyn Fn(A, T) -> A + Send + Sync> = Arc::new(f);
    Observable::new(move |observer| {
        let scan_observer = Arc::new(ScanObserver {
            downstream: observer,
            f: Arc::clone(&f),
            accumulator: Mutex::new(seed.clone()),
            upstream: SwapCancellable::new(),
            done: AtomicBool::new(false),
            emit_seed,
        });
        source.subscribe(scan_observer);
    })
}

struct ScanObserver<T, A> {
    downstream: Arc<dyn Observer<A>>,
    f: Arc<dyn Fn(A, T) -> A + Send + Sync>,
    accumulator: Mutex<A>,
    upstream: SwapCancellable,
    done: AtomicBool,
    emit_seed: bool,
}

impl<T: Send, A: Clone + Send> Observer<T> for ScanObserver<T, A> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
        if self.emit_seed && !self.done.load(Ordering::Acquire) {
            self.downstream.on_next(self.accumulator.lock().clone());
        }
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        let current = self.accumulator.lock().clone();
        match guarded("scan", || (self.f)(current, value)) {
            Ok(updated) => {
                *self.accumulator.lock() = updated.clone();
                self.downstream.on_next(updated);
            }
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
            self.downstream.on_complete();
        }
    }
}
