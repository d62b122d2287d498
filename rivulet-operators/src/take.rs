// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Prefix-limiting operators.

use rivulet_core::{guarded, Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Extension trait providing `take` and `take_while`.
pub trait TakeExt<T: Send + 'static> {
    /// Pass through the first `count` values, then complete and cancel
    /// upstream. `take(0)` completes immediately.
    fn take(&self, count: u64) -> Observable<T>;

    /// Pass values while `predicate` holds; the first rejected value
    /// completes the stream (the rejected value is not emitted).
    fn take_while(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Observable<T>;
}

impl<T: Send + 'static> TakeExt<T> for Observable<T> {
    fn take(&self, count: u64) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |observer| {
            source.subscribe(Arc::new(TakeObserver {
                downstream: observer,
                remaining: AtomicU64::new(count),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }

    fn take_while(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Observable<T> {
        let source = self.clone();
        let predicate: Arc<dyn Fn(&T) -> bool + Send + Sync> = Arc::new(predicate);
        Observable::new(move |observer| {
            source.subscribe(Arc::new(TakeWhileObserver {
                downstream: observer,
                predicate: Arc::clone(&predicate),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }
}

struct TakeObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    remaining: AtomicU64,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for TakeObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
        if self.remaining.load(Ordering::Acquire) == 0
            && !self.done.swap(true, Ordering::AcqRel)
        {
            self.upstream.cancel();
            self.downstream.on_complete();
        }
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        let before = self.remaining.fetch_sub(1, Ordering::AcqRel);
        if before == 0 {
            // raced past zero; restore and drop
            self.remaining.store(0, Ordering::Release);
            return;
        }
        self.downstream.on_next(value);
        if before == 1 && !self.done.swap(true, Ordering::AcqRel) {
            self.upstream.cancel();
            self.downstream.on_complete();
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

struct TakeWhileObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for TakeWhileObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        match guarded("take_while", || (self.predicate)(&value)) {
            Ok(true) => self.downstream.on_next(value),
            Ok(false) => {
                if !self.done.swap(true, Ordering::AcqRel) {
                    self.upstream.cancel();
                    self.downstream.on_complete();
                }
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
