// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Value transformation operator.

use rivulet_core::{guarded, Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the `map` operator.
pub trait MapExt<T: Send + 'static> {
    /// Apply `f` to every value.
    ///
    /// A panic in `f` terminates the stream with an `Errored` notification
    /// and cancels the upstream subscription.
    fn map<R: Send + 'static>(&self, f: impl Fn(T) -> R + Send + Sync + 'static) -> Observable<R>;
}

impl<T: Send + 'static> MapExt<T> for Observable<T> {
    fn map<R: Send + 'static>(&self, f: impl Fn(T) -> R + Send + Sync + 'static) -> Observable<R> {
        let source = self.clone();
        let f: Arc<dyn Fn(T) -> R + Send + Sync> = Arc::new(f);
        Observable::new(move |observer| {
            source.subscribe(Arc::new(MapObserver {
                downstream: observer,
                f: Arc::clone(&f),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }
}

struct MapObserver<T, R> {
    downstream: Arc<dyn Observer<R>>,
    f: Arc<dyn Fn(T) -> R + Send + Sync>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send, R: Send> Observer<T> for MapObserver<T, R> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        match guarded("map", || (self.f)(value)) {
            Ok(mapped) => self.downstream.on_next(mapped),
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
