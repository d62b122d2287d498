// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Predicate-based value filtering.

use rivulet_core::{guarded, Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the `filter` operator.
pub trait FilterExt<T: Send + 'static> {
    /// Drop values rejected by `predicate`.
    ///
    /// A panic in the predicate terminates the stream with `Errored`.
    fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Observable<T>;
}

impl<T: Send + 'static> FilterExt<T> for Observable<T> {
    fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Observable<T> {
        let source = self.clone();
        let predicate: Arc<dyn Fn(&T) -> bool + Send + Sync> = Arc::new(predicate);
        Observable::new(move |observer| {
            source.subscribe(Arc::new(FilterObserver {
                downstream: observer,
                predicate: Arc::clone(&predicate),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }
}

struct FilterObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for FilterObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        match guarded("filter", || (self.predicate)(&value)) {
            Ok(true) => self.downstream.on_next(value),
            Ok(false) => {}
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
