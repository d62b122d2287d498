// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Prefix-dropping operator.

use rivulet_core::{Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Extension trait providing `skip`.
pub trait SkipExt<T: Send + 'static> {
    /// Drop the first `count` values, passing everything after through.
    fn skip(&self, count: u64) -> Observable<T>;
}

impl<T: Send + 'static> SkipExt<T> for Observable<T> {
    fn skip(&self, count: u64) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |observer| {
            source.subscribe(Arc::new(SkipObserver {
                downstream: observer,
                remaining: AtomicU64::new(count),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }
}

struct SkipObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    remaining: AtomicU64,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for SkipObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        if self.remaining.load(Ordering::Acquire) == 0 {
            self.downstream.on_next(value);
        } else {
            self.remaining.fetch_sub(1, Ordering::AcqRel);
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
