// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Element extraction and shape narrowing.

use parking_lot::Mutex;
use rivulet_core::{
    Cancellable, Completable, Maybe, MaybeObserver, Observable, Observer, RivuletError, Single,
    SwapCancellable,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::collect::CollectExt;
use crate::reduce::ReduceExt;

/// Extension trait narrowing a stream to scalar shapes.
pub trait ElementsExt<T: Send + 'static> {
    /// The first value, or empty completion for an empty source.
    fn first(&self) -> Maybe<T>;

    /// The last value, or empty completion for an empty source.
    fn last(&self) -> Maybe<T>;

    /// The value at position `index` (zero-based), or empty completion when
    /// the source is shorter.
    fn element_at(&self, index: u64) -> Maybe<T>;

    /// The number of emitted values.
    fn count(&self) -> Single<u64>;

    /// Discard all values, keeping only the terminal.
    fn ignore_elements(&self) -> Completable;
}

impl<T: Send + 'static> ElementsExt<T> for Observable<T> {
    fn first(&self) -> Maybe<T> {
        Maybe::from_observable(self)
    }

    fn last(&self) -> Maybe<T> {
        let source = self.clone();
        Maybe::new(move |observer| {
            source.subscribe(Arc::new(LastObserver {
                downstream: observer,
                latest: Mutex::new(None),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }

    fn element_at(&self, index: u64) -> Maybe<T> {
        let source = self.clone();
        Maybe::new(move |observer| {
            source.subscribe(Arc::new(ElementAtObserver {
                downstream: observer,
                remaining: AtomicU64::new(index),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }

    fn count(&self) -> Single<u64> {
        self.reduce(0u64, |count, _| count + 1)
    }

    fn ignore_elements(&self) -> Completable {
        Completable::from_observable(self)
    }
}

/// Extension trait for boolean stream comparison.
pub trait SequenceEqualExt<T: Send + 'static> {
    /// Collect both sources fully and compare them element-wise.
    fn sequence_equal(&self, other: &Observable<T>) -> Single<bool>
    where
        T: PartialEq + Sync;
}

impl<T: Send + 'static> SequenceEqualExt<T> for Observable<T> {
    fn sequence_equal(&self, other: &Observable<T>) -> Single<bool>
    where
        T: PartialEq + Sync,
    {
        let left = self.to_list();
        let right = other.to_list();
        left.flat_map(move |a| right.map(move |b| a == b))
    }
}

struct LastObserver<T> {
    downstream: Arc<dyn MaybeObserver<T>>,
    latest: Mutex<Option<T>>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for LastObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if !self.done.load(Ordering::Acquire) {
            *self.latest.lock() = Some(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            match self.latest.lock().take() {
                Some(value) => self.downstream.on_success(value),
                None => self.downstream.on_complete(),
            }
        }
    }
}

struct ElementAtObserver<T> {
    downstream: Arc<dyn MaybeObserver<T>>,
    remaining: AtomicU64,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for ElementAtObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        let before = self.remaining.load(Ordering::Acquire);
        if before == 0 {
            if !self.done.swap(true, Ordering::AcqRel) {
                self.upstream.cancel();
                self.downstream.on_success(value);
            }
        } else {
            self.remaining.store(before - 1, Ordering::Release);
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
