// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Deduplication operators.

use parking_lot::Mutex;
use rivulet_core::{Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the distinct operators.
pub trait DistinctExt<T: Send + 'static> {
    /// Emit only values never seen before (by value equality).
    ///
    /// Memory grows with the number of distinct values.
    fn distinct(&self) -> Observable<T>
    where
        T: Clone + Eq + Hash;

    /// Emit only values that differ from the immediately preceding emission.
    fn distinct_until_changed(&self) -> Observable<T>
    where
        T: Clone + PartialEq;
}

impl<T: Send + 'static> DistinctExt<T> for Observable<T> {
    fn distinct(&self) -> Observable<T>
    where
        T: Clone + Eq + Hash,
    {
        let source = self.clone();
        Observable::new(move |observer| {
            source.subscribe(Arc::new(DistinctObserver {
                downstream: observer,
                seen: Mutex::new(HashSet::new()),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }

    fn distinct_until_changed(&self) -> Observable<T>
    where
        T: Clone + PartialEq,
    {
        let source = self.clone();
        Observable::new(move |observer| {
            source.subscribe(Arc::new(DistinctUntilChangedObserver {
                downstream: observer,
                previous: Mutex::new(None),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }
}

struct DistinctObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    seen: Mutex<HashSet<T>>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Clone + Eq + Hash + Send> Observer<T> for DistinctObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        if self.seen.lock().insert(value.clone()) {
            self.downstream.on_next(value);
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

struct DistinctUntilChangedObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    previous: Mutex<Option<T>>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Clone + PartialEq + Send> Observer<T> for DistinctUntilChangedObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        let changed = {
            let mut previous = self.previous.lock();
            let changed = previous.as_ref() != Some(&value);
            if changed {
                *previous = Some(value.clone());
            }
            changed
        };
        if changed {
            self.downstream.on_next(value);
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
