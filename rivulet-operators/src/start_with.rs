// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Prefixing operators.

use rivulet_core::{Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the `start_with` family.
pub trait StartWithExt<T: Send + 'static> {
    /// Synchronously emit `values` before forwarding the upstream.
    fn start_with(&self, values: Vec<T>) -> Observable<T>
    where
        T: Clone + Sync;

    /// Forward `other` in full (awaiting its completion) before subscribing
    /// to `self`.
    fn start_with_observable(&self, other: &Observable<T>) -> Observable<T>;
}

impl<T: Send + 'static> StartWithExt<T> for Observable<T> {
    fn start_with(&self, values: Vec<T>) -> Observable<T>
    where
        T: Clone + Sync,
    {
        let source = self.clone();
        Observable::new(move |observer| {
            let handle = SwapCancellable::new();
            observer.on_subscribe(handle.as_cancellable());
            for value in values.clone() {
                if handle.is_cancelled() {
                    return;
                }
                observer.on_next(value);
            }
            if handle.is_cancelled() {
                return;
            }
            source.subscribe(Arc::new(TailObserver {
                downstream: observer,
                handle,
                done: AtomicBool::new(false),
            }));
        })
    }

    fn start_with_observable(&self, other: &Observable<T>) -> Observable<T> {
        let tail = self.clone();
        let head = other.clone();
        Observable::new(move |observer| {
            let handle = SwapCancellable::new();
            observer.on_subscribe(handle.as_cancellable());
            head.subscribe(Arc::new(HeadObserver {
                downstream: observer,
                tail: tail.clone(),
                handle,
                done: AtomicBool::new(false),
            }));
        })
    }
}

/// Forwards upstream notifications once `on_subscribe` routed the new
/// upstream handle into the already-announced swap slot.
struct TailObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    handle: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for TailObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.handle.replace(cancellable);
    }

    fn on_next(&self, value: T) {
        if !self.done.load(Ordering::Acquire) {
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

struct HeadObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    tail: Observable<T>,
    handle: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send + 'static> Observer<T> for HeadObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.handle.replace(cancellable);
    }

    fn on_next(&self, value: T) {
        if !self.done.load(Ordering::Acquire) {
            self.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.handle.is_cancelled() {
            return;
        }
        // head finished cleanly: hand the same downstream to the tail
        self.tail.subscribe(Arc::new(TailObserver {
            downstream: Arc::clone(&self.downstream),
            handle: self.handle.clone(),
            done: AtomicBool::new(false),
        }));
    }
}
