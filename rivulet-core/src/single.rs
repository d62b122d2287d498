// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The exactly-one-value reactive shape.

use crate::cancellable::{Cancellable, SwapCancellable};
use crate::error::{Result, RivuletError};
use crate::guard::guarded;
use crate::maybe::Maybe;
use crate::observable::Observable;
use crate::observer::{Observer, SingleObserver};
use parking_lot::{Condvar, Mutex};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type SubscribeFn<T> = dyn Fn(Arc<dyn SingleObserver<T>>) + Send + Sync;

/// A source that terminates with exactly one value or one error.
pub struct Single<T> {
    subscriber: Arc<SubscribeFn<T>>,
}

impl<T> Clone for Single<T> {
    fn clone(&self) -> Self {
        Self {
            subscriber: Arc::clone(&self.subscriber),
        }
    }
}

impl<T: Send + 'static> Single<T> {
    /// Low-level constructor from a raw subscribe function.
    pub fn new(subscribe: impl Fn(Arc<dyn SingleObserver<T>>) + Send + Sync + 'static) -> Self {
        Self {
            subscriber: Arc::new(subscribe),
        }
    }

    /// Subscribe with a full observer.
    pub fn subscribe(&self, observer: Arc<dyn SingleObserver<T>>) {
        (self.subscriber)(observer);
    }

    /// Subscribe with success/error callbacks; returns the subscription
    /// handle.
    pub fn subscribe_all(
        &self,
        on_success: impl Fn(T) + Send + Sync + 'static,
        on_error: impl Fn(RivuletError) + Send + Sync + 'static,
    ) -> Cancellable {
        let observer = Arc::new(LambdaSingleObserver {
            on_success,
            on_error,
            upstream: SwapCancellable::new(),
            done: AtomicBool::new(false),
            _marker: PhantomData,
        });
        let handle = observer.upstream.as_cancellable();
        self.subscribe(observer);
        handle
    }

    /// Succeed immediately with `value`.
    pub fn just(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::new(move |observer| {
            observer.on_subscribe(Cancellable::empty());
            observer.on_success(value.clone());
        })
    }

    /// Fail immediately with `error`.
    #[must_use]
    pub fn error(error: RivuletError) -> Self {
        Self::new(move |observer| {
            observer.on_subscribe(Cancellable::empty());
            observer.on_error(error.clone());
        })
    }

    /// Run `f` on subscribe; succeed with its value or fail with its error.
    pub fn from_callable(f: impl Fn() -> Result<T> + Send + Sync + 'static) -> Self {
        Self::new(move |observer| {
            let handle = Cancellable::flag();
            observer.on_subscribe(handle.clone());
            let outcome = guarded("Single::from_callable", &f).and_then(|r| r);
            if handle.is_cancelled() {
                return;
            }
            match outcome {
                Ok(value) => observer.on_success(value),
                Err(error) => observer.on_error(error),
            }
        })
    }

    /// Invoke `supplier` on each subscribe to obtain a fresh upstream.
    pub fn defer(supplier: impl Fn() -> Single<T> + Send + Sync + 'static) -> Self {
        Self::new(move |observer| match guarded("Single::defer", &supplier) {
            Ok(source) => source.subscribe(observer),
            Err(error) => {
                observer.on_subscribe(Cancellable::empty());
                observer.on_error(error);
            }
        })
    }

    /// Take the first value of `source`; an empty source fails with
    /// [`RivuletError::NoSuchElement`].
    pub fn from_observable(source: &Observable<T>) -> Self {
        let source = source.clone();
        Self::new(move |observer| {
            source.subscribe(Arc::new(FirstValueObserver {
                downstream: observer,
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }

    /// Transform the success value.
    pub fn map<R: Send + 'static>(
        &self,
        f: impl Fn(T) -> R + Send + Sync + 'static,
    ) -> Single<R> {
        let source = self.clone();
        let f = Arc::new(f);
        Single::new(move |observer| {
            let f = Arc::clone(&f);
            let downstream = observer;
            source.subscribe(Arc::new(MapSingleObserver {
                downstream,
                f,
                upstream: SwapCancellable::new(),
            }));
        })
    }

    /// Chain another single computed from the success value.
    pub fn flat_map<R: Send + 'static>(
        &self,
        f: impl Fn(T) -> Single<R> + Send + Sync + 'static,
    ) -> Single<R> {
        let source = self.clone();
        let f: Arc<dyn Fn(T) -> Single<R> + Send + Sync> = Arc::new(f);
        Single::new(move |observer| {
            source.subscribe(Arc::new(FlatMapSingleObserver {
                downstream: observer,
                f: Arc::clone(&f),
                upstream: SwapCancellable::new(),
            }));
        })
    }

    /// Keep the value only if `predicate` accepts it, producing a [`Maybe`].
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Maybe<T> {
        let source = self.clone();
        let predicate: Arc<dyn Fn(&T) -> bool + Send + Sync> = Arc::new(predicate);
        Maybe::new(move |observer| {
            source.subscribe(Arc::new(FilterSingleObserver {
                downstream: observer,
                predicate: Arc::clone(&predicate),
                upstream: SwapCancellable::new(),
            }));
        })
    }

    /// Recover an error into a fallback value.
    pub fn on_error_return(&self, f: impl Fn(RivuletError) -> T + Send + Sync + 'static) -> Self {
        let source = self.clone();
        let f: Arc<dyn Fn(RivuletError) -> T + Send + Sync> = Arc::new(f);
        Single::new(move |observer| {
            source.subscribe(Arc::new(OnErrorReturnSingleObserver {
                downstream: observer,
                f: Arc::clone(&f),
                upstream: SwapCancellable::new(),
            }));
        })
    }

    /// Widen to an [`Observable`] that emits the value then completes.
    #[must_use]
    pub fn to_observable(&self) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |observer| {
            source.subscribe(Arc::new(SingleToObservableObserver {
                downstream: observer,
            }));
        })
    }

    /// Widen to a [`Maybe`] that always produces the value.
    #[must_use]
    pub fn to_maybe(&self) -> Maybe<T> {
        let source = self.clone();
        Maybe::new(move |observer| {
            source.subscribe(Arc::new(SingleToMaybeObserver {
                downstream: observer,
            }));
        })
    }

    /// Block the calling thread until the terminal arrives.
    ///
    /// Creates a fresh subscription per call. Must not be invoked from a
    /// trampoline task, where blocking would deadlock the queue.
    pub fn blocking_get(&self) -> Result<T> {
        let slot: Arc<(Mutex<Option<Result<T>>>, Condvar)> =
            Arc::new((Mutex::new(None), Condvar::new()));
        let writer = Arc::clone(&slot);
        let writer_err = Arc::clone(&slot);
        self.subscribe_all(
            move |value| {
                *writer.0.lock() = Some(Ok(value));
                writer.1.notify_all();
            },
            move |error| {
                *writer_err.0.lock() = Some(Err(error));
                writer_err.1.notify_all();
            },
        );
        let mut guard = slot.0.lock();
        while guard.is_none() {
            slot.1.wait(&mut guard);
        }
        guard.take().unwrap_or(Err(RivuletError::NoSuchElement))
    }
}

struct LambdaSingleObserver<T, S, E> {
    on_success: S,
    on_error: E,
    upstream: SwapCancellable,
    done: AtomicBool,
    _marker: PhantomData<fn(T)>,
}

impl<T, S, E> SingleObserver<T> for LambdaSingleObserver<T, S, E>
where
    T: Send,
    S: Fn(T) + Send + Sync,
    E: Fn(RivuletError) + Send + Sync,
{
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
    }

    fn on_success(&self, value: T) {
        if !self.done.swap(true, Ordering::AcqRel) && !self.upstream.is_cancelled() {
            (self.on_success)(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) && !self.upstream.is_cancelled() {
            (self.on_error)(error);
        }
    }
}

struct FirstValueObserver<T> {
    downstream: Arc<dyn SingleObserver<T>>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for FirstValueObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.upstream.cancel();
            self.downstream.on_success(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.downstream.on_error(RivuletError::NoSuchElement);
        }
    }
}

struct MapSingleObserver<T, R> {
    downstream: Arc<dyn SingleObserver<R>>,
    f: Arc<dyn Fn(T) -> R + Send + Sync>,
    upstream: SwapCancellable,
}

impl<T: Send, R: Send> SingleObserver<T> for MapSingleObserver<T, R> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_success(&self, value: T) {
        match guarded("Single::map", || (self.f)(value)) {
            Ok(mapped) => self.downstream.on_success(mapped),
            Err(error) => {
                self.upstream.cancel();
                self.downstream.on_error(error);
            }
        }
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}

struct FlatMapSingleObserver<T, R> {
    downstream: Arc<dyn SingleObserver<R>>,
    f: Arc<dyn Fn(T) -> Single<R> + Send + Sync>,
    upstream: SwapCancellable,
}

impl<T: Send + 'static, R: Send + 'static> SingleObserver<T> for FlatMapSingleObserver<T, R> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_success(&self, value: T) {
        match guarded("Single::flat_map", || (self.f)(value)) {
            Ok(inner) => {
                let downstream = Arc::clone(&self.downstream);
                let upstream = self.upstream.clone();
                inner.subscribe(Arc::new(InnerSingleObserver {
                    downstream,
                    upstream,
                }));
            }
            Err(error) => {
                self.upstream.cancel();
                self.downstream.on_error(error);
            }
        }
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}

struct InnerSingleObserver<R> {
    downstream: Arc<dyn SingleObserver<R>>,
    upstream: SwapCancellable,
}

impl<R: Send> SingleObserver<R> for InnerSingleObserver<R> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        // second upstream: track it in the shared slot so downstream cancel
        // reaches the inner subscription
        self.upstream.replace(cancellable);
    }

    fn on_success(&self, value: R) {
        self.downstream.on_success(value);
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}

struct FilterSingleObserver<T> {
    downstream: Arc<dyn crate::observer::MaybeObserver<T>>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    upstream: SwapCancellable,
}

impl<T: Send> SingleObserver<T> for FilterSingleObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_success(&self, value: T) {
        match guarded("Single::filter", || (self.predicate)(&value)) {
            Ok(true) => self.downstream.on_success(value),
            Ok(false) => self.downstream.on_complete(),
            Err(error) => self.downstream.on_error(error),
        }
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}

struct OnErrorReturnSingleObserver<T> {
    downstream: Arc<dyn SingleObserver<T>>,
    f: Arc<dyn Fn(RivuletError) -> T + Send + Sync>,
    upstream: SwapCancellable,
}

impl<T: Send> SingleObserver<T> for OnErrorReturnSingleObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_success(&self, value: T) {
        self.downstream.on_success(value);
    }

    fn on_error(&self, error: RivuletError) {
        match guarded("Single::on_error_return", || (self.f)(error)) {
            Ok(fallback) => self.downstream.on_success(fallback),
            Err(error) => self.downstream.on_error(error),
        }
    }
}

struct SingleToObservableObserver<T> {
    downstream: Arc<dyn Observer<T>>,
}

impl<T: Send> SingleObserver<T> for SingleToObservableObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.downstream.on_subscribe(cancellable);
    }

    fn on_success(&self, value: T) {
        self.downstream.on_next(value);
        self.downstream.on_complete();
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}

struct SingleToMaybeObserver<T> {
    downstream: Arc<dyn crate::observer::MaybeObserver<T>>,
}

impl<T: Send> SingleObserver<T> for SingleToMaybeObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.downstream.on_subscribe(cancellable);
    }

    fn on_success(&self, value: T) {
        self.downstream.on_success(value);
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}
