// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The zero-or-one-value reactive shape.

use crate::cancellable::{Cancellable, SwapCancellable};
use crate::error::{Result, RivuletError};
use crate::guard::guarded;
use crate::observable::Observable;
use crate::observer::{MaybeObserver, Observer, SingleObserver};
use crate::single::Single;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type SubscribeFn<T> = dyn Fn(Arc<dyn MaybeObserver<T>>) + Send + Sync;

/// A source that terminates with one value, empty completion, or an error.
pub struct Maybe<T> {
    subscriber: Arc<SubscribeFn<T>>,
}

impl<T> Clone for Maybe<T> {
    fn clone(&self) -> Self {
        Self {
            subscriber: Arc::clone(&self.subscriber),
        }
    }
}

impl<T: Send + 'static> Maybe<T> {
    /// Low-level constructor from a raw subscribe function.
    pub fn new(subscribe: impl Fn(Arc<dyn MaybeObserver<T>>) + Send + Sync + 'static) -> Self {
        Self {
            subscriber: Arc::new(subscribe),
        }
    }

    /// Subscribe with a full observer.
    pub fn subscribe(&self, observer: Arc<dyn MaybeObserver<T>>) {
        (self.subscriber)(observer);
    }

    /// Subscribe with callbacks for every notification kind.
    pub fn subscribe_all(
        &self,
        on_success: impl Fn(T) + Send + Sync + 'static,
        on_error: impl Fn(RivuletError) + Send + Sync + 'static,
        on_complete: impl Fn() + Send + Sync + 'static,
    ) -> Cancellable {
        let observer = Arc::new(LambdaMaybeObserver {
            on_success,
            on_error,
            on_complete,
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

    /// Complete immediately without a value.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(|observer| {
            observer.on_subscribe(Cancellable::empty());
            observer.on_complete();
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

    /// Take the first value of `source`; an empty source completes empty.
    pub fn from_observable(source: &Observable<T>) -> Self {
        let source = source.clone();
        Self::new(move |observer| {
            source.subscribe(Arc::new(FirstValueMaybeObserver {
                downstream: observer,
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }

    /// Transform the success value.
    pub fn map<R: Send + 'static>(&self, f: impl Fn(T) -> R + Send + Sync + 'static) -> Maybe<R> {
        let source = self.clone();
        let f: Arc<dyn Fn(T) -> R + Send + Sync> = Arc::new(f);
        Maybe::new(move |observer| {
            source.subscribe(Arc::new(MapMaybeObserver {
                downstream: observer,
                f: Arc::clone(&f),
                upstream: SwapCancellable::new(),
            }));
        })
    }

    /// Drop the value (completing empty) unless `predicate` accepts it.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Maybe<T> {
        let source = self.clone();
        let predicate: Arc<dyn Fn(&T) -> bool + Send + Sync> = Arc::new(predicate);
        Maybe::new(move |observer| {
            source.subscribe(Arc::new(FilterMaybeObserver {
                downstream: observer,
                predicate: Arc::clone(&predicate),
                upstream: SwapCancellable::new(),
            }));
        })
    }

    /// Narrow to a [`Single`]; an empty source fails with
    /// [`RivuletError::NoSuchElement`].
    #[must_use]
    pub fn to_single(&self) -> Single<T> {
        let source = self.clone();
        Single::new(move |observer| {
            source.subscribe(Arc::new(MaybeToSingleObserver {
                downstream: observer,
            }));
        })
    }

    /// Narrow to a [`Single`], substituting `default` when empty.
    pub fn default_if_empty(&self, default: T) -> Single<T>
    where
        T: Clone + Sync,
    {
        let source = self.clone();
        Single::new(move |observer| {
            source.subscribe(Arc::new(DefaultIfEmptyObserver {
                downstream: observer,
                default: default.clone(),
            }));
        })
    }

    /// Widen to an [`Observable`] of zero or one value.
    #[must_use]
    pub fn to_observable(&self) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |observer| {
            source.subscribe(Arc::new(MaybeToObservableObserver {
                downstream: observer,
            }));
        })
    }

    /// Block the calling thread until the terminal arrives.
    ///
    /// Returns `Ok(None)` for empty completion. Fresh subscription per call;
    /// must not run on a trampoline task.
    pub fn blocking_get(&self) -> Result<Option<T>> {
        use parking_lot::{Condvar, Mutex};
        let slot: Arc<(Mutex<Option<Result<Option<T>>>>, Condvar)> =
            Arc::new((Mutex::new(None), Condvar::new()));
        let on_success = Arc::clone(&slot);
        let on_error = Arc::clone(&slot);
        let on_complete = Arc::clone(&slot);
        self.subscribe_all(
            move |value| {
                *on_success.0.lock() = Some(Ok(Some(value)));
                on_success.1.notify_all();
            },
            move |error| {
                *on_error.0.lock() = Some(Err(error));
                on_error.1.notify_all();
            },
            move || {
                *on_complete.0.lock() = Some(Ok(None));
                on_complete.1.notify_all();
            },
        );
        let mut guard = slot.0.lock();
        while guard.is_none() {
            slot.1.wait(&mut guard);
        }
        guard.take().unwrap_or(Ok(None))
    }
}

struct LambdaMaybeObserver<T, S, E, C> {
    on_success: S,
    on_error: E,
    on_complete: C,
    upstream: SwapCancellable,
    done: AtomicBool,
    _marker: PhantomData<fn(T)>,
}

impl<T, S, E, C> MaybeObserver<T> for LambdaMaybeObserver<T, S, E, C>
where
    T: Send,
    S: Fn(T) + Send + Sync,
    E: Fn(RivuletError) + Send + Sync,
    C: Fn() + Send + Sync,
{
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
    }

    fn on_success(&self, value: T) {
        if !self.done.swap(true, Ordering::AcqRel) && !self.upstream.is_cancelled() {
            (self.on_success)(value);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) && !self.upstream.is_cancelled() {
            (self.on_complete)();
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) && !self.upstream.is_cancelled() {
            (self.on_error)(error);
        }
    }
}

struct FirstValueMaybeObserver<T> {
    downstream: Arc<dyn MaybeObserver<T>>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for FirstValueMaybeObserver<T> {
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
            self.downstream.on_complete();
        }
    }
}

struct MapMaybeObserver<T, R> {
    downstream: Arc<dyn MaybeObserver<R>>,
    f: Arc<dyn Fn(T) -> R + Send + Sync>,
    upstream: SwapCancellable,
}

impl<T: Send, R: Send> MaybeObserver<T> for MapMaybeObserver<T, R> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_success(&self, value: T) {
        match guarded("Maybe::map", || (self.f)(value)) {
            Ok(mapped) => self.downstream.on_success(mapped),
            Err(error) => {
                self.upstream.cancel();
                self.downstream.on_error(error);
            }
        }
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}

struct FilterMaybeObserver<T> {
    downstream: Arc<dyn MaybeObserver<T>>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    upstream: SwapCancellable,
}

impl<T: Send> MaybeObserver<T> for FilterMaybeObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_success(&self, value: T) {
        match guarded("Maybe::filter", || (self.predicate)(&value)) {
            Ok(true) => self.downstream.on_success(value),
            Ok(false) => self.downstream.on_complete(),
            Err(error) => self.downstream.on_error(error),
        }
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}

struct MaybeToSingleObserver<T> {
    downstream: Arc<dyn SingleObserver<T>>,
}

impl<T: Send> MaybeObserver<T> for MaybeToSingleObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.downstream.on_subscribe(cancellable);
    }

    fn on_success(&self, value: T) {
        self.downstream.on_success(value);
    }

    fn on_complete(&self) {
        self.downstream.on_error(RivuletError::NoSuchElement);
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}

struct DefaultIfEmptyObserver<T> {
    downstream: Arc<dyn SingleObserver<T>>,
    default: T,
}

impl<T: Clone + Send + Sync> MaybeObserver<T> for DefaultIfEmptyObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.downstream.on_subscribe(cancellable);
    }

    fn on_success(&self, value: T) {
        self.downstream.on_success(value);
    }

    fn on_complete(&self) {
        self.downstream.on_success(self.default.clone());
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}

struct MaybeToObservableObserver<T> {
    downstream: Arc<dyn Observer<T>>,
}

impl<T: Send> MaybeObserver<T> for MaybeToObservableObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.downstream.on_subscribe(cancellable);
    }

    fn on_success(&self, value: T) {
        self.downstream.on_next(value);
        self.downstream.on_complete();
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}
