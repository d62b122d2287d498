// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The value-less reactive shape: completion or error only.

use crate::cancellable::{Cancellable, SwapCancellable};
use crate::error::{Result, RivuletError};
use crate::guard::guarded;
use crate::observable::Observable;
use crate::observer::{CompletableObserver, Observer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type SubscribeFn = dyn Fn(Arc<dyn CompletableObserver>) + Send + Sync;

/// A source carrying no values: it either completes or errors.
#[derive(Clone)]
pub struct Completable {
    subscriber: Arc<SubscribeFn>,
}

impl Completable {
    /// Low-level constructor from a raw subscribe function.
    pub fn new(subscribe: impl Fn(Arc<dyn CompletableObserver>) + Send + Sync + 'static) -> Self {
        Self {
            subscriber: Arc::new(subscribe),
        }
    }

    /// Subscribe with a full observer.
    pub fn subscribe(&self, observer: Arc<dyn CompletableObserver>) {
        (self.subscriber)(observer);
    }

    /// Subscribe with completion/error callbacks; returns the subscription
    /// handle.
    pub fn subscribe_all(
        &self,
        on_complete: impl Fn() + Send + Sync + 'static,
        on_error: impl Fn(RivuletError) + Send + Sync + 'static,
    ) -> Cancellable {
        let observer = Arc::new(LambdaCompletableObserver {
            on_complete,
            on_error,
            upstream: SwapCancellable::new(),
            done: AtomicBool::new(false),
        });
        let handle = observer.upstream.as_cancellable();
        self.subscribe(observer);
        handle
    }

    /// Complete immediately.
    #[must_use]
    pub fn complete() -> Self {
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

    /// Run `action` on subscribe; complete on `Ok`, error on `Err` or panic.
    pub fn from_action(action: impl Fn() -> Result<()> + Send + Sync + 'static) -> Self {
        Self::new(move |observer| {
            let handle = Cancellable::flag();
            observer.on_subscribe(handle.clone());
            let outcome = guarded("Completable::from_action", &action).and_then(|r| r);
            if handle.is_cancelled() {
                return;
            }
            match outcome {
                Ok(()) => observer.on_complete(),
                Err(error) => observer.on_error(error),
            }
        })
    }

    /// Subscribe to `source` and discard its values, completing when it does.
    pub fn from_observable<T: Send + 'static>(source: &Observable<T>) -> Self {
        let source = source.clone();
        Self::new(move |observer| {
            source.subscribe(Arc::new(IgnoreElementsObserver {
                downstream: observer,
                _marker: std::marker::PhantomData,
            }));
        })
    }

    /// Run `next` after this completable completes.
    #[must_use]
    pub fn and_then(&self, next: Completable) -> Completable {
        let source = self.clone();
        Completable::new(move |observer| {
            source.subscribe(Arc::new(AndThenObserver {
                downstream: observer,
                next: next.clone(),
                upstream: SwapCancellable::new(),
            }));
        })
    }

    /// Swallow the error terminal, completing instead.
    #[must_use]
    pub fn on_error_complete(&self) -> Completable {
        let source = self.clone();
        Completable::new(move |observer| {
            source.subscribe(Arc::new(OnErrorCompleteObserver {
                downstream: observer,
            }));
        })
    }

    /// Widen to an empty [`Observable`] of any element type.
    #[must_use]
    pub fn to_observable<T: Send + 'static>(&self) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |observer| {
            source.subscribe(Arc::new(CompletableToObservableObserver {
                downstream: observer,
            }));
        })
    }

    /// Block the calling thread until the terminal arrives.
    ///
    /// Fresh subscription per call; must not run on a trampoline task.
    pub fn blocking_await(&self) -> Result<()> {
        use parking_lot::{Condvar, Mutex};
        let slot: Arc<(Mutex<Option<Result<()>>>, Condvar)> =
            Arc::new((Mutex::new(None), Condvar::new()));
        let on_complete = Arc::clone(&slot);
        let on_error = Arc::clone(&slot);
        self.subscribe_all(
            move || {
                *on_complete.0.lock() = Some(Ok(()));
                on_complete.1.notify_all();
            },
            move |error| {
                *on_error.0.lock() = Some(Err(error));
                on_error.1.notify_all();
            },
        );
        let mut guard = slot.0.lock();
        while guard.is_none() {
            slot.1.wait(&mut guard);
        }
        guard.take().unwrap_or(Ok(()))
    }
}

struct LambdaCompletableObserver<C, E> {
    on_complete: C,
    on_error: E,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<C, E> CompletableObserver for LambdaCompletableObserver<C, E>
where
    C: Fn() + Send + Sync,
    E: Fn(RivuletError) + Send + Sync,
{
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
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

struct IgnoreElementsObserver<T> {
    downstream: Arc<dyn CompletableObserver>,
    _marker: std::marker::PhantomData<fn(T)>,
}

impl<T: Send> Observer<T> for IgnoreElementsObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.downstream.on_subscribe(cancellable);
    }

    fn on_next(&self, _value: T) {}

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}

struct AndThenObserver {
    downstream: Arc<dyn CompletableObserver>,
    next: Completable,
    upstream: SwapCancellable,
}

impl CompletableObserver for AndThenObserver {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_complete(&self) {
        let downstream = Arc::clone(&self.downstream);
        let upstream = self.upstream.clone();
        self.next.subscribe(Arc::new(SecondCompletableObserver {
            downstream,
            upstream,
        }));
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}

struct SecondCompletableObserver {
    downstream: Arc<dyn CompletableObserver>,
    upstream: SwapCancellable,
}

impl CompletableObserver for SecondCompletableObserver {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}

struct OnErrorCompleteObserver {
    downstream: Arc<dyn CompletableObserver>,
}

impl CompletableObserver for OnErrorCompleteObserver {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.downstream.on_subscribe(cancellable);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }

    fn on_error(&self, _error: RivuletError) {
        self.downstream.on_complete();
    }
}

struct CompletableToObservableObserver<T> {
    downstream: Arc<dyn Observer<T>>,
}

impl<T: Send> CompletableObserver for CompletableToObservableObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.downstream.on_subscribe(cancellable);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }
}
