// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The many-valued reactive shape and its creation factories.
//!
//! An [`Observable`] is a cold recipe: nothing happens until an observer
//! subscribes, and every subscription re-runs the recipe. Hot sources
//! (subjects) share one timeline across subscribers and are layered on top of
//! this type by the subjects crate.

use crate::cancellable::{Cancellable, SwapCancellable};
use crate::error::{Result, RivuletError};
use crate::guard::guarded;
use crate::observer::Observer;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type SubscribeFn<T> = dyn Fn(Arc<dyn Observer<T>>) + Send + Sync;

/// A push-based source of `0..N` values terminated by completion or error.
///
/// The shape is a shared subscribe function; cloning an `Observable` clones
/// the recipe, not a subscription. Operators live in extension traits (see
/// the operators crate) and wrap the upstream recipe in a new one.
pub struct Observable<T> {
    subscriber: Arc<SubscribeFn<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            subscriber: Arc::clone(&self.subscriber),
        }
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Low-level constructor from a raw subscribe function.
    ///
    /// The function is invoked once per subscription and must honor the event
    /// protocol: deliver `on_subscribe` first, at most one terminal, nothing
    /// after a terminal or cancellation. Operators are built on this;
    /// application code should prefer [`Observable::create`], which enforces
    /// the protocol.
    pub fn new(subscribe: impl Fn(Arc<dyn Observer<T>>) + Send + Sync + 'static) -> Self {
        Self {
            subscriber: Arc::new(subscribe),
        }
    }

    /// Subscribe with a full observer.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) {
        (self.subscriber)(observer);
    }

    /// Subscribe with a value callback; errors and completion are ignored.
    pub fn subscribe_fn(&self, on_next: impl Fn(T) + Send + Sync + 'static) -> Cancellable {
        self.subscribe_all(on_next, |_| {}, || {})
    }

    /// Subscribe with callbacks for every notification kind.
    ///
    /// Returns the subscription handle; the same handle is what the
    /// callbacks' subscription received via `on_subscribe`.
    pub fn subscribe_all(
        &self,
        on_next: impl Fn(T) + Send + Sync + 'static,
        on_error: impl Fn(RivuletError) + Send + Sync + 'static,
        on_complete: impl Fn() + Send + Sync + 'static,
    ) -> Cancellable {
        let observer = Arc::new(LambdaObserver {
            on_next,
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

    /// Emit each provided value in order, then complete.
    pub fn of(values: Vec<T>) -> Self
    where
        T: Clone + Sync,
    {
        Self::from_iter(values)
    }

    /// Emit the single value, then complete.
    pub fn just(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::from_iter(std::iter::once(value))
    }

    /// Synchronously replay an iterable per subscription, then complete.
    ///
    /// The iterable is cloned for each subscription, so every subscriber sees
    /// an independent, complete pass.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    {
        Self::new(move |observer| {
            let handle = Cancellable::flag();
            observer.on_subscribe(handle.clone());
            for value in iter.clone() {
                if handle.is_cancelled() {
                    return;
                }
                observer.on_next(value);
            }
            if !handle.is_cancelled() {
                observer.on_complete();
            }
        })
    }

    /// Run `f` on subscribe; emit its value then complete, or its error.
    ///
    /// A panic inside `f` is captured and delivered as a terminal error.
    pub fn from_callable(f: impl Fn() -> Result<T> + Send + Sync + 'static) -> Self {
        Self::new(move |observer| {
            let handle = Cancellable::flag();
            observer.on_subscribe(handle.clone());
            let outcome = guarded("from_callable", &f).and_then(|r| r);
            if handle.is_cancelled() {
                return;
            }
            match outcome {
                Ok(value) => {
                    observer.on_next(value);
                    if !handle.is_cancelled() {
                        observer.on_complete();
                    }
                }
                Err(error) => observer.on_error(error),
            }
        })
    }

    /// Invoke `supplier` on each subscribe to obtain a fresh upstream.
    pub fn defer(supplier: impl Fn() -> Observable<T> + Send + Sync + 'static) -> Self {
        Self::new(move |observer| match guarded("defer", &supplier) {
            Ok(source) => source.subscribe(observer),
            Err(error) => {
                observer.on_subscribe(Cancellable::empty());
                observer.on_error(error);
            }
        })
    }

    /// Complete immediately without emitting.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(|observer| {
            observer.on_subscribe(Cancellable::empty());
            observer.on_complete();
        })
    }

    /// Emit nothing and never terminate.
    #[must_use]
    pub fn never() -> Self {
        Self::new(|observer| {
            observer.on_subscribe(Cancellable::flag());
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

    /// Bridge a push-style emitter into an observable.
    ///
    /// `emit` runs once per subscription with an [`Emitter`] handle. The
    /// emitter enforces the protocol: emissions after a terminal or after
    /// downstream cancellation are dropped, and a panic inside `emit` is
    /// delivered as a terminal error.
    pub fn create(emit: impl Fn(Emitter<T>) + Send + Sync + 'static) -> Self {
        Self::new(move |observer| {
            let emitter = Emitter::new(observer);
            let failsafe = emitter.clone();
            if let Err(error) = guarded("create", || emit(emitter)) {
                failsafe.error(error);
            }
        })
    }
}

impl Observable<u64> {
    /// Emit `start, start+1, …, start+count-1`, then complete.
    #[must_use]
    pub fn range(start: u64, count: u64) -> Self {
        Self::new(move |observer| {
            let handle = Cancellable::flag();
            observer.on_subscribe(handle.clone());
            for offset in 0..count {
                if handle.is_cancelled() {
                    return;
                }
                observer.on_next(start + offset);
            }
            if !handle.is_cancelled() {
                observer.on_complete();
            }
        })
    }
}

struct LambdaObserver<T, N, E, C> {
    on_next: N,
    on_error: E,
    on_complete: C,
    upstream: SwapCancellable,
    done: AtomicBool,
    _marker: PhantomData<fn(T)>,
}

impl<T, N, E, C> Observer<T> for LambdaObserver<T, N, E, C>
where
    T: Send,
    N: Fn(T) + Send + Sync,
    E: Fn(RivuletError) + Send + Sync,
    C: Fn() + Send + Sync,
{
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
    }

    fn on_next(&self, value: T) {
        if !self.done.load(Ordering::Acquire) && !self.upstream.is_cancelled() {
            (self.on_next)(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) && !self.upstream.is_cancelled() {
            (self.on_error)(error);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) && !self.upstream.is_cancelled() {
            (self.on_complete)();
        }
    }
}

struct EmitterShared {
    done: AtomicBool,
    handle: SwapCancellable,
}

/// Push handle given to [`Observable::create`] emitter functions.
///
/// Clonable so producers may emit from other threads; terminal and
/// cancellation guards are shared across clones.
pub struct Emitter<T> {
    observer: Arc<dyn Observer<T>>,
    shared: Arc<EmitterShared>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            observer: Arc::clone(&self.observer),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Emitter<T> {
    fn new(observer: Arc<dyn Observer<T>>) -> Self {
        let shared = Arc::new(EmitterShared {
            done: AtomicBool::new(false),
            handle: SwapCancellable::new(),
        });
        observer.on_subscribe(shared.handle.as_cancellable());
        Self { observer, shared }
    }

    /// Emit a value. Dropped after a terminal or cancellation.
    pub fn next(&self, value: T) {
        if !self.shared.done.load(Ordering::Acquire) && !self.is_cancelled() {
            self.observer.on_next(value);
        }
    }

    /// Terminate with an error. Later terminals are dropped.
    pub fn error(&self, error: RivuletError) {
        if !self.shared.done.swap(true, Ordering::AcqRel) && !self.is_cancelled() {
            self.observer.on_error(error);
        }
    }

    /// Terminate with completion. Later terminals are dropped.
    pub fn complete(&self) {
        if !self.shared.done.swap(true, Ordering::AcqRel) && !self.is_cancelled() {
            self.observer.on_complete();
        }
    }

    /// Returns `true` once the downstream has cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.handle.is_cancelled()
    }

    /// Attach a resource released when the subscription is cancelled.
    ///
    /// Replaces (and cancels) any previously attached resource.
    pub fn set_cancellable(&self, cancellable: Cancellable) {
        self.shared.handle.replace(cancellable);
    }
}
