// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error recovery operators.

use rivulet_core::{guarded, Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the error recovery operators.
pub trait OnErrorExt<T: Send + 'static> {
    /// Replace an error terminal with `f(error)` followed by completion.
    fn on_error_return(&self, f: impl Fn(RivuletError) -> T + Send + Sync + 'static)
        -> Observable<T>;

    /// Replace an error terminal by subscribing to `f(error)` and forwarding
    /// it.
    fn on_error_resume_next(
        &self,
        f: impl Fn(RivuletError) -> Observable<T> + Send + Sync + 'static,
    ) -> Observable<T>;

    /// Swallow the error terminal, completing instead.
    fn on_error_complete(&self) -> Observable<T>;
}

impl<T: Send + 'static> OnErrorExt<T> for Observable<T> {
    fn on_error_return(
        &self,
        f: impl Fn(RivuletError) -> T + Send + Sync + 'static,
    ) -> Observable<T> {
        let source = self.clone();
        let f: Arc<dyn Fn(RivuletError) -> T + Send + Sync> = Arc::new(f);
        Observable::new(move |observer| {
            source.subscribe(Arc::new(OnErrorReturnObserver {
                downstream: observer,
                f: Arc::clone(&f),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }

    fn on_error_resume_next(
        &self,
        f: impl Fn(RivuletError) -> Observable<T> + Send + Sync + 'static,
    ) -> Observable<T> {
        let source = self.clone();
        let f: Arc<dyn Fn(RivuletError) -> Observable<T> + Send + Sync> = Arc::new(f);
        Observable::new(move |observer| {
            source.subscribe(Arc::new(ResumeNextObserver {
                downstream: observer,
                f: Arc::clone(&f),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }

    fn on_error_complete(&self) -> Observable<T> {
        self.on_error_resume_next(|_| Observable::empty())
    }
}

struct OnErrorReturnObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    f: Arc<dyn Fn(RivuletError) -> T + Send + Sync>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for OnErrorReturnObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if !self.done.load(Ordering::Acquire) {
            self.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            match guarded("on_error_return", || (self.f)(error)) {
                Ok(fallback) => {
                    self.downstream.on_next(fallback);
                    self.downstream.on_complete();
                }
                Err(error) => self.downstream.on_error(error),
            }
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.downstream.on_complete();
        }
    }
}

struct ResumeNextObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    f: Arc<dyn Fn(RivuletError) -> Observable<T> + Send + Sync>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send + 'static> Observer<T> for ResumeNextObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if !self.done.load(Ordering::Acquire) {
            self.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        match guarded("on_error_resume_next", || (self.f)(error)) {
            Ok(fallback) => {
                fallback.subscribe(Arc::new(FallbackObserver {
                    downstream: Arc::clone(&self.downstream),
                    upstream: self.upstream.clone(),
                    done: AtomicBool::new(false),
                }));
            }
            Err(error) => self.downstream.on_error(error),
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.downstream.on_complete();
        }
    }
}

struct FallbackObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for FallbackObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        // downstream's handle now controls the fallback subscription
        self.upstream.replace(cancellable);
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
