// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Side-effect taps.
//!
//! Taps never alter the stream: a panicking side-effect handler is swallowed
//! (logged at warn) and the original notification proceeds.

use rivulet_core::{guarded, Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the side-effect operators.
pub trait TapExt<T: Send + 'static> {
    /// Run `f` for each value before forwarding it.
    fn do_on_next(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Observable<T>;

    /// Run `f` for the error terminal before forwarding it.
    fn do_on_error(&self, f: impl Fn(&RivuletError) + Send + Sync + 'static) -> Observable<T>;

    /// Run `f` for the completion terminal before forwarding it.
    fn do_on_complete(&self, f: impl Fn() + Send + Sync + 'static) -> Observable<T>;

    /// Run `f` exactly once after the terminal or on cancellation,
    /// whichever comes first.
    fn do_finally(&self, f: impl Fn() + Send + Sync + 'static) -> Observable<T>;
}

impl<T: Send + 'static> TapExt<T> for Observable<T> {
    fn do_on_next(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Observable<T> {
        self.tap(Some(Arc::new(f)), None, None)
    }

    fn do_on_error(&self, f: impl Fn(&RivuletError) + Send + Sync + 'static) -> Observable<T> {
        self.tap(None, Some(Arc::new(f)), None)
    }

    fn do_on_complete(&self, f: impl Fn() + Send + Sync + 'static) -> Observable<T> {
        self.tap(None, None, Some(Arc::new(f)))
    }

    fn do_finally(&self, f: impl Fn() + Send + Sync + 'static) -> Observable<T> {
        let source = self.clone();
        let f: Arc<dyn Fn() + Send + Sync> = Arc::new(f);
        Observable::new(move |observer| {
            source.subscribe(Arc::new(FinallyObserver {
                downstream: observer,
                f: Arc::clone(&f),
                ran: Arc::new(AtomicBool::new(false)),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }
}

type NextTap<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorTap = Arc<dyn Fn(&RivuletError) + Send + Sync>;
type CompleteTap = Arc<dyn Fn() + Send + Sync>;

trait TapInternal<T: Send + 'static> {
    fn tap(
        &self,
        on_next: Option<NextTap<T>>,
        on_error: Option<ErrorTap>,
        on_complete: Option<CompleteTap>,
    ) -> Observable<T>;
}

impl<T: Send + 'static> TapInternal<T> for Observable<T> {
    fn tap(
        &self,
        on_next: Option<NextTap<T>>,
        on_error: Option<ErrorTap>,
        on_complete: Option<CompleteTap>,
    ) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |observer| {
            source.subscribe(Arc::new(TapObserver {
                downstream: observer,
                on_next: on_next.clone(),
                on_error: on_error.clone(),
                on_complete: on_complete.clone(),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }
}

fn swallow(context: &str, f: impl FnOnce()) {
    if guarded(context, f).is_err() {
        tracing::warn!(context, "side-effect handler panicked; notification proceeds");
    }
}

struct TapObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    on_next: Option<NextTap<T>>,
    on_error: Option<ErrorTap>,
    on_complete: Option<CompleteTap>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for TapObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        if let Some(tap) = &self.on_next {
            swallow("do_on_next", || tap(&value));
        }
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            if let Some(tap) = &self.on_error {
                swallow("do_on_error", || tap(&error));
            }
            self.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            if let Some(tap) = &self.on_complete {
                swallow("do_on_complete", || tap());
            }
            self.downstream.on_complete();
        }
    }
}

struct FinallyObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    f: Arc<dyn Fn() + Send + Sync>,
    ran: Arc<AtomicBool>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T> FinallyObserver<T> {
    fn run_once(ran: &AtomicBool, f: &Arc<dyn Fn() + Send + Sync>) {
        if !ran.swap(true, Ordering::AcqRel) {
            swallow("do_finally", || f());
        }
    }
}

impl<T: Send> Observer<T> for FinallyObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        let upstream = self.upstream.clone();
        let ran = Arc::clone(&self.ran);
        let f = Arc::clone(&self.f);
        self.downstream
            .on_subscribe(Cancellable::from_action(move || {
                upstream.cancel();
                Self::run_once(&ran, &f);
            }));
    }

    fn on_next(&self, value: T) {
        if !self.done.load(Ordering::Acquire) {
            self.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.downstream.on_error(error);
            Self::run_once(&self.ran, &self.f);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.downstream.on_complete();
            Self::run_once(&self.ran, &self.f);
        }
    }
}
