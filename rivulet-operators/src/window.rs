// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Splitting a stream into inner streams by size or time.
//!
//! Windows are backed by replay subjects: values pushed into a window before
//! the downstream got around to subscribing to it are not lost. The uniform
//! rule applies for counted windows: a window opens every `skip` values and
//! closes after `count` values, with no special case for `count == 1`.

use parking_lot::Mutex;
use rivulet_core::{
    Cancellable, Observable, Observer, RivuletError, Scheduler, SerializedObserver,
    SwapCancellable,
};
use rivulet_subjects::ReplaySubject;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing the `window` operators.
pub trait WindowExt<T: Clone + Send + 'static> {
    /// Split into consecutive windows of `count` values.
    fn window_count(&self, count: usize) -> Observable<Observable<T>> {
        self.window_count_with_skip(count, count)
    }

    /// Open a window every `skip` values, closing each after `count` values:
    /// overlapping when `skip < count`, gapped when `skip > count`. Open
    /// windows complete when the upstream terminates.
    fn window_count_with_skip(&self, count: usize, skip: usize) -> Observable<Observable<T>>;

    /// Open a fresh window every `span`; each value lands in the window open
    /// at its arrival.
    fn window_time(
        &self,
        span: Duration,
        scheduler: Arc<dyn Scheduler>,
    ) -> Observable<Observable<T>>;
}

impl<T: Clone + Send + 'static> WindowExt<T> for Observable<T> {
    fn window_count_with_skip(&self, count: usize, skip: usize) -> Observable<Observable<T>> {
        assert!(count > 0, "window count must be at least 1");
        assert!(skip > 0, "window skip must be at least 1");
        let source = self.clone();
        Observable::new(move |observer| {
            source.subscribe(Arc::new(WindowCountObserver {
                downstream: observer,
                state: Mutex::new(WindowCountState {
                    open: VecDeque::new(),
                    index: 0,
                }),
                count,
                skip,
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }

    fn window_time(
        &self,
        span: Duration,
        scheduler: Arc<dyn Scheduler>,
    ) -> Observable<Observable<T>> {
        let source = self.clone();
        let scheduler = Arc::clone(&scheduler);
        Observable::new(move |observer| {
            let state = Arc::new(WindowTimeState {
                downstream: SerializedObserver::new(observer),
                current: Mutex::new(None),
                upstream: SwapCancellable::new(),
                ticker: SwapCancellable::new(),
                done: AtomicBool::new(false),
            });
            let subscription = {
                let cancel_state = Arc::clone(&state);
                Cancellable::from_action(move || {
                    cancel_state.upstream.cancel();
                    cancel_state.ticker.cancel();
                })
            };
            state.downstream.on_subscribe(subscription);
            state.open_window();

            let tick_state = Arc::clone(&state);
            let ticker = scheduler.schedule_periodic(
                span,
                span,
                Box::new(move || {
                    if !tick_state.done.load(Ordering::Acquire) {
                        tick_state.roll_window();
                    }
                }),
            );
            state.ticker.replace(ticker);

            source.subscribe(Arc::new(WindowTimeObserver {
                state: Arc::clone(&state),
            }));
        })
    }
}

struct WindowCountState<T> {
    // (window, values already delivered into it), oldest first
    open: VecDeque<(ReplaySubject<T>, usize)>,
    index: usize,
}

struct WindowCountObserver<T> {
    downstream: Arc<dyn Observer<Observable<T>>>,
    state: Mutex<WindowCountState<T>>,
    count: usize,
    skip: usize,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Clone + Send + 'static> Observer<T> for WindowCountObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        let opened = {
            let mut state = self.state.lock();
            if state.index % self.skip == 0 {
                let window = ReplaySubject::new();
                state.open.push_back((window.clone(), 0));
                Some(window)
            } else {
                None
            }
        };
        if let Some(window) = opened {
            // announce the window before any of its values
            self.downstream.on_next(window.as_observable());
        }

        let closed = {
            let mut state = self.state.lock();
            state.index += 1;
            for (window, delivered) in state.open.iter_mut() {
                window.on_next(value.clone());
                *delivered += 1;
            }
            if state
                .open
                .front()
                .is_some_and(|(_, delivered)| *delivered == self.count)
            {
                state.open.pop_front()
            } else {
                None
            }
        };
        if let Some((window, _)) = closed {
            window.on_complete();
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            let open: Vec<_> = self.state.lock().open.drain(..).collect();
            for (window, _) in open {
                window.on_error(error.clone());
            }
            self.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            let open: Vec<_> = self.state.lock().open.drain(..).collect();
            for (window, _) in open {
                window.on_complete();
            }
            self.downstream.on_complete();
        }
    }
}

struct WindowTimeState<T> {
    downstream: SerializedObserver<Observable<T>>,
    current: Mutex<Option<ReplaySubject<T>>>,
    upstream: SwapCancellable,
    ticker: SwapCancellable,
    done: AtomicBool,
}

impl<T: Clone + Send + 'static> WindowTimeState<T> {
    fn open_window(&self) {
        let window = ReplaySubject::new();
        *self.current.lock() = Some(window.clone());
        self.downstream.on_next(window.as_observable());
    }

    fn roll_window(&self) {
        let previous = self.current.lock().take();
        if let Some(previous) = previous {
            previous.on_complete();
        }
        self.open_window();
    }

    fn close_current(&self) -> Option<ReplaySubject<T>> {
        self.current.lock().take()
    }
}

struct WindowTimeObserver<T> {
    state: Arc<WindowTimeState<T>>,
}

impl<T: Clone + Send + 'static> Observer<T> for WindowTimeObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.upstream.replace(cancellable);
    }

    fn on_next(&self, value: T) {
        if self.state.done.load(Ordering::Acquire) {
            return;
        }
        let current = self.state.current.lock().clone();
        if let Some(window) = current {
            window.on_next(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.ticker.cancel();
            if let Some(window) = self.state.close_current() {
                window.on_error(error.clone());
            }
            self.state.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.ticker.cancel();
            if let Some(window) = self.state.close_current() {
                window.on_complete();
            }
            self.state.downstream.on_complete();
        }
    }
}
