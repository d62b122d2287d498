// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Batching into lists by size or time.

use parking_lot::Mutex;
use rivulet_core::{
    Cancellable, Observable, Observer, RivuletError, Scheduler, SerializedObserver,
    SwapCancellable,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing the `buffer` operators.
pub trait BufferExt<T: Clone + Send + 'static> {
    /// Collect every `count` consecutive values into a list.
    fn buffer_count(&self, count: usize) -> Observable<Vec<T>> {
        self.buffer_count_with_skip(count, count)
    }

    /// Collect values into lists of `count`, opening a new list every `skip`
    /// values: `skip < count` produces overlapping lists, `skip > count`
    /// gapped ones. A partial list is flushed at completion.
    fn buffer_count_with_skip(&self, count: usize, skip: usize) -> Observable<Vec<T>>;

    /// Collect values into lists flushed every `span` (empty lists
    /// included); the final partial list is flushed at completion.
    fn buffer_time(&self, span: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<Vec<T>>;
}

impl<T: Clone + Send + 'static> BufferExt<T> for Observable<T> {
    fn buffer_count_with_skip(&self, count: usize, skip: usize) -> Observable<Vec<T>> {
        assert!(count > 0, "buffer count must be at least 1");
        assert!(skip > 0, "buffer skip must be at least 1");
        let source = self.clone();
        Observable::new(move |observer| {
            source.subscribe(Arc::new(BufferCountObserver {
                downstream: observer,
                state: Mutex::new(BufferCountState {
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

    fn buffer_time(&self, span: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<Vec<T>> {
        let source = self.clone();
        let scheduler = Arc::clone(&scheduler);
        Observable::new(move |observer| {
            let state = Arc::new(BufferTimeState {
                downstream: SerializedObserver::new(observer),
                current: Mutex::new(Vec::new()),
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

            let tick_state = Arc::clone(&state);
            let ticker = scheduler.schedule_periodic(
                span,
                span,
                Box::new(move || {
                    if !tick_state.done.load(Ordering::Acquire) {
                        let batch = std::mem::take(&mut *tick_state.current.lock());
                        tick_state.downstream.on_next(batch);
                    }
                }),
            );
            state.ticker.replace(ticker);

            source.subscribe(Arc::new(BufferTimeObserver {
                state: Arc::clone(&state),
            }));
        })
    }
}

struct BufferCountState<T> {
    // currently open lists, oldest first
    open: VecDeque<Vec<T>>,
    index: usize,
}

struct BufferCountObserver<T> {
    downstream: Arc<dyn Observer<Vec<T>>>,
    state: Mutex<BufferCountState<T>>,
    count: usize,
    skip: usize,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Clone + Send + 'static> Observer<T> for BufferCountObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        let closed = {
            let mut state = self.state.lock();
            if state.index % self.skip == 0 {
                state.open.push_back(Vec::with_capacity(self.count));
            }
            state.index += 1;
            for buffer in state.open.iter_mut() {
                buffer.push(value.clone());
            }
            // only the oldest open list can reach capacity
            if state.open.front().is_some_and(|b| b.len() == self.count) {
                state.open.pop_front()
            } else {
                None
            }
        };
        if let Some(batch) = closed {
            self.downstream.on_next(batch);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.state.lock().open.clear();
            self.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            let remaining: Vec<Vec<T>> = self.state.lock().open.drain(..).collect();
            for batch in remaining {
                if !batch.is_empty() {
                    self.downstream.on_next(batch);
                }
            }
            self.downstream.on_complete();
        }
    }
}

struct BufferTimeState<T> {
    downstream: SerializedObserver<Vec<T>>,
    current: Mutex<Vec<T>>,
    upstream: SwapCancellable,
    ticker: SwapCancellable,
    done: AtomicBool,
}

struct BufferTimeObserver<T> {
    state: Arc<BufferTimeState<T>>,
}

impl<T: Clone + Send + 'static> Observer<T> for BufferTimeObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.upstream.replace(cancellable);
    }

    fn on_next(&self, value: T) {
        if !self.state.done.load(Ordering::Acquire) {
            self.state.current.lock().push(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.ticker.cancel();
            self.state.current.lock().clear();
            self.state.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.state.done.swap(true, Ordering::AcqRel) {
            self.state.ticker.cancel();
            let batch = std::mem::take(&mut *self.state.current.lock());
            if !batch.is_empty() {
                self.state.downstream.on_next(batch);
            }
            self.state.downstream.on_complete();
        }
    }
}
