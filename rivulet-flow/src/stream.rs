// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Interop with the Rust async ecosystem's demand-aware stream standard.
//!
//! `futures::Stream` is pull-based: each `poll_next` is one unit of demand.
//! [`FlowStream`] bridges a [`Flowable`] into that world with prefetching
//! (request a batch, replenish at the halfway mark), and
//! [`observable_from_stream`] drains a stream with unbounded demand on the
//! subscribing thread.

use crate::flowable::Flowable;
use crate::subscriber::{FlowSubscriber, Subscription};
use parking_lot::Mutex;
use rivulet_core::{Cancellable, Observable, Result, RivuletError};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

const PREFETCH: usize = 32;

/// Extension trait bridging a [`Flowable`] into a [`futures::Stream`].
pub trait IntoStreamExt<T: Send + 'static> {
    /// Adapt into a `futures::Stream` of `Result` items.
    ///
    /// Subscription is lazy (first poll); demand is prefetched in batches of
    /// 32 and replenished once half a batch was consumed. Dropping the
    /// stream cancels the subscription.
    fn into_stream(&self) -> FlowStream<T>;
}

impl<T: Send + 'static> IntoStreamExt<T> for Flowable<T> {
    fn into_stream(&self) -> FlowStream<T> {
        FlowStream {
            flowable: self.clone(),
            shared: Arc::new(StreamShared {
                state: Mutex::new(StreamState {
                    queue: VecDeque::new(),
                    terminal: None,
                    waker: None,
                    subscription: None,
                }),
                consumed: AtomicUsize::new(0),
            }),
            started: false,
        }
    }
}

struct StreamState<T> {
    queue: VecDeque<T>,
    // Some(None) = completed, Some(Some(e)) = errored
    terminal: Option<Option<RivuletError>>,
    waker: Option<Waker>,
    subscription: Option<Subscription>,
}

struct StreamShared<T> {
    state: Mutex<StreamState<T>>,
    consumed: AtomicUsize,
}

impl<T> StreamShared<T> {
    fn wake(&self) {
        let waker = self.state.lock().waker.take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// `futures::Stream` adapter over a [`Flowable`]; see
/// [`IntoStreamExt::into_stream`].
pub struct FlowStream<T> {
    flowable: Flowable<T>,
    shared: Arc<StreamShared<T>>,
    started: bool,
}

impl<T: Send + 'static> futures::Stream for FlowStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if !self.started {
            self.started = true;
            let subscriber = Arc::new(StreamSubscriber {
                shared: Arc::clone(&self.shared),
            });
            self.flowable.subscribe(subscriber);
        }

        let mut state = self.shared.state.lock();
        if let Some(value) = state.queue.pop_front() {
            // replenish demand once half a batch has been consumed; request
            // outside the lock, since a synchronous producer may re-enter
            // on_next during the call
            let consumed = self.shared.consumed.fetch_add(1, Ordering::AcqRel) + 1;
            let replenish = if consumed % (PREFETCH / 2) == 0 {
                state.subscription.clone()
            } else {
                None
            };
            drop(state);
            if let Some(subscription) = replenish {
                subscription.request((PREFETCH / 2) as u64);
            }
            return Poll::Ready(Some(Ok(value)));
        }
        match state.terminal.take() {
            Some(Some(error)) => {
                state.terminal = Some(None);
                Poll::Ready(Some(Err(error)))
            }
            Some(None) => {
                state.terminal = Some(None);
                Poll::Ready(None)
            }
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl<T> Drop for FlowStream<T> {
    fn drop(&mut self) {
        let subscription = self.shared.state.lock().subscription.take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }
}

struct StreamSubscriber<T> {
    shared: Arc<StreamShared<T>>,
}

impl<T: Send + 'static> FlowSubscriber<T> for StreamSubscriber<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        subscription.request(PREFETCH as u64);
        self.shared.state.lock().subscription = Some(subscription);
    }

    fn on_next(&self, value: T) {
        self.shared.state.lock().queue.push_back(value);
        self.shared.wake();
    }

    fn on_error(&self, error: RivuletError) {
        self.shared.state.lock().terminal = Some(Some(error));
        self.shared.wake();
    }

    fn on_complete(&self) {
        self.shared.state.lock().terminal = Some(None);
        self.shared.wake();
    }
}

/// Adapt a `futures::Stream` factory into a cold [`Observable`].
///
/// Each subscription builds a fresh stream via `factory` and drains it with
/// unbounded demand on the subscribing thread (blocking it until the stream
/// ends). Compose with `subscribe_on` to move that work off-thread.
pub fn observable_from_stream<S>(
    factory: impl Fn() -> S + Send + Sync + 'static,
) -> Observable<S::Item>
where
    S: futures::Stream + Send + 'static,
    S::Item: Send + 'static,
{
    Observable::new(move |observer| {
        let handle = Cancellable::flag();
        observer.on_subscribe(handle.clone());
        let iter = futures::executor::block_on_stream(Box::pin(factory()));
        for value in iter {
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
