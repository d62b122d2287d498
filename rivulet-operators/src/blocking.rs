// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Bridges from push-based streams to imperative callers.
//!
//! Every bridge opens a fresh subscription and parks the calling thread on a
//! condvar until the required notification arrives. None of them schedule
//! work on the calling thread, so they are safe anywhere except inside a
//! trampoline task (where parking the thread would starve the queue).

use parking_lot::{Condvar, Mutex};
use rivulet_core::{Maybe, Observable, Result, RivuletError, SwapCancellable};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::elements::ElementsExt;

/// Extension trait providing the blocking bridges.
pub trait BlockingExt<T: Send + 'static> {
    /// Block until the first value; [`RivuletError::NoSuchElement`] for an
    /// empty source.
    fn blocking_first(&self) -> Result<T>;

    /// Block until the first value, substituting `default` for an empty
    /// source.
    fn blocking_first_or(&self, default: T) -> Result<T>;

    /// Block until the terminal and return the last value;
    /// [`RivuletError::NoSuchElement`] for an empty source.
    fn blocking_last(&self) -> Result<T>;

    /// Block until the terminal and return the last value, substituting
    /// `default` for an empty source.
    fn blocking_last_or(&self, default: T) -> Result<T>;

    /// Iterate the stream from the calling thread, blocking for each
    /// element. Dropping the iterator cancels the subscription.
    fn blocking_iter(&self) -> BlockingIter<T>;

    /// A future resolving to the first value (or the terminal error);
    /// [`RivuletError::NoSuchElement`] for an empty source.
    fn to_future(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T>> + Send>>;
}

impl<T: Send + 'static> BlockingExt<T> for Observable<T> {
    fn blocking_first(&self) -> Result<T> {
        blocking_maybe(&self.first())?.ok_or(RivuletError::NoSuchElement)
    }

    fn blocking_first_or(&self, default: T) -> Result<T> {
        Ok(blocking_maybe(&self.first())?.unwrap_or(default))
    }

    fn blocking_last(&self) -> Result<T> {
        blocking_maybe(&self.last())?.ok_or(RivuletError::NoSuchElement)
    }

    fn blocking_last_or(&self, default: T) -> Result<T> {
        Ok(blocking_maybe(&self.last())?.unwrap_or(default))
    }

    fn blocking_iter(&self) -> BlockingIter<T> {
        let shared = Arc::new(IterShared {
            state: Mutex::new(IterState {
                queue: VecDeque::new(),
                terminal: None,
            }),
            available: Condvar::new(),
        });

        let push = Arc::clone(&shared);
        let fail = Arc::clone(&shared);
        let finish = Arc::clone(&shared);
        let subscription = self.subscribe_all(
            move |value| {
                push.state.lock().queue.push_back(value);
                push.available.notify_all();
            },
            move |error| {
                fail.state.lock().terminal = Some(Some(error));
                fail.available.notify_all();
            },
            move || {
                finish.state.lock().terminal = Some(None);
                finish.available.notify_all();
            },
        );

        BlockingIter {
            shared,
            subscription: {
                let slot = SwapCancellable::new();
                slot.replace(subscription);
                slot
            },
            finished: AtomicBool::new(false),
        }
    }

    fn to_future(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T>> + Send>> {
        let (sender, receiver) = futures::channel::oneshot::channel::<Result<T>>();
        let sender = Arc::new(Mutex::new(Some(sender)));

        let on_success = Arc::clone(&sender);
        let on_failure = Arc::clone(&sender);
        let on_empty = Arc::clone(&sender);
        let upstream = SwapCancellable::new();
        let settle_upstream = upstream.clone();
        let handle = self.first().subscribe_all(
            move |value| {
                settle_upstream.cancel();
                if let Some(sender) = on_success.lock().take() {
                    let _ = sender.send(Ok(value));
                }
            },
            move |error| {
                if let Some(sender) = on_failure.lock().take() {
                    let _ = sender.send(Err(error));
                }
            },
            move || {
                if let Some(sender) = on_empty.lock().take() {
                    let _ = sender.send(Err(RivuletError::NoSuchElement));
                }
            },
        );
        upstream.replace(handle);

        Box::pin(async move {
            receiver
                .await
                .unwrap_or(Err(RivuletError::NoSuchElement))
        })
    }
}

fn blocking_maybe<T: Send + 'static>(maybe: &Maybe<T>) -> Result<Option<T>> {
    maybe.blocking_get()
}

struct IterState<T> {
    queue: VecDeque<T>,
    // Some(None) = completed, Some(Some(e)) = errored
    terminal: Option<Option<RivuletError>>,
}

struct IterShared<T> {
    state: Mutex<IterState<T>>,
    available: Condvar,
}

/// Blocking iterator over a stream; see
/// [`BlockingExt::blocking_iter`].
pub struct BlockingIter<T> {
    shared: Arc<IterShared<T>>,
    subscription: SwapCancellable,
    finished: AtomicBool,
}

impl<T: Send + 'static> Iterator for BlockingIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished.load(Ordering::Acquire) {
            return None;
        }
        let mut state = self.shared.state.lock();
        loop {
            if let Some(value) = state.queue.pop_front() {
                return Some(Ok(value));
            }
            match &state.terminal {
                Some(Some(error)) => {
                    self.finished.store(true, Ordering::Release);
                    return Some(Err(error.clone()));
                }
                Some(None) => {
                    self.finished.store(true, Ordering::Release);
                    return None;
                }
                None => self.shared.available.wait(&mut state),
            }
        }
    }
}

impl<T> Drop for BlockingIter<T> {
    fn drop(&mut self) {
        self.subscription.cancel();
    }
}
