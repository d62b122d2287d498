// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Per-subscription serialization.
//!
//! The protocol guarantees that at most one notification is in flight per
//! observer. Operators whose upstreams may emit from several threads
//! (merge, flatten, timed operators racing timers against values) wrap the
//! downstream in a [`SerializedObserver`]: the first caller becomes the
//! emitter and drains a queue filled by concurrent callers.

use crate::cancellable::Cancellable;
use crate::error::RivuletError;
use crate::observer::{Notification, Observer};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

struct SerializedState<T> {
    queue: VecDeque<Notification<T>>,
    emitting: bool,
    done: bool,
}

/// Observer wrapper enforcing serialized, single-terminal delivery.
pub struct SerializedObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    state: Mutex<SerializedState<T>>,
}

impl<T: Send> SerializedObserver<T> {
    /// Wrap `downstream` in a serializing layer.
    pub fn new(downstream: Arc<dyn Observer<T>>) -> Self {
        Self {
            downstream,
            state: Mutex::new(SerializedState {
                queue: VecDeque::new(),
                emitting: false,
                done: false,
            }),
        }
    }

    fn enqueue_or_emit(&self, notification: Notification<T>) {
        let terminal = notification.is_terminal();
        {
            let mut state = self.state.lock();
            if state.done {
                return;
            }
            if terminal {
                state.done = true;
            }
            if state.emitting {
                state.queue.push_back(notification);
                return;
            }
            state.emitting = true;
        }

        notification.dispatch(self.downstream.as_ref());
        self.drain();
    }

    fn drain(&self) {
        loop {
            let next = {
                let mut state = self.state.lock();
                match state.queue.pop_front() {
                    Some(notification) => notification,
                    None => {
                        state.emitting = false;
                        return;
                    }
                }
            };
            next.dispatch(self.downstream.as_ref());
        }
    }
}

impl<T: Send> Observer<T> for SerializedObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.downstream.on_subscribe(cancellable);
    }

    fn on_next(&self, value: T) {
        self.enqueue_or_emit(Notification::Next(value));
    }

    fn on_error(&self, error: RivuletError) {
        self.enqueue_or_emit(Notification::Error(error));
    }

    fn on_complete(&self) {
        self.enqueue_or_emit(Notification::Complete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        nexts: AtomicUsize,
        terminals: AtomicUsize,
    }

    impl Observer<u32> for Counting {
        fn on_subscribe(&self, _cancellable: Cancellable) {}

        fn on_next(&self, _value: u32) {
            self.nexts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&self, _error: RivuletError) {
            self.terminals.fetch_add(1, Ordering::SeqCst);
        }

        fn on_complete(&self) {
            self.terminals.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn drops_everything_after_first_terminal() {
        let counting = Arc::new(Counting {
            nexts: AtomicUsize::new(0),
            terminals: AtomicUsize::new(0),
        });
        let serialized = SerializedObserver::new(counting.clone() as Arc<dyn Observer<u32>>);

        serialized.on_next(1);
        serialized.on_complete();
        serialized.on_next(2);
        serialized.on_error(RivuletError::custom("late"));
        serialized.on_complete();

        assert_eq!(counting.nexts.load(Ordering::SeqCst), 1);
        assert_eq!(counting.terminals.load(Ordering::SeqCst), 1);
    }
}
