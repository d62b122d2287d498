// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Replay subject: buffered history replayed to every subscriber.

use crate::registry::{Registry, Terminal};
use parking_lot::Mutex;
use rivulet_core::{Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct ReplayBuffer<T> {
    items: VecDeque<T>,
    // global index of items[0]; cursors are global indices so bounded
    // eviction never invalidates them
    head: u64,
    capacity: Option<usize>,
}

impl<T: Clone> ReplayBuffer<T> {
    fn push(&mut self, value: T) {
        if let Some(capacity) = self.capacity {
            if self.items.len() == capacity {
                self.items.pop_front();
                self.head += 1;
            }
        }
        self.items.push_back(value);
    }

    fn get(&self, cursor: u64) -> Option<(u64, T)> {
        let effective = cursor.max(self.head);
        let offset = usize::try_from(effective - self.head).ok()?;
        self.items
            .get(offset)
            .map(|item| (effective + 1, item.clone()))
    }
}

struct ReplayEntry<T> {
    observer: Arc<dyn Observer<T>>,
    cancelled: AtomicBool,
    cursor: Mutex<u64>,
    // one drain at a time per entry: subscribe-time replay and live tails
    // funnel through the same lock, preserving order
    emission: Mutex<()>,
}

struct ReplayInner<T> {
    registry: Registry<ReplayEntry<T>>,
    buffer: Mutex<ReplayBuffer<T>>,
    upstream: SwapCancellable,
}

impl<T: Clone + Send + 'static> ReplayInner<T> {
    fn drain(&self, entry: &ReplayEntry<T>) {
        let _guard = entry.emission.lock();
        loop {
            if entry.cancelled.load(Ordering::Acquire) {
                return;
            }
            let next = {
                let buffer = self.buffer.lock();
                let cursor = *entry.cursor.lock();
                buffer.get(cursor)
            };
            match next {
                Some((advanced, value)) => {
                    *entry.cursor.lock() = advanced;
                    entry.observer.on_next(value);
                }
                None => return,
            }
        }
    }
}

/// A hot source that records emissions and replays them to new subscribers.
///
/// The unbounded flavor replays the full history; the bounded flavor keeps
/// the last `capacity` values, evicting from the head.
pub struct ReplaySubject<T> {
    inner: Arc<ReplayInner<T>>,
}

impl<T> Clone for ReplaySubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> ReplaySubject<T> {
    /// Create an unbounded replay subject.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a replay subject that keeps only the last `capacity` values.
    ///
    /// # Panics
    ///
    /// Panics when `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "replay capacity must be at least 1");
        Self::build(Some(capacity))
    }

    fn build(capacity: Option<usize>) -> Self {
        Self {
            inner: Arc::new(ReplayInner {
                registry: Registry::new(),
                buffer: Mutex::new(ReplayBuffer {
                    items: VecDeque::new(),
                    head: 0,
                    capacity,
                }),
                upstream: SwapCancellable::new(),
            }),
        }
    }

    /// Register `observer`, replaying the surviving buffer first.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) {
        if let Some(terminal) = self.inner.registry.terminal() {
            // replay the surviving buffer, then the recorded terminal
            observer.on_subscribe(Cancellable::empty());
            let values: Vec<T> = {
                let buffer = self.inner.buffer.lock();
                buffer.items.iter().cloned().collect()
            };
            for value in values {
                observer.on_next(value);
            }
            match terminal {
                Terminal::Complete => observer.on_complete(),
                Terminal::Error(error) => observer.on_error(error),
            }
            return;
        }

        let entry = Arc::new(ReplayEntry {
            observer,
            cancelled: AtomicBool::new(false),
            cursor: Mutex::new(0),
            emission: Mutex::new(()),
        });
        let removal_inner = Arc::clone(&self.inner);
        let removal_entry = Arc::clone(&entry);
        entry
            .observer
            .on_subscribe(Cancellable::from_action(move || {
                removal_entry.cancelled.store(true, Ordering::Release);
                removal_inner.registry.remove(&removal_entry);
            }));

        match self.inner.registry.add(Arc::clone(&entry)) {
            Ok(()) => self.inner.drain(&entry),
            Err(terminal) => {
                if !entry.cancelled.load(Ordering::Acquire) {
                    let values: Vec<T> = {
                        let buffer = self.inner.buffer.lock();
                        buffer.items.iter().cloned().collect()
                    };
                    for value in values {
                        entry.observer.on_next(value);
                    }
                    match terminal {
                        Terminal::Complete => entry.observer.on_complete(),
                        Terminal::Error(error) => entry.observer.on_error(error),
                    }
                }
            }
        }
    }

    /// View the subject as a cold-looking [`Observable`] handle.
    #[must_use]
    pub fn as_observable(&self) -> Observable<T> {
        let subject = self.clone();
        Observable::new(move |observer| subject.subscribe(observer))
    }

    /// Returns `true` while at least one observer is registered.
    #[must_use]
    pub fn has_observers(&self) -> bool {
        self.inner.registry.len() > 0
    }

    /// Returns `true` once a terminal has been recorded.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner.registry.terminal().is_some()
    }
}

impl<T: Clone + Send + 'static> Default for ReplaySubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Observer<T> for ReplaySubject<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        if self.is_terminated() {
            cancellable.cancel();
        } else {
            self.inner.upstream.replace(cancellable);
        }
    }

    fn on_next(&self, value: T) {
        let snapshot = {
            let mut buffer = self.inner.buffer.lock();
            if self.inner.registry.terminal().is_some() {
                return;
            }
            buffer.push(value);
            self.inner.registry.snapshot()
        };
        if let Some(snapshot) = snapshot {
            for entry in snapshot.iter() {
                self.inner.drain(entry);
            }
        }
    }

    fn on_error(&self, error: RivuletError) {
        if let Some(snapshot) = self
            .inner
            .registry
            .terminate(Terminal::Error(error.clone()))
        {
            for entry in snapshot.iter() {
                self.inner.drain(entry);
                let _guard = entry.emission.lock();
                if !entry.cancelled.load(Ordering::Acquire) {
                    entry.observer.on_error(error.clone());
                }
            }
        }
    }

    fn on_complete(&self) {
        if let Some(snapshot) = self.inner.registry.terminate(Terminal::Complete) {
            for entry in snapshot.iter() {
                self.inner.drain(entry);
                let _guard = entry.emission.lock();
                if !entry.cancelled.load(Ordering::Acquire) {
                    entry.observer.on_complete();
                }
            }
        }
    }
}
