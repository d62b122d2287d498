// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Behavior subject: replay of the latest value, then live emissions.

use crate::publish::deliver_terminal;
use crate::registry::{Registry, Terminal};
use parking_lot::Mutex;
use rivulet_core::{Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct BehaviorEntry<T> {
    observer: Arc<dyn Observer<T>>,
    cancelled: AtomicBool,
    // serializes the initial replay against concurrent live deliveries to
    // this entry; held per delivery, never across entries
    emission: Mutex<()>,
}

impl<T> BehaviorEntry<T> {
    fn deliver(&self, value: T) {
        let _guard = self.emission.lock();
        if !self.cancelled.load(Ordering::Acquire) {
            self.observer.on_next(value);
        }
    }
}

struct BehaviorInner<T> {
    registry: Registry<BehaviorEntry<T>>,
    value: Mutex<Option<T>>,
    upstream: SwapCancellable,
}

/// A hot source that stores its latest value and replays it to each new
/// subscriber before live emissions continue.
pub struct BehaviorSubject<T> {
    inner: Arc<BehaviorInner<T>>,
}

impl<T> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> BehaviorSubject<T> {
    /// Create a subject with no initial value.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BehaviorInner {
                registry: Registry::new(),
                value: Mutex::new(None),
                upstream: SwapCancellable::new(),
            }),
        }
    }

    /// Create a subject seeded with `initial`; the seed is replayed to the
    /// first subscribers like any stored value.
    pub fn with_default(initial: T) -> Self {
        let subject = Self::new();
        *subject.inner.value.lock() = Some(initial);
        subject
    }

    /// The currently stored value, if any.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.inner.value.lock().clone()
    }

    /// Register `observer`, replaying the stored value first.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) {
        if let Some(terminal) = self.inner.registry.terminal() {
            observer.on_subscribe(Cancellable::empty());
            deliver_terminal(observer.as_ref(), &terminal);
            return;
        }

        let entry = Arc::new(BehaviorEntry {
            observer,
            cancelled: AtomicBool::new(false),
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

        // Entry lock taken before registration: a live emission that finds
        // this entry in its snapshot blocks until the replay below finished,
        // so the replayed value always precedes it. Reading the stored value
        // and registering under the value lock keeps replay and live path
        // agreeing on which value is "current".
        let replay_guard = entry.emission.lock();
        let replay = {
            let value = self.inner.value.lock();
            match self.inner.registry.add(Arc::clone(&entry)) {
                Ok(()) => value.clone(),
                Err(terminal) => {
                    drop(value);
                    drop(replay_guard);
                    if !entry.cancelled.load(Ordering::Acquire) {
                        deliver_terminal(entry.observer.as_ref(), &terminal);
                    }
                    return;
                }
            }
        };
        if let Some(value) = replay {
            if !entry.cancelled.load(Ordering::Acquire) {
                entry.observer.on_next(value);
            }
        }
        drop(replay_guard);
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

impl<T: Clone + Send + 'static> Default for BehaviorSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Observer<T> for BehaviorSubject<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        if self.is_terminated() {
            cancellable.cancel();
        } else {
            self.inner.upstream.replace(cancellable);
        }
    }

    fn on_next(&self, value: T) {
        let snapshot = {
            let mut stored = self.inner.value.lock();
            *stored = Some(value.clone());
            self.inner.registry.snapshot()
        };
        if let Some(snapshot) = snapshot {
            for entry in snapshot.iter() {
                entry.deliver(value.clone());
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
                let _guard = entry.emission.lock();
                if !entry.cancelled.load(Ordering::Acquire) {
                    entry.observer.on_complete();
                }
            }
        }
    }
}
