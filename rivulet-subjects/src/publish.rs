// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Publish subject: multicast of future emissions only.

use crate::registry::{Registry, Terminal};
use rivulet_core::{Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct PublishEntry<T> {
    observer: Arc<dyn Observer<T>>,
    cancelled: AtomicBool,
}

struct PublishInner<T> {
    registry: Registry<PublishEntry<T>>,
    upstream: SwapCancellable,
}

/// A hot source that relays emissions to every currently subscribed
/// observer. Subscribers see only values emitted after they subscribed; a
/// late subscriber of a terminated subject receives the recorded terminal
/// immediately.
pub struct PublishSubject<T> {
    inner: Arc<PublishInner<T>>,
}

impl<T> Clone for PublishSubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> PublishSubject<T> {
    /// Create a subject with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PublishInner {
                registry: Registry::new(),
                upstream: SwapCancellable::new(),
            }),
        }
    }

    /// Register `observer` for future emissions.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) {
        if let Some(terminal) = self.inner.registry.terminal() {
            observer.on_subscribe(Cancellable::empty());
            deliver_terminal(observer.as_ref(), &terminal);
            return;
        }

        let entry = Arc::new(PublishEntry {
            observer,
            cancelled: AtomicBool::new(false),
        });
        let removal_inner = Arc::clone(&self.inner);
        let removal_entry = Arc::clone(&entry);
        entry
            .observer
            .on_subscribe(Cancellable::from_action(move || {
                removal_entry.cancelled.store(true, Ordering::Release);
                removal_inner.registry.remove(&removal_entry);
            }));

        // terminate may have raced the registration; resolve in its favor
        if let Err(terminal) = self.inner.registry.add(Arc::clone(&entry)) {
            if !entry.cancelled.load(Ordering::Acquire) {
                deliver_terminal(entry.observer.as_ref(), &terminal);
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

    /// Number of currently registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns `true` once a terminal has been recorded.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner.registry.terminal().is_some()
    }
}

impl<T: Clone + Send + 'static> Default for PublishSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Observer<T> for PublishSubject<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        if self.is_terminated() {
            cancellable.cancel();
        } else {
            self.inner.upstream.replace(cancellable);
        }
    }

    fn on_next(&self, value: T) {
        if let Some(snapshot) = self.inner.registry.snapshot() {
            for entry in snapshot.iter() {
                if !entry.cancelled.load(Ordering::Acquire) {
                    entry.observer.on_next(value.clone());
                }
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
                if !entry.cancelled.load(Ordering::Acquire) {
                    entry.observer.on_error(error.clone());
                }
            }
        }
    }

    fn on_complete(&self) {
        if let Some(snapshot) = self.inner.registry.terminate(Terminal::Complete) {
            for entry in snapshot.iter() {
                if !entry.cancelled.load(Ordering::Acquire) {
                    entry.observer.on_complete();
                }
            }
        }
    }
}

pub(crate) fn deliver_terminal<T>(observer: &dyn Observer<T>, terminal: &Terminal) {
    match terminal {
        Terminal::Complete => observer.on_complete(),
        Terminal::Error(error) => observer.on_error(error.clone()),
    }
}
