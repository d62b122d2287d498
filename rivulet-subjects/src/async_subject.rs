// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Async subject: only the final value, delivered at completion.

use crate::registry::{Registry, Terminal};
use parking_lot::Mutex;
use rivulet_core::{Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct AsyncEntry<T> {
    observer: Arc<dyn Observer<T>>,
    cancelled: AtomicBool,
}

struct AsyncInner<T> {
    registry: Registry<AsyncEntry<T>>,
    value: Mutex<Option<T>>,
    upstream: SwapCancellable,
}

/// A hot source that stores the most recent value and emits nothing until it
/// terminates: on completion every observer receives the stored value (if
/// any) followed by completion; on error only the error. Late subscribers
/// after the terminal receive the same sequence.
pub struct AsyncSubject<T> {
    inner: Arc<AsyncInner<T>>,
}

impl<T> Clone for AsyncSubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> AsyncSubject<T> {
    /// Create a subject with no stored value.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AsyncInner {
                registry: Registry::new(),
                value: Mutex::new(None),
                upstream: SwapCancellable::new(),
            }),
        }
    }

    /// Register `observer`; nothing is delivered until the subject
    /// terminates.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) {
        if let Some(terminal) = self.inner.registry.terminal() {
            observer.on_subscribe(Cancellable::empty());
            self.deliver_terminal_with_value(observer.as_ref(), &terminal);
            return;
        }

        let entry = Arc::new(AsyncEntry {
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

        if let Err(terminal) = self.inner.registry.add(Arc::clone(&entry)) {
            if !entry.cancelled.load(Ordering::Acquire) {
                self.deliver_terminal_with_value(entry.observer.as_ref(), &terminal);
            }
        }
    }

    fn deliver_terminal_with_value(&self, observer: &dyn Observer<T>, terminal: &Terminal) {
        match terminal {
            Terminal::Complete => {
                let value = self.inner.value.lock().clone();
                if let Some(value) = value {
                    observer.on_next(value);
                }
                observer.on_complete();
            }
            Terminal::Error(error) => observer.on_error(error.clone()),
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

impl<T: Clone + Send + 'static> Default for AsyncSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Observer<T> for AsyncSubject<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        if self.is_terminated() {
            cancellable.cancel();
        } else {
            self.inner.upstream.replace(cancellable);
        }
    }

    fn on_next(&self, value: T) {
        if self.inner.registry.terminal().is_none() {
            *self.inner.value.lock() = Some(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        // the stored value is discarded on error
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
            let value = self.inner.value.lock().clone();
            for entry in snapshot.iter() {
                if !entry.cancelled.load(Ordering::Acquire) {
                    if let Some(value) = value.clone() {
                        entry.observer.on_next(value);
                    }
                    entry.observer.on_complete();
                }
            }
        }
    }
}
