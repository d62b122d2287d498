// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Recording observer for stream assertions.

use parking_lot::{Condvar, Mutex};
use rivulet_core::{Cancellable, Observer, RivuletError};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

struct Recorded<T> {
    values: Vec<T>,
    errors: Vec<RivuletError>,
    completions: usize,
    subscription: Option<Cancellable>,
}

struct Shared<T> {
    recorded: Mutex<Recorded<T>>,
    changed: Condvar,
}

/// An observer that records every notification it receives.
///
/// Clones share the same recording, so keep one handle for assertions and
/// pass [`arc`](TestObserver::arc) to `subscribe`. Await helpers block on a
/// condvar with a timeout, making asynchronous pipelines testable without
/// sleeps.
pub struct TestObserver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TestObserver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> TestObserver<T> {
    /// Create an observer with an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                recorded: Mutex::new(Recorded {
                    values: Vec::new(),
                    errors: Vec::new(),
                    completions: 0,
                    subscription: None,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    /// A trait-object handle sharing this recording, for `subscribe`.
    #[must_use]
    pub fn arc(&self) -> Arc<dyn Observer<T>> {
        Arc::new(self.clone())
    }

    /// Snapshot of the recorded values.
    #[must_use]
    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.shared.recorded.lock().values.clone()
    }

    /// Number of recorded values.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.shared.recorded.lock().values.len()
    }

    /// Snapshot of the recorded errors.
    #[must_use]
    pub fn errors(&self) -> Vec<RivuletError> {
        self.shared.recorded.lock().errors.clone()
    }

    /// Number of recorded completions (protocol-conforming sources deliver
    /// at most one).
    #[must_use]
    pub fn completions(&self) -> usize {
        self.shared.recorded.lock().completions
    }

    /// Returns `true` once a terminal was recorded.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        let recorded = self.shared.recorded.lock();
        recorded.completions > 0 || !recorded.errors.is_empty()
    }

    /// The subscription handle captured from `on_subscribe`.
    #[must_use]
    pub fn subscription(&self) -> Option<Cancellable> {
        self.shared.recorded.lock().subscription.clone()
    }

    /// Cancel the recorded subscription.
    pub fn cancel(&self) {
        if let Some(subscription) = self.subscription() {
            subscription.cancel();
        }
    }

    /// Assert the recorded values equal `expected`.
    ///
    /// # Panics
    ///
    /// Panics with a diff-style message on mismatch.
    pub fn assert_values(&self, expected: &[T])
    where
        T: Clone + PartialEq + Debug,
    {
        let actual = self.values();
        assert_eq!(
            actual, expected,
            "recorded values do not match expectation"
        );
    }

    /// Assert exactly one completion and no errors were recorded.
    ///
    /// # Panics
    ///
    /// Panics when the stream has not completed cleanly.
    pub fn assert_completed(&self) {
        let recorded = self.shared.recorded.lock();
        assert!(
            recorded.errors.is_empty(),
            "expected completion but recorded error: {:?}",
            recorded.errors
        );
        assert_eq!(recorded.completions, 1, "expected exactly one completion");
    }

    /// Assert no terminal was recorded yet.
    ///
    /// # Panics
    ///
    /// Panics when a terminal was recorded.
    pub fn assert_not_terminated(&self) {
        assert!(!self.is_terminated(), "expected no terminal yet");
    }

    /// Assert exactly one error was recorded and return it.
    ///
    /// # Panics
    ///
    /// Panics when no error (or more than one) was recorded.
    pub fn assert_error(&self) -> RivuletError {
        let recorded = self.shared.recorded.lock();
        assert_eq!(
            recorded.errors.len(),
            1,
            "expected exactly one error, recorded {:?}",
            recorded.errors
        );
        assert_eq!(recorded.completions, 0, "error and completion both recorded");
        recorded.errors[0].clone()
    }

    /// Assert no error was recorded.
    ///
    /// # Panics
    ///
    /// Panics when an error was recorded.
    pub fn assert_no_errors(&self) {
        let recorded = self.shared.recorded.lock();
        assert!(
            recorded.errors.is_empty(),
            "unexpected errors: {:?}",
            recorded.errors
        );
    }

    /// Block until a terminal arrives or `timeout` elapses.
    ///
    /// Returns `true` when the terminal arrived in time.
    pub fn await_terminal(&self, timeout: Duration) -> bool {
        let mut recorded = self.shared.recorded.lock();
        let deadline = std::time::Instant::now() + timeout;
        while recorded.completions == 0 && recorded.errors.is_empty() {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            self.shared.changed.wait_for(&mut recorded, remaining);
        }
        true
    }

    /// Block until at least `count` values arrived or `timeout` elapses.
    ///
    /// Returns `true` when enough values arrived in time.
    pub fn await_values(&self, count: usize, timeout: Duration) -> bool {
        let mut recorded = self.shared.recorded.lock();
        let deadline = std::time::Instant::now() + timeout;
        while recorded.values.len() < count {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            self.shared.changed.wait_for(&mut recorded, remaining);
        }
        true
    }
}

impl<T: Send + 'static> Default for TestObserver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Observer<T> for TestObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.shared.recorded.lock().subscription = Some(cancellable);
        self.shared.changed.notify_all();
    }

    fn on_next(&self, value: T) {
        self.shared.recorded.lock().values.push(value);
        self.shared.changed.notify_all();
    }

    fn on_error(&self, error: RivuletError) {
        self.shared.recorded.lock().errors.push(error);
        self.shared.changed.notify_all();
    }

    fn on_complete(&self) {
        self.shared.recorded.lock().completions += 1;
        self.shared.changed.notify_all();
    }
}
