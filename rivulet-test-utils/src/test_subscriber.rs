// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Recording subscriber for demand-channel assertions.

use parking_lot::{Condvar, Mutex};
use rivulet_core::RivuletError;
use rivulet_flow::{FlowSubscriber, Subscription};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

struct Recorded<T> {
    values: Vec<T>,
    errors: Vec<RivuletError>,
    completions: usize,
    subscription: Option<Subscription>,
}

struct Shared<T> {
    recorded: Mutex<Recorded<T>>,
    changed: Condvar,
    initial_request: u64,
}

/// A demand-aware subscriber that records every notification.
///
/// By default it requests nothing on subscribe, which is exactly what
/// backpressure tests need; use [`with_initial_request`] for a subscriber
/// that starts with demand in place.
///
/// [`with_initial_request`]: TestSubscriber::with_initial_request
pub struct TestSubscriber<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TestSubscriber<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> TestSubscriber<T> {
    /// A subscriber that issues no initial demand.
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial_request(0)
    }

    /// A subscriber that requests `n` on subscribe (`0` requests nothing).
    #[must_use]
    pub fn with_initial_request(n: u64) -> Self {
        Self {
            shared: Arc::new(Shared {
                recorded: Mutex::new(Recorded {
                    values: Vec::new(),
                    errors: Vec::new(),
                    completions: 0,
                    subscription: None,
                }),
                changed: Condvar::new(),
                initial_request: n,
            }),
        }
    }

    /// A trait-object handle sharing this recording, for `subscribe`.
    #[must_use]
    pub fn arc(&self) -> Arc<dyn FlowSubscriber<T>> {
        Arc::new(self.clone())
    }

    /// Request further demand on the captured subscription.
    pub fn request(&self, n: u64) {
        let subscription = self.shared.recorded.lock().subscription.clone();
        if let Some(subscription) = subscription {
            subscription.request(n);
        }
    }

    /// Cancel the captured subscription.
    pub fn cancel(&self) {
        let subscription = self.shared.recorded.lock().subscription.clone();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
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

    /// Number of recorded completions.
    #[must_use]
    pub fn completions(&self) -> usize {
        self.shared.recorded.lock().completions
    }

    /// Assert the recorded values equal `expected`.
    ///
    /// # Panics
    ///
    /// Panics on mismatch.
    pub fn assert_values(&self, expected: &[T])
    where
        T: Clone + PartialEq + Debug,
    {
        assert_eq!(
            self.values(),
            expected,
            "recorded values do not match expectation"
        );
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
        recorded.errors[0].clone()
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

    /// Block until a terminal arrives or `timeout` elapses.
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
}

impl<T: Send + 'static> Default for TestSubscriber<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> FlowSubscriber<T> for TestSubscriber<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        let initial = self.shared.initial_request;
        self.shared.recorded.lock().subscription = Some(subscription.clone());
        self.shared.changed.notify_all();
        if initial > 0 {
            subscription.request(initial);
        }
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
