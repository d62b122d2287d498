// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Demand-aware subscriber contract.

use rivulet_core::RivuletError;
use std::sync::Arc;

/// Observer of a [`Flowable`](crate::Flowable): like a stream observer, but
/// its subscription handle carries demand.
///
/// Values are delivered only against previously requested demand; terminals
/// need no demand.
pub trait FlowSubscriber<T>: Send + Sync {
    /// Called exactly once, strictly first, with the demand channel handle.
    fn on_subscribe(&self, subscription: Subscription);

    /// Called per value, consuming one unit of requested demand.
    fn on_next(&self, value: T);

    /// Terminal: the source failed.
    fn on_error(&self, error: RivuletError);

    /// Terminal: the source completed.
    fn on_complete(&self);
}

pub(crate) trait SubscriptionState: Send + Sync {
    fn request(&self, n: u64);
    fn cancel(&self);
    fn is_cancelled(&self) -> bool;
}

/// Demand channel handle delivered through
/// [`FlowSubscriber::on_subscribe`].
///
/// `request(n)` authorizes up to `n` further value deliveries; demand is a
/// saturating 64-bit counter where `u64::MAX` means unbounded. `request(0)`
/// is a protocol violation and terminates the subscription with
/// [`RivuletError::InvalidRequest`](rivulet_core::RivuletError::InvalidRequest).
#[derive(Clone)]
pub struct Subscription {
    pub(crate) state: Arc<dyn SubscriptionState>,
}

impl Subscription {
    /// Authorize `n` further value deliveries.
    pub fn request(&self, n: u64) {
        self.state.request(n);
    }

    /// Request unbounded delivery.
    pub fn request_unbounded(&self) {
        self.state.request(u64::MAX);
    }

    /// Stop delivery and release upstream resources.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Returns `true` once cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}
