// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Converting non-demand sources into demand-aware ones.

use crate::channel::FlowChannel;
use crate::flowable::{Flowable, DEFAULT_CAPACITY};
use crate::policy::OverflowPolicy;
use crate::subscriber::{Subscription, SubscriptionState};
use rivulet_core::{Cancellable, Observable, Observer, RivuletError};
use std::sync::Arc;

/// Extension trait converting an [`Observable`] into a [`Flowable`].
pub trait ToFlowableExt<T: Send + 'static> {
    /// Apply `policy` (with the default capacity) between this push source
    /// and demand-aware subscribers.
    fn to_flowable(&self, policy: OverflowPolicy) -> Flowable<T> {
        self.to_flowable_with_capacity(policy, DEFAULT_CAPACITY)
    }

    /// Apply `policy` with an explicit queue bound for the bounded policies.
    fn to_flowable_with_capacity(&self, policy: OverflowPolicy, capacity: usize) -> Flowable<T>;
}

impl<T: Send + 'static> ToFlowableExt<T> for Observable<T> {
    fn to_flowable_with_capacity(&self, policy: OverflowPolicy, capacity: usize) -> Flowable<T> {
        assert!(capacity > 0, "flowable capacity must be at least 1");
        let source = self.clone();
        Flowable::new(move |subscriber| {
            let channel = FlowChannel::new(subscriber.clone(), policy, capacity);
            subscriber.on_subscribe(Subscription {
                state: Arc::clone(&channel) as Arc<dyn SubscriptionState>,
            });
            source.subscribe(Arc::new(ChannelObserver { channel }));
        })
    }
}

struct ChannelObserver<T> {
    channel: Arc<FlowChannel<T>>,
}

impl<T: Send + 'static> Observer<T> for ChannelObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.channel.set_upstream(cancellable);
    }

    fn on_next(&self, value: T) {
        self.channel.offer(value);
    }

    fn on_error(&self, error: RivuletError) {
        self.channel.fail(error);
    }

    fn on_complete(&self) {
        self.channel.complete();
    }
}
