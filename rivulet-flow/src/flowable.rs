// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The demand-aware reactive shape.

use crate::channel::FlowChannel;
use crate::policy::OverflowPolicy;
use crate::subscriber::{FlowSubscriber, Subscription, SubscriptionState};
use parking_lot::Mutex;
use rivulet_core::{guarded, Cancellable, RivuletError};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Default queue bound for the bounded overflow policies.
pub const DEFAULT_CAPACITY: usize = 128;

type SubscribeFn<T> = dyn Fn(Arc<dyn FlowSubscriber<T>>) + Send + Sync;

/// A push-based source whose delivery rate is governed by downstream demand.
///
/// Subscribers receive a [`Subscription`] and call `request(n)` to authorize
/// deliveries; the overflow policy chosen at creation decides what happens
/// to values produced beyond outstanding demand.
pub struct Flowable<T> {
    subscriber_fn: Arc<SubscribeFn<T>>,
}

impl<T> Clone for Flowable<T> {
    fn clone(&self) -> Self {
        Self {
            subscriber_fn: Arc::clone(&self.subscriber_fn),
        }
    }
}

impl<T: Send + 'static> Flowable<T> {
    /// Low-level constructor from a raw subscribe function.
    pub fn new(subscribe: impl Fn(Arc<dyn FlowSubscriber<T>>) + Send + Sync + 'static) -> Self {
        Self {
            subscriber_fn: Arc::new(subscribe),
        }
    }

    /// Subscribe with a full demand-aware subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn FlowSubscriber<T>>) {
        (self.subscriber_fn)(subscriber);
    }

    /// Subscribe with callbacks and unbounded demand; returns the
    /// subscription handle.
    pub fn subscribe_all(
        &self,
        on_next: impl Fn(T) + Send + Sync + 'static,
        on_error: impl Fn(RivuletError) + Send + Sync + 'static,
        on_complete: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        let subscriber = Arc::new(LambdaFlowSubscriber {
            on_next,
            on_error,
            on_complete,
            done: AtomicBool::new(false),
            _marker: std::marker::PhantomData,
        });
        let handle = Arc::new(DeferredSubscription {
            inner: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        });
        let forwarding = Arc::new(ForwardingSubscriber {
            target: subscriber as Arc<dyn FlowSubscriber<T>>,
            handle: Arc::clone(&handle),
        });
        self.subscribe(forwarding);
        Subscription {
            state: handle as Arc<dyn SubscriptionState>,
        }
    }

    /// Bridge a push-style producer into a flowable under `policy` with the
    /// default capacity.
    pub fn create(
        emit: impl Fn(FlowEmitter<T>) + Send + Sync + 'static,
        policy: OverflowPolicy,
    ) -> Self {
        Self::create_with_capacity(emit, policy, DEFAULT_CAPACITY)
    }

    /// Bridge a push-style producer into a flowable under `policy` with an
    /// explicit queue bound for the bounded policies.
    pub fn create_with_capacity(
        emit: impl Fn(FlowEmitter<T>) + Send + Sync + 'static,
        policy: OverflowPolicy,
        capacity: usize,
    ) -> Self {
        assert!(capacity > 0, "flowable capacity must be at least 1");
        let emit = Arc::new(emit);
        Self::new(move |subscriber| {
            let channel = FlowChannel::new(subscriber.clone(), policy, capacity);
            subscriber.on_subscribe(Subscription {
                state: Arc::clone(&channel) as Arc<dyn SubscriptionState>,
            });
            let emitter = FlowEmitter {
                channel: Arc::clone(&channel),
            };
            let failsafe = FlowEmitter {
                channel: Arc::clone(&channel),
            };
            if let Err(error) = guarded("Flowable::create", || (emit)(emitter)) {
                failsafe.error(error);
            }
        })
    }

    /// Replay an iterable honoring demand: values are pulled from the
    /// iterator only as the subscriber requests them.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
        I::IntoIter: Send + 'static,
    {
        Self::new(move |subscriber| {
            let state = Arc::new(IterSubscription {
                subscriber: subscriber.clone(),
                iter: Mutex::new(Some(iter.clone().into_iter())),
                demand: AtomicU64::new(0),
                wip: AtomicUsize::new(0),
                cancelled: AtomicBool::new(false),
                terminated: AtomicBool::new(false),
            });
            subscriber.on_subscribe(Subscription {
                state: state as Arc<dyn SubscriptionState>,
            });
        })
    }
}

/// Producer handle passed to [`Flowable::create`] emitter functions.
pub struct FlowEmitter<T> {
    channel: Arc<FlowChannel<T>>,
}

impl<T> Clone for FlowEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
        }
    }
}

impl<T: Send + 'static> FlowEmitter<T> {
    /// Offer a value under the configured overflow policy.
    pub fn next(&self, value: T) {
        self.channel.offer(value);
    }

    /// Terminate with an error (delivered after the queue drains).
    pub fn error(&self, error: RivuletError) {
        self.channel.fail(error);
    }

    /// Terminate with completion (delivered after the queue drains).
    pub fn complete(&self) {
        self.channel.complete();
    }

    /// Outstanding downstream demand.
    #[must_use]
    pub fn requested(&self) -> u64 {
        self.channel.requested()
    }

    /// Returns `true` once the downstream cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.channel.is_cancelled()
    }

    /// Attach an upstream resource released on cancellation.
    pub fn set_cancellable(&self, cancellable: Cancellable) {
        self.channel.set_upstream(cancellable);
    }
}

struct LambdaFlowSubscriber<T, N, E, C> {
    on_next: N,
    on_error: E,
    on_complete: C,
    done: AtomicBool,
    _marker: std::marker::PhantomData<fn(T)>,
}

impl<T, N, E, C> FlowSubscriber<T> for LambdaFlowSubscriber<T, N, E, C>
where
    T: Send,
    N: Fn(T) + Send + Sync,
    E: Fn(RivuletError) + Send + Sync,
    C: Fn() + Send + Sync,
{
    fn on_subscribe(&self, _subscription: Subscription) {
        // the forwarding layer already wired the deferred handle
    }

    fn on_next(&self, value: T) {
        if !self.done.load(Ordering::Acquire) {
            (self.on_next)(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            (self.on_error)(error);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            (self.on_complete)();
        }
    }
}

/// Subscription slot filled once the real channel arrives; requests issued
/// before that are impossible here because `subscribe_all` requests
/// unbounded demand itself right after wiring.
struct DeferredSubscription {
    inner: Mutex<Option<Subscription>>,
    cancelled: AtomicBool,
}

impl SubscriptionState for DeferredSubscription {
    fn request(&self, n: u64) {
        if let Some(inner) = &*self.inner.lock() {
            inner.request(n);
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(inner) = &*self.inner.lock() {
            inner.cancel();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

struct ForwardingSubscriber<T> {
    target: Arc<dyn FlowSubscriber<T>>,
    handle: Arc<DeferredSubscription>,
}

impl<T: Send> FlowSubscriber<T> for ForwardingSubscriber<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        self.handle.inner.lock().replace(subscription.clone());
        if self.handle.cancelled.load(Ordering::Acquire) {
            subscription.cancel();
        } else {
            subscription.request_unbounded();
        }
        self.target.on_subscribe(Subscription {
            state: Arc::clone(&self.handle) as Arc<dyn SubscriptionState>,
        });
    }

    fn on_next(&self, value: T) {
        self.target.on_next(value);
    }

    fn on_error(&self, error: RivuletError) {
        self.target.on_error(error);
    }

    fn on_complete(&self) {
        self.target.on_complete();
    }
}

struct IterSubscription<T, I: Iterator<Item = T>> {
    subscriber: Arc<dyn FlowSubscriber<T>>,
    iter: Mutex<Option<I>>,
    demand: AtomicU64,
    wip: AtomicUsize,
    cancelled: AtomicBool,
    terminated: AtomicBool,
}

impl<T: Send, I: Iterator<Item = T> + Send> IterSubscription<T, I> {
    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        let mut missed = 1usize;
        loop {
            loop {
                if self.cancelled.load(Ordering::Acquire)
                    || self.terminated.load(Ordering::Acquire)
                {
                    break;
                }
                if self.demand.load(Ordering::Acquire) == 0 {
                    break;
                }
                let next = {
                    let mut iter = self.iter.lock();
                    iter.as_mut().and_then(Iterator::next)
                };
                match next {
                    Some(value) => {
                        self.subscriber.on_next(value);
                        let current = self.demand.load(Ordering::Acquire);
                        if current != u64::MAX && current > 0 {
                            self.demand.fetch_sub(1, Ordering::AcqRel);
                        }
                    }
                    None => {
                        if !self.terminated.swap(true, Ordering::AcqRel) {
                            self.iter.lock().take();
                            self.subscriber.on_complete();
                        }
                        break;
                    }
                }
            }
            missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if missed == 0 {
                return;
            }
        }
    }
}

impl<T: Send, I: Iterator<Item = T> + Send> SubscriptionState for IterSubscription<T, I> {
    fn request(&self, n: u64) {
        if n == 0 {
            if !self.terminated.swap(true, Ordering::AcqRel) {
                self.iter.lock().take();
                self.subscriber.on_error(RivuletError::invalid_request(n));
            }
            return;
        }
        loop {
            let current = self.demand.load(Ordering::Acquire);
            if current == u64::MAX {
                break;
            }
            let next = current.saturating_add(n);
            if self
                .demand
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }
        self.drain();
    }

    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.iter.lock().take();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
