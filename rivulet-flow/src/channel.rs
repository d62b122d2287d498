// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The demand/queue engine behind every flowable.
//!
//! Producers offer values; the channel applies the overflow policy at the
//! queue boundary and a single drain loop moves queued values downstream
//! while demand lasts. The drain is guarded by a work-in-progress counter
//! (enter-once): any thread may poke it, at most one drains, and a poke that
//! lost the race is picked up by the draining thread before it leaves.

use crate::policy::OverflowPolicy;
use crate::subscriber::{FlowSubscriber, SubscriptionState};
use parking_lot::Mutex;
use rivulet_core::{RivuletError, SwapCancellable};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) struct FlowChannel<T> {
    subscriber: Arc<dyn FlowSubscriber<T>>,
    queue: Mutex<VecDeque<T>>,
    demand: AtomicU64,
    wip: AtomicUsize,
    cancelled: AtomicBool,
    // upstream finished producing (terminal recorded, maybe deferred)
    done: AtomicBool,
    // terminal delivered downstream
    terminated: AtomicBool,
    error: Mutex<Option<RivuletError>>,
    policy: OverflowPolicy,
    capacity: usize,
    upstream: SwapCancellable,
}

impl<T: Send + 'static> FlowChannel<T> {
    pub(crate) fn new(
        subscriber: Arc<dyn FlowSubscriber<T>>,
        policy: OverflowPolicy,
        capacity: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            subscriber,
            queue: Mutex::new(VecDeque::new()),
            demand: AtomicU64::new(0),
            wip: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            done: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            error: Mutex::new(None),
            policy,
            capacity,
            upstream: SwapCancellable::new(),
        })
    }

    /// Offer a produced value to the queue under the overflow policy.
    pub(crate) fn offer(&self, value: T) {
        if self.done.load(Ordering::Acquire) || self.cancelled.load(Ordering::Acquire) {
            return;
        }
        let overflowed = {
            let mut queue = self.queue.lock();
            match self.policy {
                OverflowPolicy::Buffer => {
                    queue.push_back(value);
                    false
                }
                OverflowPolicy::Drop => {
                    // no buffer: keep only what outstanding demand covers
                    if (queue.len() as u64) < self.demand.load(Ordering::Acquire) {
                        queue.push_back(value);
                    }
                    false
                }
                OverflowPolicy::DropLatest => {
                    if queue.len() < self.capacity {
                        queue.push_back(value);
                    }
                    false
                }
                OverflowPolicy::DropOldest => {
                    if queue.len() == self.capacity {
                        queue.pop_front();
                    }
                    queue.push_back(value);
                    false
                }
                OverflowPolicy::Error => {
                    if queue.len() < self.capacity {
                        queue.push_back(value);
                        false
                    } else {
                        queue.clear();
                        true
                    }
                }
            }
        };
        if overflowed {
            *self.error.lock() = Some(RivuletError::missing_backpressure(self.capacity));
            self.done.store(true, Ordering::Release);
            self.upstream.cancel();
        }
        self.drain();
    }

    /// Record upstream completion; delivered once the queue drains.
    pub(crate) fn complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.drain();
        }
    }

    /// Record an upstream error; delivered once the queue drains.
    pub(crate) fn fail(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            *self.error.lock() = Some(error);
            self.drain();
        }
    }

    /// Outstanding demand as seen by the producer.
    pub(crate) fn requested(&self) -> u64 {
        self.demand.load(Ordering::Acquire)
    }

    pub(crate) fn set_upstream(&self, cancellable: rivulet_core::Cancellable) {
        self.upstream.replace(cancellable);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn add_demand(&self, n: u64) {
        loop {
            let current = self.demand.load(Ordering::Acquire);
            if current == u64::MAX {
                return;
            }
            let next = current.saturating_add(n);
            if self
                .demand
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }

    fn consume_demand(&self) {
        loop {
            let current = self.demand.load(Ordering::Acquire);
            // MAX is sticky: unbounded demand never decrements
            if current == u64::MAX || current == 0 {
                return;
            }
            if self
                .demand
                .compare_exchange(current, current - 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }

    /// Enter-once drain loop: deliver while demand and values last, then the
    /// deferred terminal once the queue is empty.
    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        let mut missed = 1usize;
        loop {
            loop {
                if self.cancelled.load(Ordering::Acquire) {
                    self.queue.lock().clear();
                    break;
                }
                let value = {
                    let mut queue = self.queue.lock();
                    if self.demand.load(Ordering::Acquire) > 0 {
                        queue.pop_front()
                    } else {
                        None
                    }
                };
                match value {
                    Some(value) => {
                        if !self.terminated.load(Ordering::Acquire) {
                            self.subscriber.on_next(value);
                            self.consume_demand();
                        }
                    }
                    None => break,
                }
            }

            if self.done.load(Ordering::Acquire)
                && !self.cancelled.load(Ordering::Acquire)
                && self.queue.lock().is_empty()
                && !self.terminated.swap(true, Ordering::AcqRel)
            {
                match self.error.lock().take() {
                    Some(error) => self.subscriber.on_error(error),
                    None => self.subscriber.on_complete(),
                }
            }

            missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if missed == 0 {
                return;
            }
        }
    }
}

impl<T: Send + 'static> SubscriptionState for FlowChannel<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            // protocol violation: discard pending values and terminate
            // through the drain so delivery stays serialized
            self.upstream.cancel();
            self.queue.lock().clear();
            self.fail(RivuletError::invalid_request(n));
            return;
        }
        self.add_demand(n);
        self.drain();
    }

    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.upstream.cancel();
            self.queue.lock().clear();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
