// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Fixed pool of named event loops.

use crate::clock;
use crate::loop_thread::{LoopThread, LoopWorker};
use rivulet_core::{Cancellable, PeriodicTask, Scheduler, Task, Worker};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A fixed set of single-threaded loops with round-robin dispatch.
///
/// Unlike [`ComputationScheduler`](crate::ComputationScheduler) the pool size
/// is chosen by the caller, which makes it the right home for pipelines that
/// want a known, small set of delivery threads. Each worker pins to one loop
/// for its whole lifetime.
pub struct EventLoopScheduler {
    loops: Vec<Arc<LoopThread>>,
    next: AtomicUsize,
    shutdown: AtomicBool,
}

impl EventLoopScheduler {
    /// Create `size` event loops (at least one).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let loops = (0..size)
            .map(|index| LoopThread::spawn(format!("rivulet-event-loop-{index}")))
            .collect();
        Self {
            loops,
            next: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    fn next_loop(&self) -> Arc<LoopThread> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.loops.len();
        Arc::clone(&self.loops[index])
    }
}

impl Scheduler for EventLoopScheduler {
    fn schedule(&self, task: Task) -> Cancellable {
        self.schedule_after(Duration::ZERO, task)
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Cancellable {
        if self.shutdown.load(Ordering::Acquire) {
            return Cancellable::empty();
        }
        self.next_loop().schedule(delay, task)
    }

    fn schedule_periodic(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: PeriodicTask,
    ) -> Cancellable {
        if self.shutdown.load(Ordering::Acquire) {
            return Cancellable::empty();
        }
        self.next_loop().schedule_periodic(initial_delay, period, task)
    }

    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(LoopWorker::pinned(self.next_loop()))
    }

    fn now(&self) -> Duration {
        clock::now()
    }

    fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            for loop_thread in &self.loops {
                loop_thread.shutdown();
            }
        }
    }
}
