// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Fixed pool sized to the hardware parallelism count.

use crate::clock;
use crate::loop_thread::{LoopThread, LoopWorker};
use rivulet_core::{Cancellable, PeriodicTask, Scheduler, Task, Worker};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// CPU-bound work scheduler: one single-threaded loop per hardware thread,
/// round-robin dispatch. Workers pin to one loop.
pub struct ComputationScheduler {
    loops: Vec<Arc<LoopThread>>,
    next: AtomicUsize,
    shutdown: AtomicBool,
}

impl ComputationScheduler {
    /// Create a pool sized to `std::thread::available_parallelism()`.
    #[must_use]
    pub fn new() -> Self {
        let size = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self::with_pool_size(size)
    }

    /// Create a pool with an explicit slot count.
    #[must_use]
    pub fn with_pool_size(size: usize) -> Self {
        let size = size.max(1);
        let loops = (0..size)
            .map(|index| LoopThread::spawn(format!("rivulet-compute-{index}")))
            .collect();
        Self {
            loops,
            next: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Process-wide shared instance, used as the default for timed sources.
    pub fn shared() -> Arc<dyn Scheduler> {
        static SHARED: OnceLock<Arc<ComputationScheduler>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(ComputationScheduler::new()))) as Arc<dyn Scheduler>
    }

    fn next_loop(&self) -> Arc<LoopThread> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.loops.len();
        Arc::clone(&self.loops[index])
    }
}

impl Default for ComputationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ComputationScheduler {
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
