// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! One fresh thread per submission.

use crate::clock;
use crate::loop_thread::{LoopThread, LoopWorker};
use rivulet_core::{Cancellable, PeriodicTask, Scheduler, Task, Worker};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

static THREAD_INDEX: AtomicUsize = AtomicUsize::new(0);

fn next_name() -> String {
    format!(
        "rivulet-new-thread-{}",
        THREAD_INDEX.fetch_add(1, Ordering::Relaxed)
    )
}

/// Spawns a dedicated thread for every direct submission and every worker.
///
/// Direct one-shot submissions release their thread when the task finishes;
/// workers hold theirs until cancelled.
#[derive(Clone, Copy, Default)]
pub struct NewThreadScheduler;

impl NewThreadScheduler {
    /// Create the scheduler (stateless; each submission gets fresh state).
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Scheduler for NewThreadScheduler {
    fn schedule(&self, task: Task) -> Cancellable {
        self.schedule_after(Duration::ZERO, task)
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Cancellable {
        let loop_thread = LoopThread::spawn(next_name());
        let retire = Arc::clone(&loop_thread);
        let handle = loop_thread.schedule(
            delay,
            Box::new(move || {
                task();
                retire.shutdown();
            }),
        );
        let reaper = Arc::clone(&loop_thread);
        // tie thread lifetime to the task handle so a cancel also reaps it
        Cancellable::from_action(move || {
            handle.cancel();
            reaper.shutdown();
        })
    }

    fn schedule_periodic(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: PeriodicTask,
    ) -> Cancellable {
        let loop_thread = LoopThread::spawn(next_name());
        let handle = loop_thread.schedule_periodic(initial_delay, period, task);
        let reaper = Arc::clone(&loop_thread);
        Cancellable::from_action(move || {
            handle.cancel();
            reaper.shutdown();
        })
    }

    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(LoopWorker::owning(LoopThread::spawn(next_name())))
    }

    fn now(&self) -> Duration {
        clock::now()
    }

    fn shutdown(&self) {}
}
