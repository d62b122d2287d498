// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Scheduler abstraction.
//!
//! Schedulers decide *where and when* work runs; operators only ever hold an
//! `Arc<dyn Scheduler>` handle. Implementations (thread pools, the
//! trampoline, the virtual-time test clock) live in the schedulers crate so
//! that operator code stays runtime-agnostic.

use crate::cancellable::Cancellable;
use std::sync::Arc;
use std::time::Duration;

/// A one-shot unit of scheduled work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A repeatedly invoked unit of scheduled work.
pub type PeriodicTask = Box<dyn FnMut() + Send + 'static>;

/// Decides where and when submitted tasks execute.
///
/// All methods return a [`Cancellable`]; cancelling removes the task from the
/// queue if it has not started. A task already running completes, but its
/// output is discarded downstream.
pub trait Scheduler: Send + Sync {
    /// Run `task` as soon as the scheduler allows.
    fn schedule(&self, task: Task) -> Cancellable;

    /// Run `task` after `delay`.
    fn schedule_after(&self, delay: Duration, task: Task) -> Cancellable;

    /// Run `task` after `initial_delay`, then repeatedly every `period`.
    fn schedule_periodic(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: PeriodicTask,
    ) -> Cancellable;

    /// Create a worker guaranteeing sequential, non-overlapping execution of
    /// the tasks submitted to it.
    fn create_worker(&self) -> Arc<dyn Worker>;

    /// The scheduler's clock, as an offset on its own monotonic timeline.
    ///
    /// Real schedulers share one process-wide monotonic clock; the test
    /// scheduler reports virtual time.
    fn now(&self) -> Duration;

    /// Stop accepting work and release pooled resources.
    fn shutdown(&self);
}

/// A scheduler-scoped execution context with sequential task execution.
///
/// Tasks submitted to one worker never overlap and run in submission order
/// (delayed tasks in deadline order). Cancelling the worker drops all pending
/// tasks and rejects later submissions.
pub trait Worker: Send + Sync {
    /// Run `task` as soon as the worker's queue allows.
    fn schedule(&self, task: Task) -> Cancellable;

    /// Run `task` after `delay`.
    fn schedule_after(&self, delay: Duration, task: Task) -> Cancellable;

    /// Run `task` after `initial_delay`, then repeatedly every `period`.
    fn schedule_periodic(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: PeriodicTask,
    ) -> Cancellable;

    /// Drop pending tasks and reject later submissions.
    fn cancel(&self);

    /// Returns `true` once the worker has been cancelled.
    fn is_cancelled(&self) -> bool;
}
