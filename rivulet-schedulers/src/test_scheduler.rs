// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Deterministic virtual-time scheduler for testing timed operators.
//!
//! The clock never moves on its own; tests advance it explicitly and every
//! queued task fires at a deterministic point. Entries are ordered by
//! `(virtual_time, insertion_seq)`, never by time alone, so tasks scheduled
//! for the same instant run in the order they were scheduled.

use parking_lot::Mutex;
use rivulet_core::{Cancellable, PeriodicTask, Scheduler, Task, Worker};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

enum VirtualTask {
    Once(Task),
    Periodic { task: PeriodicTask, period: Duration },
}

struct VirtualEntry {
    at: Duration,
    seq: u64,
    task: VirtualTask,
    handle: Cancellable,
}

impl VirtualEntry {
    fn key(&self) -> (Duration, u64) {
        (self.at, self.seq)
    }
}

impl PartialEq for VirtualEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for VirtualEntry {}

impl PartialOrd for VirtualEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for VirtualEntry {
    // reversed: std's max-heap pops the earliest (time, seq) first
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.key().cmp(&self.key())
    }
}

struct VirtualState {
    queue: BinaryHeap<VirtualEntry>,
    now: Duration,
    seq: u64,
    shutdown: bool,
}

/// A scheduler whose clock is advanced manually by the test.
pub struct TestScheduler {
    state: Arc<Mutex<VirtualState>>,
}

impl TestScheduler {
    /// Create a scheduler at virtual time zero with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(VirtualState {
                queue: BinaryHeap::new(),
                now: Duration::ZERO,
                seq: 0,
                shutdown: false,
            })),
        }
    }

    /// Advance the virtual clock by `duration`, running every task whose
    /// fire time falls inside the window, in `(time, seq)` order.
    pub fn advance_time_by(&self, duration: Duration) {
        let target = self.state.lock().now + duration;
        self.advance_time_to(target);
    }

    /// Advance the virtual clock to `target`, running due tasks on the way.
    ///
    /// `now` moves to each entry's fire time before it executes, so a task
    /// reading the clock sees the instant it was scheduled for; afterwards
    /// `now` rests at `target`.
    pub fn advance_time_to(&self, target: Duration) {
        loop {
            let entry = {
                let mut state = self.state.lock();
                if state.shutdown {
                    return;
                }
                match state.queue.peek() {
                    Some(next) if next.at <= target => {
                        let entry = state.queue.pop().expect("peeked entry");
                        state.now = entry.at;
                        entry
                    }
                    _ => {
                        if target > state.now {
                            state.now = target;
                        }
                        return;
                    }
                }
            };
            self.run(entry);
        }
    }

    /// Run at most one queued task, jumping `now` to its fire time.
    ///
    /// Does nothing when the queue is empty.
    pub fn trigger_actions(&self) {
        let entry = {
            let mut state = self.state.lock();
            if state.shutdown {
                return;
            }
            match state.queue.pop() {
                Some(entry) => {
                    state.now = entry.at;
                    entry
                }
                None => return,
            }
        };
        self.run(entry);
    }

    /// Clear the queue; later advances do nothing.
    pub fn shutdown_queue(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        state.queue.clear();
    }

    fn run(&self, entry: VirtualEntry) {
        if entry.handle.is_cancelled() {
            return;
        }
        match entry.task {
            VirtualTask::Once(task) => task(),
            VirtualTask::Periodic { mut task, period } => {
                task();
                if !entry.handle.is_cancelled() {
                    let mut state = self.state.lock();
                    if !state.shutdown {
                        let seq = state.seq;
                        state.seq += 1;
                        state.queue.push(VirtualEntry {
                            at: entry.at + period,
                            seq,
                            task: VirtualTask::Periodic { task, period },
                            handle: entry.handle,
                        });
                    }
                }
            }
        }
    }

    fn insert(&self, delay: Duration, task: VirtualTask) -> Cancellable {
        let handle = Cancellable::flag();
        let mut state = self.state.lock();
        if state.shutdown {
            handle.cancel();
            return handle;
        }
        let at = state.now + delay;
        let seq = state.seq;
        state.seq += 1;
        state.queue.push(VirtualEntry {
            at,
            seq,
            task,
            handle: handle.clone(),
        });
        handle
    }
}

impl Default for TestScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TestScheduler {
    fn schedule(&self, task: Task) -> Cancellable {
        self.insert(Duration::ZERO, VirtualTask::Once(task))
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Cancellable {
        self.insert(delay, VirtualTask::Once(task))
    }

    fn schedule_periodic(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: PeriodicTask,
    ) -> Cancellable {
        self.insert(initial_delay, VirtualTask::Periodic { task, period })
    }

    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(TestWorker {
            scheduler: TestScheduler {
                state: Arc::clone(&self.state),
            },
            tasks: rivulet_core::CompositeCancellable::new(),
        })
    }

    fn now(&self) -> Duration {
        self.state.lock().now
    }

    fn shutdown(&self) {
        self.shutdown_queue();
    }
}

struct TestWorker {
    scheduler: TestScheduler,
    tasks: rivulet_core::CompositeCancellable,
}

impl Worker for TestWorker {
    fn schedule(&self, task: Task) -> Cancellable {
        self.schedule_after(Duration::ZERO, task)
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Cancellable {
        if self.tasks.is_cancelled() {
            return Cancellable::empty();
        }
        let handle = self.scheduler.insert(delay, VirtualTask::Once(task));
        self.tasks.add(handle.clone());
        handle
    }

    fn schedule_periodic(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: PeriodicTask,
    ) -> Cancellable {
        if self.tasks.is_cancelled() {
            return Cancellable::empty();
        }
        let handle = self
            .scheduler
            .insert(initial_delay, VirtualTask::Periodic { task, period });
        self.tasks.add(handle.clone());
        handle
    }

    fn cancel(&self) {
        self.tasks.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.tasks.is_cancelled()
    }
}
