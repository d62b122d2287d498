// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Adapter over an external executor.
//!
//! Delayed and periodic schedules ride a process-wide timing wheel (one
//! shared loop thread) that fires submissions into the executor; workers
//! serialize through a queued drain so tasks never overlap even when the
//! executor is a thread pool.

use crate::clock;
use crate::loop_thread::LoopThread;
use parking_lot::Mutex;
use rivulet_core::{Cancellable, PeriodicTask, Scheduler, Task, Worker};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Minimal external execution facility adapted by [`ExecutorScheduler`].
pub trait Executor: Send + Sync {
    /// Run `task`, now or later, on any thread.
    fn execute(&self, task: Task);
}

impl<F> Executor for F
where
    F: Fn(Task) + Send + Sync,
{
    fn execute(&self, task: Task) {
        self(task);
    }
}

fn timing_wheel() -> Arc<LoopThread> {
    static WHEEL: OnceLock<Arc<LoopThread>> = OnceLock::new();
    Arc::clone(WHEEL.get_or_init(|| LoopThread::spawn("rivulet-timer")))
}

/// Runs rivulet tasks on a caller-provided [`Executor`].
pub struct ExecutorScheduler {
    executor: Arc<dyn Executor>,
    shutdown: AtomicBool,
}

impl ExecutorScheduler {
    /// Wrap an external executor.
    pub fn new(executor: impl Executor + 'static) -> Self {
        Self {
            executor: Arc::new(executor),
            shutdown: AtomicBool::new(false),
        }
    }

    fn submit(&self, task: Task) -> Cancellable {
        let handle = Cancellable::flag();
        let guard = handle.clone();
        self.executor.execute(Box::new(move || {
            if !guard.is_cancelled() {
                task();
            }
        }));
        handle
    }
}

impl Scheduler for ExecutorScheduler {
    fn schedule(&self, task: Task) -> Cancellable {
        if self.shutdown.load(Ordering::Acquire) {
            return Cancellable::empty();
        }
        self.submit(task)
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Cancellable {
        if self.shutdown.load(Ordering::Acquire) {
            return Cancellable::empty();
        }
        if delay.is_zero() {
            return self.submit(task);
        }
        let executor = Arc::clone(&self.executor);
        let handle = Cancellable::flag();
        let guard = handle.clone();
        let fired = timing_wheel().schedule(
            delay,
            Box::new(move || {
                if !guard.is_cancelled() {
                    let inner_guard = guard.clone();
                    executor.execute(Box::new(move || {
                        if !inner_guard.is_cancelled() {
                            task();
                        }
                    }));
                }
            }),
        );
        let wheel_entry = fired;
        Cancellable::from_action(move || {
            handle.cancel();
            wheel_entry.cancel();
        })
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
        let executor = Arc::clone(&self.executor);
        // the wheel ticks; each tick hands one run to the executor, sharing
        // the FnMut task behind a lock
        let task = Arc::new(Mutex::new(task));
        timing_wheel().schedule_periodic(
            initial_delay,
            period,
            Box::new(move || {
                let task = Arc::clone(&task);
                executor.execute(Box::new(move || {
                    (task.lock())();
                }));
            }),
        )
    }

    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(ExecutorWorker {
            executor: Arc::clone(&self.executor),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            wip: Arc::new(AtomicUsize::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    fn now(&self) -> Duration {
        clock::now()
    }

    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

struct ExecutorWorker {
    executor: Arc<dyn Executor>,
    queue: Arc<Mutex<VecDeque<(Task, Cancellable)>>>,
    wip: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl ExecutorWorker {
    fn enqueue(&self, task: Task) -> Cancellable {
        if self.is_cancelled() {
            return Cancellable::empty();
        }
        let handle = Cancellable::flag();
        self.queue.lock().push_back((task, handle.clone()));

        // enter-once drain keeps worker tasks sequential on any executor
        if self.wip.fetch_add(1, Ordering::AcqRel) == 0 {
            let queue = Arc::clone(&self.queue);
            let wip = Arc::clone(&self.wip);
            let cancelled = Arc::clone(&self.cancelled);
            self.executor.execute(Box::new(move || {
                let mut missed = 1usize;
                loop {
                    loop {
                        let next = queue.lock().pop_front();
                        match next {
                            Some((task, task_handle)) => {
                                if !cancelled.load(Ordering::Acquire)
                                    && !task_handle.is_cancelled()
                                {
                                    task();
                                }
                            }
                            None => break,
                        }
                    }
                    missed = wip.fetch_sub(missed, Ordering::AcqRel) - missed;
                    if missed == 0 {
                        break;
                    }
                }
            }));
        }
        handle
    }
}

impl Worker for ExecutorWorker {
    fn schedule(&self, task: Task) -> Cancellable {
        self.enqueue(task)
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Cancellable {
        if self.is_cancelled() {
            return Cancellable::empty();
        }
        if delay.is_zero() {
            return self.enqueue(task);
        }
        let worker = self.clone_parts();
        let handle = Cancellable::flag();
        let guard = handle.clone();
        let wheel_entry = timing_wheel().schedule(
            delay,
            Box::new(move || {
                if !guard.is_cancelled() {
                    worker.enqueue(task);
                }
            }),
        );
        Cancellable::from_action(move || {
            handle.cancel();
            wheel_entry.cancel();
        })
    }

    fn schedule_periodic(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: PeriodicTask,
    ) -> Cancellable {
        if self.is_cancelled() {
            return Cancellable::empty();
        }
        let worker = self.clone_parts();
        let task = Arc::new(Mutex::new(task));
        timing_wheel().schedule_periodic(
            initial_delay,
            period,
            Box::new(move || {
                let task = Arc::clone(&task);
                worker.enqueue(Box::new(move || {
                    (task.lock())();
                }));
            }),
        )
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.queue.lock().clear();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl ExecutorWorker {
    fn clone_parts(&self) -> ExecutorWorker {
        ExecutorWorker {
            executor: Arc::clone(&self.executor),
            queue: Arc::clone(&self.queue),
            wip: Arc::clone(&self.wip),
            cancelled: Arc::clone(&self.cancelled),
        }
    }
}
