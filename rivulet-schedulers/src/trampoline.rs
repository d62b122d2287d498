// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Calling-thread scheduler with a re-entrancy trampoline.
//!
//! Tasks scheduled while another task is running are queued and executed
//! FIFO on the same thread once the current task returns. This bounds the
//! stack for operator chains that eagerly resubscribe (retry, concat):
//! the nested schedule becomes an enqueue instead of a recursive call.

use crate::clock;
use rivulet_core::{Cancellable, PeriodicTask, Scheduler, Task, Worker};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

thread_local! {
    static QUEUE: RefCell<VecDeque<(Task, Cancellable)>> = RefCell::new(VecDeque::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

fn enqueue_and_drain(task: Task) -> Cancellable {
    let handle = Cancellable::flag();
    QUEUE.with(|queue| {
        queue.borrow_mut().push_back((task, handle.clone()));
    });

    let draining = DRAINING.with(Cell::get);
    if draining {
        // a task is already running on this thread; it drains the queue
        return handle;
    }

    DRAINING.with(|flag| flag.set(true));
    loop {
        let next = QUEUE.with(|queue| queue.borrow_mut().pop_front());
        match next {
            Some((task, task_handle)) => {
                if !task_handle.is_cancelled() {
                    task();
                }
            }
            None => break,
        }
    }
    DRAINING.with(|flag| flag.set(false));
    handle
}

/// Runs tasks on the calling thread, FIFO under re-entrancy.
///
/// Delayed and periodic scheduling are unsupported and panic: the trampoline
/// has no timing facility and silently degrading to immediate execution
/// would reorder timed pipelines.
#[derive(Clone, Copy, Default)]
pub struct TrampolineScheduler;

impl TrampolineScheduler {
    /// Create the trampoline scheduler (stateless; state is thread-local).
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Scheduler for TrampolineScheduler {
    fn schedule(&self, task: Task) -> Cancellable {
        enqueue_and_drain(task)
    }

    fn schedule_after(&self, _delay: Duration, _task: Task) -> Cancellable {
        panic!("TrampolineScheduler does not support delayed scheduling");
    }

    fn schedule_periodic(
        &self,
        _initial_delay: Duration,
        _period: Duration,
        _task: PeriodicTask,
    ) -> Cancellable {
        panic!("TrampolineScheduler does not support periodic scheduling");
    }

    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(TrampolineWorker {
            cancelled: std::sync::atomic::AtomicBool::new(false),
        })
    }

    fn now(&self) -> Duration {
        clock::now()
    }

    fn shutdown(&self) {}
}

struct TrampolineWorker {
    cancelled: std::sync::atomic::AtomicBool,
}

impl Worker for TrampolineWorker {
    fn schedule(&self, task: Task) -> Cancellable {
        if self.is_cancelled() {
            return Cancellable::empty();
        }
        enqueue_and_drain(task)
    }

    fn schedule_after(&self, _delay: Duration, _task: Task) -> Cancellable {
        panic!("TrampolineScheduler does not support delayed scheduling");
    }

    fn schedule_periodic(
        &self,
        _initial_delay: Duration,
        _period: Duration,
        _task: PeriodicTask,
    ) -> Cancellable {
        panic!("TrampolineScheduler does not support periodic scheduling");
    }

    fn cancel(&self) {
        self.cancelled
            .store(true, std::sync::atomic::Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn nested_schedules_run_fifo_after_current_task() {
        let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let scheduler = TrampolineScheduler::new();

        let outer_order = Arc::clone(&order);
        scheduler.schedule(Box::new(move || {
            let first = Arc::clone(&outer_order);
            let second = Arc::clone(&outer_order);
            TrampolineScheduler::new().schedule(Box::new(move || first.lock().push(2)));
            TrampolineScheduler::new().schedule(Box::new(move || second.lock().push(3)));
            outer_order.lock().push(1);
        }));

        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "does not support delayed scheduling")]
    fn delayed_schedule_fails_loudly() {
        TrampolineScheduler::new().schedule_after(Duration::from_millis(1), Box::new(|| {}));
    }
}
