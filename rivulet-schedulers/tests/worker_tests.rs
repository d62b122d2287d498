// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::{Condvar, Mutex};
use rivulet_core::{Scheduler, Task};
use rivulet_schedulers::{
    ComputationScheduler, EventLoopScheduler, ExecutorScheduler, IoScheduler, NewThreadScheduler,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Latch {
    state: Mutex<usize>,
    done: Condvar,
}

impl Latch {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(0),
            done: Condvar::new(),
        })
    }

    fn hit(&self) {
        *self.state.lock() += 1;
        self.done.notify_all();
    }

    fn await_count(&self, count: usize, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        let deadline = std::time::Instant::now() + timeout;
        while *state < count {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            self.done.wait_for(&mut state, remaining);
        }
        true
    }
}

fn assert_sequential(scheduler: &dyn Scheduler, submissions: usize) {
    // a worker must never overlap task execution, whatever the pool shape
    let worker = scheduler.create_worker();
    let running = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));
    let order: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let latch = Latch::new();

    for index in 0..submissions {
        let running = Arc::clone(&running);
        let overlapped = Arc::clone(&overlapped);
        let order = Arc::clone(&order);
        let latch = Arc::clone(&latch);
        worker.schedule(Box::new(move || {
            if running.swap(true, Ordering::SeqCst) {
                overlapped.store(true, Ordering::SeqCst);
            }
            order.lock().push(index);
            std::thread::sleep(Duration::from_micros(200));
            running.store(false, Ordering::SeqCst);
            latch.hit();
        }));
    }

    assert!(latch.await_count(submissions, Duration::from_secs(5)));
    assert!(!overlapped.load(Ordering::SeqCst), "worker tasks overlapped");
    assert_eq!(*order.lock(), (0..submissions).collect::<Vec<_>>());
    worker.cancel();
}

#[test]
fn computation_workers_run_sequentially_in_submission_order() {
    let scheduler = ComputationScheduler::with_pool_size(4);
    assert_sequential(&scheduler, 16);
    scheduler.shutdown();
}

#[test]
fn event_loop_workers_run_sequentially_in_submission_order() {
    let scheduler = EventLoopScheduler::new(2);
    assert_sequential(&scheduler, 16);
    scheduler.shutdown();
}

#[test]
fn io_workers_run_sequentially_in_submission_order() {
    let scheduler = IoScheduler::new();
    assert_sequential(&scheduler, 16);
    scheduler.shutdown();
}

#[test]
fn new_thread_workers_run_sequentially_in_submission_order() {
    let scheduler = NewThreadScheduler::new();
    assert_sequential(&scheduler, 16);
}

#[test]
fn executor_scheduler_serializes_worker_tasks_on_a_pool() {
    // a deliberately concurrent executor: every task gets its own thread
    let executor = ExecutorScheduler::new(|task: Task| {
        std::thread::spawn(task);
    });
    assert_sequential(&executor, 16);
}

#[test]
fn delayed_schedule_fires_after_the_delay() {
    let scheduler = ComputationScheduler::with_pool_size(1);
    let latch = Latch::new();
    let fired_at = Arc::new(Mutex::new(None));

    let start = std::time::Instant::now();
    let probe = Arc::clone(&fired_at);
    let hit = Arc::clone(&latch);
    scheduler.schedule_after(
        Duration::from_millis(30),
        Box::new(move || {
            *probe.lock() = Some(start.elapsed());
            hit.hit();
        }),
    );

    assert!(latch.await_count(1, Duration::from_secs(5)));
    let elapsed = fired_at.lock().expect("task fired");
    assert!(elapsed >= Duration::from_millis(25), "fired too early: {elapsed:?}");
    scheduler.shutdown();
}

#[test]
fn periodic_schedule_ticks_repeatedly_until_cancelled() {
    let scheduler = ComputationScheduler::with_pool_size(1);
    let ticks = Arc::new(AtomicUsize::new(0));
    let latch = Latch::new();

    let tick_count = Arc::clone(&ticks);
    let hit = Arc::clone(&latch);
    let handle = scheduler.schedule_periodic(
        Duration::from_millis(5),
        Duration::from_millis(5),
        Box::new(move || {
            tick_count.fetch_add(1, Ordering::SeqCst);
            hit.hit();
        }),
    );

    assert!(latch.await_count(3, Duration::from_secs(5)));
    handle.cancel();
    let after_cancel = ticks.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(30));
    // at most one in-flight tick may land after cancel
    assert!(ticks.load(Ordering::SeqCst) <= after_cancel + 1);
    scheduler.shutdown();
}

#[test]
fn cancelling_a_pending_task_prevents_execution() {
    let scheduler = ComputationScheduler::with_pool_size(1);
    let fired = Arc::new(AtomicBool::new(false));

    let probe = Arc::clone(&fired);
    let handle = scheduler.schedule_after(
        Duration::from_millis(50),
        Box::new(move || probe.store(true, Ordering::SeqCst)),
    );
    handle.cancel();

    std::thread::sleep(Duration::from_millis(80));
    assert!(!fired.load(Ordering::SeqCst));
    scheduler.shutdown();
}
