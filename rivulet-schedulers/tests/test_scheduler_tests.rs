// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rivulet_core::Scheduler;
use rivulet_schedulers::TestScheduler;
use std::sync::Arc;
use std::time::Duration;

fn record(log: &Arc<Mutex<Vec<&'static str>>>, entry: &'static str) -> Box<dyn FnOnce() + Send> {
    let log = Arc::clone(log);
    Box::new(move || log.lock().push(entry))
}

#[test]
fn advance_time_by_runs_tasks_in_deadline_order() {
    // Arrange
    let scheduler = TestScheduler::new();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    scheduler.schedule_after(Duration::from_millis(30), record(&log, "late"));
    scheduler.schedule_after(Duration::from_millis(10), record(&log, "early"));
    scheduler.schedule_after(Duration::from_millis(20), record(&log, "middle"));

    // Act
    scheduler.advance_time_by(Duration::from_millis(25));

    // Assert
    assert_eq!(*log.lock(), vec!["early", "middle"]);
    assert_eq!(scheduler.now(), Duration::from_millis(25));

    scheduler.advance_time_by(Duration::from_millis(10));
    assert_eq!(*log.lock(), vec!["early", "middle", "late"]);
    assert_eq!(scheduler.now(), Duration::from_millis(35));
}

#[test]
fn identical_fire_times_run_in_insertion_order() {
    let scheduler = TestScheduler::new();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    scheduler.schedule_after(Duration::from_millis(5), record(&log, "first"));
    scheduler.schedule_after(Duration::from_millis(5), record(&log, "second"));
    scheduler.schedule_after(Duration::from_millis(5), record(&log, "third"));

    scheduler.advance_time_by(Duration::from_millis(5));
    assert_eq!(*log.lock(), vec!["first", "second", "third"]);
}

#[test]
fn now_reflects_the_running_entry_fire_time() {
    let scheduler = Arc::new(TestScheduler::new());
    let observed: Arc<Mutex<Option<Duration>>> = Arc::new(Mutex::new(None));

    let probe = Arc::clone(&observed);
    let clock = Arc::clone(&scheduler);
    scheduler.schedule_after(
        Duration::from_millis(12),
        Box::new(move || {
            *probe.lock() = Some(clock.now());
        }),
    );

    scheduler.advance_time_by(Duration::from_millis(40));
    assert_eq!(*observed.lock(), Some(Duration::from_millis(12)));
    assert_eq!(scheduler.now(), Duration::from_millis(40));
}

#[test]
fn periodic_tasks_reinsert_with_period_increment() {
    let scheduler = Arc::new(TestScheduler::new());
    let ticks: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));

    let tick_log = Arc::clone(&ticks);
    let clock = Arc::clone(&scheduler);
    scheduler.schedule_periodic(
        Duration::from_millis(10),
        Duration::from_millis(10),
        Box::new(move || tick_log.lock().push(clock.now())),
    );

    scheduler.advance_time_by(Duration::from_millis(35));
    assert_eq!(
        *ticks.lock(),
        vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(30),
        ]
    );
}

#[test]
fn trigger_actions_runs_exactly_one_task_and_jumps_the_clock() {
    let scheduler = TestScheduler::new();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    scheduler.schedule_after(Duration::from_millis(7), record(&log, "a"));
    scheduler.schedule_after(Duration::from_millis(9), record(&log, "b"));

    scheduler.trigger_actions();
    assert_eq!(*log.lock(), vec!["a"]);
    assert_eq!(scheduler.now(), Duration::from_millis(7));

    scheduler.trigger_actions();
    assert_eq!(*log.lock(), vec!["a", "b"]);
    assert_eq!(scheduler.now(), Duration::from_millis(9));

    // empty queue: no-op
    scheduler.trigger_actions();
    assert_eq!(scheduler.now(), Duration::from_millis(9));
}

#[test]
fn cancelled_entries_are_skipped() {
    let scheduler = TestScheduler::new();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let handle = scheduler.schedule_after(Duration::from_millis(5), record(&log, "cancelled"));
    scheduler.schedule_after(Duration::from_millis(6), record(&log, "kept"));
    handle.cancel();

    scheduler.advance_time_by(Duration::from_millis(10));
    assert_eq!(*log.lock(), vec!["kept"]);
}

#[test]
fn shutdown_clears_the_queue_and_freezes_advances() {
    let scheduler = TestScheduler::new();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    scheduler.schedule_after(Duration::from_millis(5), record(&log, "never"));
    scheduler.shutdown();

    scheduler.advance_time_by(Duration::from_millis(50));
    assert!(log.lock().is_empty());
}

#[test]
fn tasks_scheduled_during_execution_land_relative_to_virtual_now() {
    let scheduler = Arc::new(TestScheduler::new());
    let log: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));

    let outer_clock = Arc::clone(&scheduler);
    let outer_log = Arc::clone(&log);
    scheduler.schedule_after(
        Duration::from_millis(10),
        Box::new(move || {
            let inner_clock = Arc::clone(&outer_clock);
            let inner_log = Arc::clone(&outer_log);
            outer_clock.schedule_after(
                Duration::from_millis(5),
                Box::new(move || inner_log.lock().push(inner_clock.now())),
            );
        }),
    );

    scheduler.advance_time_by(Duration::from_millis(20));
    // inner task was scheduled at virtual t=10, so it fires at t=15
    assert_eq!(*log.lock(), vec![Duration::from_millis(15)]);
}

#[test]
fn worker_cancel_drops_its_pending_tasks() {
    let scheduler = TestScheduler::new();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let worker = scheduler.create_worker();
    worker.schedule_after(Duration::from_millis(5), record(&log, "worker"));
    scheduler.schedule_after(Duration::from_millis(5), record(&log, "direct"));
    worker.cancel();

    scheduler.advance_time_by(Duration::from_millis(10));
    assert_eq!(*log.lock(), vec!["direct"]);
}
