// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{Observable, Observer, RivuletError, Scheduler};
use rivulet_operators::prelude::*;
use rivulet_schedulers::TestScheduler;
use rivulet_subjects::PublishSubject;
use rivulet_test_utils::TestObserver;
use std::sync::Arc;
use std::time::Duration;

fn virtual_scheduler() -> (Arc<TestScheduler>, Arc<dyn Scheduler>) {
    let scheduler = Arc::new(TestScheduler::new());
    let handle: Arc<dyn Scheduler> = Arc::clone(&scheduler) as Arc<dyn Scheduler>;
    (scheduler, handle)
}

/// Emits `(value, at)` pairs on the virtual clock and completes at `end`.
fn timetable(
    ts: &Arc<dyn Scheduler>,
    entries: Vec<(&'static str, u64)>,
    end: u64,
) -> Observable<&'static str> {
    let mut sources: Vec<Observable<&'static str>> = entries
        .into_iter()
        .map(|(value, at)| {
            timer_on(Duration::from_millis(at), Arc::clone(ts)).map(move |_| value)
        })
        .collect();
    sources.push(
        timer_on(Duration::from_millis(end), Arc::clone(ts))
            .map(|_| "__end__")
            .filter(|v| *v != "__end__"),
    );
    merge(sources)
}

#[test]
fn interval_emits_a_monotone_counter() {
    let (scheduler, ts) = virtual_scheduler();
    let observer = TestObserver::new();
    interval_on(Duration::from_millis(10), ts).subscribe(observer.arc());

    scheduler.advance_time_by(Duration::from_millis(35));
    observer.assert_values(&[0, 1, 2]);
    observer.assert_not_terminated();

    observer.cancel();
    scheduler.advance_time_by(Duration::from_millis(100));
    observer.assert_values(&[0, 1, 2]);
}

#[test]
fn timer_fires_once_then_completes() {
    let (scheduler, ts) = virtual_scheduler();
    let observer = TestObserver::new();
    timer_on(Duration::from_millis(25), ts).subscribe(observer.arc());

    scheduler.advance_time_by(Duration::from_millis(24));
    observer.assert_not_terminated();

    scheduler.advance_time_by(Duration::from_millis(1));
    observer.assert_values(&[0]);
    observer.assert_completed();
}

#[test]
fn delay_shifts_values_and_terminal_preserving_order() {
    let (scheduler, ts) = virtual_scheduler();
    let observer = TestObserver::new();

    timetable(&ts, vec![("a", 0), ("b", 10)], 10)
        .delay(Duration::from_millis(20), Arc::clone(&ts))
        .subscribe(observer.arc());

    scheduler.advance_time_by(Duration::from_millis(19));
    assert_eq!(observer.value_count(), 0);

    scheduler.advance_time_by(Duration::from_millis(1));
    observer.assert_values(&["a"]);

    scheduler.advance_time_by(Duration::from_millis(10));
    observer.assert_values(&["a", "b"]);
    observer.assert_completed();
}

#[test]
fn timeout_errors_when_the_window_lapses() {
    let (scheduler, ts) = virtual_scheduler();
    let observer = TestObserver::<i32>::new();

    let silent = PublishSubject::new();
    silent
        .as_observable()
        .timeout(Duration::from_millis(30), ts)
        .subscribe(observer.arc());

    scheduler.advance_time_by(Duration::from_millis(29));
    observer.assert_not_terminated();

    scheduler.advance_time_by(Duration::from_millis(1));
    assert!(observer.assert_error().is_timeout());
}

#[test]
fn timeout_resets_on_every_value() {
    let (scheduler, ts) = virtual_scheduler();
    let observer = TestObserver::new();
    let source = PublishSubject::new();

    source
        .as_observable()
        .timeout(Duration::from_millis(30), ts)
        .subscribe(observer.arc());

    scheduler.advance_time_by(Duration::from_millis(20));
    source.on_next(1);
    scheduler.advance_time_by(Duration::from_millis(20));
    source.on_next(2);
    scheduler.advance_time_by(Duration::from_millis(29));
    source.on_complete();

    observer.assert_values(&[1, 2]);
    observer.assert_completed();
}

#[test]
fn debounce_keeps_only_values_followed_by_quiet() {
    // a@0 replaced by b@5 (emitted t25); c@50 (emitted t70); complete @200
    let (scheduler, ts) = virtual_scheduler();
    let observer = TestObserver::new();

    timetable(&ts, vec![("a", 0), ("b", 5), ("c", 50)], 200)
        .debounce(Duration::from_millis(20), Arc::clone(&ts))
        .subscribe(observer.arc());

    scheduler.advance_time_by(Duration::from_millis(24));
    assert_eq!(observer.value_count(), 0);

    scheduler.advance_time_by(Duration::from_millis(1));
    observer.assert_values(&["b"]);

    scheduler.advance_time_by(Duration::from_millis(45));
    observer.assert_values(&["b", "c"]);
    observer.assert_not_terminated();

    scheduler.advance_time_by(Duration::from_millis(130));
    observer.assert_completed();
}

#[test]
fn debounce_flushes_the_pending_value_on_completion() {
    let (scheduler, ts) = virtual_scheduler();
    let observer = TestObserver::new();
    let source = PublishSubject::new();

    source
        .as_observable()
        .debounce(Duration::from_millis(20), ts)
        .subscribe(observer.arc());

    source.on_next("pending");
    source.on_complete();

    observer.assert_values(&["pending"]);
    observer.assert_completed();
    scheduler.advance_time_by(Duration::from_millis(100));
    observer.assert_values(&["pending"]);
}

#[test]
fn throttle_first_emits_the_window_opener_and_drops_the_rest() {
    let (scheduler, ts) = virtual_scheduler();
    let observer = TestObserver::new();

    timetable(&ts, vec![("a", 0), ("b", 5), ("c", 12), ("d", 40)], 50)
        .throttle_first(Duration::from_millis(10), Arc::clone(&ts))
        .subscribe(observer.arc());

    scheduler.advance_time_by(Duration::from_millis(60));
    // a opens a window (b dropped), c opens the next, d the one after
    observer.assert_values(&["a", "c", "d"]);
    observer.assert_completed();
}

#[test]
fn throttle_last_samples_the_latest_value_per_tick() {
    let (scheduler, ts) = virtual_scheduler();
    let observer = TestObserver::new();

    timetable(&ts, vec![("a", 1), ("b", 5), ("c", 12), ("d", 31)], 45)
        .throttle_last(Duration::from_millis(10), Arc::clone(&ts))
        .subscribe(observer.arc());

    scheduler.advance_time_by(Duration::from_millis(60));
    // tick@10 -> b, tick@20 -> c, tick@30 -> nothing, tick@40 -> d
    observer.assert_values(&["b", "c", "d"]);
    observer.assert_completed();
}

#[test]
fn timed_operator_error_propagates_immediately() {
    let (scheduler, ts) = virtual_scheduler();
    let observer = TestObserver::<&'static str>::new();
    let source = PublishSubject::new();

    source
        .as_observable()
        .debounce(Duration::from_millis(20), ts)
        .subscribe(observer.arc());

    source.on_next("dropped");
    source.on_error(RivuletError::custom("boom"));
    observer.assert_error();
    assert_eq!(observer.value_count(), 0);

    scheduler.advance_time_by(Duration::from_millis(100));
    assert_eq!(observer.value_count(), 0);
}
