// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Clock-driven sources.

use rivulet_core::{Cancellable, Observable, Scheduler, SwapCancellable};
use rivulet_schedulers::ComputationScheduler;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Emit `0, 1, 2, …` every `period` on the shared computation scheduler.
pub fn interval(period: Duration) -> Observable<u64> {
    interval_on(period, ComputationScheduler::shared())
}

/// Emit `0, 1, 2, …` every `period` on `scheduler`.
///
/// Each subscription runs its own timer starting at zero.
pub fn interval_on(period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<u64> {
    Observable::new(move |observer| {
        let slot = SwapCancellable::new();
        observer.on_subscribe(slot.as_cancellable());

        let counter = AtomicU64::new(0);
        let tick_observer = observer;
        let tick_slot = slot.clone();
        let handle = scheduler.schedule_periodic(
            period,
            period,
            Box::new(move || {
                if !tick_slot.is_cancelled() {
                    tick_observer.on_next(counter.fetch_add(1, Ordering::AcqRel));
                }
            }),
        );
        slot.replace(handle);
    })
}

/// Emit a single `0` after `delay`, then complete, on the shared computation
/// scheduler.
pub fn timer(delay: Duration) -> Observable<u64> {
    timer_on(delay, ComputationScheduler::shared())
}

/// Emit a single `0` after `delay`, then complete, on `scheduler`.
pub fn timer_on(delay: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<u64> {
    Observable::new(move |observer| {
        let slot = SwapCancellable::new();
        observer.on_subscribe(slot.as_cancellable());

        let fire_observer = observer;
        let fire_slot = slot.clone();
        let handle: Cancellable = scheduler.schedule_after(
            delay,
            Box::new(move || {
                if !fire_slot.is_cancelled() {
                    fire_observer.on_next(0);
                    fire_observer.on_complete();
                }
            }),
        );
        slot.replace(handle);
    })
}
