// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Elastic cached pool for blocking work.

use crate::clock;
use crate::loop_thread::{LoopThread, LoopWorker};
use parking_lot::Mutex;
use rivulet_core::{Cancellable, PeriodicTask, Scheduler, Task, Worker};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

struct Idle {
    loop_thread: Arc<LoopThread>,
    since: Duration,
}

struct Cache {
    idle: Mutex<Vec<Idle>>,
    keep_alive: Duration,
    index: AtomicUsize,
    shutdown: AtomicBool,
}

impl Cache {
    fn checkout(&self) -> Arc<LoopThread> {
        let now = clock::now();
        let mut idle = self.idle.lock();
        // expire loops that sat idle beyond the keep-alive
        idle.retain(|entry| {
            let live = now.saturating_sub(entry.since) < self.keep_alive;
            if !live {
                tracing::debug!("expiring idle io loop");
                entry.loop_thread.shutdown();
            }
            live
        });
        if let Some(entry) = idle.pop() {
            return entry.loop_thread;
        }
        drop(idle);
        let index = self.index.fetch_add(1, Ordering::Relaxed);
        LoopThread::spawn(format!("rivulet-io-{index}"))
    }

    fn checkin(&self, loop_thread: Arc<LoopThread>) {
        if self.shutdown.load(Ordering::Acquire) {
            loop_thread.shutdown();
            return;
        }
        self.idle.lock().push(Idle {
            loop_thread,
            since: clock::now(),
        });
    }
}

/// Blocking-work scheduler backed by an elastic cache of loop threads.
///
/// Workers check a loop out of the cache and return it on cancel; loops idle
/// beyond the keep-alive window are retired.
pub struct IoScheduler {
    cache: Arc<Cache>,
}

impl IoScheduler {
    /// Create a scheduler with the default 60 s keep-alive.
    #[must_use]
    pub fn new() -> Self {
        Self::with_keep_alive(DEFAULT_KEEP_ALIVE)
    }

    /// Create a scheduler with an explicit idle keep-alive window.
    #[must_use]
    pub fn with_keep_alive(keep_alive: Duration) -> Self {
        Self {
            cache: Arc::new(Cache {
                idle: Mutex::new(Vec::new()),
                keep_alive,
                index: AtomicUsize::new(0),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    fn direct(&self, delay: Duration, task: Task) -> Cancellable {
        let loop_thread = self.cache.checkout();
        let cache = Arc::clone(&self.cache);
        let release = Arc::clone(&loop_thread);
        loop_thread.schedule(
            delay,
            Box::new(move || {
                task();
                cache.checkin(release);
            }),
        )
    }
}

impl Default for IoScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for IoScheduler {
    fn schedule(&self, task: Task) -> Cancellable {
        self.direct(Duration::ZERO, task)
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Cancellable {
        self.direct(delay, task)
    }

    fn schedule_periodic(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: PeriodicTask,
    ) -> Cancellable {
        // a periodic submission pins its loop until cancelled
        let loop_thread = self.cache.checkout();
        let handle = loop_thread.schedule_periodic(initial_delay, period, task);
        let cache = Arc::clone(&self.cache);
        Cancellable::from_action(move || {
            handle.cancel();
            cache.checkin(loop_thread);
        })
    }

    fn create_worker(&self) -> Arc<dyn Worker> {
        let loop_thread = self.cache.checkout();
        let cache = Arc::clone(&self.cache);
        let release = Arc::clone(&loop_thread);
        Arc::new(LoopWorker::released(loop_thread, move || {
            cache.checkin(release);
        }))
    }

    fn now(&self) -> Duration {
        clock::now()
    }

    fn shutdown(&self) {
        if !self.cache.shutdown.swap(true, Ordering::AcqRel) {
            for entry in self.cache.idle.lock().drain(..) {
                entry.loop_thread.shutdown();
            }
        }
    }
}
