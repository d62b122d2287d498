// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Single-threaded timed task loop.
//!
//! One `LoopThread` owns one OS thread parked on a condvar and a binary heap
//! of `(deadline, insertion-seq)`-keyed entries. Every pooled scheduler
//! (computation, io, event-loop, new-thread) and the executor timing wheel
//! is built from these loops; running everything on one thread is what gives
//! workers their sequential, non-overlapping execution guarantee.

use crate::clock;
use parking_lot::{Condvar, Mutex};
use rivulet_core::{Cancellable, PeriodicTask, Task};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

enum EntryKind {
    Once(Task),
    Periodic { task: PeriodicTask, period: Duration },
}

struct Entry {
    deadline: Duration,
    seq: u64,
    kind: EntryKind,
    handle: Cancellable,
}

impl Entry {
    fn key(&self) -> (Duration, u64) {
        (self.deadline, self.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // reversed so the std max-heap pops the earliest (deadline, seq) first
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

struct LoopState {
    queue: BinaryHeap<Entry>,
    seq: u64,
    shutdown: bool,
}

struct LoopShared {
    state: Mutex<LoopState>,
    condvar: Condvar,
    name: String,
}

/// A dedicated thread executing timed tasks in `(deadline, seq)` order.
pub(crate) struct LoopThread {
    shared: Arc<LoopShared>,
}

impl LoopThread {
    pub(crate) fn spawn(name: impl Into<String>) -> Arc<Self> {
        let name = name.into();
        let shared = Arc::new(LoopShared {
            state: Mutex::new(LoopState {
                queue: BinaryHeap::new(),
                seq: 0,
                shutdown: false,
            }),
            condvar: Condvar::new(),
            name: name.clone(),
        });

        let runner = Arc::clone(&shared);
        // detached: the loop exits on shutdown, the process never waits on it
        let spawned = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_loop(&runner));
        if let Err(error) = spawned {
            tracing::error!(thread = %name, %error, "failed to spawn loop thread");
        } else {
            tracing::debug!(thread = %name, "loop thread started");
        }

        Arc::new(Self { shared })
    }

    /// Schedule a one-shot task `delay` from now.
    pub(crate) fn schedule(&self, delay: Duration, task: Task) -> Cancellable {
        let handle = Cancellable::flag();
        self.push(Entry {
            deadline: clock::now() + delay,
            seq: 0,
            kind: EntryKind::Once(task),
            handle: handle.clone(),
        });
        handle
    }

    /// Schedule a periodic task: first run after `initial_delay`, then every
    /// `period`.
    pub(crate) fn schedule_periodic(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: PeriodicTask,
    ) -> Cancellable {
        let handle = Cancellable::flag();
        self.push(Entry {
            deadline: clock::now() + initial_delay,
            seq: 0,
            kind: EntryKind::Periodic { task, period },
            handle: handle.clone(),
        });
        handle
    }

    fn push(&self, mut entry: Entry) {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            entry.handle.cancel();
            return;
        }
        entry.seq = state.seq;
        state.seq += 1;
        state.queue.push(entry);
        drop(state);
        self.shared.condvar.notify_one();
    }

    /// Drop all pending tasks and stop the thread.
    pub(crate) fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.queue.clear();
        }
        self.shared.condvar.notify_one();
        tracing::debug!(thread = %self.shared.name, "loop thread shut down");
    }
}

fn run_loop(shared: &Arc<LoopShared>) {
    loop {
        let entry = {
            let mut state = shared.state.lock();
            loop {
                if state.shutdown {
                    return;
                }
                let wait = match state.queue.peek() {
                    None => None,
                    Some(next) => {
                        let now = clock::now();
                        if next.deadline <= now {
                            break state.queue.pop().expect("peeked entry");
                        }
                        Some(next.deadline - now)
                    }
                };
                match wait {
                    Some(timeout) => {
                        shared.condvar.wait_for(&mut state, timeout);
                    }
                    None => shared.condvar.wait(&mut state),
                }
            }
        };

        if entry.handle.is_cancelled() {
            continue;
        }

        match entry.kind {
            EntryKind::Once(task) => task(),
            EntryKind::Periodic { mut task, period } => {
                task();
                if !entry.handle.is_cancelled() {
                    let mut state = shared.state.lock();
                    if !state.shutdown {
                        let seq = state.seq;
                        state.seq += 1;
                        state.queue.push(Entry {
                            deadline: entry.deadline + period,
                            seq,
                            kind: EntryKind::Periodic { task, period },
                            handle: entry.handle,
                        });
                        drop(state);
                        shared.condvar.notify_one();
                    }
                }
            }
        }
    }
}

/// Worker pinned to one [`LoopThread`].
///
/// Sequentiality comes from the loop itself (one thread); the worker adds
/// bulk cancellation of everything it scheduled.
pub(crate) struct LoopWorker {
    loop_thread: Arc<LoopThread>,
    tasks: rivulet_core::CompositeCancellable,
    // runs once on cancel: shuts a dedicated loop down, or checks a pooled
    // loop back in
    on_cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl LoopWorker {
    pub(crate) fn pinned(loop_thread: Arc<LoopThread>) -> Self {
        Self {
            loop_thread,
            tasks: rivulet_core::CompositeCancellable::new(),
            on_cancel: Mutex::new(None),
        }
    }

    pub(crate) fn owning(loop_thread: Arc<LoopThread>) -> Self {
        let dedicated = Arc::clone(&loop_thread);
        Self::released(loop_thread, move || dedicated.shutdown())
    }

    pub(crate) fn released(
        loop_thread: Arc<LoopThread>,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            loop_thread,
            tasks: rivulet_core::CompositeCancellable::new(),
            on_cancel: Mutex::new(Some(Box::new(on_cancel))),
        }
    }

    fn tracked(&self, schedule: impl FnOnce() -> Cancellable) -> Cancellable {
        if self.tasks.is_cancelled() {
            return Cancellable::empty();
        }
        let handle = schedule();
        self.tasks.add(handle.clone());
        handle
    }
}

impl rivulet_core::Worker for LoopWorker {
    fn schedule(&self, task: Task) -> Cancellable {
        self.schedule_after(Duration::ZERO, task)
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Cancellable {
        let tasks = self.tasks.clone();
        self.tracked(|| {
            let cleanup = tasks.clone();
            let handle_slot: Arc<Mutex<Option<Cancellable>>> = Arc::new(Mutex::new(None));
            let slot = Arc::clone(&handle_slot);
            let handle = self.loop_thread.schedule(
                delay,
                Box::new(move || {
                    task();
                    // self-remove so long-lived workers do not accumulate handles
                    if let Some(own) = slot.lock().take() {
                        cleanup.remove(&own);
                    }
                }),
            );
            *handle_slot.lock() = Some(handle.clone());
            handle
        })
    }

    fn schedule_periodic(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: PeriodicTask,
    ) -> Cancellable {
        self.tracked(|| self.loop_thread.schedule_periodic(initial_delay, period, task))
    }

    fn cancel(&self) {
        self.tasks.cancel();
        if let Some(release) = self.on_cancel.lock().take() {
            release();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.tasks.is_cancelled()
    }
}
