// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Scheduler implementations for the rivulet reactive-streams core.
//!
//! Six schedulers cover the spectrum from "stay on this thread"
//! ([`TrampolineScheduler`]) through pooled execution
//! ([`ComputationScheduler`], [`IoScheduler`], [`EventLoopScheduler`],
//! [`NewThreadScheduler`]) to adapting an external executor
//! ([`ExecutorScheduler`]). The [`TestScheduler`] drives timed operators on
//! a deterministic virtual clock.

mod clock;
mod loop_thread;

pub mod computation;
pub mod event_loop;
pub mod executor;
pub mod io;
pub mod new_thread;
pub mod test_scheduler;
pub mod trampoline;

pub use computation::ComputationScheduler;
pub use event_loop::EventLoopScheduler;
pub use executor::{Executor, ExecutorScheduler};
pub use io::IoScheduler;
pub use new_thread::NewThreadScheduler;
pub use test_scheduler::TestScheduler;
pub use trampoline::TrampolineScheduler;

use rivulet_core::Scheduler;
use std::sync::Arc;

/// The process-wide computation scheduler (default for timed sources).
pub fn computation() -> Arc<dyn Scheduler> {
    ComputationScheduler::shared()
}

/// A fresh io scheduler with default keep-alive.
pub fn io() -> Arc<dyn Scheduler> {
    Arc::new(IoScheduler::new())
}

/// The new-thread scheduler.
pub fn new_thread() -> Arc<dyn Scheduler> {
    Arc::new(NewThreadScheduler::new())
}

/// The calling-thread trampoline scheduler.
pub fn trampoline() -> Arc<dyn Scheduler> {
    Arc::new(TrampolineScheduler::new())
}
