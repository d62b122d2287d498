// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Core protocol of the rivulet reactive-streams library.
//!
//! This crate defines the four reactive shapes ([`Observable`], [`Single`],
//! [`Maybe`], [`Completable`]), their observer contracts, cancellation
//! handles, the error taxonomy and the scheduler abstraction. Everything else
//! in the workspace (subjects, operators, schedulers, the backpressure
//! channel) builds on these types.
//!
//! # Event protocol
//!
//! Every subscription receives `on_subscribe` exactly once, strictly first,
//! then zero or more values, then exactly one terminal (unless it is
//! cancelled beforehand). Nothing is delivered after a terminal or after
//! cancellation. Notifications for one subscription are serialized: at most
//! one observer method runs at a time.

pub mod cancellable;
pub mod completable;
pub mod error;
pub mod guard;
pub mod maybe;
pub mod observable;
pub mod observer;
pub mod scheduler;
pub mod serialized;
pub mod single;

pub use cancellable::{Cancellable, CompositeCancellable, SwapCancellable};
pub use completable::Completable;
pub use error::{Result, RivuletError};
pub use guard::guarded;
pub use maybe::Maybe;
pub use observable::{Emitter, Observable};
pub use observer::{
    CompletableObserver, MaybeObserver, Notification, Observer, SingleObserver,
};
pub use scheduler::{PeriodicTask, Scheduler, Task, Worker};
pub use serialized::SerializedObserver;
pub use single::Single;
