// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Demand-driven backpressure channel for the rivulet reactive-streams core.
//!
//! A [`Flowable`] delivers values only against demand its subscriber
//! requested through the [`Subscription`] handle. Demand is a saturating
//! 64-bit counter (`u64::MAX` = unbounded); production beyond outstanding
//! demand is resolved by the [`OverflowPolicy`] chosen at creation. The
//! crate also carries the boundary adapters to the async ecosystem:
//! [`IntoStreamExt::into_stream`] and [`observable_from_stream`].

mod channel;

pub mod convert;
pub mod flowable;
pub mod policy;
pub mod stream;
pub mod subscriber;

pub use convert::ToFlowableExt;
pub use flowable::{FlowEmitter, Flowable, DEFAULT_CAPACITY};
pub use policy::OverflowPolicy;
pub use stream::{observable_from_stream, FlowStream, IntoStreamExt};
pub use subscriber::{FlowSubscriber, Subscription};
