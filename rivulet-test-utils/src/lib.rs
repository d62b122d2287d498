// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities for rivulet pipelines: recording observers with blocking
//! await helpers, so asynchronous pipelines can be asserted without sleeps.

mod test_observer;
mod test_subscriber;

pub use test_observer::TestObserver;
pub use test_subscriber::TestSubscriber;
