// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Overflow policies for demand-aware sources.

/// What happens when a producer emits while downstream demand is zero.
///
/// Chosen at source creation; the bounded policies share one capacity,
/// configured alongside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Queue without bound; every value is eventually delivered provided
    /// demand eventually arrives.
    Buffer,
    /// No queue beyond outstanding demand: undeliverable values are
    /// discarded.
    Drop,
    /// Bounded queue; when full, the arriving value is discarded.
    DropLatest,
    /// Bounded queue; when full, the oldest queued value is evicted to make
    /// room for the arriving one.
    DropOldest,
    /// Bounded queue; when full, the subscription terminates with
    /// [`RivuletError::MissingBackpressure`](rivulet_core::RivuletError::MissingBackpressure).
    Error,
}
