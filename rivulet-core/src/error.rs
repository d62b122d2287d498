// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for the rivulet reactive-streams core.
//!
//! Terminal `Errored` notifications fan out to every registered observer of a
//! hot source, so [`RivuletError`] is `Clone`; wrapped user errors are held
//! behind an `Arc` to keep cloning cheap.

use std::sync::Arc;
use std::time::Duration;

/// Root error type for all rivulet notifications and operations.
///
/// Errors travelling through a stream are terminal: once an observer receives
/// an `Errored` notification carrying one of these values, no further
/// notifications follow on that subscription.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RivuletError {
    /// A user-supplied callback (map function, predicate, zipper, …) panicked.
    ///
    /// The panic is caught at the operator boundary and re-routed as a
    /// terminal error instead of unwinding through the pipeline.
    #[error("user callback panicked in {context}")]
    Callback {
        /// Where the callback was invoked and, when available, the panic message
        context: String,
    },

    /// A demand-aware subscriber issued an invalid `request`.
    ///
    /// Demand requests must be strictly positive; `request(0)` violates the
    /// protocol and terminates the subscription.
    #[error("invalid demand request: {requested} (must be >= 1)")]
    InvalidRequest {
        /// The offending request amount
        requested: u64,
    },

    /// A timeout operator expired before the upstream produced activity.
    #[error("no upstream activity within {duration:?}")]
    Timeout {
        /// The configured timeout window
        duration: Duration,
    },

    /// A bounded backpressure queue overflowed under the `Error` policy.
    #[error("backpressure buffer overflowed (capacity: {capacity})")]
    MissingBackpressure {
        /// Capacity of the queue that overflowed
        capacity: usize,
    },

    /// A required element was absent.
    ///
    /// Raised when converting an empty stream to a single-value shape, or
    /// when a filter on a single-value shape rejects its only value and the
    /// caller demanded a value anyway.
    #[error("expected exactly one element but the source was empty")]
    NoSuchElement,

    /// A free-form error raised by library users through the `error(..)`
    /// creation factory or test code.
    #[error("{message}")]
    Custom {
        /// Human-readable error description
        message: String,
    },

    /// An arbitrary user error propagated through the stream.
    #[error("user error: {0}")]
    User(Arc<dyn std::error::Error + Send + Sync>),
}

impl RivuletError {
    /// Create a callback-panic error with the given context.
    pub fn callback(context: impl Into<String>) -> Self {
        Self::Callback {
            context: context.into(),
        }
    }

    /// Create an invalid-demand error for the given request amount.
    #[must_use]
    pub const fn invalid_request(requested: u64) -> Self {
        Self::InvalidRequest { requested }
    }

    /// Create a timeout error for the given window.
    #[must_use]
    pub const fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create a backpressure-overflow error for the given queue capacity.
    #[must_use]
    pub const fn missing_backpressure(capacity: usize) -> Self {
        Self::MissingBackpressure { capacity }
    }

    /// Create a free-form error with the given message.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }

    /// Wrap an arbitrary user error.
    pub fn user(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::User(Arc::new(error))
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a backpressure-overflow error.
    #[must_use]
    pub const fn is_missing_backpressure(&self) -> bool {
        matches!(self, Self::MissingBackpressure { .. })
    }

    /// Returns `true` if this error originated in a user callback.
    #[must_use]
    pub const fn is_callback(&self) -> bool {
        matches!(self, Self::Callback { .. })
    }
}

/// Specialized `Result` for rivulet operations.
pub type Result<T> = std::result::Result<T, RivuletError>;
