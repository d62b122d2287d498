// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Observer contracts for the four reactive shapes.
//!
//! Observers are shared across threads as `Arc<dyn …>` and therefore take
//! `&self`; implementations use interior mutability. Every source delivers
//! `on_subscribe` exactly once, strictly before any other notification, and
//! at most one terminal (`on_error`, `on_complete` or `on_success` depending
//! on the shape) per subscription.

use crate::cancellable::Cancellable;
use crate::error::RivuletError;

/// Observer of an [`Observable`](crate::Observable): zero or more values
/// followed by exactly one terminal.
pub trait Observer<T>: Send + Sync {
    /// Called exactly once before any other notification with the handle that
    /// cancels this subscription.
    fn on_subscribe(&self, cancellable: Cancellable);

    /// Called for each emitted value, in emission order, serialized per
    /// subscription.
    fn on_next(&self, value: T);

    /// Terminal: the source failed. No further notifications follow.
    fn on_error(&self, error: RivuletError);

    /// Terminal: the source completed normally. No further notifications
    /// follow.
    fn on_complete(&self);
}

/// Observer of a [`Single`](crate::Single): exactly one value or one error.
pub trait SingleObserver<T>: Send + Sync {
    /// Called exactly once before the terminal with the subscription handle.
    fn on_subscribe(&self, cancellable: Cancellable);

    /// Terminal: the single value.
    fn on_success(&self, value: T);

    /// Terminal: the source failed.
    fn on_error(&self, error: RivuletError);
}

/// Observer of a [`Maybe`](crate::Maybe): one value, empty completion, or an
/// error.
pub trait MaybeObserver<T>: Send + Sync {
    /// Called exactly once before the terminal with the subscription handle.
    fn on_subscribe(&self, cancellable: Cancellable);

    /// Terminal: the value, when the source produced one.
    fn on_success(&self, value: T);

    /// Terminal: the source completed without producing a value.
    fn on_complete(&self);

    /// Terminal: the source failed.
    fn on_error(&self, error: RivuletError);
}

/// Observer of a [`Completable`](crate::Completable): completion or error,
/// no value.
pub trait CompletableObserver: Send + Sync {
    /// Called exactly once before the terminal with the subscription handle.
    fn on_subscribe(&self, cancellable: Cancellable);

    /// Terminal: the source completed.
    fn on_complete(&self);

    /// Terminal: the source failed.
    fn on_error(&self, error: RivuletError);
}

/// A single event travelling through a stream subscription.
///
/// Operators that re-schedule or queue deliveries (`delay`, `observe_on`,
/// serialization wrappers) carry events in this form.
#[derive(Debug, Clone)]
pub enum Notification<T> {
    /// A value emission.
    Next(T),
    /// Terminal failure.
    Error(RivuletError),
    /// Terminal completion.
    Complete,
}

impl<T> Notification<T> {
    /// Returns `true` for `Error` and `Complete`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Next(_))
    }

    /// Deliver this notification to `observer`.
    pub fn dispatch(self, observer: &dyn Observer<T>) {
        match self {
            Notification::Next(value) => observer.on_next(value),
            Notification::Error(error) => observer.on_error(error),
            Notification::Complete => observer.on_complete(),
        }
    }
}
