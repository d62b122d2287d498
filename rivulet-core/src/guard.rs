// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Panic isolation for user-supplied callbacks.

use crate::error::{Result, RivuletError};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Run a user callback, converting a panic into
/// [`RivuletError::Callback`](crate::RivuletError::Callback).
///
/// Operators invoke every user lambda (map functions, predicates, zippers,
/// suppliers) through this guard so that a panicking callback surfaces as a
/// terminal `Errored` notification instead of unwinding through the operator
/// chain.
///
/// # Example
///
/// ```
/// use rivulet_core::guarded;
///
/// let ok = guarded("doc", || 2 + 2);
/// assert_eq!(ok.unwrap(), 4);
///
/// let err = guarded("doc", || panic!("boom"));
/// assert!(err.is_err());
/// ```
pub fn guarded<R>(context: &str, f: impl FnOnce() -> R) -> Result<R> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned());
        match message {
            Some(message) => RivuletError::callback(format!("{context}: {message}")),
            None => RivuletError::callback(context),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_return_value() {
        assert_eq!(guarded("test", || 41 + 1).unwrap(), 42);
    }

    #[test]
    fn captures_panic_message() {
        let error = guarded("map", || -> i32 { panic!("division by zero") }).unwrap_err();
        match error {
            RivuletError::Callback { context } => {
                assert!(context.contains("map"));
                assert!(context.contains("division by zero"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
