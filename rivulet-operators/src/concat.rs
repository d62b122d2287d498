// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Sequential concatenation of two sources.

use crate::start_with::StartWithExt;
use rivulet_core::Observable;

/// Extension trait providing `concat_with`.
pub trait ConcatExt<T: Send + 'static> {
    /// Emit all of `self`, then (after its completion) all of `other`.
    fn concat_with(&self, other: &Observable<T>) -> Observable<T>;
}

impl<T: Send + 'static> ConcatExt<T> for Observable<T> {
    fn concat_with(&self, other: &Observable<T>) -> Observable<T> {
        other.start_with_observable(self)
    }
}
