// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Process-wide monotonic clock shared by every real scheduler.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Monotonic offset since the first clock access in this process.
///
/// All real schedulers report `now()` on this shared timeline so deadlines
/// computed against one scheduler are meaningful to another.
pub fn now() -> Duration {
    ANCHOR.get_or_init(Instant::now).elapsed()
}
