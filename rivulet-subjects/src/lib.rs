// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Hot multicast subjects for the rivulet reactive-streams core.
//!
//! A subject is an [`Observer`](rivulet_core::Observer) *and* a source: push
//! notifications in, and they fan out to every registered observer according
//! to the subject's policy:
//!
//! - [`PublishSubject`]: future emissions only
//! - [`BehaviorSubject`]: latest value replayed, then live
//! - [`ReplaySubject`]: buffered history replayed (unbounded or last-N)
//! - [`AsyncSubject`]: final value only, delivered at completion
//!
//! All four share the copy-on-write observer registry: emission fans out to
//! an immutable snapshot, subscribe/unsubscribe swap in fresh snapshots, and
//! the first terminal freezes the subject for good.

mod async_subject;
mod behavior;
mod publish;
mod registry;
mod replay;

pub use async_subject::AsyncSubject;
pub use behavior::BehaviorSubject;
pub use publish::PublishSubject;
pub use replay::ReplaySubject;
