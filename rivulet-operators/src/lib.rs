// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Operator algebra for the rivulet reactive-streams core.
//!
//! One module per operator, each exposing an extension trait over
//! [`Observable`](rivulet_core::Observable) (or free functions for the
//! multi-source combinators and timed sources). Import the [`prelude`] to
//! bring every operator into scope:
//!
//! ```
//! use rivulet_core::Observable;
//! use rivulet_operators::prelude::*;
//!
//! let doubled_evens = Observable::range(1, 5)
//!     .filter(|n| n % 2 == 0)
//!     .map(|n| n * 10);
//! let collected = doubled_evens.to_list().blocking_get().unwrap();
//! assert_eq!(collected, vec![20, 40]);
//! ```

pub mod blocking;
pub mod buffer;
pub mod collect;
pub mod combine_latest;
pub mod concat;
pub mod concat_map;
pub mod connectable;
pub mod debounce;
pub mod delay;
pub mod distinct;
pub mod elements;
pub mod filter;
pub mod flat_map;
pub mod interval;
pub mod map;
pub mod merge;
pub mod observe_on;
pub mod on_error;
pub mod reduce;
pub mod retry;
pub mod scan;
pub mod skip;
pub mod start_with;
pub mod subscribe_on;
pub mod switch_map;
pub mod take;
pub mod tap;
pub mod throttle;
pub mod timeout;
pub mod window;
pub mod with_latest_from;
pub mod zip;

pub use blocking::{BlockingExt, BlockingIter};
pub use buffer::BufferExt;
pub use collect::CollectExt;
pub use combine_latest::{combine_latest, CombineLatestExt};
pub use concat::ConcatExt;
pub use concat_map::ConcatMapExt;
pub use connectable::{ConnectExt, ConnectableObservable};
pub use debounce::DebounceExt;
pub use delay::DelayExt;
pub use distinct::DistinctExt;
pub use elements::{ElementsExt, SequenceEqualExt};
pub use filter::FilterExt;
pub use flat_map::FlatMapExt;
pub use interval::{interval, interval_on, timer, timer_on};
pub use map::MapExt;
pub use merge::{merge, MergeExt};
pub use observe_on::ObserveOnExt;
pub use on_error::OnErrorExt;
pub use reduce::ReduceExt;
pub use retry::RetryExt;
pub use scan::ScanExt;
pub use skip::SkipExt;
pub use start_with::StartWithExt;
pub use subscribe_on::SubscribeOnExt;
pub use switch_map::SwitchMapExt;
pub use take::TakeExt;
pub use tap::TapExt;
pub use throttle::ThrottleExt;
pub use timeout::TimeoutExt;
pub use window::WindowExt;
pub use with_latest_from::WithLatestFromExt;
pub use zip::{zip, ZipExt};

/// One-stop import for every operator extension trait.
pub mod prelude {
    pub use crate::blocking::BlockingExt;
    pub use crate::buffer::BufferExt;
    pub use crate::collect::CollectExt;
    pub use crate::combine_latest::{combine_latest, CombineLatestExt};
    pub use crate::concat::ConcatExt;
    pub use crate::concat_map::ConcatMapExt;
    pub use crate::connectable::ConnectExt;
    pub use crate::debounce::DebounceExt;
    pub use crate::delay::DelayExt;
    pub use crate::distinct::DistinctExt;
    pub use crate::elements::{ElementsExt, SequenceEqualExt};
    pub use crate::filter::FilterExt;
    pub use crate::flat_map::FlatMapExt;
    pub use crate::interval::{interval, interval_on, timer, timer_on};
    pub use crate::map::MapExt;
    pub use crate::merge::{merge, MergeExt};
    pub use crate::observe_on::ObserveOnExt;
    pub use crate::on_error::OnErrorExt;
    pub use crate::reduce::ReduceExt;
    pub use crate::retry::RetryExt;
    pub use crate::scan::ScanExt;
    pub use crate::skip::SkipExt;
    pub use crate::start_with::StartWithExt;
    pub use crate::subscribe_on::SubscribeOnExt;
    pub use crate::switch_map::SwitchMapExt;
    pub use crate::take::TakeExt;
    pub use crate::tap::TapExt;
    pub use crate::throttle::ThrottleExt;
    pub use crate::timeout::TimeoutExt;
    pub use crate::window::WindowExt;
    pub use crate::with_latest_from::WithLatestFromExt;
    pub use crate::zip::{zip, ZipExt};
}
