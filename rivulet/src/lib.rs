// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Rivulet: push-based reactive streams for Rust.
//!
//! This facade re-exports the whole workspace: the four reactive shapes and
//! their protocol ([`rivulet_core`]), hot multicast subjects
//! ([`rivulet_subjects`]), the operator algebra ([`rivulet_operators`]),
//! scheduler implementations with a virtual-time test clock
//! ([`rivulet_schedulers`]) and the demand-driven backpressure channel
//! ([`rivulet_flow`]).
//!
//! # Example
//!
//! ```
//! use rivulet_rx::prelude::*;
//!
//! let evens_times_ten = Observable::range(1, 5)
//!     .filter(|n| n % 2 == 0)
//!     .map(|n| n * 10)
//!     .to_list()
//!     .blocking_get()
//!     .unwrap();
//! assert_eq!(evens_times_ten, vec![20, 40]);
//! ```

pub use rivulet_core as core;
pub use rivulet_flow as flow;
pub use rivulet_operators as operators;
pub use rivulet_schedulers as schedulers;
pub use rivulet_subjects as subjects;

pub use rivulet_core::{
    Cancellable, Completable, CompletableObserver, CompositeCancellable, Emitter, Maybe,
    MaybeObserver, Notification, Observable, Observer, PeriodicTask, Result, RivuletError,
    Scheduler, SerializedObserver, Single, SingleObserver, SwapCancellable, Task, Worker,
};
pub use rivulet_flow::{
    observable_from_stream, FlowEmitter, FlowStream, FlowSubscriber, Flowable, IntoStreamExt,
    OverflowPolicy, Subscription, ToFlowableExt,
};
pub use rivulet_operators::ConnectableObservable;
pub use rivulet_schedulers::{
    ComputationScheduler, EventLoopScheduler, Executor, ExecutorScheduler, IoScheduler,
    NewThreadScheduler, TestScheduler, TrampolineScheduler,
};
pub use rivulet_subjects::{AsyncSubject, BehaviorSubject, PublishSubject, ReplaySubject};

/// Everything needed to build pipelines: shapes, subjects, schedulers, every
/// operator extension trait, and the backpressure types.
pub mod prelude {
    pub use rivulet_core::{
        Cancellable, Completable, Maybe, Observable, Observer, Result, RivuletError, Scheduler,
        Single,
    };
    pub use rivulet_flow::{
        observable_from_stream, FlowSubscriber, Flowable, IntoStreamExt, OverflowPolicy,
        Subscription, ToFlowableExt,
    };
    pub use rivulet_operators::prelude::*;
    pub use rivulet_schedulers::{
        ComputationScheduler, IoScheduler, NewThreadScheduler, TestScheduler, TrampolineScheduler,
    };
    pub use rivulet_subjects::{AsyncSubject, BehaviorSubject, PublishSubject, ReplaySubject};
}
