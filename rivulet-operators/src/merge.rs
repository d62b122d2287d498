// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Interleaving combination of several sources.

use rivulet_core::{
    Cancellable, CompositeCancellable, Observable, Observer, RivuletError, SerializedObserver,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Merge the emissions of every source into one stream.
///
/// All sources are subscribed immediately; values interleave in arrival
/// order. The merged stream completes when every source completed, and the
/// first error cancels the remaining sources.
pub fn merge<T: Send + 'static>(sources: Vec<Observable<T>>) -> Observable<T> {
    Observable::new(move |observer| {
        let state = Arc::new(MergeState {
            downstream: SerializedObserver::new(observer),
            remaining: AtomicUsize::new(sources.len()),
            errored: AtomicBool::new(false),
            subscriptions: CompositeCancellable::new(),
        });
        state
            .downstream
            .on_subscribe(state.subscriptions.as_cancellable());

        if sources.is_empty() {
            state.downstream.on_complete();
            return;
        }
        for source in &sources {
            source.subscribe(Arc::new(MergeObserver {
                state: Arc::clone(&state),
            }));
        }
    })
}

/// Extension trait providing pairwise `merge_with`.
pub trait MergeExt<T: Send + 'static> {
    /// Merge this stream with `other`.
    fn merge_with(&self, other: &Observable<T>) -> Observable<T>;
}

impl<T: Send + 'static> MergeExt<T> for Observable<T> {
    fn merge_with(&self, other: &Observable<T>) -> Observable<T> {
        merge(vec![self.clone(), other.clone()])
    }
}

struct MergeState<T> {
    downstream: SerializedObserver<T>,
    remaining: AtomicUsize,
    errored: AtomicBool,
    subscriptions: CompositeCancellable,
}

struct MergeObserver<T> {
    state: Arc<MergeState<T>>,
}

impl<T: Send + 'static> Observer<T> for MergeObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.subscriptions.add(cancellable);
    }

    fn on_next(&self, value: T) {
        if !self.state.errored.load(Ordering::Acquire) {
            self.state.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.state.errored.swap(true, Ordering::AcqRel) {
            self.state.subscriptions.cancel();
            self.state.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if self.state.remaining.fetch_sub(1, Ordering::AcqRel) == 1
            && !self.state.errored.load(Ordering::Acquire)
        {
            self.state.downstream.on_complete();
        }
    }
}
