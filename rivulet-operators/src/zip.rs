// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Positional pairing of two sources.

use parking_lot::Mutex;
use rivulet_core::{
    guarded, Cancellable, CompositeCancellable, Observable, Observer, RivuletError,
    SerializedObserver,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Pair the n-th value of `left` with the n-th value of `right`.
///
/// Each side keeps a FIFO queue; whenever both heads are available they are
/// popped and combined. The zipped stream completes as soon as one side has
/// completed with an empty queue (no further pair can ever form); the other
/// side is cancelled at that point.
pub fn zip<A, B, R>(
    left: &Observable<A>,
    right: &Observable<B>,
    zipper: impl Fn(A, B) -> R + Send + Sync + 'static,
) -> Observable<R>
where
    A: Send + 'static,
    B: Send + 'static,
    R: Send + 'static,
{
    let left = left.clone();
    let right = right.clone();
    let zipper: Arc<dyn Fn(A, B) -> R + Send + Sync> = Arc::new(zipper);
    Observable::new(move |observer| {
        let state = Arc::new(ZipState {
            downstream: SerializedObserver::new(observer),
            zipper: Arc::clone(&zipper),
            sides: Mutex::new(Sides {
                left: VecDeque::new(),
                right: VecDeque::new(),
                left_done: false,
                right_done: false,
            }),
            terminated: AtomicBool::new(false),
            subscriptions: CompositeCancellable::new(),
        });
        state
            .downstream
            .on_subscribe(state.subscriptions.as_cancellable());

        left.subscribe(Arc::new(ZipLeftObserver {
            state: Arc::clone(&state),
        }));
        right.subscribe(Arc::new(ZipRightObserver {
            state: Arc::clone(&state),
        }));
    })
}

/// Extension trait providing method-style `zip_with`.
pub trait ZipExt<T: Send + 'static> {
    /// Zip this stream positionally with `other`.
    fn zip_with<B: Send + 'static, R: Send + 'static>(
        &self,
        other: &Observable<B>,
        zipper: impl Fn(T, B) -> R + Send + Sync + 'static,
    ) -> Observable<R>;
}

impl<T: Send + 'static> ZipExt<T> for Observable<T> {
    fn zip_with<B: Send + 'static, R: Send + 'static>(
        &self,
        other: &Observable<B>,
        zipper: impl Fn(T, B) -> R + Send + Sync + 'static,
    ) -> Observable<R> {
        zip(self, other, zipper)
    }
}

struct Sides<A, B> {
    left: VecDeque<A>,
    right: VecDeque<B>,
    left_done: bool,
    right_done: bool,
}

struct ZipState<A, B, R> {
    downstream: SerializedObserver<R>,
    zipper: Arc<dyn Fn(A, B) -> R + Send + Sync>,
    sides: Mutex<Sides<A, B>>,
    terminated: AtomicBool,
    subscriptions: CompositeCancellable,
}

impl<A: Send, B: Send, R: Send> ZipState<A, B, R> {
    /// Emit every ready pair, then settle completion if a drained side has
    /// finished.
    fn drain(&self) {
        loop {
            if self.terminated.load(Ordering::Acquire) {
                return;
            }
            let next = {
                let mut sides = self.sides.lock();
                if !sides.left.is_empty() && !sides.right.is_empty() {
                    let a = sides.left.pop_front().expect("non-empty left queue");
                    let b = sides.right.pop_front().expect("non-empty right queue");
                    Some((a, b))
                } else {
                    // no pair can ever form once a drained side completed
                    let exhausted = (sides.left.is_empty() && sides.left_done)
                        || (sides.right.is_empty() && sides.right_done);
                    if exhausted && !self.terminated.swap(true, Ordering::AcqRel) {
                        drop(sides);
                        self.subscriptions.cancel();
                        self.downstream.on_complete();
                    }
                    return;
                }
            };
            let (a, b) = next.expect("non-empty pair");
            match guarded("zip", || (self.zipper)(a, b)) {
                Ok(zipped) => self.downstream.on_next(zipped),
                Err(error) => {
                    self.fail(error);
                    return;
                }
            }
        }
    }

    fn fail(&self, error: RivuletError) {
        if !self.terminated.swap(true, Ordering::AcqRel) {
            self.subscriptions.cancel();
            self.downstream.on_error(error);
        }
    }
}

struct ZipLeftObserver<A, B, R> {
    state: Arc<ZipState<A, B, R>>,
}

impl<A: Send + 'static, B: Send + 'static, R: Send + 'static> Observer<A>
    for ZipLeftObserver<A, B, R>
{
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.subscriptions.add(cancellable);
    }

    fn on_next(&self, value: A) {
        if self.state.terminated.load(Ordering::Acquire) {
            return;
        }
        self.state.sides.lock().left.push_back(value);
        self.state.drain();
    }

    fn on_error(&self, error: RivuletError) {
        self.state.fail(error);
    }

    fn on_complete(&self) {
        self.state.sides.lock().left_done = true;
        self.state.drain();
    }
}

struct ZipRightObserver<A, B, R> {
    state: Arc<ZipState<A, B, R>>,
}

impl<A: Send + 'static, B: Send + 'static, R: Send + 'static> Observer<B>
    for ZipRightObserver<A, B, R>
{
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.state.subscriptions.add(cancellable);
    }

    fn on_next(&self, value: B) {
        if self.state.terminated.load(Ordering::Acquire) {
            return;
        }
        self.state.sides.lock().right.push_back(value);
        self.state.drain();
    }

    fn on_error(&self, error: RivuletError) {
        self.state.fail(error);
    }

    fn on_complete(&self) {
        self.state.sides.lock().right_done = true;
        self.state.drain();
    }
}
