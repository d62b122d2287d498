// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Hot-cold conversion: connectable sources, reference counting, sharing.
//!
//! `publish`/`replay` park a cold source behind a subject. Subscribers
//! attach to the subject without starting the source; `connect()` subscribes
//! the subject upstream and starts the shared run. `ref_count()` automates
//! connect/disconnect around the first and last subscriber, handing out a
//! fresh subject after a full disconnect so the source can be re-run.

use parking_lot::Mutex;
use rivulet_core::{Cancellable, Observable, Observer, RivuletError, SwapCancellable};
use rivulet_subjects::{PublishSubject, ReplaySubject};
use std::sync::Arc;

trait Multicast<T>: Send + Sync {
    fn subscribe(&self, observer: Arc<dyn Observer<T>>);
    fn observer(&self) -> Arc<dyn Observer<T>>;
    fn is_terminated(&self) -> bool;
}

struct PublishMulticast<T>(PublishSubject<T>);

impl<T: Clone + Send + 'static> Multicast<T> for PublishMulticast<T> {
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) {
        self.0.subscribe(observer);
    }

    fn observer(&self) -> Arc<dyn Observer<T>> {
        Arc::new(self.0.clone())
    }

    fn is_terminated(&self) -> bool {
        self.0.is_terminated()
    }
}

struct ReplayMulticast<T>(ReplaySubject<T>);

impl<T: Clone + Send + 'static> Multicast<T> for ReplayMulticast<T> {
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) {
        self.0.subscribe(observer);
    }

    fn observer(&self) -> Arc<dyn Observer<T>> {
        Arc::new(self.0.clone())
    }

    fn is_terminated(&self) -> bool {
        self.0.is_terminated()
    }
}

struct ConnectableState<T> {
    subject: Arc<dyn Multicast<T>>,
    connection: Option<Cancellable>,
}

/// A source whose emissions begin only when [`connect`] is invoked.
///
/// Subscribers register against the backing subject at any time; the
/// upstream runs once per connection and fans out to all of them.
///
/// [`connect`]: ConnectableObservable::connect
pub struct ConnectableObservable<T> {
    source: Observable<T>,
    factory: Arc<dyn Fn() -> Arc<dyn Multicast<T>> + Send + Sync>,
    state: Arc<Mutex<ConnectableState<T>>>,
}

impl<T> Clone for ConnectableObservable<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            factory: Arc::clone(&self.factory),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone + Send + 'static> ConnectableObservable<T> {
    fn new(
        source: Observable<T>,
        factory: impl Fn() -> Arc<dyn Multicast<T>> + Send + Sync + 'static,
    ) -> Self {
        let subject = factory();
        Self {
            source,
            factory: Arc::new(factory),
            state: Arc::new(Mutex::new(ConnectableState {
                subject,
                connection: None,
            })),
        }
    }

    /// Register `observer` with the backing subject without starting the
    /// upstream.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) {
        let subject = Arc::clone(&self.state.lock().subject);
        subject.subscribe(observer);
    }

    /// Start the shared upstream run (idempotent while connected).
    ///
    /// Returns the connection handle; cancelling it tears the upstream down
    /// and installs a fresh subject so a later `connect` re-runs the source.
    pub fn connect(&self) -> Cancellable {
        let (connection_observer, connection) = {
            let mut state = self.state.lock();
            if let Some(connection) = &state.connection {
                return connection.clone();
            }
            if state.subject.is_terminated() {
                state.subject = (self.factory)();
            }
            let upstream = SwapCancellable::new();
            let reset_state = Arc::clone(&self.state);
            let reset_factory = Arc::clone(&self.factory);
            let reset_upstream = upstream.clone();
            let connection = Cancellable::from_action(move || {
                reset_upstream.cancel();
                let mut state = reset_state.lock();
                state.connection = None;
                state.subject = (reset_factory)();
            });
            state.connection = Some(connection.clone());
            (
                ConnectionObserver {
                    target: state.subject.observer(),
                    handle: upstream,
                },
                connection,
            )
        };
        self.source.subscribe(Arc::new(connection_observer));
        connection
    }

    /// View as a plain [`Observable`] whose subscriptions do not connect.
    #[must_use]
    pub fn as_observable(&self) -> Observable<T> {
        let connectable = self.clone();
        Observable::new(move |observer| connectable.subscribe(observer))
    }

    /// Automatic connection management: the first subscriber connects, the
    /// last cancellation disconnects, and a later subscriber reconnects a
    /// fresh run.
    #[must_use]
    pub fn ref_count(&self) -> Observable<T> {
        let connectable = self.clone();
        let refs: Arc<Mutex<RefCount>> = Arc::new(Mutex::new(RefCount {
            subscribers: 0,
            connection: None,
        }));
        Observable::new(move |observer| {
            let first = {
                let mut refs = refs.lock();
                refs.subscribers += 1;
                refs.subscribers == 1
            };

            connectable.subscribe(Arc::new(RefCountObserver {
                downstream: observer,
                refs: Arc::clone(&refs),
            }));

            if first {
                let connection = connectable.connect();
                let mut refs = refs.lock();
                // the connection may have terminated (and every subscriber
                // cancelled) synchronously; only keep a live handle
                if refs.subscribers > 0 {
                    refs.connection = Some(connection);
                }
            }
        })
    }
}

struct ConnectionObserver<T> {
    target: Arc<dyn Observer<T>>,
    handle: SwapCancellable,
}

impl<T: Send> Observer<T> for ConnectionObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.handle.replace(cancellable);
        self.target.on_subscribe(self.handle.as_cancellable());
    }

    fn on_next(&self, value: T) {
        self.target.on_next(value);
    }

    fn on_error(&self, error: RivuletError) {
        self.target.on_error(error);
    }

    fn on_complete(&self) {
        self.target.on_complete();
    }
}

struct RefCount {
    subscribers: usize,
    connection: Option<Cancellable>,
}

struct RefCountObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    refs: Arc<Mutex<RefCount>>,
}

impl<T: Send> Observer<T> for RefCountObserver<T> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        let refs = Arc::clone(&self.refs);
        self.downstream
            .on_subscribe(Cancellable::from_action(move || {
                cancellable.cancel();
                let connection = {
                    let mut refs = refs.lock();
                    refs.subscribers = refs.subscribers.saturating_sub(1);
                    if refs.subscribers == 0 {
                        refs.connection.take()
                    } else {
                        None
                    }
                };
                if let Some(connection) = connection {
                    connection.cancel();
                }
            }));
    }

    fn on_next(&self, value: T) {
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: RivuletError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}

/// Extension trait providing hot-cold conversion.
pub trait ConnectExt<T: Clone + Send + 'static> {
    /// Park this source behind a publish subject.
    fn publish(&self) -> ConnectableObservable<T>;

    /// Park this source behind an unbounded replay subject.
    fn replay(&self) -> ConnectableObservable<T>;

    /// Park this source behind a replay subject keeping the last `capacity`
    /// values.
    fn replay_with_capacity(&self, capacity: usize) -> ConnectableObservable<T>;

    /// `publish().ref_count()`: shared execution with automatic
    /// connect/disconnect.
    fn share(&self) -> Observable<T>;
}

impl<T: Clone + Send + 'static> ConnectExt<T> for Observable<T> {
    fn publish(&self) -> ConnectableObservable<T> {
        ConnectableObservable::new(self.clone(), || {
            Arc::new(PublishMulticast(PublishSubject::new()))
        })
    }

    fn replay(&self) -> ConnectableObservable<T> {
        ConnectableObservable::new(self.clone(), || {
            Arc::new(ReplayMulticast(ReplaySubject::new()))
        })
    }

    fn replay_with_capacity(&self, capacity: usize) -> ConnectableObservable<T> {
        ConnectableObservable::new(self.clone(), move || {
            Arc::new(ReplayMulticast(ReplaySubject::with_capacity(capacity)))
        })
    }

    fn share(&self) -> Observable<T> {
        self.publish().ref_count()
    }
}
