// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Terminal collectors: gather the whole stream into one container.

use parking_lot::Mutex;
use rivulet_core::{
    guarded, Cancellable, Observable, Observer, RivuletError, Single, SingleObserver,
    SwapCancellable,
};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the collector operators.
pub trait CollectExt<T: Send + 'static> {
    /// Gather every value into a `Vec`, delivered on completion.
    fn to_list(&self) -> Single<Vec<T>>;

    /// Gather every value into a `HashSet`, delivered on completion.
    fn to_set(&self) -> Single<HashSet<T>>
    where
        T: Eq + Hash;

    /// Gather values into a map keyed by `key_fn`; later keys overwrite
    /// earlier ones.
    fn to_map<K: Eq + Hash + Send + 'static>(
        &self,
        key_fn: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Single<HashMap<K, T>>;

    /// Gather values into a map with derived keys and values.
    fn to_map_with<K: Eq + Hash + Send + 'static, V: Send + 'static>(
        &self,
        key_fn: impl Fn(&T) -> K + Send + Sync + 'static,
        value_fn: impl Fn(&T) -> V + Send + Sync + 'static,
    ) -> Single<HashMap<K, V>>;

    /// Fold values into a container produced by `supplier`, mutated in place
    /// by `accumulator`, delivered on completion.
    fn collect<C: Send + 'static>(
        &self,
        supplier: impl Fn() -> C + Send + Sync + 'static,
        accumulator: impl Fn(&mut C, T) + Send + Sync + 'static,
    ) -> Single<C>;
}

impl<T: Send + 'static> CollectExt<T> for Observable<T> {
    fn to_list(&self) -> Single<Vec<T>> {
        self.collect(Vec::new, |list, value| list.push(value))
    }

    fn to_set(&self) -> Single<HashSet<T>>
    where
        T: Eq + Hash,
    {
        self.collect(HashSet::new, |set, value| {
            set.insert(value);
        })
    }

    fn to_map<K: Eq + Hash + Send + 'static>(
        &self,
        key_fn: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Single<HashMap<K, T>> {
        self.collect(HashMap::new, move |map, value| {
            map.insert(key_fn(&value), value);
        })
    }

    fn to_map_with<K: Eq + Hash + Send + 'static, V: Send + 'static>(
        &self,
        key_fn: impl Fn(&T) -> K + Send + Sync + 'static,
        value_fn: impl Fn(&T) -> V + Send + Sync + 'static,
    ) -> Single<HashMap<K, V>> {
        self.collect(HashMap::new, move |map, value| {
            map.insert(key_fn(&value), value_fn(&value));
        })
    }

    fn collect<C: Send + 'static>(
        &self,
        supplier: impl Fn() -> C + Send + Sync + 'static,
        accumulator: impl Fn(&mut C, T) + Send + Sync + 'static,
    ) -> Single<C> {
        let source = self.clone();
        let supplier: Arc<dyn Fn() -> C + Send + Sync> = Arc::new(supplier);
        let accumulator: Arc<dyn Fn(&mut C, T) + Send + Sync> = Arc::new(accumulator);
        Single::new(move |observer| {
            let container = match guarded("collect supplier", || (supplier)()) {
                Ok(container) => container,
                Err(error) => {
                    observer.on_subscribe(Cancellable::empty());
                    observer.on_error(error);
                    return;
                }
            };
            source.subscribe(Arc::new(CollectObserver {
                downstream: observer,
                accumulator: Arc::clone(&accumulator),
                container: Mutex::new(Some(container)),
                upstream: SwapCancellable::new(),
                done: AtomicBool::new(false),
            }));
        })
    }
}

struct CollectObserver<T, C> {
    downstream: Arc<dyn SingleObserver<C>>,
    accumulator: Arc<dyn Fn(&mut C, T) + Send + Sync>,
    container: Mutex<Option<C>>,
    upstream: SwapCancellable,
    done: AtomicBool,
}

impl<T: Send, C: Send> Observer<T> for CollectObserver<T, C> {
    fn on_subscribe(&self, cancellable: Cancellable) {
        self.upstream.replace(cancellable);
        self.downstream.on_subscribe(self.upstream.as_cancellable());
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        let outcome = {
            let mut container = self.container.lock();
            match container.as_mut() {
                Some(container) => {
                    guarded("collect accumulator", || (self.accumulator)(container, value))
                }
                None => Ok(()),
            }
        };
        if let Err(error) = outcome {
            if !self.done.swap(true, Ordering::AcqRel) {
                self.upstream.cancel();
                self.downstream.on_error(error);
            }
        }
    }

    fn on_error(&self, error: RivuletError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            if let Some(container) = self.container.lock().take() {
                self.downstream.on_success(container);
            }
        }
    }
}
