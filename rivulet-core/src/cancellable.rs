// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Scoped cancellation handles.
//!
//! Every subscription hands its observer a [`Cancellable`] before any other
//! notification. Cancelling is idempotent, safe from any thread, and
//! propagates through composed handles so that cancelling an operator chain
//! releases every upstream resource.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

trait CancelState: Send + Sync {
    fn cancel(&self);
    fn is_cancelled(&self) -> bool;
}

/// A cheap, clonable cancellation handle.
///
/// Clones share the same underlying state: cancelling any clone cancels them
/// all. Handle identity (used by composite removal) follows the shared state,
/// not the clone.
#[derive(Clone)]
pub struct Cancellable {
    state: Arc<dyn CancelState>,
}

struct Flag {
    cancelled: AtomicBool,
}

impl CancelState for Flag {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

struct Action {
    cancelled: AtomicBool,
    action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl CancelState for Action {
    fn cancel(&self) {
        // swap guarantees the action runs at most once even under a cancel race
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            if let Some(action) = self.action.lock().take() {
                action();
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Cancellable {
    /// Create a plain flag handle with no associated release action.
    #[must_use]
    pub fn flag() -> Self {
        Self {
            state: Arc::new(Flag {
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// An already-cancelled no-op handle.
    ///
    /// Useful for sources that terminate synchronously before the observer
    /// has any chance to cancel.
    #[must_use]
    pub fn empty() -> Self {
        let state = Flag {
            cancelled: AtomicBool::new(true),
        };
        Self {
            state: Arc::new(state),
        }
    }

    /// Create a handle that runs `action` exactly once on first cancel.
    pub fn from_action(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            state: Arc::new(Action {
                cancelled: AtomicBool::new(false),
                action: Mutex::new(Some(Box::new(action))),
            }),
        }
    }

    /// Cancel the subscription this handle guards.
    ///
    /// Idempotent: second and later calls are no-ops.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Returns `true` if `self` and `other` share the same underlying state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl std::fmt::Debug for Cancellable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cancellable")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

struct CompositeState {
    // None once cancelled; later additions are cancelled on arrival
    children: Mutex<Option<Vec<Cancellable>>>,
}

impl CancelState for CompositeState {
    fn cancel(&self) {
        let children = self.children.lock().take();
        if let Some(children) = children {
            for child in children {
                child.cancel();
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.children.lock().is_none()
    }
}

/// A cancellation handle owning a set of child handles.
///
/// Cancelling the composite cancels every child; handles added after
/// cancellation are cancelled on arrival, preserving idempotence.
#[derive(Clone)]
pub struct CompositeCancellable {
    state: Arc<CompositeState>,
}

impl CompositeCancellable {
    /// Create an empty, active composite.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(CompositeState {
                children: Mutex::new(Some(Vec::new())),
            }),
        }
    }

    /// Add a child handle.
    ///
    /// Returns `false` (after cancelling `child`) if the composite was
    /// already cancelled.
    pub fn add(&self, child: Cancellable) -> bool {
        {
            let mut guard = self.state.children.lock();
            if let Some(children) = guard.as_mut() {
                children.push(child);
                return true;
            }
        }
        child.cancel();
        false
    }

    /// Remove a child by handle identity without cancelling it.
    pub fn remove(&self, child: &Cancellable) {
        let mut guard = self.state.children.lock();
        if let Some(children) = guard.as_mut() {
            if let Some(index) = children.iter().position(|c| c.ptr_eq(child)) {
                children.swap_remove(index);
            }
        }
    }

    /// Cancel the composite and every child it holds.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Returns `true` once the composite has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Number of currently held children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.children.lock().as_ref().map_or(0, Vec::len)
    }

    /// Returns `true` if the composite holds no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View this composite as a plain [`Cancellable`].
    #[must_use]
    pub fn as_cancellable(&self) -> Cancellable {
        Cancellable {
            state: Arc::clone(&self.state) as Arc<dyn CancelState>,
        }
    }
}

impl Default for CompositeCancellable {
    fn default() -> Self {
        Self::new()
    }
}

enum Slot {
    Active(Option<Cancellable>),
    Cancelled,
}

struct SwapState {
    slot: Mutex<Slot>,
}

impl CancelState for SwapState {
    fn cancel(&self) {
        let previous = {
            let mut guard = self.slot.lock();
            match std::mem::replace(&mut *guard, Slot::Cancelled) {
                Slot::Active(current) => current,
                Slot::Cancelled => None,
            }
        };
        if let Some(current) = previous {
            current.cancel();
        }
    }

    fn is_cancelled(&self) -> bool {
        matches!(&*self.slot.lock(), Slot::Cancelled)
    }
}

/// A single replaceable cancellation slot.
///
/// Operators that resubscribe upstream (switch, retry, debounce, timeout)
/// keep the live upstream handle here; replacing the slot cancels the evicted
/// handle, and a cancelled slot cancels every handle that arrives later.
#[derive(Clone)]
pub struct SwapCancellable {
    state: Arc<SwapState>,
}

impl SwapCancellable {
    /// Create an empty, active slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(SwapState {
                slot: Mutex::new(Slot::Active(None)),
            }),
        }
    }

    /// Install `handle`, cancelling whichever handle previously occupied the
    /// slot. If the slot itself was cancelled, `handle` is cancelled instead.
    pub fn replace(&self, handle: Cancellable) {
        let evicted = {
            let mut guard = self.state.slot.lock();
            match &mut *guard {
                Slot::Active(current) => current.replace(handle),
                Slot::Cancelled => Some(handle),
            }
        };
        if let Some(evicted) = evicted {
            evicted.cancel();
        }
    }

    /// Cancel the slot and its current occupant.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Returns `true` once the slot has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// View this slot as a plain [`Cancellable`].
    #[must_use]
    pub fn as_cancellable(&self) -> Cancellable {
        Cancellable {
            state: Arc::clone(&self.state) as Arc<dyn CancelState>,
        }
    }
}

impl Default for SwapCancellable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cancel_is_idempotent() {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        let handle = Cancellable::from_action(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        handle.cancel();
        handle.cancel();

        assert!(handle.is_cancelled());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_is_born_cancelled() {
        assert!(Cancellable::empty().is_cancelled());
    }

    #[test]
    fn composite_cancels_children_and_late_additions() {
        let composite = CompositeCancellable::new();
        let first = Cancellable::flag();
        composite.add(first.clone());

        composite.cancel();
        assert!(first.is_cancelled());

        let late = Cancellable::flag();
        assert!(!composite.add(late.clone()));
        assert!(late.is_cancelled());
    }

    #[test]
    fn composite_remove_does_not_cancel() {
        let composite = CompositeCancellable::new();
        let child = Cancellable::flag();
        composite.add(child.clone());
        composite.remove(&child);

        composite.cancel();
        assert!(!child.is_cancelled());
    }

    #[test]
    fn swap_cancels_evicted_handle() {
        let slot = SwapCancellable::new();
        let first = Cancellable::flag();
        let second = Cancellable::flag();

        slot.replace(first.clone());
        slot.replace(second.clone());

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        slot.cancel();
        assert!(second.is_cancelled());

        let third = Cancellable::flag();
        slot.replace(third.clone());
        assert!(third.is_cancelled());
    }
}
