// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Copy-on-write observer registry shared by every subject flavor.
//!
//! The registry holds an immutable snapshot of registered entries. Mutations
//! (add, remove, terminate) build a fresh snapshot and swap it in under a
//! short lock; emission clones the current snapshot and fans out without any
//! lock held. A snapshot is never mutated in place, so an emission that
//! started before a concurrent add/remove keeps delivering to exactly the
//! set that was live when it began. Terminating swaps the registry into a
//! terminal state that records the outcome for late subscribers and rejects
//! further registrations.

use parking_lot::Mutex;
use rivulet_core::RivuletError;
use std::sync::Arc;

/// Recorded outcome of a terminated subject.
#[derive(Debug, Clone)]
pub(crate) enum Terminal {
    Complete,
    Error(RivuletError),
}

enum RegistryState<E> {
    Active(Arc<Vec<Arc<E>>>),
    Terminated(Terminal),
}

pub(crate) struct Registry<E> {
    state: Mutex<RegistryState<E>>,
}

impl<E> Registry<E> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::Active(Arc::new(Vec::new()))),
        }
    }

    /// Register `entry`. Fails with the recorded terminal when the subject
    /// has already terminated.
    pub(crate) fn add(&self, entry: Arc<E>) -> Result<(), Terminal> {
        let mut state = self.state.lock();
        match &*state {
            RegistryState::Active(current) => {
                let mut next = Vec::with_capacity(current.len() + 1);
                next.extend(current.iter().cloned());
                next.push(entry);
                *state = RegistryState::Active(Arc::new(next));
                Ok(())
            }
            RegistryState::Terminated(terminal) => Err(terminal.clone()),
        }
    }

    /// Deregister `entry` by identity. Unknown entries are ignored.
    pub(crate) fn remove(&self, entry: &Arc<E>) {
        let mut state = self.state.lock();
        if let RegistryState::Active(current) = &*state {
            if let Some(index) = current.iter().position(|e| Arc::ptr_eq(e, entry)) {
                let mut next = Vec::with_capacity(current.len() - 1);
                next.extend(
                    current
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != index)
                        .map(|(_, e)| Arc::clone(e)),
                );
                *state = RegistryState::Active(Arc::new(next));
            }
        }
    }

    /// Current live snapshot, or `None` once terminated.
    pub(crate) fn snapshot(&self) -> Option<Arc<Vec<Arc<E>>>> {
        match &*self.state.lock() {
            RegistryState::Active(current) => Some(Arc::clone(current)),
            RegistryState::Terminated(_) => None,
        }
    }

    /// Swap into the terminal state, capturing the final snapshot.
    ///
    /// Returns `None` when a terminal was already recorded: exactly one
    /// caller wins and fans the terminal out.
    pub(crate) fn terminate(&self, terminal: Terminal) -> Option<Arc<Vec<Arc<E>>>> {
        let mut state = self.state.lock();
        match &*state {
            RegistryState::Active(current) => {
                let snapshot = Arc::clone(current);
                *state = RegistryState::Terminated(terminal);
                Some(snapshot)
            }
            RegistryState::Terminated(_) => None,
        }
    }

    /// The recorded terminal, if any.
    pub(crate) fn terminal(&self) -> Option<Terminal> {
        match &*self.state.lock() {
            RegistryState::Active(_) => None,
            RegistryState::Terminated(terminal) => Some(terminal.clone()),
        }
    }

    /// Number of currently registered entries (zero once terminated).
    pub(crate) fn len(&self) -> usize {
        match &*self.state.lock() {
            RegistryState::Active(current) => current.len(),
            RegistryState::Terminated(_) => 0,
        }
    }
}
