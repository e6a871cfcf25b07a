// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scoped exclusive access to the façade's mirrored state.
//!
//! [`ScopeLock`] is a reentrant-aware lock that remembers which thread holds
//! it. Every façade call takes it for the duration of the call; `begin`/`end`
//! take it across several calls. While one thread holds a scope, its own
//! calls pass straight through and every other thread blocks until the scope
//! is released.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tracing::warn;

#[derive(Debug, Default)]
struct Gate {
    holder: Option<ThreadId>,
    depth: usize,
}

/// Reentrant lock guarding `T`, with an explicit holder for multi-call scopes.
#[derive(Debug, Default)]
pub struct ScopeLock<T> {
    gate: Mutex<Gate>,
    released: Condvar,
    data: Mutex<T>,
}

impl<T> ScopeLock<T> {
    pub fn new(data: T) -> Self {
        Self {
            gate: Mutex::new(Gate::default()),
            released: Condvar::new(),
            data: Mutex::new(data),
        }
    }

    /// Locks for one call. Passes through when the current thread already
    /// holds a scope; blocks while another thread does.
    pub fn lock(&self) -> ScopedAccess<'_, T> {
        self.enter();
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        ScopedAccess {
            data,
            _ticket: Ticket { lock: self },
        }
    }

    /// Starts a scope held by the current thread until the matching [`end`].
    ///
    /// [`end`]: ScopeLock::end
    pub fn begin(&self) {
        self.enter();
    }

    /// Ends one level of the current thread's scope.
    ///
    /// Returns `false`, leaving the lock untouched, when the current thread
    /// does not hold it.
    pub fn end(&self) -> bool {
        let me = thread::current().id();
        let held = self.gate().holder == Some(me);
        if !held {
            warn!(thread = ?me, "end() called by a thread that holds no scope");
            return false;
        }
        self.leave();
        true
    }

    /// Returns `true` if the current thread holds the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.gate().holder == Some(thread::current().id())
    }

    /// Returns `true` if any thread holds the lock.
    pub fn is_locked(&self) -> bool {
        self.gate().holder.is_some()
    }

    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self) {
        let me = thread::current().id();
        let mut gate = self.gate();
        while matches!(gate.holder, Some(holder) if holder != me) {
            gate = self
                .released
                .wait(gate)
                .unwrap_or_else(PoisonError::into_inner);
        }
        gate.holder = Some(me);
        gate.depth += 1;
    }

    fn leave(&self) {
        let mut gate = self.gate();
        gate.depth = gate.depth.saturating_sub(1);
        if gate.depth == 0 {
            gate.holder = None;
            drop(gate);
            self.released.notify_all();
        }
    }
}

struct Ticket<'a, T> {
    lock: &'a ScopeLock<T>,
}

impl<T> Drop for Ticket<'_, T> {
    fn drop(&mut self) {
        self.lock.leave();
    }
}

/// Access to the guarded data for the duration of one call.
pub struct ScopedAccess<'a, T> {
    // Field order matters: the data guard is released before the gate.
    data: MutexGuard<'a, T>,
    _ticket: Ticket<'a, T>,
}

impl<T> Deref for ScopedAccess<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for ScopedAccess<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

/// Ends a scope on drop. Returned by `ThreadQuery::scoped`.
///
/// The scope belongs to the thread that opened it, so the guard cannot be
/// sent to another thread:
///
/// ```compile_fail
/// use std::sync::Arc;
///
/// use sqlthread_core::ConnectionSpec;
/// use sqlthread_query::ThreadQuery;
/// use sqlthread_test_utils::MockDriver;
///
/// let driver = Arc::new(MockDriver::new());
/// let query = ThreadQuery::builder(driver, ConnectionSpec::new("mock", "db"))
///     .build()
///     .unwrap();
/// let scope = query.scoped();
/// std::thread::scope(|s| {
///     s.spawn(move || drop(scope));
/// });
/// ```
pub struct ScopeGuard<'a, T> {
    lock: &'a ScopeLock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<'a, T> ScopeGuard<'a, T> {
    pub(crate) fn new(lock: &'a ScopeLock<T>) -> Self {
        lock.begin();
        Self {
            lock,
            _not_send: PhantomData,
        }
    }
}

impl<T> Drop for ScopeGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.end();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn holder_reenters_without_deadlock() {
        let lock = ScopeLock::new(Vec::new());
        lock.begin();
        lock.lock().push(1);
        lock.lock().push(2);
        assert!(lock.is_held_by_current_thread());
        assert!(lock.end());
        assert!(!lock.is_locked());
        assert_eq!(*lock.lock(), vec![1, 2]);
    }

    #[test]
    fn scopes_nest() {
        let lock = ScopeLock::new(());
        lock.begin();
        lock.begin();
        assert!(lock.end());
        assert!(lock.is_locked());
        assert!(lock.end());
        assert!(!lock.is_locked());
    }

    #[test]
    fn end_without_begin_is_ignored() {
        let lock = ScopeLock::new(0u8);
        assert!(!lock.end());
        assert!(!lock.is_locked());
    }

    #[test]
    fn other_thread_blocks_until_end() {
        let lock = Arc::new(ScopeLock::new(Vec::<&str>::new()));
        let entered = Arc::new(AtomicBool::new(false));
        lock.begin();

        let (started_tx, started_rx) = mpsc::channel();
        let worker = {
            let lock = Arc::clone(&lock);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                started_tx.send(()).unwrap();
                lock.lock().push("other");
                entered.store(true, Ordering::SeqCst);
            })
        };

        started_rx.recv().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst), "other thread must wait");
        lock.lock().push("holder");
        lock.end();

        worker.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
        assert_eq!(*lock.lock(), vec!["holder", "other"]);
    }

    #[test]
    fn end_from_foreign_thread_does_not_release() {
        let lock = Arc::new(ScopeLock::new(()));
        lock.begin();
        let foreign = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || lock.end())
        };
        assert!(!foreign.join().unwrap());
        assert!(lock.is_held_by_current_thread());
        lock.end();
    }

    #[test]
    fn guard_ends_scope_on_drop() {
        let lock = ScopeLock::new(());
        {
            let _scope = ScopeGuard::new(&lock);
            assert!(lock.is_held_by_current_thread());
        }
        assert!(!lock.is_locked());
    }
}
