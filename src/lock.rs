//! The execution lock serialising data model mutation against the protocol stack.
//!
//! The lock is reentrant: a context that already holds it can acquire it again
//! and gets [`LockStatus::AlreadyTaken`] instead of deadlocking. Acquisition is
//! bounded by a [`Timeout`]; a timed out attempt touches nothing.

use core::cell::{Cell, Ref, RefCell, RefMut};
use std::time::Duration;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::{trace, warn};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Fail straight away if another context holds the lock
    Immediate,
    After(Duration),
    Forever,
}

/// Outcome of an acquire attempt
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Failed = 0,
    /// The calling context already held the lock
    AlreadyTaken = 1,
    Success = 2,
}

struct Held<T> {
    depth: Cell<usize>,
    data: RefCell<T>,
}

pub struct ExecutionLock<T> {
    inner: ReentrantMutex<Held<T>>,
}

impl<T> ExecutionLock<T> {
    pub fn new(data: T) -> Self {
        Self {
            inner: ReentrantMutex::new(Held {
                depth: Cell::new(0),
                data: RefCell::new(data),
            }),
        }
    }

    /// Acquire the lock, waiting at most `timeout`.
    ///
    /// Returns [`Error::LockTimeout`] if another context kept the lock for the
    /// whole wait. The returned guard reports whether this acquisition was the
    /// outermost one through [`ExecutionGuard::status`].
    pub fn lock(&self, timeout: Timeout) -> Result<ExecutionGuard<'_, T>> {
        let guard = match timeout {
            Timeout::Immediate => self.inner.try_lock(),
            Timeout::After(wait) => self.inner.try_lock_for(wait),
            Timeout::Forever => Some(self.inner.lock()),
        };
        let Some(guard) = guard else {
            warn!(?timeout, "execution lock not acquired");
            return Err(Error::LockTimeout);
        };
        let depth = guard.depth.get();
        guard.depth.set(depth + 1);
        let status = if depth == 0 {
            LockStatus::Success
        } else {
            LockStatus::AlreadyTaken
        };
        trace!(?status, depth, "execution lock acquired");
        Ok(ExecutionGuard { guard, status })
    }

    /// Like [`lock`](Self::lock), collapsing the outcome to a [`LockStatus`].
    /// The lock is released again before returning.
    pub fn probe(&self, timeout: Timeout) -> LockStatus {
        match self.lock(timeout) {
            Ok(guard) => guard.status(),
            Err(_) => LockStatus::Failed,
        }
    }

    /// Exclusive access without locking, for when no other context can hold
    /// a reference, e.g. while the graph is still under construction.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut().data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner().data.into_inner()
    }
}

impl<T: Default> Default for ExecutionLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Holds the execution lock until dropped.
///
/// Data is reached through [`borrow`](Self::borrow) and
/// [`borrow_mut`](Self::borrow_mut). Nested guards of the same context share
/// the data, so a borrow must not be held across a call that locks again.
pub struct ExecutionGuard<'a, T> {
    guard: ReentrantMutexGuard<'a, Held<T>>,
    status: LockStatus,
}

impl<'a, T> ExecutionGuard<'a, T> {
    pub fn status(&self) -> LockStatus {
        self.status
    }

    /// # Panics
    /// If the data is mutably borrowed by an outer guard of the same context.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.guard.data.borrow()
    }

    /// # Panics
    /// If the data is borrowed by an outer guard of the same context.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.guard.data.borrow_mut()
    }

    pub fn try_borrow(&self) -> Result<Ref<'_, T>> {
        self.guard.data.try_borrow().map_err(|_| Error::Busy)
    }

    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, T>> {
        self.guard.data.try_borrow_mut().map_err(|_| Error::Busy)
    }
}

impl<'a, T> Drop for ExecutionGuard<'a, T> {
    fn drop(&mut self) {
        let depth = self.guard.depth.get();
        self.guard.depth.set(depth.saturating_sub(1));
    }
}
