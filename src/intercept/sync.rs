//! Locking primitives that report acquisition in real-time contexts
//!
//! Drop-in wrappers over `std::sync`. Guards are the standard guard types, so
//! [`Condvar`] works with [`Mutex`] exactly like the std pair. Non-blocking
//! attempts (`try_lock`, `try_read`, `try_write`) are bounded and not
//! reported.

use super::{intercepted_call, symbols};
use std::fmt;
use std::sync::{
    LockResult, MutexGuard, RwLockReadGuard, RwLockWriteGuard, TryLockResult, WaitTimeoutResult,
};
use std::time::Duration;

/// Mutual exclusion lock
pub struct Mutex<T: ?Sized> {
    inner: std::sync::Mutex<T>,
}

impl<T> Mutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: std::sync::Mutex::new(value),
        }
    }

    pub fn into_inner(self) -> LockResult<T> {
        self.inner.into_inner()
    }
}

impl<T: ?Sized> Mutex<T> {
    /// Acquire the lock, blocking the thread until it is available
    pub fn lock(&self) -> LockResult<MutexGuard<'_, T>> {
        intercepted_call(symbols::PTHREAD_MUTEX_LOCK);
        self.inner.lock()
    }

    pub fn try_lock(&self) -> TryLockResult<MutexGuard<'_, T>> {
        self.inner.try_lock()
    }

    pub fn get_mut(&mut self) -> LockResult<&mut T> {
        self.inner.get_mut()
    }

    pub fn is_poisoned(&self) -> bool {
        self.inner.is_poisoned()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

/// Reader-writer lock
pub struct RwLock<T: ?Sized> {
    inner: std::sync::RwLock<T>,
}

impl<T> RwLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: std::sync::RwLock::new(value),
        }
    }

    pub fn into_inner(self) -> LockResult<T> {
        self.inner.into_inner()
    }
}

impl<T: ?Sized> RwLock<T> {
    pub fn read(&self) -> LockResult<RwLockReadGuard<'_, T>> {
        intercepted_call(symbols::PTHREAD_RWLOCK_RDLOCK);
        self.inner.read()
    }

    pub fn write(&self) -> LockResult<RwLockWriteGuard<'_, T>> {
        intercepted_call(symbols::PTHREAD_RWLOCK_WRLOCK);
        self.inner.write()
    }

    pub fn try_read(&self) -> TryLockResult<RwLockReadGuard<'_, T>> {
        self.inner.try_read()
    }

    pub fn try_write(&self) -> TryLockResult<RwLockWriteGuard<'_, T>> {
        self.inner.try_write()
    }

    pub fn get_mut(&mut self) -> LockResult<&mut T> {
        self.inner.get_mut()
    }
}

impl<T: Default> Default for RwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for RwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

/// Condition variable
#[derive(Debug, Default)]
pub struct Condvar {
    inner: std::sync::Condvar,
}

impl Condvar {
    pub const fn new() -> Self {
        Self {
            inner: std::sync::Condvar::new(),
        }
    }

    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> LockResult<MutexGuard<'a, T>> {
        intercepted_call(symbols::PTHREAD_COND_WAIT);
        self.inner.wait(guard)
    }

    pub fn wait_while<'a, T, F>(
        &self,
        guard: MutexGuard<'a, T>,
        condition: F,
    ) -> LockResult<MutexGuard<'a, T>>
    where
        F: FnMut(&mut T) -> bool,
    {
        intercepted_call(symbols::PTHREAD_COND_WAIT);
        self.inner.wait_while(guard, condition)
    }

    pub fn wait_timeout<'a, T>(
        &self,
        guard: MutexGuard<'a, T>,
        dur: Duration,
    ) -> LockResult<(MutexGuard<'a, T>, WaitTimeoutResult)> {
        intercepted_call(symbols::PTHREAD_COND_TIMEDWAIT);
        self.inner.wait_timeout(guard, dur)
    }

    pub fn notify_one(&self) {
        intercepted_call(symbols::PTHREAD_COND_SIGNAL);
        self.inner.notify_one()
    }

    pub fn notify_all(&self) {
        intercepted_call(symbols::PTHREAD_COND_BROADCAST);
        self.inner.notify_all()
    }
}
