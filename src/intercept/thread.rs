//! Thread primitives that report in real-time contexts

use super::{intercepted_call, symbols};
use std::time::Duration;

/// Spawn a thread (reported as `pthread_create`)
pub fn spawn<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    intercepted_call(symbols::PTHREAD_CREATE);
    JoinHandle {
        inner: std::thread::spawn(f),
    }
}

/// Handle to a thread spawned through [`spawn`]
#[derive(Debug)]
pub struct JoinHandle<T> {
    inner: std::thread::JoinHandle<T>,
}

impl<T> JoinHandle<T> {
    /// Wait for the thread to finish (reported as `pthread_join`)
    pub fn join(self) -> std::thread::Result<T> {
        intercepted_call(symbols::PTHREAD_JOIN);
        self.inner.join()
    }

    pub fn thread(&self) -> &std::thread::Thread {
        self.inner.thread()
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    pub fn into_inner(self) -> std::thread::JoinHandle<T> {
        self.inner
    }
}

impl<T> From<std::thread::JoinHandle<T>> for JoinHandle<T> {
    fn from(inner: std::thread::JoinHandle<T>) -> Self {
        Self { inner }
    }
}

pub fn sleep(dur: Duration) {
    intercepted_call(symbols::NANOSLEEP);
    std::thread::sleep(dur)
}

pub fn yield_now() {
    intercepted_call(symbols::SCHED_YIELD);
    std::thread::yield_now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{self, ScopedDisabler, ScopedRealtime};

    #[test]
    fn test_spawn_and_join() {
        let handle = spawn(|| 40 + 2);
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn test_spawned_thread_starts_unconstrained() {
        let _rt = ScopedRealtime::new();
        let _off = ScopedDisabler::new();
        let handle = spawn(context::realtime_depth);
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn test_sleep_and_yield_outside_realtime() {
        sleep(Duration::from_millis(1));
        yield_now();
    }

    #[test]
    fn test_from_std_handle() {
        let handle: JoinHandle<&str> = std::thread::spawn(|| "done").into();
        assert!(handle.thread().id() != std::thread::current().id());
        assert_eq!(handle.into_inner().join().unwrap(), "done");
    }
}
