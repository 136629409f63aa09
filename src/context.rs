//! Per-thread real-time context tracking
//!
//! Each thread owns a tiny state word: how deep it is inside constrained
//! (real-time) regions, and how deep inside disabled scopes. Detection is
//! active when the first is non-zero and the second is zero.
//!
//! The state lives in a const-initialised thread local holding a `Copy` value,
//! so reading it never allocates, never registers a destructor and never
//! takes a lock. That matters because the interception layer calls
//! [`is_active`] from inside the global allocator.
//!
//! Nesting a constrained region inside another one only bumps the depth; the
//! region stays active until the outermost guard is dropped. The disabled
//! depth is thread-wide rather than per frame: entering another constrained
//! function from inside a disabled scope stays disabled.

use std::marker::PhantomData;

#[cfg(feature = "enabled")]
use std::cell::Cell;

/// Snapshot of the calling thread's context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextFrame {
    /// Inside at least one constrained region
    pub constrained: bool,
    /// Number of live disabled scopes
    pub disabled_depth: u32,
}

impl ContextFrame {
    /// Whether violations would be detected in this state
    pub fn is_active(&self) -> bool {
        self.constrained && self.disabled_depth == 0
    }
}

#[cfg(feature = "enabled")]
#[derive(Clone, Copy)]
struct State {
    realtime_depth: u32,
    disabled_depth: u32,
}

#[cfg(feature = "enabled")]
thread_local! {
    static STATE: Cell<State> = const {
        Cell::new(State {
            realtime_depth: 0,
            disabled_depth: 0,
        })
    };
}

/// Apply `f` to the thread state. A thread that is tearing down its locals
/// is treated as having no context.
#[cfg(feature = "enabled")]
#[inline(always)]
fn update(f: impl FnOnce(State) -> State) {
    let _ = STATE.try_with(|cell| cell.set(f(cell.get())));
}

#[cfg(feature = "enabled")]
#[inline(always)]
fn load() -> State {
    STATE.try_with(Cell::get).unwrap_or(State {
        realtime_depth: 0,
        disabled_depth: 0,
    })
}

/// Enter a constrained region on the current thread
#[inline]
pub fn enter_constrained() {
    #[cfg(feature = "enabled")]
    update(|s| State {
        realtime_depth: s.realtime_depth.saturating_add(1),
        ..s
    });
}

/// Leave the innermost constrained region. Unbalanced calls saturate at zero.
#[inline]
pub fn exit_constrained() {
    #[cfg(feature = "enabled")]
    update(|s| State {
        realtime_depth: s.realtime_depth.saturating_sub(1),
        ..s
    });
}

/// Open a disabled scope on the current thread
#[inline]
pub fn enter_disabled() {
    #[cfg(feature = "enabled")]
    update(|s| State {
        disabled_depth: s.disabled_depth.saturating_add(1),
        ..s
    });
}

/// Close the innermost disabled scope. Unbalanced calls saturate at zero.
#[inline]
pub fn exit_disabled() {
    #[cfg(feature = "enabled")]
    update(|s| State {
        disabled_depth: s.disabled_depth.saturating_sub(1),
        ..s
    });
}

/// True iff the current thread is inside a constrained region and not
/// inside a disabled scope
#[inline(always)]
pub fn is_active() -> bool {
    #[cfg(feature = "enabled")]
    {
        let s = load();
        s.realtime_depth > 0 && s.disabled_depth == 0
    }
    #[cfg(not(feature = "enabled"))]
    {
        false
    }
}

/// Current thread's context
pub fn current() -> ContextFrame {
    ContextFrame {
        constrained: realtime_depth() > 0,
        disabled_depth: disabled_depth(),
    }
}

/// Constrained-region nesting depth of the current thread
pub fn realtime_depth() -> u32 {
    #[cfg(feature = "enabled")]
    {
        load().realtime_depth
    }
    #[cfg(not(feature = "enabled"))]
    {
        0
    }
}

/// Disabled-scope nesting depth of the current thread
pub fn disabled_depth() -> u32 {
    #[cfg(feature = "enabled")]
    {
        load().disabled_depth
    }
    #[cfg(not(feature = "enabled"))]
    {
        0
    }
}

/// Run `f` with detection disabled on this thread
pub fn with_disabled<R>(f: impl FnOnce() -> R) -> R {
    let _guard = ScopedDisabler::new();
    f()
}

/// RAII guard for a constrained region
///
/// The region is left when the guard drops, including while unwinding.
/// Guards are tied to the thread that created them.
///
/// ```
/// let _rt = rtsan::ScopedRealtime::new();
/// assert!(rtsan::context::is_active());
/// ```
#[must_use = "the region ends as soon as the guard is dropped"]
pub struct ScopedRealtime {
    _not_send: PhantomData<*const ()>,
}

impl ScopedRealtime {
    #[inline]
    pub fn new() -> Self {
        enter_constrained();
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Default for ScopedRealtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScopedRealtime {
    #[inline]
    fn drop(&mut self) {
        exit_constrained();
    }
}

/// RAII guard exempting the enclosed code from detection
#[must_use = "detection resumes as soon as the guard is dropped"]
pub struct ScopedDisabler {
    _not_send: PhantomData<*const ()>,
}

impl ScopedDisabler {
    #[inline]
    pub fn new() -> Self {
        enter_disabled();
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Default for ScopedDisabler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScopedDisabler {
    #[inline]
    fn drop(&mut self) {
        exit_disabled();
    }
}

#[cfg(all(test, feature = "enabled"))]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn test_inactive_by_default() {
        assert!(!is_active());
        assert_eq!(current(), ContextFrame::default());
    }

    #[test]
    fn test_scoped_realtime_activates() {
        {
            let _rt = ScopedRealtime::new();
            assert!(is_active());
            assert_eq!(realtime_depth(), 1);
        }
        assert!(!is_active());
        assert_eq!(realtime_depth(), 0);
    }

    #[test]
    fn test_nested_regions_stay_active() {
        let _outer = ScopedRealtime::new();
        {
            let _inner = ScopedRealtime::new();
            assert_eq!(realtime_depth(), 2);
        }
        // Leaving the inner region must not deactivate the outer one
        assert!(is_active());
        assert_eq!(realtime_depth(), 1);
    }

    #[test]
    fn test_disabler_suppresses_activity() {
        let _rt = ScopedRealtime::new();
        {
            let _off = ScopedDisabler::new();
            assert!(!is_active());
            let frame = current();
            assert!(frame.constrained);
            assert_eq!(frame.disabled_depth, 1);
        }
        assert!(is_active());
    }

    #[test]
    fn test_disabled_depth_is_thread_wide() {
        let _off = ScopedDisabler::new();
        let _rt = ScopedRealtime::new();
        assert!(!is_active());
    }

    #[test]
    fn test_nested_disablers() {
        let _rt = ScopedRealtime::new();
        let a = ScopedDisabler::new();
        let b = ScopedDisabler::new();
        assert_eq!(disabled_depth(), 2);
        drop(b);
        assert!(!is_active());
        drop(a);
        assert!(is_active());
    }

    #[test]
    fn test_unwinding_pops_region() {
        let before = realtime_depth();
        let result = panic::catch_unwind(|| {
            let _rt = ScopedRealtime::new();
            let _off = ScopedDisabler::new();
            panic!("leaving the region abnormally");
        });
        assert!(result.is_err());
        assert_eq!(realtime_depth(), before);
        assert_eq!(disabled_depth(), 0);
    }

    #[test]
    fn test_unbalanced_exit_saturates() {
        exit_constrained();
        exit_disabled();
        assert_eq!(realtime_depth(), 0);
        assert_eq!(disabled_depth(), 0);
    }

    #[test]
    fn test_with_disabled_returns_value() {
        let _rt = ScopedRealtime::new();
        let value = with_disabled(|| {
            assert!(!is_active());
            7
        });
        assert_eq!(value, 7);
        assert!(is_active());
    }

    #[test]
    fn test_context_frame_is_active() {
        let frame = ContextFrame {
            constrained: true,
            disabled_depth: 0,
        };
        assert!(frame.is_active());
        let frame = ContextFrame {
            constrained: true,
            disabled_depth: 3,
        };
        assert!(!frame.is_active());
    }

    #[test]
    fn test_threads_do_not_share_context() {
        let _rt = ScopedRealtime::new();
        let other = std::thread::spawn(is_active).join().unwrap();
        assert!(!other);
        assert!(is_active());
    }
}
