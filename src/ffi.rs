//! C ABI
//!
//! Mirrors the `__rtsan_*` entry points of the LLVM sanitizer interface so C
//! and C++ code linked into the same process (or a code generator emitting
//! the calls) shares the Rust context stack. All functions are safe to call
//! from any thread at any time; the notify functions additionally require a
//! valid NUL-terminated string or null.

use crate::{context, intercept, runtime};
use std::ffi::{c_char, CStr};

#[no_mangle]
pub extern "C" fn __rtsan_realtime_enter() {
    context::enter_constrained();
}

#[no_mangle]
pub extern "C" fn __rtsan_realtime_exit() {
    context::exit_constrained();
}

#[no_mangle]
pub extern "C" fn __rtsan_disable() {
    context::enter_disabled();
}

#[no_mangle]
pub extern "C" fn __rtsan_enable() {
    context::exit_disabled();
}

#[no_mangle]
pub extern "C" fn __rtsan_ensure_initialized() {
    runtime::ensure_initialized();
}

#[no_mangle]
pub extern "C" fn __rtsan_is_initialized() -> bool {
    runtime::is_initialized()
}

/// Report a call to an unsafe primitive made by foreign code
///
/// # Safety
///
/// `symbol` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn __rtsan_notify_intercepted_call(symbol: *const c_char) {
    if context::is_active() {
        // SAFETY: forwarded from the caller's contract
        let name = unsafe { symbol_name(symbol) };
        intercept::intercepted_call(name);
    }
}

/// Report a call to a function the foreign code classified as blocking
///
/// # Safety
///
/// Same contract as [`__rtsan_notify_intercepted_call`].
#[no_mangle]
pub unsafe extern "C" fn __rtsan_notify_blocking_call(symbol: *const c_char) {
    if context::is_active() {
        // SAFETY: forwarded from the caller's contract
        let name = unsafe { symbol_name(symbol) };
        intercept::blocking_call(name);
    }
}

unsafe fn symbol_name<'a>(symbol: *const c_char) -> &'a str {
    if symbol.is_null() {
        return "<unknown>";
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract
    unsafe { CStr::from_ptr(symbol) }
        .to_str()
        .unwrap_or("<non-utf8 symbol>")
}

#[cfg(all(test, feature = "enabled"))]
mod tests {
    use super::*;

    #[test]
    fn test_enter_exit_through_c_abi() {
        __rtsan_realtime_enter();
        assert_eq!(context::realtime_depth(), 1);
        __rtsan_disable();
        assert!(!context::is_active());
        __rtsan_enable();
        __rtsan_realtime_exit();
        assert_eq!(context::realtime_depth(), 0);
    }

    #[test]
    fn test_notify_outside_region_is_silent() {
        unsafe {
            __rtsan_notify_intercepted_call(c"malloc".as_ptr());
            __rtsan_notify_blocking_call(std::ptr::null());
        }
    }

    #[test]
    fn test_symbol_name_handles_null() {
        assert_eq!(unsafe { symbol_name(std::ptr::null()) }, "<unknown>");
        assert_eq!(unsafe { symbol_name(c"fsync".as_ptr()) }, "fsync");
    }

    #[test]
    fn test_initialization_through_c_abi() {
        __rtsan_ensure_initialized();
        assert!(__rtsan_is_initialized());
    }
}
