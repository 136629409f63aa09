//! LD_PRELOAD interposers
//!
//! With the `preload` feature the cdylib exports the libc and libpthread
//! primitives below, so a process started with
//! `LD_PRELOAD=librtsan.so` has every such call checked against the calling
//! thread's context, whichever language made it. Real-time regions are
//! entered through the `__rtsan_*` C ABI.
//!
//! Allocation forwards to glibc's `__libc_*` entry points, which never go
//! through the dynamic linker. Everything else resolves the next definition
//! with `dlsym(RTLD_NEXT)` on first use and caches it.

use crate::intercept::{intercepted_call, symbols};
use crate::report;
use libc::{
    c_int, c_uint, c_void, pid_t, pthread_attr_t, pthread_cond_t, pthread_mutex_t,
    pthread_rwlock_t, pthread_t, sigset_t, size_t, sockaddr, socklen_t, ssize_t, timespec,
    useconds_t,
};
use std::ffi::CStr;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

extern "C" {
    fn __libc_malloc(size: size_t) -> *mut c_void;
    fn __libc_calloc(nmemb: size_t, size: size_t) -> *mut c_void;
    fn __libc_realloc(ptr: *mut c_void, size: size_t) -> *mut c_void;
    fn __libc_free(ptr: *mut c_void);
    fn __libc_memalign(align: size_t, size: size_t) -> *mut c_void;
    fn dlvsym(handle: *mut c_void, symbol: *const libc::c_char, version: *const libc::c_char)
        -> *mut c_void;
}

/// Version of the condition variable ABI that unversioned lookups miss
#[cfg(target_arch = "x86_64")]
const COND_VERSION: Option<&CStr> = Some(c"GLIBC_2.3.2");
#[cfg(not(target_arch = "x86_64"))]
const COND_VERSION: Option<&CStr> = None;

#[used]
#[link_section = ".init_array"]
static INIT: extern "C" fn() = initialize;

extern "C" fn initialize() {
    crate::runtime::ensure_initialized();
}

fn resolve(cache: &AtomicPtr<c_void>, name: &CStr, version: Option<&CStr>) -> *mut c_void {
    let cached = cache.load(Ordering::Acquire);
    if !cached.is_null() {
        return cached;
    }
    // SAFETY: RTLD_NEXT lookup of a NUL-terminated name
    let found = unsafe {
        match version {
            Some(version) => dlvsym(libc::RTLD_NEXT, name.as_ptr(), version.as_ptr()),
            None => libc::dlsym(libc::RTLD_NEXT, name.as_ptr()),
        }
    };
    if found.is_null() {
        report::write_stderr(b"==rtsan== cannot resolve interposed symbol ");
        report::write_stderr(name.to_bytes());
        report::write_stderr(b"\n");
        // SAFETY: async-signal-safe termination with nothing to unwind
        unsafe { libc::abort() };
    }
    cache.store(found, Ordering::Release);
    found
}

macro_rules! interpose {
    ($(
        $name:ident [$symbol:expr $(, $version:expr)?] ( $($arg:ident : $ty:ty),* ) -> $ret:ty;
    )*) => {$(
        /// # Safety
        ///
        /// Same contract as the libc function of the same name.
        #[no_mangle]
        pub unsafe extern "C" fn $name($($arg: $ty),*) -> $ret {
            static REAL: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());
            intercepted_call($symbol);
            #[allow(unused_mut, unused_assignments)]
            let mut version: Option<&CStr> = None;
            $(version = $version;)?
            let real = resolve(
                &REAL,
                // SAFETY: literal with a single trailing NUL
                unsafe { CStr::from_bytes_with_nul_unchecked(concat!(stringify!($name), "\0").as_bytes()) },
                version,
            );
            // SAFETY: `real` is the next definition of this very symbol
            let real: unsafe extern "C" fn($($ty),*) -> $ret = unsafe { std::mem::transmute(real) };
            unsafe { real($($arg),*) }
        }
    )*};
}

interpose! {
    pthread_mutex_lock[symbols::PTHREAD_MUTEX_LOCK](mutex: *mut pthread_mutex_t) -> c_int;
    pthread_rwlock_rdlock[symbols::PTHREAD_RWLOCK_RDLOCK](lock: *mut pthread_rwlock_t) -> c_int;
    pthread_rwlock_wrlock[symbols::PTHREAD_RWLOCK_WRLOCK](lock: *mut pthread_rwlock_t) -> c_int;
    pthread_cond_wait[symbols::PTHREAD_COND_WAIT, COND_VERSION](
        cond: *mut pthread_cond_t,
        mutex: *mut pthread_mutex_t
    ) -> c_int;
    pthread_cond_timedwait[symbols::PTHREAD_COND_TIMEDWAIT, COND_VERSION](
        cond: *mut pthread_cond_t,
        mutex: *mut pthread_mutex_t,
        abstime: *const timespec
    ) -> c_int;
    pthread_create[symbols::PTHREAD_CREATE](
        thread: *mut pthread_t,
        attr: *const pthread_attr_t,
        start: extern "C" fn(*mut c_void) -> *mut c_void,
        arg: *mut c_void
    ) -> c_int;
    pthread_join[symbols::PTHREAD_JOIN](thread: pthread_t, retval: *mut *mut c_void) -> c_int;
    nanosleep[symbols::NANOSLEEP](req: *const timespec, rem: *mut timespec) -> c_int;
    usleep[symbols::USLEEP](usec: useconds_t) -> c_int;
    sleep[symbols::SLEEP](seconds: c_uint) -> c_uint;
    sched_yield[symbols::SCHED_YIELD]() -> c_int;
    fork[symbols::FORK]() -> pid_t;
    socket[symbols::SOCKET](domain: c_int, kind: c_int, protocol: c_int) -> c_int;
    connect[symbols::CONNECT](fd: c_int, addr: *const sockaddr, len: socklen_t) -> c_int;
    accept[symbols::ACCEPT](fd: c_int, addr: *mut sockaddr, len: *mut socklen_t) -> c_int;
    send[symbols::SEND](fd: c_int, buf: *const c_void, len: size_t, flags: c_int) -> ssize_t;
    recv[symbols::RECV](fd: c_int, buf: *mut c_void, len: size_t, flags: c_int) -> ssize_t;
    fsync[symbols::FSYNC](fd: c_int) -> c_int;
    sigprocmask[symbols::SIGPROCMASK](
        how: c_int,
        set: *const sigset_t,
        old: *mut sigset_t
    ) -> c_int;
    pthread_sigmask[symbols::PTHREAD_SIGMASK](
        how: c_int,
        set: *const sigset_t,
        old: *mut sigset_t
    ) -> c_int;
}

/// # Safety
///
/// Same contract as `malloc(3)`.
#[no_mangle]
pub unsafe extern "C" fn malloc(size: size_t) -> *mut c_void {
    intercepted_call(symbols::MALLOC);
    // SAFETY: glibc's allocator entry point
    unsafe { __libc_malloc(size) }
}

/// # Safety
///
/// Same contract as `calloc(3)`.
#[no_mangle]
pub unsafe extern "C" fn calloc(nmemb: size_t, size: size_t) -> *mut c_void {
    intercepted_call(symbols::CALLOC);
    // SAFETY: glibc's allocator entry point
    unsafe { __libc_calloc(nmemb, size) }
}

/// # Safety
///
/// Same contract as `realloc(3)`.
#[no_mangle]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: size_t) -> *mut c_void {
    intercepted_call(symbols::REALLOC);
    // SAFETY: glibc's allocator entry point
    unsafe { __libc_realloc(ptr, size) }
}

/// # Safety
///
/// Same contract as `free(3)`.
#[no_mangle]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
    intercepted_call(symbols::FREE);
    // SAFETY: glibc's allocator entry point
    unsafe { __libc_free(ptr) }
}

/// # Safety
///
/// Same contract as `aligned_alloc(3)`.
#[no_mangle]
pub unsafe extern "C" fn aligned_alloc(align: size_t, size: size_t) -> *mut c_void {
    intercepted_call(symbols::ALIGNED_ALLOC);
    // SAFETY: glibc's allocator entry point
    unsafe { __libc_memalign(align, size) }
}

/// # Safety
///
/// Same contract as `posix_memalign(3)`.
#[no_mangle]
pub unsafe extern "C" fn posix_memalign(out: *mut *mut c_void, align: size_t, size: size_t) -> c_int {
    intercepted_call(symbols::POSIX_MEMALIGN);
    if !align.is_power_of_two() || align % std::mem::size_of::<*mut c_void>() != 0 {
        return libc::EINVAL;
    }
    // SAFETY: glibc's allocator entry point
    let block = unsafe { __libc_memalign(align, size) };
    if block.is_null() {
        return libc::ENOMEM;
    }
    // SAFETY: caller passes a writable out pointer
    unsafe { *out = block };
    0
}
