//! Interception of unbounded-latency primitives
//!
//! Every wrapper in this module calls [`intercepted_call`] with the name of
//! the primitive it is about to run, then runs it. Detection is
//! observational: unless the reporter terminates the process, the real
//! operation always completes.
//!
//! When the calling thread is not in an active real-time context the check
//! is one thread-local load and one branch.
//!
//! | Family     | Rust surface                                   | Reported as |
//! |------------|------------------------------------------------|-------------|
//! | allocation | [`RtsanAllocator`]                             | `malloc`, `calloc`, `realloc`, `free`, `aligned_alloc` |
//! | locking    | [`sync::Mutex`], [`sync::RwLock`], [`sync::Condvar`] | `pthread_mutex_lock`, `pthread_rwlock_*`, `pthread_cond_*` |
//! | threads    | [`thread::spawn`], [`thread::JoinHandle::join`], [`thread::sleep`], [`thread::yield_now`] | `pthread_create`, `pthread_join`, `nanosleep`, `sched_yield` |
//! | processes  | [`process::spawn`], [`process::output`], [`process::Child::wait`] | `fork`, `waitpid` |
//! | file I/O   | [`fs::File`], [`fs::read`], [`fs::write`], [`io::Intercepted`] | `open`, `read`, `write`, `lseek`, `fflush`, `fsync` |
//! | socket I/O | [`net::TcpStream`], [`net::TcpListener`], [`net::UdpSocket`] | `connect`, `bind`, `accept`, `sendto`, `recvfrom`, `read`, `write` |
//! | signals    | [`signal::sigprocmask`], [`signal::pthread_sigmask`] | `sigprocmask`, `pthread_sigmask` |

pub mod alloc;
pub mod fs;
pub mod io;
pub mod net;
pub mod process;
pub mod signal;
pub mod sync;
pub mod thread;

pub use alloc::RtsanAllocator;

use crate::context;
use crate::report;
use crate::violation::ViolationKind;

/// Primitive names as they appear in reports and suppression rules
pub mod symbols {
    pub const MALLOC: &str = "malloc";
    pub const CALLOC: &str = "calloc";
    pub const REALLOC: &str = "realloc";
    pub const FREE: &str = "free";
    pub const ALIGNED_ALLOC: &str = "aligned_alloc";
    pub const POSIX_MEMALIGN: &str = "posix_memalign";

    pub const PTHREAD_MUTEX_LOCK: &str = "pthread_mutex_lock";
    pub const PTHREAD_RWLOCK_RDLOCK: &str = "pthread_rwlock_rdlock";
    pub const PTHREAD_RWLOCK_WRLOCK: &str = "pthread_rwlock_wrlock";
    pub const PTHREAD_COND_WAIT: &str = "pthread_cond_wait";
    pub const PTHREAD_COND_TIMEDWAIT: &str = "pthread_cond_timedwait";
    pub const PTHREAD_COND_SIGNAL: &str = "pthread_cond_signal";
    pub const PTHREAD_COND_BROADCAST: &str = "pthread_cond_broadcast";

    pub const PTHREAD_CREATE: &str = "pthread_create";
    pub const PTHREAD_JOIN: &str = "pthread_join";
    pub const NANOSLEEP: &str = "nanosleep";
    pub const USLEEP: &str = "usleep";
    pub const SLEEP: &str = "sleep";
    pub const SCHED_YIELD: &str = "sched_yield";

    pub const FORK: &str = "fork";
    pub const WAITPID: &str = "waitpid";

    pub const OPEN: &str = "open";
    pub const READ: &str = "read";
    pub const WRITE: &str = "write";
    pub const LSEEK: &str = "lseek";
    pub const FFLUSH: &str = "fflush";
    pub const FSYNC: &str = "fsync";
    pub const FDATASYNC: &str = "fdatasync";

    pub const SOCKET: &str = "socket";
    pub const CONNECT: &str = "connect";
    pub const BIND: &str = "bind";
    pub const ACCEPT: &str = "accept";
    pub const SEND: &str = "send";
    pub const RECV: &str = "recv";
    pub const SENDTO: &str = "sendto";
    pub const RECVFROM: &str = "recvfrom";

    pub const SIGPROCMASK: &str = "sigprocmask";
    pub const PTHREAD_SIGMASK: &str = "pthread_sigmask";
}

/// Category of an intercepted primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Allocation,
    Locking,
    Threads,
    Processes,
    FileIo,
    SocketIo,
    Signals,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Allocation => "allocation",
            Family::Locking => "locking",
            Family::Threads => "threads",
            Family::Processes => "processes",
            Family::FileIo => "file-io",
            Family::SocketIo => "socket-io",
            Family::Signals => "signals",
        }
    }
}

/// The interception table
pub const PRIMITIVES: &[(&str, Family)] = {
    use self::symbols::*;
    use self::Family::{Allocation, FileIo, Locking, Processes, Signals, SocketIo, Threads};
    &[
        (MALLOC, Allocation),
        (CALLOC, Allocation),
        (REALLOC, Allocation),
        (FREE, Allocation),
        (ALIGNED_ALLOC, Allocation),
        (POSIX_MEMALIGN, Allocation),
        (PTHREAD_MUTEX_LOCK, Locking),
        (PTHREAD_RWLOCK_RDLOCK, Locking),
        (PTHREAD_RWLOCK_WRLOCK, Locking),
        (PTHREAD_COND_WAIT, Locking),
        (PTHREAD_COND_TIMEDWAIT, Locking),
        (PTHREAD_COND_SIGNAL, Locking),
        (PTHREAD_COND_BROADCAST, Locking),
        (PTHREAD_CREATE, Threads),
        (PTHREAD_JOIN, Threads),
        (NANOSLEEP, Threads),
        (USLEEP, Threads),
        (SLEEP, Threads),
        (SCHED_YIELD, Threads),
        (FORK, Processes),
        (WAITPID, Processes),
        (OPEN, FileIo),
        (READ, FileIo),
        (WRITE, FileIo),
        (LSEEK, FileIo),
        (FFLUSH, FileIo),
        (FSYNC, FileIo),
        (FDATASYNC, FileIo),
        (SOCKET, SocketIo),
        (CONNECT, SocketIo),
        (BIND, SocketIo),
        (ACCEPT, SocketIo),
        (SEND, SocketIo),
        (RECV, SocketIo),
        (SENDTO, SocketIo),
        (RECVFROM, SocketIo),
        (SIGPROCMASK, Signals),
        (PTHREAD_SIGMASK, Signals),
    ]
};

/// Family of a primitive in the interception table
pub fn family_of(symbol: &str) -> Option<Family> {
    PRIMITIVES
        .iter()
        .find(|(name, _)| *name == symbol)
        .map(|(_, family)| *family)
}

/// Check a call to an intercepted primitive
#[inline(always)]
pub fn intercepted_call(symbol: &str) {
    if context::is_active() {
        report::raise(ViolationKind::InterceptedCall, symbol);
    }
}

/// Prologue of a function classified as forbidden
#[inline(always)]
pub fn blocking_call(symbol: &str) {
    if context::is_active() {
        report::raise(ViolationKind::BlockingCall, symbol);
    }
}
