//! rtsan - real-time safety sanitizer for Rust programs
//!
//! Marks regions of a program as real-time (constrained) and reports, at the
//! moment they happen, calls inside those regions to operations with
//! unbounded latency: heap allocation, lock acquisition, thread and process
//! management, blocking file and socket I/O, signal mask changes, and calls
//! to functions the program itself classified as blocking.
//!
//! ```no_run
//! #[global_allocator]
//! static ALLOC: rtsan::RtsanAllocator = rtsan::RtsanAllocator::system();
//!
//! rtsan::nonblocking! {
//!     fn render(out: &mut [f32]) {
//!         let scratch = vec![0.0_f32; out.len()]; // reported: `malloc`
//!         out.copy_from_slice(&scratch);
//!     }
//! }
//!
//! fn main() {
//!     render(&mut [0.0; 64]);
//! }
//! ```
//!
//! Runtime behaviour is configured through the `RTSAN_OPTIONS` environment
//! variable (see [`options`]). Building without the default `enabled` feature
//! compiles every check down to nothing.

pub mod classification;
pub mod cli;
pub mod context;
pub mod dwarf;
pub mod error;
#[cfg(feature = "capi")]
pub mod ffi;
pub mod intercept;
#[cfg(all(feature = "preload", target_os = "linux", target_env = "gnu", not(test)))]
mod interpose;
mod macros;
pub mod options;
pub mod report;
pub mod runtime;
pub mod stack;
pub mod suppression;
pub mod violation;

pub use classification::{function_scope, Classification, ClassificationEntry};
pub use context::{ScopedDisabler, ScopedRealtime};
pub use error::{Error, Result};
pub use intercept::RtsanAllocator;
pub use options::Options;
pub use violation::ViolationKind;

#[doc(hidden)]
pub use inventory;

/// Enter a constrained region on the calling thread
///
/// Prefer [`ScopedRealtime`]; every call must be paired with
/// [`realtime_exit`] on the same thread.
#[inline]
pub fn realtime_enter() {
    context::enter_constrained();
}

#[inline]
pub fn realtime_exit() {
    context::exit_constrained();
}

/// Suspend detection on the calling thread until the matching [`enable`]
#[inline]
pub fn disable() {
    context::enter_disabled();
}

#[inline]
pub fn enable() {
    context::exit_disabled();
}

/// Load options, suppressions and the manifest now instead of lazily
pub fn ensure_initialized() {
    runtime::ensure_initialized();
}

pub fn is_initialized() -> bool {
    runtime::is_initialized()
}
