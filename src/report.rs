//! Violation reporting and termination policy
//!
//! Everything here runs on the cold path that follows a detected violation.
//! [`raise`] opens a disabled scope before doing anything else, so the
//! allocation and I/O needed to capture, symbolize and print a stack cannot
//! re-enter detection. The report is written with a single `write(2)` to
//! file descriptor 2 rather than through `std::io::stderr()`, whose lock may
//! already be held by the very thread being reported.
//!
//! # Report format
//!
//! ```text
//! ==4242==ERROR: RealtimeSanitizer: unsafe-library-call
//! Intercepted call to real-time unsafe function `malloc` in real-time context!
//! SUMMARY: RealtimeSanitizer: unsafe-library-call `malloc` at src/engine.rs:88
//!     #0 0x000055d0c3a1b2c4 in <rtsan::intercept::alloc::RtsanAllocator as core::alloc::global::GlobalAlloc>::alloc src/intercept/alloc.rs:61:9
//!     #1 0x000055d0c3a0f011 in engine::Engine::render src/engine.rs:88:23
//! ```

use crate::context;
use crate::options::Options;
use crate::runtime;
use crate::stack::{self, CapturedStack, StackFrame};
use crate::suppression::SuppressionList;
use crate::violation::{ViolationKind, ViolationRecord};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

/// Slots in the table of already-reported stack fingerprints
const SEEN_STACKS: usize = 1024;

/// Function prefixes that never count as the user's source location
const RUNTIME_PREFIXES: &[&str] = &["rtsan::", "std::", "core::", "alloc::", "backtrace::", "__rust"];

/// What the reporter decided to do with a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A suppression rule matched
    Suppressed,
    /// The same stack was already reported
    Duplicate,
    /// Print it (and terminate, under the default policy)
    Report,
}

/// Counters printed by `print_stats_on_exit`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_errors: u64,
    pub unique_errors: u64,
    pub suppressed: u64,
}

/// Lock-free set of stack fingerprints with fixed capacity
///
/// Once full, every further stack counts as new.
struct SeenStacks {
    slots: Box<[AtomicU64]>,
}

impl SeenStacks {
    fn new() -> Self {
        Self {
            slots: (0..SEEN_STACKS).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Returns true when the fingerprint was not present before
    fn insert(&self, fingerprint: u64) -> bool {
        // zero marks an empty slot
        let fingerprint = fingerprint.max(1);
        let start = (fingerprint % SEEN_STACKS as u64) as usize;

        for probe in 0..SEEN_STACKS {
            let slot = &self.slots[(start + probe) % SEEN_STACKS];
            match slot.compare_exchange(0, fingerprint, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return true,
                Err(existing) if existing == fingerprint => return false,
                Err(_) => continue,
            }
        }
        true
    }
}

/// Decides what happens to each violation and keeps the counters
pub struct Reporter {
    halt_on_error: bool,
    suppress_equal_stacks: bool,
    total_errors: AtomicU64,
    unique_errors: AtomicU64,
    suppressed: AtomicU64,
    seen: SeenStacks,
}

impl Reporter {
    pub fn new(options: &Options) -> Self {
        Self {
            halt_on_error: options.halt_on_error,
            suppress_equal_stacks: options.suppress_equal_stacks,
            total_errors: AtomicU64::new(0),
            unique_errors: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            seen: SeenStacks::new(),
        }
    }

    /// Run the suppression matcher and duplicate filter on a violation
    pub fn evaluate(&self, record: &ViolationRecord<'_>, suppressions: &SuppressionList) -> Verdict {
        if suppressions.should_suppress(record).is_some() {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return Verdict::Suppressed;
        }

        self.total_errors.fetch_add(1, Ordering::Relaxed);
        if self.suppress_equal_stacks && !self.seen.insert(record.stack.fingerprint()) {
            return Verdict::Duplicate;
        }

        self.unique_errors.fetch_add(1, Ordering::Relaxed);
        Verdict::Report
    }

    pub fn halt_on_error(&self) -> bool {
        self.halt_on_error
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_errors: self.total_errors.load(Ordering::Relaxed),
            unique_errors: self.unique_errors.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
        }
    }
}

/// Handle a violation detected on the current thread
///
/// Called only when the thread's context is active. May not return when the
/// termination policy is to halt.
#[cold]
#[inline(never)]
pub(crate) fn raise(kind: ViolationKind, symbol: &str) {
    context::with_disabled(|| {
        let runtime = runtime::get();
        if !runtime.options().enabled {
            return;
        }

        let record = ViolationRecord::new(kind, symbol, stack::capture());
        let reporter = runtime.reporter();
        if reporter.evaluate(&record, runtime.suppressions()) != Verdict::Report {
            return;
        }

        write_stderr(render(&record, std::process::id()).as_bytes());
        if reporter.halt_on_error() {
            std::process::abort();
        }
    });
}

/// Format a full report
pub fn render(record: &ViolationRecord<'_>, pid: u32) -> String {
    let mut out = String::with_capacity(256 + record.stack.len() * 96);
    let _ = writeln!(out, "=={}==ERROR: RealtimeSanitizer: {}", pid, record.kind.slug());
    let _ = writeln!(out, "{}", record.message());
    let _ = writeln!(out, "{}", summary_line(record));
    for (idx, frame) in record.stack.frames().iter().enumerate() {
        let _ = writeln!(out, "    #{} {}", idx, format_frame(frame));
    }
    out
}

/// The single-line `SUMMARY:` of a report
pub fn summary_line(record: &ViolationRecord<'_>) -> String {
    let mut line = format!(
        "SUMMARY: RealtimeSanitizer: {} `{}`",
        record.kind.slug(),
        record.symbol
    );
    if let Some((file, lineno)) = user_location(&record.stack) {
        let _ = write!(line, " at {}:{}", file, lineno);
    }
    line
}

/// Best source location to blame: the first located frame outside the
/// runtime and standard library, else the first located frame at all
fn user_location(stack: &CapturedStack) -> Option<(&str, u32)> {
    stack
        .frames()
        .iter()
        .filter(|frame| {
            frame.function.as_deref().is_some_and(|name| {
                let name = name.trim_start_matches('<');
                !RUNTIME_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
            })
        })
        .find_map(|frame| Some((frame.file.as_deref()?, frame.line?)))
        .or_else(|| stack.first_location())
}

fn format_frame(frame: &StackFrame) -> String {
    let mut line = format!("{:#018x} in {}", frame.ip, frame.function.as_deref().unwrap_or("<unknown>"));
    if let Some(file) = &frame.file {
        let _ = write!(line, " {}", file);
        if let Some(lineno) = frame.line {
            let _ = write!(line, ":{}", lineno);
            if let Some(col) = frame.column {
                let _ = write!(line, ":{}", col);
            }
        }
    }
    line
}

/// Format the exit statistics block
pub fn render_stats(stats: &StatsSnapshot) -> String {
    format!(
        "RealtimeSanitizer exit stats:\n    Total error count: {}\n    Unique error count: {}\n    Suppression count: {}\n",
        stats.total_errors, stats.unique_errors, stats.suppressed
    )
}

/// Write all of `bytes` to fd 2 without touching the std stderr lock
pub(crate) fn write_stderr(mut bytes: &[u8]) {
    while !bytes.is_empty() {
        // SAFETY: the pointer and length describe a live, initialized slice
        let written = unsafe { libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len()) };
        if written < 0 {
            if std::io::Error::last_os_error().kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            return;
        }
        if written == 0 {
            return;
        }
        bytes = &bytes[written as usize..];
    }
}
