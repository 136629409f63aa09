//! In-process stack capture for violation reports
//!
//! Walks the calling thread's stack with the `backtrace` crate and resolves
//! every frame on a best-effort basis. Frames that cannot be symbolized (no
//! debug info, stripped binary, corrupted frame chain) are kept as bare
//! addresses; a partial trace is always preferred over no trace.
//!
//! Capture allocates, so it only ever runs on the violation path, inside a
//! disabled scope.

use fnv::FnvHasher;
use std::hash::Hasher;

/// Maximum stack depth to capture (prevent runaway walks)
pub const MAX_STACK_DEPTH: usize = 64;

/// How many leading frames are scanned for engine internals
const ENGINE_SCAN: usize = 24;

/// Frames belonging to the detection machinery itself. Everything up to the
/// deepest of these is dropped from the report.
const ENGINE_FRAMES: &[&str] = &[
    "backtrace::",
    "rtsan::stack::",
    "rtsan::report::",
    "rtsan::intercept::intercepted_call",
    "rtsan::intercept::blocking_call",
    "rtsan::context::with_disabled",
];

/// A single captured frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackFrame {
    /// Instruction pointer
    pub ip: usize,
    /// Demangled function name, without the hash suffix
    pub function: Option<String>,
    /// Source file path
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl StackFrame {
    /// A frame known only by its address
    pub fn unresolved(ip: usize) -> Self {
        Self {
            ip,
            ..Self::default()
        }
    }

    /// A frame with a function name and nothing else
    pub fn named(ip: usize, function: &str) -> Self {
        Self {
            ip,
            function: Some(function.to_string()),
            ..Self::default()
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.function.is_some()
    }
}

/// Ordered call stack, innermost frame first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedStack {
    frames: Vec<StackFrame>,
}

impl CapturedStack {
    /// Build a stack from frames, keeping at most [`MAX_STACK_DEPTH`]
    pub fn from_frames(mut frames: Vec<StackFrame>) -> Self {
        frames.truncate(MAX_STACK_DEPTH);
        Self { frames }
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// FNV-1a hash of the frame addresses, used to recognise repeats
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FnvHasher::default();
        for frame in &self.frames {
            hasher.write_usize(frame.ip);
        }
        hasher.finish()
    }

    /// First frame carrying a source location
    pub fn first_location(&self) -> Option<(&str, u32)> {
        self.frames
            .iter()
            .find_map(|f| Some((f.file.as_deref()?, f.line?)))
    }
}

/// Capture the calling thread's stack
///
/// Engine frames at the top of the stack are trimmed so the trace starts at
/// the intercepted primitive or the forbidden function.
pub fn capture() -> CapturedStack {
    let mut raw: Vec<backtrace::Frame> = Vec::with_capacity(MAX_STACK_DEPTH + ENGINE_SCAN);
    backtrace::trace(|frame| {
        raw.push(frame.clone());
        raw.len() < MAX_STACK_DEPTH + ENGINE_SCAN
    });

    let mut frames: Vec<StackFrame> = raw.iter().map(resolve).collect();
    let skip = engine_prefix_len(&frames);
    frames.drain(..skip);
    CapturedStack::from_frames(frames)
}

fn resolve(frame: &backtrace::Frame) -> StackFrame {
    let mut out = StackFrame::unresolved(frame.ip() as usize);
    backtrace::resolve_frame(frame, |symbol| {
        // Inlined frames resolve to several symbols; keep the innermost named one
        if out.function.is_some() {
            return;
        }
        out.function = symbol.name().map(|name| format!("{:#}", name));
        out.file = symbol.filename().map(|path| path.display().to_string());
        out.line = symbol.lineno();
        out.column = symbol.colno();
    });
    out
}

fn is_engine_frame(name: &str) -> bool {
    let name = name.trim_start_matches('<');
    ENGINE_FRAMES.iter().any(|prefix| name.starts_with(prefix))
}

fn engine_prefix_len(frames: &[StackFrame]) -> usize {
    let scan = &frames[..frames.len().min(ENGINE_SCAN)];
    scan.iter()
        .rposition(|f| f.function.as_deref().is_some_and(is_engine_frame))
        .map_or(0, |idx| idx + 1)
}
