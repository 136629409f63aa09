//! Violation records

use crate::stack::CapturedStack;
use std::fmt;

/// What kind of real-time rule was broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// An intercepted unbounded-latency primitive ran in a real-time context
    InterceptedCall,
    /// A function classified as forbidden ran in a real-time context
    BlockingCall,
}

impl ViolationKind {
    /// Short identifier used in the report header and summary
    pub fn slug(&self) -> &'static str {
        match self {
            ViolationKind::InterceptedCall => "unsafe-library-call",
            ViolationKind::BlockingCall => "blocking-call",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// One detected violation, consumed by the reporter right away
#[derive(Debug, Clone)]
pub struct ViolationRecord<'a> {
    pub kind: ViolationKind,
    /// Primitive or forbidden function that was called
    pub symbol: &'a str,
    pub stack: CapturedStack,
}

impl<'a> ViolationRecord<'a> {
    pub fn new(kind: ViolationKind, symbol: &'a str, stack: CapturedStack) -> Self {
        Self {
            kind,
            symbol,
            stack,
        }
    }

    /// Human-readable description of the violation
    pub fn message(&self) -> String {
        match self.kind {
            ViolationKind::InterceptedCall => format!(
                "Intercepted call to real-time unsafe function `{}` in real-time context!",
                self.symbol
            ),
            ViolationKind::BlockingCall => format!(
                "Call to blocking function `{}` in real-time context!",
                self.symbol
            ),
        }
    }
}
