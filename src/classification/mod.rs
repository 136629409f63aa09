// Function latency classification
//
// Functions are classified as entry points of constrained (real-time) regions
// or as forbidden inside such regions. Classifications come from two places,
// both fixed before any constrained code runs:
//
// - compiled-in annotations: the `nonblocking!` and `blocking!` macros submit a
//   `ClassificationEntry` that the linker collects (via `inventory`);
// - an optional TOML manifest named by the `manifest` runtime option.
//
// The merged table is an immutable snapshot. Classification never propagates
// through the call graph; only the per-thread context does.

mod manifest;
mod registry;

pub use manifest::{Manifest, ManifestEntry};
pub use registry::ClassificationRegistry;

use crate::context::ScopedRealtime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Latency classification of a function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    #[default]
    Unclassified,
    /// Entry point of a constrained region
    Constrained,
    /// Must not run inside a constrained region
    Forbidden,
}

impl Classification {
    /// Parse a manifest spelling
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "unclassified" | "none" => Some(Classification::Unclassified),
            "constrained" | "nonblocking" | "realtime" => Some(Classification::Constrained),
            "forbidden" | "blocking" => Some(Classification::Forbidden),
            _ => None,
        }
    }

    fn strictness(self) -> u8 {
        match self {
            Classification::Unclassified => 0,
            Classification::Constrained => 1,
            Classification::Forbidden => 2,
        }
    }

    /// Combine two classifications of the same symbol; the stricter one wins
    pub fn merge(self, other: Self) -> Self {
        if other.strictness() > self.strictness() {
            other
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Unclassified => "unclassified",
            Classification::Constrained => "constrained",
            Classification::Forbidden => "forbidden",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled-in classification, submitted by the annotation macros
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationEntry {
    pub symbol: &'static str,
    pub kind: Classification,
}

impl ClassificationEntry {
    pub const fn new(symbol: &'static str, kind: Classification) -> Self {
        Self { symbol, kind }
    }
}

inventory::collect!(ClassificationEntry);

/// All entries the linker collected from annotated functions
pub fn compiled_entries() -> impl Iterator<Item = &'static ClassificationEntry> {
    inventory::iter::<ClassificationEntry>.into_iter()
}

/// Guard returned by [`function_scope`]
#[must_use = "a constrained function's region ends when the scope is dropped"]
pub struct FunctionScope {
    _realtime: Option<ScopedRealtime>,
}

/// Run the prologue for `symbol` according to its registry classification
///
/// For code that cannot use the annotation macros (trait objects, callbacks
/// registered by name). A `Constrained` symbol opens a region for the life of
/// the returned guard; a `Forbidden` symbol is checked like a blocking call.
///
/// ```no_run
/// fn render(buffer: &mut [f32]) {
///     let _scope = rtsan::function_scope("audio::render");
///     buffer.fill(0.0);
/// }
/// ```
pub fn function_scope(symbol: &str) -> FunctionScope {
    match crate::runtime::get().registry().classify(symbol) {
        Classification::Constrained => FunctionScope {
            _realtime: Some(ScopedRealtime::new()),
        },
        Classification::Forbidden => {
            crate::intercept::blocking_call(symbol);
            FunctionScope { _realtime: None }
        }
        Classification::Unclassified => FunctionScope { _realtime: None },
    }
}

#[cfg(test)]
mod tests;
