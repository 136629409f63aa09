//! Process-wide runtime snapshot
//!
//! Options, suppression rules and the classification registry are loaded
//! once, published through a `OnceLock`, and never mutated afterwards. Every
//! thread reads them without synchronization beyond the one acquire load in
//! `OnceLock::get`.
//!
//! Initialization is lazy (first violation, first `function_scope` lookup)
//! or explicit through [`ensure_initialized`] / [`initialize`]. It always runs
//! inside a disabled scope: reading files and allocating from within a
//! constrained region must not report against the runtime itself.

use crate::classification::{ClassificationRegistry, Manifest};
use crate::context;
use crate::options::Options;
use crate::report::{self, Reporter, StatsSnapshot};
use crate::suppression::SuppressionList;
use std::sync::OnceLock;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Immutable runtime state shared by all threads
pub struct Runtime {
    options: Options,
    suppressions: SuppressionList,
    registry: ClassificationRegistry,
    reporter: Reporter,
}

impl Runtime {
    /// Build a runtime, loading the files the options point at
    pub fn new(options: Options) -> Self {
        let suppressions = options
            .suppressions
            .as_deref()
            .map(SuppressionList::load)
            .unwrap_or_default();
        let manifest = options.manifest.as_deref().map(Manifest::load);
        let registry = ClassificationRegistry::load(manifest.as_ref());
        let reporter = Reporter::new(&options);

        tracing::debug!(
            enabled = options.enabled,
            halt_on_error = options.halt_on_error,
            suppressions = suppressions.len(),
            classified = registry.len(),
            "realtime sanitizer initialized"
        );

        Self {
            options,
            suppressions,
            registry,
            reporter,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn suppressions(&self) -> &SuppressionList {
        &self.suppressions
    }

    pub fn registry(&self) -> &ClassificationRegistry {
        &self.registry
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.reporter.stats()
    }
}

/// The process runtime, initializing it from `RTSAN_OPTIONS` if needed
pub fn get() -> &'static Runtime {
    RUNTIME.get_or_init(|| context::with_disabled(|| build(Options::from_env())))
}

/// Initialize from `RTSAN_OPTIONS` unless already initialized
pub fn ensure_initialized() {
    let _ = get();
}

/// Initialize with explicit options
///
/// Returns false when the runtime was already initialized, in which case the
/// given options are ignored.
pub fn initialize(options: Options) -> bool {
    let mut installed = false;
    RUNTIME.get_or_init(|| {
        installed = true;
        context::with_disabled(|| build(options))
    });
    installed
}

pub fn is_initialized() -> bool {
    RUNTIME.get().is_some()
}

fn build(options: Options) -> Runtime {
    let print_stats = options.print_stats_on_exit;
    let runtime = Runtime::new(options);
    if print_stats {
        // SAFETY: registering a plain extern "C" fn with no captured state
        let rc = unsafe { libc::atexit(print_stats_at_exit) };
        if rc != 0 {
            tracing::warn!("could not register exit statistics handler");
        }
    }
    runtime
}

extern "C" fn print_stats_at_exit() {
    if let Some(runtime) = RUNTIME.get() {
        report::write_stderr(report::render_stats(&runtime.stats()).as_bytes());
    }
}
