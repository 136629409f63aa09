//! CLI argument parsing for the `rtsan` tool

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for the checking subcommands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "rtsan")]
#[command(version)]
#[command(about = "Real-time safety sanitizer runtime and tooling", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a command with sanitizer options (and optionally the preload shim)
    Run {
        /// Suppression file
        #[arg(long, value_name = "FILE")]
        suppressions: Option<PathBuf>,

        /// TOML classification manifest
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        /// Keep running after a violation instead of aborting
        #[arg(long = "continue-on-error")]
        continue_on_error: bool,

        /// Report every violation, even when its stack was already reported
        #[arg(long = "report-all")]
        report_all: bool,

        /// Print violation counters when the command exits
        #[arg(long = "print-stats")]
        print_stats: bool,

        /// Shared library to inject with LD_PRELOAD (built with the `preload` feature)
        #[arg(long, value_name = "LIB")]
        preload: Option<PathBuf>,

        /// Command to run (everything after --)
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Validate a suppression file and print its rules
    CheckSuppressions {
        /// Suppression file to check
        file: PathBuf,

        /// Output format (text or json)
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate a classification manifest and print its entries
    CheckManifest {
        /// Manifest file to check
        file: PathBuf,

        /// Output format (text or json)
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Resolve raw report addresses to functions and source lines
    Symbolize {
        /// Unstripped binary the addresses belong to
        #[arg(long, value_name = "PATH")]
        binary: PathBuf,

        /// Load bias to subtract from each address (hex)
        #[arg(long = "load-bias", value_name = "HEX")]
        load_bias: Option<String>,

        /// Addresses as printed in the report
        #[arg(required = true, value_name = "ADDR")]
        addresses: Vec<String>,
    },

    /// List the intercepted primitives and their families
    ListPrimitives,
}
