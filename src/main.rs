use anyhow::{Context, Result};
use clap::Parser;
use rtsan::classification::Manifest;
use rtsan::cli::{Cli, Commands, OutputFormat};
use rtsan::dwarf::{self, Symbolizer};
use rtsan::intercept::PRIMITIVES;
use rtsan::options::{Options, OPTIONS_ENV};
use rtsan::suppression::SuppressionList;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

struct RunArgs {
    suppressions: Option<PathBuf>,
    manifest: Option<PathBuf>,
    continue_on_error: bool,
    report_all: bool,
    print_stats: bool,
    preload: Option<PathBuf>,
    command: Vec<String>,
}

/// Launch the command with sanitizer options and return its exit code
fn run(args: RunArgs) -> Result<i32> {
    let (program, rest) = args
        .command
        .split_first()
        .context("No command given")?;

    let mut options = Options::from_env();
    if args.suppressions.is_some() {
        options.suppressions = args.suppressions;
    }
    if args.manifest.is_some() {
        options.manifest = args.manifest;
    }
    if args.continue_on_error {
        options.halt_on_error = false;
    }
    if args.report_all {
        options.suppress_equal_stacks = false;
    }
    if args.print_stats {
        options.print_stats_on_exit = true;
    }

    let rendered = options.to_env_string();
    if Options::parse(&rendered) != options {
        anyhow::bail!(
            "Paths containing both quote characters and separators cannot be passed through {}",
            OPTIONS_ENV
        );
    }

    let mut command = Command::new(program);
    command.args(rest).env(OPTIONS_ENV, &rendered);

    if let Some(lib) = &args.preload {
        let lib = lib
            .canonicalize()
            .with_context(|| format!("Preload library not found: {}", lib.display()))?;
        let preload = match std::env::var("LD_PRELOAD") {
            Ok(existing) if !existing.is_empty() => format!("{}:{}", lib.display(), existing),
            _ => lib.display().to_string(),
        };
        command.env("LD_PRELOAD", preload);
    }

    tracing::debug!(program = %program, options = %rendered, "launching");

    let status = command
        .status()
        .with_context(|| format!("Failed to run {}", program))?;

    Ok(match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    })
}

fn check_suppressions(file: &Path, format: OutputFormat) -> Result<i32> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read suppression file: {}", file.display()))?;

    match SuppressionList::parse_strict(&text) {
        Ok(list) => {
            match format {
                OutputFormat::Text => {
                    for rule in list.rules() {
                        println!("{}", rule);
                    }
                    println!("{} rule(s) OK", list.len());
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(list.rules())?);
                }
            }
            Ok(0)
        }
        Err(errors) => {
            for error in &errors {
                eprintln!("{}: {}", file.display(), error);
            }
            eprintln!("{} malformed line(s)", errors.len());
            Ok(1)
        }
    }
}

fn check_manifest(file: &Path, format: OutputFormat) -> Result<i32> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read manifest: {}", file.display()))?;

    let (manifest, rejected) = Manifest::parse(&text)
        .with_context(|| format!("Invalid manifest: {}", file.display()))?;

    match format {
        OutputFormat::Text => {
            for entry in manifest.entries() {
                println!("{:<12} {}", entry.kind.as_str(), entry.symbol);
            }
            println!("{} entries OK", manifest.len());
        }
        OutputFormat::Json => {
            let entries: Vec<_> = manifest
                .entries()
                .iter()
                .map(|entry| serde_json::json!({ "symbol": entry.symbol, "kind": entry.kind }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    for error in &rejected {
        eprintln!("{}: {}", file.display(), error);
    }
    Ok(if rejected.is_empty() { 0 } else { 1 })
}

fn symbolize(binary: &Path, load_bias: Option<&str>, addresses: &[String]) -> Result<i32> {
    let symbolizer = Symbolizer::load(binary)?;
    let bias = load_bias.map(dwarf::parse_address).transpose()?.unwrap_or(0);

    for text in addresses {
        let address = dwarf::parse_address(text)?;
        let frames = symbolizer.resolve(address.wrapping_sub(bias))?;
        if frames.is_empty() {
            println!("{:#018x} in <unknown>", address);
        }
        for frame in frames {
            println!("{:#018x} in {}", address, frame);
        }
    }
    Ok(0)
}

fn list_primitives() -> Result<i32> {
    for (symbol, family) in PRIMITIVES {
        println!("{:<12} {}", family.as_str(), symbol);
    }
    Ok(0)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let code = match args.command {
        Commands::Run {
            suppressions,
            manifest,
            continue_on_error,
            report_all,
            print_stats,
            preload,
            command,
        } => run(RunArgs {
            suppressions,
            manifest,
            continue_on_error,
            report_all,
            print_stats,
            preload,
            command,
        })?,
        Commands::CheckSuppressions { file, format } => check_suppressions(&file, format)?,
        Commands::CheckManifest { file, format } => check_manifest(&file, format)?,
        Commands::Symbolize {
            binary,
            load_bias,
            addresses,
        } => symbolize(&binary, load_bias.as_deref(), &addresses)?,
        Commands::ListPrimitives => list_primitives()?,
    };

    std::process::exit(code);
}
