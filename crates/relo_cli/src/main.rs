//! Relo CLI: relocates third-party JVM libraries into a private namespace.
//!
//! Provides `relo relocate` for relocating every library listed in
//! `relocate.toml`, `relo transform` for rewriting a single archive against
//! its dependencies, and `relo plan` for inspecting the entry rename map.

#![warn(missing_docs)]

mod pipeline;
mod plan;
mod relocate;
mod transform;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Library relocation for the JVM.
#[derive(Parser, Debug)]
#[command(name = "relo", version, about = "Relocate JVM libraries into a private namespace")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `relocate.toml` manifest.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Relocate every library of the manifest into the output repository.
    Relocate(RelocateArgs),
    /// Relocate one archive against a set of dependency archives.
    Transform(TransformArgs),
    /// Print the entry rename map for a set of archives.
    Plan(PlanArgs),
}

/// Arguments for the `relo relocate` subcommand.
#[derive(Parser, Debug)]
pub struct RelocateArgs {
    /// Override the output repository root.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of worker threads.
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Do not relocate source archives.
    #[arg(long)]
    pub no_sources: bool,

    /// Write the JSON relocation report to this file (`-` for stdout).
    #[arg(long)]
    pub report: Option<String>,
}

/// Arguments for the `relo transform` subcommand.
#[derive(Parser, Debug)]
pub struct TransformArgs {
    /// The archive to relocate.
    pub input: PathBuf,

    /// Where to write the relocated archive.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Namespace to relocate under (dotted).
    #[arg(short, long)]
    pub namespace: String,

    /// Dependency archives that take part in the rename map.
    #[arg(short, long = "dep", num_args = 1..)]
    pub dependencies: Vec<PathBuf>,

    /// Whether the archive holds classes or sources.
    #[arg(short, long, value_enum, default_value_t = ArchiveKind::Binary)]
    pub kind: ArchiveKind,

    /// Digest algorithm for the integrity sidecar.
    #[arg(long, default_value = "sha512")]
    pub hash: String,
}

/// Arguments for the `relo plan` subcommand.
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Archives to scan.
    #[arg(required = true)]
    pub archives: Vec<PathBuf>,

    /// Namespace to relocate under (dotted).
    #[arg(short, long)]
    pub namespace: String,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Archive kind selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ArchiveKind {
    /// Compiled classes.
    Binary,
    /// Source files.
    Sources,
}

/// Output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom manifest.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Relocate(ref args) => relocate::run(args, &global),
        Command::Transform(ref args) => transform::run(args, &global),
        Command::Plan(ref args) => plan::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over the flags.
fn init_logging(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(global)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_level(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "info"
    }
}
