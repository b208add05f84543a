//! tickerlist CLI: build, parse, show and seed commands.
//!
//! Commands:
//! - `build`: fetch the source, validate, and update the artifact (with retry and fallback)
//! - `parse`: run a local file through the pipeline and print the result; writes nothing
//! - `show`: report symbol count and digest of the current artifact
//! - `seed`: print the built-in seed list in artifact format
//!
//! Exit codes for `build`: 0 unchanged, 10 changed, 20 degraded (previous
//! artifact kept), 21 seeded, 30 no artifact written, 2 usage/config error.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tickerlist_core::seed::seed_set;
use tickerlist_core::snapshot::digest;
use tickerlist_core::{
    ArtifactFormat, BuildConfig, BuildOutcome, Controller, DocumentShape, FileSnapshotStore,
    HttpFetcher, Pipeline, RawDocument, SnapshotStore, EXIT_NO_ARTIFACT,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code for usage and configuration errors (matches clap's).
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(
    name = "tickerlist",
    version,
    about = "tickerlist: build a canonical S&P 100 ticker list"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the source and update the artifact if it changed.
    Build {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Source URL (overrides config and SOURCE_URL).
        #[arg(long)]
        url: Option<String>,

        /// Artifact path (overrides config).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Minimum number of symbols for a trusted build.
        #[arg(long)]
        min_count: Option<usize>,

        /// Total fetch attempts before falling back.
        #[arg(long)]
        attempts: Option<u32>,

        /// Write the artifact without indentation.
        #[arg(long, default_value_t = false)]
        compact: bool,

        /// Write a JSON build report here.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run a local document through the pipeline and print the validated list.
    Parse {
        /// Document to read (JSON, CSV or HTML).
        file: PathBuf,

        /// Declared shape; detected from content when omitted.
        #[arg(long, value_enum)]
        shape: Option<ShapeArg>,

        /// Path to a TOML config file (validation settings).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Minimum number of symbols for a trusted build.
        #[arg(long)]
        min_count: Option<usize>,
    },
    /// Report symbol count and digest of the current artifact.
    Show {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Artifact path (overrides config).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the built-in seed list.
    Seed {
        /// Print without indentation.
        #[arg(long, default_value_t = false)]
        compact: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShapeArg {
    Json,
    Csv,
    Html,
}

impl From<ShapeArg> for DocumentShape {
    fn from(s: ShapeArg) -> Self {
        match s {
            ShapeArg::Json => DocumentShape::Json,
            ShapeArg::Csv => DocumentShape::Csv,
            ShapeArg::Html => DocumentShape::Html,
        }
    }
}

/// Machine-readable summary of a build, for downstream hooks.
#[derive(Serialize)]
struct BuildReport {
    status: String,
    exit_code: i32,
    changed: bool,
    count: usize,
    digest: String,
    attempts: u32,
    error_kind: Option<String>,
    warnings: Vec<String>,
    message: String,
    artifact: PathBuf,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Build {
            config,
            url,
            out,
            min_count,
            attempts,
            compact,
            report,
        } => run_build(config, url, out, min_count, attempts, compact, report),
        Commands::Parse {
            file,
            shape,
            config,
            min_count,
        } => run_parse(&file, shape, config, min_count),
        Commands::Show { config, out } => run_show(config, out),
        Commands::Seed { compact } => run_seed(compact),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Defaults < config file < SOURCE_URL < command-line flags.
fn load_config(path: Option<&Path>) -> Result<BuildConfig> {
    let mut config = match path {
        Some(p) => BuildConfig::from_file(p)?,
        None => BuildConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

#[allow(clippy::too_many_arguments)]
fn run_build(
    config_path: Option<PathBuf>,
    url: Option<String>,
    out: Option<PathBuf>,
    min_count: Option<usize>,
    attempts: Option<u32>,
    compact: bool,
    report_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(url) = url {
        config.source.url = url;
    }
    if let Some(out) = out {
        config.output.path = out;
    }
    if let Some(min) = min_count {
        config.validation.min_count = min;
    }
    if let Some(n) = attempts {
        config.retry.max_attempts = n;
    }
    if compact {
        config.output.format = ArtifactFormat::Compact;
    }
    config.validate()?;
    debug!(?config, "resolved build configuration");

    let started_at = Utc::now();
    let fetcher = HttpFetcher::new(config.source.timeout(), config.source.user_agent())
        .context("failed to build HTTP client")?;
    let store = FileSnapshotStore::new(&config.output.path, config.output.format);
    let controller = Controller::from_config(&config);

    let outcome = match controller.run(&fetcher, &store) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(path = %config.output.path.display(), "PersistenceError: {e}");
            eprintln!("FATAL: PersistenceError: {e}");
            eprintln!("No artifact written to {}", config.output.path.display());
            return Ok(exit_code(EXIT_NO_ARTIFACT));
        }
    };

    print_outcome(&outcome, &config.output.path);
    Ok(exit_code(finish_build(
        &outcome,
        &config.output.path,
        started_at,
        report_path.as_deref(),
    )))
}

/// Write the optional report and return the build's exit code. A report that
/// cannot be written is logged; it never changes the exit code.
fn finish_build(
    outcome: &BuildOutcome,
    artifact: &Path,
    started_at: DateTime<Utc>,
    report_path: Option<&Path>,
) -> i32 {
    if let Some(path) = report_path {
        let report = build_report(outcome, artifact, started_at);
        match write_report(&report, path) {
            Ok(()) => info!(path = %path.display(), "wrote build report"),
            Err(e) => warn!("{e:#}"),
        }
    }
    outcome.exit_code()
}

fn write_report(report: &BuildReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report {}", path.display()))
}

fn build_report(outcome: &BuildOutcome, artifact: &Path, started_at: DateTime<Utc>) -> BuildReport {
    BuildReport {
        status: outcome.status.label().to_string(),
        exit_code: outcome.exit_code(),
        changed: outcome.write.written && outcome.status.is_success(),
        count: outcome.write.count,
        digest: outcome.write.digest.clone(),
        attempts: outcome.attempts,
        error_kind: outcome.cause.as_ref().map(|c| c.kind().to_string()),
        warnings: outcome.warnings.clone(),
        message: outcome.message(),
        artifact: artifact.to_path_buf(),
        started_at,
        finished_at: Utc::now(),
    }
}

fn print_outcome(outcome: &BuildOutcome, artifact: &Path) {
    if outcome.status.is_success() {
        println!("{}", outcome.message());
    } else {
        eprintln!("FAILED: {}", outcome.message());
    }
    println!("Artifact: {}", artifact.display());
    println!("Digest:   {}", outcome.write.digest);
    for warn in &outcome.warnings {
        println!("WARNING: {warn}");
    }
}

fn run_parse(
    file: &Path,
    shape: Option<ShapeArg>,
    config_path: Option<PathBuf>,
    min_count: Option<usize>,
) -> Result<ExitCode> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(min) = min_count {
        config.validation.min_count = min;
    }
    config.validate()?;

    let body = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let doc = RawDocument::new(body, shape.map(Into::into).unwrap_or_default());
    let pipeline = Pipeline::new(file.display().to_string(), config.normalizer(), config.validator());

    let validated = match pipeline.process(&doc) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("FAILED: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("{}", config.output.format.serialize(&validated.symbols)?);
    eprintln!("{} symbols", validated.symbols.len());
    if !validated.rejected.is_empty() {
        eprintln!("Rejected: {}", validated.rejected.join(", "));
    }
    for warn in &validated.warnings {
        eprintln!("WARNING: {warn}");
    }
    Ok(ExitCode::SUCCESS)
}

fn run_show(config_path: Option<PathBuf>, out: Option<PathBuf>) -> Result<ExitCode> {
    let config = load_config(config_path.as_deref())?;
    let path = out.unwrap_or(config.output.path);
    let store = FileSnapshotStore::new(&path, config.output.format);

    let Some(snapshot) = store.load()? else {
        println!("No artifact at {}", path.display());
        return Ok(ExitCode::FAILURE);
    };

    println!("Artifact: {}", path.display());
    println!("Symbols:  {}", snapshot.symbols.len());
    println!("Digest:   {}", digest(&snapshot.text));
    if snapshot.text != config.output.format.serialize(&snapshot.symbols)? {
        println!("Note: artifact is not in canonical form; the next build will rewrite it");
    }
    Ok(ExitCode::SUCCESS)
}

fn run_seed(compact: bool) -> Result<ExitCode> {
    let config = load_config(None)?;
    let format = if compact {
        ArtifactFormat::Compact
    } else {
        config.output.format
    };
    let seed = seed_set(&config.normalizer());
    if seed.is_empty() {
        bail!("built-in seed list is empty");
    }
    println!("{}", format.serialize(&seed)?);
    Ok(ExitCode::SUCCESS)
}
