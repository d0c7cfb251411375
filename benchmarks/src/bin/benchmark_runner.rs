//! kvbench runner
//!
//! Runs the key-value store benchmarks and prints or writes the results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kvbench::{init_tracing, BackendKind, BenchmarkSuite, Config, ReportFormat, ResultBoard};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "kvbench-runner")]
#[command(about = "Key-value store write/read benchmark runner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path; defaults are used when it does not exist
    #[arg(short, long, default_value = "kvbench.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format, overriding the configuration file
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Output file
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmarks
    Run {
        /// Backend to run; repeat for several, all configured ones when absent
        #[arg(short, long = "backend", value_enum)]
        backends: Vec<BackendArg>,

        /// Number of pairs per workload
        #[arg(short, long)]
        items: Option<usize>,

        /// Seed for workload generation
        #[arg(short, long)]
        seed: Option<u64>,

        /// Run backends concurrently
        #[arg(short, long)]
        parallel: bool,
    },
    /// List available backends
    List,
    /// Validate benchmark configuration
    Validate,
    /// Generate sample configuration
    Config,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum BackendArg {
    SledString,
    SledBuffer,
    LmdbCache,
    SqliteAsync,
    Memory,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::SledString => BackendKind::SledString,
            BackendArg::SledBuffer => BackendKind::SledBuffer,
            BackendArg::LmdbCache => BackendKind::LmdbCache,
            BackendArg::SqliteAsync => BackendKind::SqliteAsync,
            BackendArg::Memory => BackendKind::Memory,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum FormatArg {
    Text,
    Json,
    Csv,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
            FormatArg::Csv => ReportFormat::Csv,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Run {
            backends,
            items,
            seed,
            parallel,
        } => {
            let mut config = load_config(&cli)?;
            if !backends.is_empty() {
                config.backends.enabled = backends.iter().map(|&b| b.into()).collect();
            }
            if let Some(items) = items {
                config.workload.item_count = *items;
            }
            if let Some(seed) = seed {
                config.workload.seed = Some(*seed);
            }
            if *parallel {
                config.execution.parallel = true;
            }
            run_command(config).await?;
        }
        Commands::List => {
            list_backends_command();
        }
        Commands::Validate => {
            validate_config_command(&cli)?;
        }
        Commands::Config => {
            generate_config_command(&cli)?;
        }
    }

    Ok(())
}

/// File (when present), then environment, then output flags
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.config.exists() {
        info!("Loading configuration from: {}", cli.config.display());
        Config::load_from_file(&cli.config)?
    } else {
        Config::default()
    };
    config.apply_env_overrides()?;

    if let Some(format) = cli.format {
        config.output.format = format.into();
    }
    if let Some(file) = &cli.file {
        config.output.file = Some(file.clone());
    }

    Ok(config)
}

async fn run_command(config: Config) -> Result<()> {
    config.validate().context("invalid benchmark configuration")?;

    let format = config.output.format;
    let output_file = config.output.file.clone();
    let board = BenchmarkSuite::new(config).run().await?;

    output_results(&board, format, output_file.as_deref())?;

    info!(
        "Summary: {} passed, {} failed",
        board.records().len(),
        board.failures().len()
    );
    if board.has_failures() {
        for failure in board.failures() {
            warn!("{} failed ({}): {}", failure.backend.title(), failure.category, failure.message);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn list_backends_command() {
    println!("Available backends:");
    for kind in BackendKind::ALL {
        println!(
            "  {:<14} {:<20} {:<7} {}",
            kind.label(),
            kind.title(),
            kind.encoding(),
            kind.description()
        );
    }
}

fn validate_config_command(cli: &Cli) -> Result<()> {
    info!("Validating configuration file: {}", cli.config.display());

    match Config::load_from_file(&cli.config).and_then(|config| config.validate()) {
        Ok(()) => {
            info!("Configuration file is valid");
            Ok(())
        }
        Err(e) => {
            warn!("Configuration file is invalid: {}", e);
            Err(e.into())
        }
    }
}

fn generate_config_command(cli: &Cli) -> Result<()> {
    let config = Config::default();
    config.save_to_file(&cli.config)?;
    info!("Generated sample configuration: {}", cli.config.display());
    Ok(())
}

fn output_results(board: &ResultBoard, format: ReportFormat, output_file: Option<&Path>) -> Result<()> {
    let output = board.render(format)?;

    if let Some(path) = output_file {
        std::fs::write(path, output)
            .with_context(|| format!("failed to write results to {}", path.display()))?;
        info!("Results written to: {}", path.display());
    } else {
        println!("{}", output.trim_end());
    }

    Ok(())
}
