//! kvbench: key-value store micro-benchmarks
//!
//! This crate times bulk writes and full read-backs against several embedded
//! key-value stores and checks that every store returns exactly what was
//! written:
//!
//! - Workload generation with unique keys, as text or raw bytes
//! - An order-insensitive write/read comparator
//! - A timed runner that always releases the store it opened
//! - Text, JSON and CSV reporting
//! - A suite that runs the configured stores sequentially or concurrently

pub mod backends;
pub mod compare;
pub mod config;
pub mod error;
pub mod report;
pub mod runner;
pub mod suite;
pub mod utils;
pub mod workload;

use tracing_subscriber::EnvFilter;

pub use backends::{BackendKind, OpenOptions, StorageBackend, StorageHandle};
pub use compare::compare_read_write;
pub use config::Config;
pub use error::{BackendError, BenchError, ConfigError, Result, ValidationError};
pub use report::{format_phase, ReportFormat, ResultBoard, ResultsView};
pub use runner::{run_benchmark, BenchmarkResult, Phase, PhaseResult};
pub use suite::BenchmarkSuite;
pub use workload::{
    generate_buffer_pairs, generate_random_token, generate_string_pairs, KeyValuePair, Token,
    Workload, WorkloadGenerator,
};

/// Initialize tracing. `RUST_LOG` takes precedence over the default level.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "kvbench=debug" } else { "kvbench=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
