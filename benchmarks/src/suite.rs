//! Benchmark orchestration
//!
//! Generates one workload per encoding, shared by every backend that uses
//! that encoding, then runs each enabled backend. A backend that fails is
//! logged and recorded; the remaining backends still run and report.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use tempfile::TempDir;
use tracing::{debug, error, info, info_span, Instrument};

use crate::backends::{BackendKind, LmdbCache, MemoryBackend, SledStore, SqliteStorage};
use crate::config::Config;
use crate::error::Result;
use crate::report::ResultBoard;
use crate::runner::{run_benchmark, BenchmarkResult};
use crate::workload::{Encoding, Token, Workload, WorkloadGenerator};

/// Workloads for one suite run, one per encoding
#[derive(Debug, Clone)]
pub struct Workloads {
    pub text: Workload<String>,
    pub binary: Workload<Vec<u8>>,
}

impl Workloads {
    /// Generate the configured workloads. Encodings no enabled backend uses
    /// get an empty workload.
    pub fn generate(config: &Config) -> Self {
        let settings = &config.workload;
        let mut generator =
            WorkloadGenerator::new(settings.key_length, settings.value_length, settings.seed);
        let count_for = |encoding| {
            if config.uses_encoding(encoding) {
                settings.item_count
            } else {
                0
            }
        };

        Self {
            text: generator.generate(count_for(Encoding::Text)),
            binary: generator.generate(count_for(Encoding::Binary)),
        }
    }
}

fn log_workload<T: Token>(workload: &Workload<T>) {
    if !workload.is_empty() {
        debug!(
            encoding = %workload.encoding(),
            items = workload.len(),
            payload_bytes = workload.payload_bytes(),
            "generated workload"
        );
    }
}

/// Where storage instances live for the duration of a run
enum StorageRoot {
    Temporary(TempDir),
    Configured(PathBuf),
}

impl StorageRoot {
    fn prepare(data_dir: Option<&Path>) -> Result<Self> {
        match data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Ok(StorageRoot::Configured(dir.to_path_buf()))
            }
            None => Ok(StorageRoot::Temporary(
                tempfile::Builder::new().prefix("kvbench").tempdir()?,
            )),
        }
    }

    fn path(&self) -> &Path {
        match self {
            StorageRoot::Temporary(dir) => dir.path(),
            StorageRoot::Configured(path) => path,
        }
    }
}

pub struct BenchmarkSuite {
    config: Config,
}

impl BenchmarkSuite {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run every enabled backend and collect the results. The configuration
    /// is validated before any workload is generated.
    pub async fn run(&self) -> Result<ResultBoard> {
        self.config.validate()?;
        let root = StorageRoot::prepare(self.config.storage.data_dir.as_deref())?;
        let workloads = Workloads::generate(&self.config);
        log_workload(&workloads.text);
        log_workload(&workloads.binary);
        let kinds = self.config.enabled_backends();

        info!(
            backends = kinds.len(),
            items = self.config.workload.item_count,
            parallel = self.config.execution.parallel,
            root = %root.path().display(),
            "starting benchmark suite"
        );

        let outcomes = if self.config.execution.parallel {
            join_all(
                kinds
                    .iter()
                    .map(|&kind| self.run_instrumented(kind, &workloads, root.path())),
            )
            .await
        } else {
            let mut outcomes = Vec::with_capacity(kinds.len());
            for &kind in &kinds {
                outcomes.push(self.run_instrumented(kind, &workloads, root.path()).await);
            }
            outcomes
        };

        let mut board = ResultBoard::new();
        for (kind, outcome) in outcomes {
            match outcome {
                Ok(result) => board.record(kind, result),
                Err(e) => {
                    error!(backend = %kind, category = e.category(), "benchmark failed: {}", e);
                    board.record_failure(kind, &e);
                }
            }
        }

        info!(
            succeeded = board.records().len(),
            failed = board.failures().len(),
            "benchmark suite finished"
        );
        Ok(board)
    }

    async fn run_instrumented(
        &self,
        kind: BackendKind,
        workloads: &Workloads,
        root: &Path,
    ) -> (BackendKind, Result<BenchmarkResult>) {
        let span = info_span!("benchmark", backend = %kind);
        let outcome = self.run_kind(kind, workloads, root).instrument(span).await;
        (kind, outcome)
    }

    /// Run a single backend against the workload for its encoding
    pub async fn run_kind(
        &self,
        kind: BackendKind,
        workloads: &Workloads,
        root: &Path,
    ) -> Result<BenchmarkResult> {
        match kind {
            BackendKind::SledString => run_benchmark(&SledStore::new(), &workloads.text, root).await,
            BackendKind::SledBuffer => run_benchmark(&SledStore::new(), &workloads.binary, root).await,
            BackendKind::LmdbCache => {
                let cache = LmdbCache::new(self.config.storage.lmdb_map_size);
                run_benchmark(&cache, &workloads.text, root).await
            }
            BackendKind::SqliteAsync => {
                run_benchmark(&SqliteStorage::new(), &workloads.text, root).await
            }
            BackendKind::Memory => run_benchmark(&MemoryBackend::new(), &workloads.text, root).await,
        }
    }
}
