//! Timed workload runner
//!
//! A benchmark run opens one backend instance, times a bulk write of the
//! workload and a full read-back, releases the instance and only then checks
//! the read-back against what was written. The handle is closed on every
//! path, including when a phase fails.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backends::{OpenOptions, StorageBackend, StorageHandle};
use crate::compare::compare_read_write;
use crate::error::{BackendResult, BenchError, Result};
use crate::utils::Timer;
use crate::workload::{KeyValuePair, Token, Workload};

/// Outcome of one timed phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub item_count: usize,
    pub duration_ms: f64,
}

impl PhaseResult {
    pub fn new(item_count: usize, duration_ms: f64) -> Self {
        Self {
            item_count,
            duration_ms,
        }
    }

    /// Throughput in items per millisecond.
    ///
    /// An empty phase has a rate of zero. A non-empty phase that took no
    /// measurable time has no finite rate and yields `None`.
    pub fn items_per_ms(&self) -> Option<f64> {
        if self.item_count == 0 {
            Some(0.0)
        } else if self.duration_ms > 0.0 {
            Some(self.item_count as f64 / self.duration_ms)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Write,
    Read,
}

impl Phase {
    /// Past tense used in report lines
    pub fn verb(&self) -> &'static str {
        match self {
            Phase::Write => "wrote",
            Phase::Read => "read",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Write => "write many",
            Phase::Read => "read many",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Write => write!(f, "write"),
            Phase::Read => write!(f, "read"),
        }
    }
}

/// Both phases of one benchmark run against one backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    write_phase: PhaseResult,
    read_phase: PhaseResult,
}

impl BenchmarkResult {
    pub fn builder() -> BenchmarkResultBuilder {
        BenchmarkResultBuilder::default()
    }

    pub fn write_phase(&self) -> &PhaseResult {
        &self.write_phase
    }

    pub fn read_phase(&self) -> &PhaseResult {
        &self.read_phase
    }

    pub fn phase(&self, phase: Phase) -> &PhaseResult {
        match phase {
            Phase::Write => &self.write_phase,
            Phase::Read => &self.read_phase,
        }
    }
}

/// Collects phase results as they complete; a [`BenchmarkResult`] only
/// exists once both are present.
#[derive(Debug, Default)]
pub struct BenchmarkResultBuilder {
    write_phase: Option<PhaseResult>,
    read_phase: Option<PhaseResult>,
}

impl BenchmarkResultBuilder {
    pub fn write_phase(mut self, result: PhaseResult) -> Self {
        self.write_phase = Some(result);
        self
    }

    pub fn read_phase(mut self, result: PhaseResult) -> Self {
        self.read_phase = Some(result);
        self
    }

    pub fn build(self) -> Result<BenchmarkResult> {
        Ok(BenchmarkResult {
            write_phase: self.write_phase.ok_or(BenchError::IncompleteResult("write"))?,
            read_phase: self.read_phase.ok_or(BenchError::IncompleteResult("read"))?,
        })
    }
}

/// Open options for a run: a fixed in-place instance when the backend names
/// one, otherwise a fresh uniquely named instance under `root`
pub fn open_options<T: Token, B: StorageBackend<T>>(backend: &B, root: &Path) -> OpenOptions {
    match backend.instance_name() {
        Some(name) => OpenOptions::in_place(root, name),
        None => OpenOptions::ephemeral(root),
    }
}

/// Run one timed write/read benchmark of `workload` against `backend`.
///
/// Backend failures from any phase are returned after the handle has been
/// closed. A read-back that disagrees with the workload is a
/// [`ValidationError`](crate::error::ValidationError); no result is produced
/// for it.
pub async fn run_benchmark<T, B>(backend: &B, workload: &Workload<T>, root: &Path) -> Result<BenchmarkResult>
where
    T: Token,
    B: StorageBackend<T>,
{
    let options = open_options::<T, B>(backend, root);
    let in_place = backend.instance_name().is_some();
    debug!(instance = %options.name, in_place, "opening backend");

    let mut handle = backend.open(&options).await?;
    let outcome = run_phases(&mut handle, workload, in_place).await;
    let closed = handle.close().await;

    let (builder, read_back) = outcome?;
    closed?;

    compare_read_write(workload.pairs(), &read_back)?;
    builder.build()
}

async fn run_phases<T, H>(
    handle: &mut H,
    workload: &Workload<T>,
    in_place: bool,
) -> BackendResult<(BenchmarkResultBuilder, Vec<KeyValuePair<T>>)>
where
    T: Token,
    H: StorageHandle<T>,
{
    if in_place {
        match handle.clear().await {
            Ok(()) => {}
            Err(e) if e.is_tolerated() => debug!("ignoring clear failure: {}", e),
            Err(e) => return Err(e),
        }
    }

    let timer = Timer::start();
    handle.write_all(workload.pairs()).await?;
    let write = PhaseResult::new(workload.len(), timer.elapsed_ms());
    info!(
        encoding = %T::ENCODING,
        items = write.item_count,
        duration_ms = write.duration_ms,
        "write phase complete"
    );

    let timer = Timer::start();
    let read_back = handle.read_all().await?;
    let read = PhaseResult::new(read_back.len(), timer.elapsed_ms());
    info!(
        encoding = %T::ENCODING,
        items = read.item_count,
        duration_ms = read.duration_ms,
        "read phase complete"
    );

    let builder = BenchmarkResult::builder().write_phase(write).read_phase(read);
    Ok((builder, read_back))
}
