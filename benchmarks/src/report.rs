//! Results reporting
//!
//! [`ResultsView`] renders one backend's result as three text lines.
//! [`ResultBoard`] accumulates results and failures for a whole suite and
//! renders them as text, JSON or CSV.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backends::BackendKind;
use crate::error::{BenchError, ConfigError, Result};
use crate::runner::{BenchmarkResult, Phase, PhaseResult};
use crate::utils::format::{Millis, Rate};

/// `"<verb> <n> items in <ms>ms; (<rate> items/ms)"`
pub fn format_phase(phase: Phase, result: &PhaseResult) -> String {
    format!(
        "{} {} items in {}ms; ({} items/ms)",
        phase.verb(),
        result.item_count,
        Millis(result.duration_ms),
        Rate(result.items_per_ms())
    )
}

/// Title plus both phase lines of one benchmark
pub struct ResultsView<'a> {
    pub title: &'a str,
    pub result: &'a BenchmarkResult,
}

impl<'a> ResultsView<'a> {
    pub fn new(title: &'a str, result: &'a BenchmarkResult) -> Self {
        Self { title, result }
    }
}

impl fmt::Display for ResultsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {}", self.title)?;
        for phase in [Phase::Write, Phase::Read] {
            writeln!(
                f,
                "Benchmark {}: {}",
                phase.label(),
                format_phase(phase, self.result.phase(phase))
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            _ => Err(ConfigError::InvalidValue {
                field: "output.format".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// A successful benchmark, ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRecord {
    pub backend: BackendKind,
    pub result: BenchmarkResult,
    pub completed_at: DateTime<Utc>,
}

impl BenchmarkRecord {
    pub fn title(&self) -> &'static str {
        self.backend.title()
    }

    pub fn view(&self) -> ResultsView<'_> {
        ResultsView::new(self.title(), &self.result)
    }
}

/// A backend whose run ended in an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkFailure {
    pub backend: BackendKind,
    pub category: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct PhaseRecord {
    item_count: usize,
    duration_ms: f64,
    items_per_ms: Option<f64>,
}

impl From<&PhaseResult> for PhaseRecord {
    fn from(result: &PhaseResult) -> Self {
        Self {
            item_count: result.item_count,
            duration_ms: result.duration_ms,
            items_per_ms: result.items_per_ms(),
        }
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    title: &'a str,
    backend: BackendKind,
    completed_at: DateTime<Utc>,
    write_phase: PhaseRecord,
    read_phase: PhaseRecord,
}

/// Results of one suite run, in completion order
#[derive(Debug, Default)]
pub struct ResultBoard {
    records: Vec<BenchmarkRecord>,
    failures: Vec<BenchmarkFailure>,
}

impl ResultBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, backend: BackendKind, result: BenchmarkResult) {
        self.records.push(BenchmarkRecord {
            backend,
            result,
            completed_at: Utc::now(),
        });
    }

    pub fn record_failure(&mut self, backend: BackendKind, error: &BenchError) {
        self.failures.push(BenchmarkFailure {
            backend,
            category: error.category(),
            message: error.to_string(),
        });
    }

    pub fn records(&self) -> &[BenchmarkRecord] {
        &self.records
    }

    pub fn failures(&self) -> &[BenchmarkFailure] {
        &self.failures
    }

    pub fn get(&self, backend: BackendKind) -> Option<&BenchmarkRecord> {
        self.records.iter().find(|r| r.backend == backend)
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Json => self.to_json(),
            ReportFormat::Csv => Ok(self.to_csv()),
        }
    }

    /// One view per successful backend; failed backends are not rendered
    pub fn to_text(&self) -> String {
        self.records
            .iter()
            .map(|record| record.view().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json(&self) -> Result<String> {
        let records: Vec<JsonRecord<'_>> = self
            .records
            .iter()
            .map(|record| JsonRecord {
                title: record.title(),
                backend: record.backend,
                completed_at: record.completed_at,
                write_phase: record.result.write_phase().into(),
                read_phase: record.result.read_phase().into(),
            })
            .collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        csv.push_str("backend,title,phase,item_count,duration_ms,items_per_ms\n");

        for record in &self.records {
            for phase in [Phase::Write, Phase::Read] {
                let result = record.result.phase(phase);
                let rate = result
                    .items_per_ms()
                    .map(|r| format!("{:.1}", r))
                    .unwrap_or_default();
                csv.push_str(&format!(
                    "{},{},{},{},{},{}\n",
                    record.backend,
                    record.title(),
                    phase,
                    result.item_count,
                    Millis(result.duration_ms),
                    rate,
                ));
            }
        }

        csv
    }
}
