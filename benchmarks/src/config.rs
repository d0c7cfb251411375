//! Configuration management for kvbench

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::backends::lmdb_cache::DEFAULT_MAP_SIZE;
use crate::backends::BackendKind;
use crate::error::ConfigError;
use crate::report::ReportFormat;
use crate::workload::{
    Encoding, Token, DEFAULT_ITEM_COUNT, DEFAULT_KEY_LENGTH, DEFAULT_VALUE_LENGTH,
};

/// LMDB map sizes must be a multiple of the OS page size
const PAGE_SIZE: usize = 4096;

/// Main benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub workload: WorkloadSettings,
    pub backends: BackendSettings,
    pub execution: ExecutionSettings,
    pub storage: StorageSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadSettings {
    pub item_count: usize,
    pub key_length: usize,
    pub value_length: usize,
    /// Fixed generator seed; random when absent
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub enabled: Vec<BackendKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Run backends concurrently instead of one after another
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root for storage instances; a temporary directory when absent
    pub data_dir: Option<PathBuf>,
    pub lmdb_map_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputSettings {
    pub format: ReportFormat,
    pub file: Option<PathBuf>,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            item_count: DEFAULT_ITEM_COUNT,
            key_length: DEFAULT_KEY_LENGTH,
            value_length: DEFAULT_VALUE_LENGTH,
            seed: None,
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            enabled: BackendKind::ALL.to_vec(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            lmdb_map_size: DEFAULT_MAP_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `KVBENCH_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(items) = lookup("KVBENCH_ITEMS") {
            self.workload.item_count = parse_env("KVBENCH_ITEMS", &items)?;
        }

        if let Some(seed) = lookup("KVBENCH_SEED") {
            self.workload.seed = Some(parse_env("KVBENCH_SEED", &seed)?);
        }

        if let Some(parallel) = lookup("KVBENCH_PARALLEL") {
            self.execution.parallel = parse_env("KVBENCH_PARALLEL", &parallel)?;
        }

        if let Some(dir) = lookup("KVBENCH_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workload.item_count == 0 {
            return Err(invalid("workload.item_count", self.workload.item_count));
        }

        if self.workload.key_length == 0 {
            return Err(invalid("workload.key_length", self.workload.key_length));
        }

        if self.backends.enabled.is_empty() {
            return Err(invalid("backends.enabled", "[]"));
        }

        let key_space = if self.uses_encoding(Encoding::Text) {
            String::key_space(self.workload.key_length)
        } else {
            Vec::<u8>::key_space(self.workload.key_length)
        };
        if self.workload.item_count as f64 > key_space {
            return Err(invalid(
                "workload.item_count",
                format!(
                    "{} (only {} distinct keys of length {})",
                    self.workload.item_count, key_space, self.workload.key_length
                ),
            ));
        }

        if self.storage.lmdb_map_size == 0 || self.storage.lmdb_map_size % PAGE_SIZE != 0 {
            return Err(invalid("storage.lmdb_map_size", self.storage.lmdb_map_size));
        }

        Ok(())
    }

    /// Enabled backends with duplicates removed, in configured order
    pub fn enabled_backends(&self) -> Vec<BackendKind> {
        let mut kinds = Vec::with_capacity(self.backends.enabled.len());
        for kind in &self.backends.enabled {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }

    pub fn uses_encoding(&self, encoding: Encoding) -> bool {
        self.backends.enabled.iter().any(|kind| kind.encoding() == encoding)
    }
}

fn parse_env<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var: var.to_string(),
        value: value.to_string(),
    })
}

fn invalid(field: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}
