//! Engine configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Files at or above this size are deleted without a backup (100 MiB).
pub const DEFAULT_BACKUP_SIZE_LIMIT: u64 = 100 * 1024 * 1024;

/// Aggregate cap on delete backups held by one operation (1 GiB).
pub const DEFAULT_BACKUP_BUDGET: u64 = 1024 * 1024 * 1024;

/// Configuration for the file-operation engine.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Number of worker threads executing operations.
    #[builder(default = "4")]
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Files at or above this size are not backed up before deletion.
    #[builder(default = "DEFAULT_BACKUP_SIZE_LIMIT")]
    #[serde(default = "default_backup_size_limit")]
    pub backup_size_limit: u64,

    /// Total bytes a single delete may hold in backups (None = unlimited).
    #[builder(default = "Some(DEFAULT_BACKUP_BUDGET)")]
    #[serde(default = "default_backup_budget")]
    pub backup_budget: Option<u64>,

    /// Suffix appended to duplicated names, e.g. "report - Copy.txt".
    #[builder(default = "default_copy_suffix()")]
    #[serde(default = "default_copy_suffix")]
    pub copy_suffix: String,

    /// Numbered candidates tried before falling back to a timestamp.
    #[builder(default = "10_000")]
    #[serde(default = "default_max_suffix_attempts")]
    pub max_suffix_attempts: u32,

    /// Completed operations kept for undo.
    #[builder(default = "100")]
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Where the audit log is written (None = platform data directory).
    #[builder(default)]
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
}

fn default_workers() -> usize {
    4
}

fn default_backup_size_limit() -> u64 {
    DEFAULT_BACKUP_SIZE_LIMIT
}

fn default_backup_budget() -> Option<u64> {
    Some(DEFAULT_BACKUP_BUDGET)
}

fn default_copy_suffix() -> String {
    " - Copy".to_string()
}

fn default_max_suffix_attempts() -> u32 {
    10_000
}

fn default_history_depth() -> usize {
    100
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.workers == Some(0) {
            return Err("Worker count must be at least 1".to_string());
        }
        if self.history_depth == Some(0) {
            return Err("History depth must be at least 1".to_string());
        }
        if let Some(ref suffix) = self.copy_suffix {
            if suffix.trim().is_empty() {
                return Err("Copy suffix cannot be empty".to_string());
            }
            if suffix.contains(['/', '\0']) {
                return Err("Copy suffix cannot contain path separators".to_string());
            }
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new engine config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Default location of the audit log.
    pub fn default_audit_log() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("duopane")
            .join("history.jsonl")
    }

    /// The audit log path, falling back to the platform default.
    pub fn audit_log_path(&self) -> PathBuf {
        self.audit_log
            .clone()
            .unwrap_or_else(Self::default_audit_log)
    }

    /// Check whether a file of `size` bytes may be backed up at all.
    pub fn within_backup_limit(&self, size: u64) -> bool {
        size < self.backup_size_limit
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            backup_size_limit: DEFAULT_BACKUP_SIZE_LIMIT,
            backup_budget: default_backup_budget(),
            copy_suffix: default_copy_suffix(),
            max_suffix_attempts: default_max_suffix_attempts(),
            history_depth: default_history_depth(),
            audit_log: None,
        }
    }
}
