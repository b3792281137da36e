//! Write-only audit trail of executed operations.
//!
//! The engine hands every executed operation to an [`AuditSink`] and never
//! reads it back. [`JsonlAuditLog`] keeps one JSON object per line so a
//! history view can list recent entries.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::progress::OperationType;

/// Outcome stored with an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Failed,
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// One entry in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier for this entry.
    pub id: Uuid,
    /// Label of the operation kind ("Copy", "Create Folder", ...).
    pub operation_type: String,
    /// Human-readable description of what was done.
    pub description: String,
    /// When the operation finished.
    pub timestamp: DateTime<Utc>,
    /// Whether it succeeded.
    pub status: AuditStatus,
    /// Failure message, for failed operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    /// Record a successful operation.
    pub fn success(operation_type: OperationType, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation_type: operation_type.label().to_string(),
            description: description.into(),
            timestamp: Utc::now(),
            status: AuditStatus::Success,
            error: None,
        }
    }

    /// Record a failed operation.
    pub fn failure(
        operation_type: OperationType,
        description: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: AuditStatus::Failed,
            error: Some(error.into()),
            ..Self::success(operation_type, description)
        }
    }

    /// Timestamp formatted for display ("dd.mm.yyyy HH:MM", local time).
    pub fn display_time(&self) -> String {
        self.timestamp
            .with_timezone(&chrono::Local)
            .format("%d.%m.%Y %H:%M")
            .to_string()
    }
}

/// Persistence sink for the audit trail.
///
/// Implementations must not fail the operation: write errors are theirs to
/// log.
pub trait AuditSink: Send + Sync {
    /// Persist one record.
    fn record(&self, record: &AuditRecord);
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditLog;

impl AuditSink for NullAuditLog {
    fn record(&self, _record: &AuditRecord) {}
}

/// Appends records to a JSON-lines file.
#[derive(Debug, Clone)]
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    /// Open (or prepare to create) the log at `path`.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record.
    pub fn append(&self, record: &AuditRecord) -> std::io::Result<()> {
        let line = serde_json::to_string(record)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{line}")?;
        debug!("Logged {} operation: {}", record.operation_type, record.description);
        Ok(())
    }

    /// Read up to `limit` records, most recent first.
    ///
    /// Lines that do not parse are skipped.
    pub fn read_recent(&self, limit: usize) -> Vec<AuditRecord> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let reader = BufReader::new(file);
        let mut entries: Vec<AuditRecord> = reader
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        entries.reverse();
        entries.truncate(limit);
        entries
    }

    /// Remove every record.
    pub fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl AuditSink for JsonlAuditLog {
    fn record(&self, record: &AuditRecord) {
        if let Err(e) = self.append(record) {
            warn!("Failed to log operation: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read_recent() {
        let dir = TempDir::new().unwrap();
        let log = JsonlAuditLog::open(dir.path().join("nested").join("history.jsonl")).unwrap();

        log.record(&AuditRecord::success(OperationType::Copy, "Copy 2 items to /d"));
        log.record(&AuditRecord::failure(
            OperationType::Delete,
            "Delete 1 items",
            "Operation cancelled by user",
        ));

        let entries = log.read_recent(10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation_type, "Delete");
        assert_eq!(entries[0].status, AuditStatus::Failed);
        assert_eq!(entries[0].error.as_deref(), Some("Operation cancelled by user"));
        assert_eq!(entries[1].operation_type, "Copy");
        assert_eq!(entries[1].status, AuditStatus::Success);

        assert_eq!(log.read_recent(1).len(), 1);
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let record = AuditRecord::success(OperationType::CreateFolder, "Create folder: x");
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("\"status\":\"SUCCESS\""));
        assert!(json.contains("\"operation_type\":\"Create Folder\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_clear_and_missing_file() {
        let dir = TempDir::new().unwrap();
        let log = JsonlAuditLog::open(dir.path().join("history.jsonl")).unwrap();

        assert!(log.read_recent(5).is_empty());
        log.record(&AuditRecord::success(OperationType::Rename, "Rename a to b"));
        assert_eq!(log.read_recent(5).len(), 1);

        log.clear().unwrap();
        assert!(log.read_recent(5).is_empty());
        log.clear().unwrap();
    }

    #[test]
    fn test_read_skips_corrupt_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.jsonl");
        let log = JsonlAuditLog::open(&path).unwrap();

        log.record(&AuditRecord::success(OperationType::Move, "Move 1 items to /x"));
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json").unwrap();

        assert_eq!(log.read_recent(10).len(), 1);
    }
}
