//! Execution log
//!
//! When a log directory is configured, every hook result and activation
//! record is appended as one JSON line to `<log_dir>/kai-<session_id>.jsonl`.
//! The log is best effort: write failures are reported and otherwise ignored.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::context::ActivationRecord;
use crate::config::SessionConfig;
use crate::error::{KaiError, KaiResult};
use crate::hooks::ExecutionResult;

/// One line of the execution log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum LogEntry {
    Execution(ExecutionResult),
    Activation(ActivationRecord),
}

/// Append-only JSONL log for one session
#[derive(Debug, Clone)]
pub struct ExecutionLog {
    path: PathBuf,
}

impl ExecutionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The session's log, if a log directory is configured
    pub fn from_config(config: &SessionConfig) -> Option<Self> {
        config.log_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append entries, creating the file and its directory as needed
    pub async fn append(&self, entries: &[LogEntry]) -> KaiResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await.map_err(|e| {
                KaiError::io_with_path(
                    format!("Failed to create log directory: {}", e),
                    dir.display().to_string(),
                )
            })?;
        }

        let mut lines = String::new();
        for entry in entries {
            let json = serde_json::to_string(entry)
                .map_err(|e| KaiError::json(format!("Failed to serialize log entry: {}", e)))?;
            lines.push_str(&json);
            lines.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| KaiError::io(format!("Failed to open execution log: {}", e)))?;

        file.write_all(lines.as_bytes())
            .await
            .map_err(|e| KaiError::io(format!("Failed to write execution log: {}", e)))?;

        debug!("Appended {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }

    /// Append entries, reporting but swallowing failures
    pub async fn record(&self, entries: &[LogEntry]) {
        if let Err(e) = self.append(entries).await {
            warn!("Execution log {} not updated: {}", self.path.display(), e);
        }
    }

    /// Read back every entry
    pub async fn read(&self) -> KaiResult<Vec<LogEntry>> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            KaiError::io_with_path(
                format!("Failed to read execution log: {}", e),
                self.path.display().to_string(),
            )
        })?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(KaiError::from))
            .collect()
    }
}
