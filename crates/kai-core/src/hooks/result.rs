//! Hook execution results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::event::EventKind;

/// Outcome status of one hook run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStatus {
    Success,
    Failed,
    TimedOut,
    Skipped,
}

impl fmt::Display for HookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookStatus::Success => write!(f, "success"),
            HookStatus::Failed => write!(f, "failed"),
            HookStatus::TimedOut => write!(f, "timed_out"),
            HookStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Per-hook failure, isolated to a single [`ExecutionResult`]
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HookError {
    /// The executable could not be located or spawned
    #[error("Hook unavailable: {reason}")]
    HookUnavailable { reason: String },

    /// The hook exceeded its timeout and was terminated
    #[error("Hook timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },

    /// The hook exited abnormally or reported an error marker
    #[error("Hook failed: {reason}")]
    HookFailed {
        reason: String,
        exit_code: Option<i32>,
    },

    /// The hook was not run
    #[error("Hook skipped: {reason}")]
    Skipped { reason: String },
}

impl HookError {
    /// The status a result carrying this error must have
    pub fn status(&self) -> HookStatus {
        match self {
            HookError::HookUnavailable { .. } | HookError::HookFailed { .. } => HookStatus::Failed,
            HookError::TimedOut { .. } => HookStatus::TimedOut,
            HookError::Skipped { .. } => HookStatus::Skipped,
        }
    }
}

/// Result of running one hook for one event
///
/// `error` is present iff `status` is not `Success`; the constructors are the
/// only way this crate builds results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub hook_id: String,
    pub event_kind: EventKind,
    pub status: HookStatus,
    #[serde(default)]
    pub output: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<HookError>,
    pub started_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Create a successful result
    pub fn success(
        hook_id: impl Into<String>,
        event_kind: EventKind,
        output: impl Into<String>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            hook_id: hook_id.into(),
            event_kind,
            status: HookStatus::Success,
            output: output.into(),
            duration_ms: duration.as_millis() as u64,
            error: None,
            started_at,
        }
    }

    /// Create a non-successful result; the status follows from the error
    pub fn failure(
        hook_id: impl Into<String>,
        event_kind: EventKind,
        error: HookError,
        output: impl Into<String>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            hook_id: hook_id.into(),
            event_kind,
            status: error.status(),
            output: output.into(),
            duration_ms: duration.as_millis() as u64,
            error: Some(error),
            started_at,
        }
    }

    /// Create a skipped result for a hook that never ran
    pub fn skipped(hook_id: impl Into<String>, event_kind: EventKind, reason: impl Into<String>) -> Self {
        Self::failure(
            hook_id,
            event_kind,
            HookError::Skipped {
                reason: reason.into(),
            },
            String::new(),
            Utc::now(),
            Duration::ZERO,
        )
    }

    pub fn is_success(&self) -> bool {
        self.status == HookStatus::Success
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} in {}ms",
            self.hook_id, self.event_kind, self.status, self.duration_ms
        )?;
        if let Some(err) = &self.error {
            write!(f, ": {}", err)?;
        }
        Ok(())
    }
}
