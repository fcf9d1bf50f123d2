//! Hook dispatch
//!
//! Runs every hook in a plan concurrently, each bounded by its own timeout and
//! isolated from the others. Results are returned in plan order regardless of
//! completion order.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::input::HookInput;
use super::invoker::{HookInvoker, InvocationOutcome};
use super::registration::HookRegistration;
use super::result::{ExecutionResult, HookError};
use crate::event::Event;

/// Prefix of a stderr line that marks the run as failed
const STDERR_ERROR_MARKER: &str = "ERROR:";

/// Executes planned hooks with failure isolation
#[derive(Clone)]
pub struct Dispatcher {
    invoker: Arc<dyn HookInvoker>,
}

impl Dispatcher {
    pub fn new(invoker: Arc<dyn HookInvoker>) -> Self {
        Self { invoker }
    }

    /// Run `hooks` for `event` and collect one result per hook, in plan order
    ///
    /// Never fails: unavailable, failing, and timed-out hooks are reported in
    /// their own results. Hooks still pending when `cancel` fires are
    /// reported as skipped.
    pub async fn dispatch(
        &self,
        event: &Event,
        hooks: &[HookRegistration],
        session_id: &str,
        cancel: &CancellationToken,
    ) -> Vec<ExecutionResult> {
        if hooks.is_empty() {
            debug!("No hooks registered for event: {}", event.kind);
            return Vec::new();
        }

        info!(
            "Dispatching {} hook(s) for event: {}",
            hooks.len(),
            event.kind.description()
        );

        let input = HookInput::from_event(event, session_id);
        let runs = hooks.iter().map(|hook| self.run_hook(hook, &input, cancel));
        let results = join_all(runs).await;

        for result in &results {
            match &result.error {
                None => debug!("Hook succeeded: {}", result),
                Some(HookError::Skipped { .. }) => debug!("Hook skipped: {}", result),
                Some(_) => warn!("Hook did not succeed: {}", result),
            }
        }

        results
    }

    /// Run a single hook
    async fn run_hook(
        &self,
        hook: &HookRegistration,
        input: &HookInput,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        if !hook.enabled {
            return ExecutionResult::skipped(&hook.id, hook.event_kind, "hook disabled");
        }
        if cancel.is_cancelled() {
            return ExecutionResult::skipped(&hook.id, hook.event_kind, "dispatch cancelled");
        }

        debug!("Executing hook: {}", hook);
        let started_at = Utc::now();
        let start = Instant::now();

        tokio::select! {
            _ = cancel.cancelled() => {
                ExecutionResult::skipped(&hook.id, hook.event_kind, "dispatch cancelled")
            }
            outcome = timeout(hook.timeout(), self.invoker.invoke(hook, input)) => {
                let elapsed = start.elapsed();
                match outcome {
                    Ok(outcome) => Self::interpret(hook, outcome, started_at, elapsed),
                    Err(_) => {
                        warn!("Hook '{}' timed out after {:?}", hook.id, hook.timeout());
                        ExecutionResult::failure(
                            &hook.id,
                            hook.event_kind,
                            HookError::TimedOut { timeout_ms: hook.timeout_ms },
                            String::new(),
                            started_at,
                            elapsed,
                        )
                    }
                }
            }
        }
    }

    /// Turn a raw invocation outcome into a result
    fn interpret(
        hook: &HookRegistration,
        outcome: InvocationOutcome,
        started_at: chrono::DateTime<Utc>,
        elapsed: std::time::Duration,
    ) -> ExecutionResult {
        let failure = |error: HookError, output: String| {
            ExecutionResult::failure(&hook.id, hook.event_kind, error, output, started_at, elapsed)
        };

        match outcome {
            InvocationOutcome::Unavailable { reason } => {
                failure(HookError::HookUnavailable { reason }, String::new())
            }
            InvocationOutcome::Error { reason } => failure(
                HookError::HookFailed {
                    reason,
                    exit_code: None,
                },
                String::new(),
            ),
            InvocationOutcome::Exited {
                exit_code,
                stdout,
                stderr,
            } => {
                let output = stdout.trim_end().to_string();
                if exit_code != Some(0) {
                    let reason = match (stderr.trim(), exit_code) {
                        (msg, _) if !msg.is_empty() => msg.to_string(),
                        (_, Some(code)) => format!("exited with code {}", code),
                        (_, None) => "terminated by signal".to_string(),
                    };
                    return failure(HookError::HookFailed { reason, exit_code }, output);
                }
                if let Some(reason) = Self::error_marker(&stdout, &stderr) {
                    return failure(HookError::HookFailed { reason, exit_code }, output);
                }
                ExecutionResult::success(&hook.id, hook.event_kind, output, started_at, elapsed)
            }
        }
    }

    /// Detect an error reported by a hook that still exited cleanly
    ///
    /// Either a JSON object on stdout with an `error` field that is not
    /// `null`, `false` or an empty string, or a stderr line starting with
    /// `ERROR:`.
    fn error_marker(stdout: &str, stderr: &str) -> Option<String> {
        let trimmed = stdout.trim();
        if trimmed.starts_with('{') {
            if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(trimmed) {
                match map.get("error") {
                    None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => {}
                    Some(serde_json::Value::String(msg)) if msg.trim().is_empty() => {}
                    Some(serde_json::Value::String(msg)) => return Some(msg.clone()),
                    Some(other) => return Some(other.to_string()),
                }
            }
        }

        stderr
            .lines()
            .map(str::trim_start)
            .find_map(|line| line.strip_prefix(STDERR_ERROR_MARKER))
            .map(|msg| msg.trim().to_string())
    }
}
