//! External process invocation for hooks
//!
//! The dispatcher only sees the [`HookInvoker`] trait. [`ProcessInvoker`] is the
//! production implementation: it spawns the hook executable directly with its
//! argument array (no shell), writes the [`HookInput`] JSON to stdin and
//! collects exit status plus emitted text.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::input::HookInput;
use super::registration::HookRegistration;
use crate::config::SessionConfig;

/// How long output is still collected after a hook exits
const OUTPUT_GRACE: Duration = Duration::from_millis(200);

/// What happened when a hook was invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The process ran to completion
    Exited {
        /// `None` when the process was terminated by a signal
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The executable could not be located or started
    Unavailable { reason: String },
    /// The process started but could not be driven to completion
    Error { reason: String },
}

impl InvocationOutcome {
    /// Convenience constructor for a clean exit
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::Exited {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Capability to run one hook
///
/// Implementations must not enforce the hook timeout themselves; the
/// dispatcher bounds every call and drops the future when it expires.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HookInvoker: Send + Sync {
    async fn invoke(&self, hook: &HookRegistration, input: &HookInput) -> InvocationOutcome;
}

/// Invokes hooks as child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    base_env: HashMap<String, String>,
    working_dir: Option<PathBuf>,
}

impl ProcessInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an invoker exporting the session's environment to every hook
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            base_env: config.hook_env(),
            working_dir: Some(config.base_dir.clone()),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.base_env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl HookInvoker for ProcessInvoker {
    async fn invoke(&self, hook: &HookRegistration, input: &HookInput) -> InvocationOutcome {
        let input_json = match input.to_json() {
            Ok(json) => json,
            Err(e) => {
                return InvocationOutcome::Error {
                    reason: format!("Failed to serialize hook input: {}", e),
                };
            }
        };

        let invocation = &hook.invocation;
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(&self.base_env)
            .env("PAI_EVENT", input.event.as_str())
            .env("PAI_SESSION_ID", &input.session_id)
            .envs(&invocation.env);

        if let Some(dir) = invocation.working_dir.as_ref().or(self.working_dir.as_ref()) {
            cmd.current_dir(dir);
        }

        // Own process group, so a timeout can take down everything the hook started
        #[cfg(unix)]
        cmd.process_group(0);

        // Dropping the child (e.g. on timeout) must terminate the process
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return InvocationOutcome::Unavailable {
                    reason: format!("{}: {}", invocation.program.display(), e),
                };
            }
        };

        let mut group = ProcessGroupGuard::new(child.id());

        if let Some(mut stdin) = child.stdin.take() {
            // Hooks are free to ignore stdin and exit early
            if let Err(e) = stdin.write_all(input_json.as_bytes()).await {
                debug!("Hook '{}' did not accept input: {}", hook.id, e);
            }
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        // Completion follows the hook's exit, not EOF on its pipes: a
        // background child may inherit them and keep them open.
        let status = {
            let drain = async {
                tokio::join!(
                    read_pipe(stdout, &mut stdout_buf),
                    read_pipe(stderr, &mut stderr_buf)
                )
            };
            tokio::pin!(drain);
            let wait = child.wait();
            tokio::pin!(wait);

            let mut drained = false;
            let status = loop {
                tokio::select! {
                    status = &mut wait => break status,
                    _ = &mut drain, if !drained => drained = true,
                }
            };
            if status.is_ok() && !drained && timeout(OUTPUT_GRACE, &mut drain).await.is_err() {
                debug!(
                    "Hook '{}' exited but its output pipes are still open; keeping what was read",
                    hook.id
                );
            }
            status
        };

        match status {
            Ok(status) => {
                // Background children of a hook that exited on its own keep running
                group.release();
                InvocationOutcome::Exited {
                    exit_code: status.code(),
                    stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
                }
            }
            Err(e) => InvocationOutcome::Error {
                reason: format!("Failed to wait for hook: {}", e),
            },
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) {
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(buf).await {
            debug!("Failed to read hook output: {}", e);
        }
    }
}

/// Kills a hook's whole process group when dropped, unless released
///
/// The invocation future is dropped on timeout or cancellation, which must
/// take down anything the hook started as well.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn release(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => debug!("Failed to kill hook process group {}: {}", pgid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}
