//! Subprocess runner.
//!
//! Spawns the configured program once per run with `kill_on_drop(true)`.
//! The conversation is written to the child's stdin as a JSON array of
//! `{content, role}` objects. Each stdout line is appended to the response
//! cell as it arrives; stderr lines go to the execution trace. Cancelling
//! the run kills the child.

use std::path::PathBuf;
use std::process::Stdio;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, info, warn};

use super::{CellRunner, RunFuture, RunInvocation};
use crate::{AppError, Result};

/// Maximum accepted length of a single output line.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Runs an external program per cell execution.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
}

impl CommandRunner {
    /// Construct a runner for `program` with fixed `args`.
    #[must_use]
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }

    async fn execute(&self, invocation: RunInvocation) -> Result<()> {
        let RunInvocation {
            messages,
            document,
            output,
        } = invocation;
        let cancel = output.cancellation().clone();

        let payload = serde_json::to_vec(&messages)?;
        let working_dir = document.base_dir().unwrap_or_else(|| PathBuf::from("."));

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| AppError::Runner(format!("failed to spawn {}: {err}", self.program)))?;

        info!(
            program = %self.program,
            pid = child.id().unwrap_or(0),
            messages = messages.len(),
            "runner process spawned"
        );

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Runner("runner stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Runner("runner stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::Runner("runner stderr unavailable".into()))?;

        // Feed stdin from its own task so a chatty child cannot deadlock us.
        let writer = tokio::spawn(async move {
            if let Err(err) = stdin.write_all(&payload).await {
                debug!(%err, "runner closed stdin early");
            }
        });

        let mut stdout = FramedRead::new(stdout, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
        let mut stderr = FramedRead::new(stderr, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
        let mut stdout_done = false;
        let mut stderr_done = false;

        output.clear_output().await?;

        while !(stdout_done && stderr_done) {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!(program = %self.program, "run cancelled, killing runner process");
                    if let Err(err) = child.kill().await {
                        warn!(%err, "failed to kill runner process");
                    }
                    writer.abort();
                    return Ok(());
                }
                line = stdout.next(), if !stdout_done => match line {
                    Some(Ok(line)) => output.append_output(&format!("{line}\n")).await?,
                    Some(Err(err)) => {
                        return Err(AppError::Runner(format!(
                            "failed to read runner output: {err}"
                        )));
                    }
                    None => stdout_done = true,
                },
                line = stderr.next(), if !stderr_done => match line {
                    Some(Ok(line)) => output.append_trace(&line).await?,
                    Some(Err(err)) => {
                        warn!(%err, "unreadable runner stderr, ignoring the rest");
                        stderr_done = true;
                    }
                    None => stderr_done = true,
                },
            }
        }

        let _ = writer.await;
        let status = child
            .wait()
            .await
            .map_err(|err| AppError::Runner(format!("failed to wait for runner: {err}")))?;

        if status.success() {
            debug!(program = %self.program, "runner process exited cleanly");
            Ok(())
        } else {
            Err(AppError::Runner(format!(
                "{} exited with {status}",
                self.program
            )))
        }
    }
}

impl CellRunner for CommandRunner {
    fn run(&self, invocation: RunInvocation) -> RunFuture<'_> {
        Box::pin(self.execute(invocation))
    }
}
