//! Pluggable execution strategies.
//!
//! A [`CellRunner`] receives the expanded conversation and an
//! [`OutputSink`] bound to the response cell. It decides what to produce
//! (echo, subprocess, remote model) while the orchestrator owns cell
//! topology, timing, and error reporting.

pub mod command;
pub mod echo;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{RunnerConfig, RunnerKind};
use crate::document::{DocumentService, ExecutionHandle};
use crate::models::message::Message;
use crate::{AppError, Result};

pub use command::CommandRunner;
pub use echo::EchoRunner;

/// Boxed future returned by [`CellRunner::run`].
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Output capabilities bound to one response cell for one run.
#[derive(Clone)]
pub struct OutputSink {
    document: Arc<dyn DocumentService>,
    execution: Arc<dyn ExecutionHandle>,
    cell_index: usize,
    cancel: CancellationToken,
}

impl OutputSink {
    /// Bind a sink to the cell at `cell_index`.
    #[must_use]
    pub fn new(
        document: Arc<dyn DocumentService>,
        execution: Arc<dyn ExecutionHandle>,
        cell_index: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            document,
            execution,
            cell_index,
            cancel,
        }
    }

    /// Replace the whole response cell text with an empty string.
    ///
    /// # Errors
    ///
    /// Propagates the host's edit rejection.
    pub async fn clear_output(&self) -> Result<()> {
        self.document.replace_cell_text(self.cell_index, "").await
    }

    /// Append `text` to the end of the response cell.
    ///
    /// Silently does nothing once the run has been cancelled.
    ///
    /// # Errors
    ///
    /// Propagates the host's edit rejection.
    pub async fn append_output(&self, text: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Ok(());
        }
        self.document.append_cell_text(self.cell_index, text).await
    }

    /// Write diagnostic text to the execution's trace channel.
    ///
    /// # Errors
    ///
    /// Propagates the host's rejection.
    pub async fn append_trace(&self, text: &str) -> Result<()> {
        self.execution.append_trace(text).await
    }

    /// Token the runner should watch for early exit.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Index of the response cell.
    #[must_use]
    pub fn cell_index(&self) -> usize {
        self.cell_index
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink")
            .field("cell_index", &self.cell_index)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Everything a runner gets for one run.
pub struct RunInvocation {
    /// Conversation history, oldest first, templates expanded.
    pub messages: Vec<Message>,
    /// The notebook the run belongs to.
    pub document: Arc<dyn DocumentService>,
    /// Output capabilities for the response cell.
    pub output: OutputSink,
}

/// Execution strategy invoked once per run.
///
/// Implementations may clear and append output any number of times, should
/// watch [`OutputSink::cancellation`] for early exit, and must eventually
/// return or fail.
pub trait CellRunner: Send + Sync {
    /// Produce the response for `invocation`.
    ///
    /// # Errors
    ///
    /// Any error is reported in the response cell and marks the run failed.
    fn run(&self, invocation: RunInvocation) -> RunFuture<'_>;
}

/// Runner built from an async closure. See [`runner_fn`].
#[derive(Clone)]
pub struct RunnerFn<F> {
    f: F,
}

/// Wrap an async closure as a [`CellRunner`].
pub fn runner_fn<F, Fut>(f: F) -> RunnerFn<F>
where
    F: Fn(RunInvocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    RunnerFn { f }
}

impl<F, Fut> CellRunner for RunnerFn<F>
where
    F: Fn(RunInvocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn run(&self, invocation: RunInvocation) -> RunFuture<'_> {
        Box::pin((self.f)(invocation))
    }
}

/// Build the runner selected by `config`.
///
/// # Errors
///
/// Returns `AppError::Config` if the command runner has no program.
pub fn build_runner(config: &RunnerConfig) -> Result<Arc<dyn CellRunner>> {
    match config.kind {
        RunnerKind::Echo => Ok(Arc::new(EchoRunner)),
        RunnerKind::Command => {
            let program = config
                .program
                .clone()
                .filter(|program| !program.is_empty())
                .ok_or_else(|| {
                    AppError::Config("runner.program is required for the command runner".into())
                })?;
            Ok(Arc::new(CommandRunner::new(program, config.args.clone())))
        }
    }
}
