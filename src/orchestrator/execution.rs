//! One run of one cell.
//!
//! [`ExecutionSession::run`] secures the response slot, builds and expands
//! the conversation, invokes the runner, and opens the next user turn. Any
//! failure along the way is caught once, logged, and attached to the cell
//! as an error output. A [`FinalizeGuard`] ends the host execution with the
//! final success flag on every exit path, including a dropped future.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};

use super::topology::{self, ResponseSlot, PlacementError};
use crate::config::CellRoles;
use crate::conversation::{expand_conversation, extract_conversation};
use crate::document::{DocumentService, ExecutionHandle};
use crate::models::cell::OutputItem;
use crate::notify::Notifier;
use crate::runner::{CellRunner, OutputSink, RunInvocation};
use crate::{AppError, Result};

/// Result of one [`ExecutionSession::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Whether the runner and all post-run steps succeeded.
    pub success: bool,
    /// Index of the response cell, once it was secured.
    pub response_index: Option<usize>,
    /// Whether the response cell was newly inserted.
    pub response_inserted: bool,
    /// Index of the user cell appended after the run, if any.
    pub next_user_index: Option<usize>,
    /// Index of a cell that was inserted but could not be tagged.
    pub stray_index: Option<usize>,
    /// Display text of the error that failed the run.
    pub error: Option<String>,
}

impl ExecutionOutcome {
    /// Number of cells this run added to the document.
    #[must_use]
    pub fn cells_inserted(&self) -> usize {
        usize::from(self.response_inserted)
            + usize::from(self.next_user_index.is_some())
            + usize::from(self.stray_index.is_some())
    }
}

/// Ends the bound execution when dropped.
struct FinalizeGuard {
    execution: Option<Arc<dyn ExecutionHandle>>,
    success: bool,
}

impl FinalizeGuard {
    fn new() -> Self {
        Self {
            execution: None,
            success: false,
        }
    }

    fn bind(&mut self, execution: Arc<dyn ExecutionHandle>) {
        self.execution = Some(execution);
    }

    fn execution(&self) -> Option<Arc<dyn ExecutionHandle>> {
        self.execution.clone()
    }
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        if let Some(execution) = self.execution.take() {
            execution.end(self.success, Utc::now());
        }
    }
}

fn record_stray(outcome: &mut ExecutionOutcome, err: PlacementError) -> AppError {
    outcome.stray_index = err.stray_index;
    err.error
}

/// Lifecycle wrapper around one runner invocation.
pub struct ExecutionSession {
    document: Arc<dyn DocumentService>,
    runner: Arc<dyn CellRunner>,
    notifier: Arc<dyn Notifier>,
    roles: CellRoles,
    base_dir: PathBuf,
    execution_order: u32,
    cancel: CancellationToken,
}

impl ExecutionSession {
    /// Construct a session with default roles, the current directory as
    /// template base, execution order 1, and a fresh cancellation token.
    #[must_use]
    pub fn new(
        document: Arc<dyn DocumentService>,
        runner: Arc<dyn CellRunner>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            document,
            runner,
            notifier,
            roles: CellRoles::default(),
            base_dir: PathBuf::from("."),
            execution_order: 1,
            cancel: CancellationToken::new(),
        }
    }

    /// Use custom role tags.
    #[must_use]
    pub fn with_roles(mut self, roles: CellRoles) -> Self {
        self.roles = roles;
        self
    }

    /// Resolve relative path templates against `base_dir`.
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: PathBuf) -> Self {
        self.base_dir = base_dir;
        self
    }

    /// Set the run counter reported to the host.
    #[must_use]
    pub fn with_execution_order(mut self, order: u32) -> Self {
        self.execution_order = order;
        self
    }

    /// Use `cancel` as the run's cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the cell at `active_index` to completion.
    ///
    /// Never returns an error: failures are reported in the response cell and
    /// in the returned outcome.
    pub async fn run(self, active_index: usize) -> ExecutionOutcome {
        let span = info_span!(
            "execute_cell",
            cell_index = active_index,
            execution_order = self.execution_order
        );
        self.run_inner(active_index).instrument(span).await
    }

    async fn run_inner(&self, active_index: usize) -> ExecutionOutcome {
        let mut guard = FinalizeGuard::new();
        let mut outcome = ExecutionOutcome::default();

        let result = self.drive(active_index, &mut guard, &mut outcome).await;
        match result {
            Ok(()) => {
                guard.success = true;
                outcome.success = true;
                info!("cell execution succeeded");
            }
            Err(err) => {
                self.report_failure(&err, active_index, &mut guard).await;
                outcome.error = Some(err.to_string());
            }
        }

        outcome
    }

    async fn drive(
        &self,
        active_index: usize,
        guard: &mut FinalizeGuard,
        outcome: &mut ExecutionOutcome,
    ) -> Result<()> {
        let slot: ResponseSlot =
            topology::ensure_response_cell(self.document.as_ref(), active_index, &self.roles)
                .await
                .map_err(|err| record_stray(outcome, err))?;
        outcome.response_index = Some(slot.index);
        outcome.response_inserted = slot.inserted;

        let execution = self.document.create_execution(slot.index)?;
        guard.bind(Arc::clone(&execution));
        execution.set_execution_order(self.execution_order);
        execution.start(Utc::now());
        execution.clear_outputs().await?;

        let output = OutputSink::new(
            Arc::clone(&self.document),
            execution,
            slot.index,
            self.cancel.clone(),
        );
        output.clear_output().await?;

        let cells = self.document.cells();
        let messages = extract_conversation(&cells, active_index);
        let messages = expand_conversation(messages, &self.base_dir, self.notifier.as_ref()).await;
        info!(messages = messages.len(), "invoking runner");

        let invocation = RunInvocation {
            messages,
            document: Arc::clone(&self.document),
            output,
        };
        AssertUnwindSafe(self.runner.run(invocation))
            .catch_unwind()
            .await
            .map_err(|_| AppError::Runner("runner panicked".into()))??;

        outcome.next_user_index =
            topology::append_next_user_cell(self.document.as_ref(), slot, &self.roles)
                .await
                .map_err(|err| record_stray(outcome, err))?;
        Ok(())
    }

    async fn report_failure(&self, err: &AppError, active_index: usize, guard: &mut FinalizeGuard) {
        error!(%err, cell_index = active_index, "cell execution failed");

        // Topology can fail before a response cell exists; report on the
        // triggering cell instead.
        let execution = if let Some(execution) = guard.execution() {
            execution
        } else {
            match self.document.create_execution(active_index) {
                Ok(execution) => {
                    guard.bind(Arc::clone(&execution));
                    execution.set_execution_order(self.execution_order);
                    execution.start(Utc::now());
                    execution
                }
                Err(create_err) => {
                    error!(%create_err, "no cell available to report the failure on");
                    return;
                }
            }
        };

        let item = OutputItem::error(err.kind(), &err.to_string());
        if let Err(append_err) = execution.append_output(item).await {
            error!(%append_err, "failed to attach error output");
        }
    }
}
