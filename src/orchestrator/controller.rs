//! Notebook-level entry point for running cells.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::execution::{ExecutionOutcome, ExecutionSession};
use crate::config::GlobalConfig;
use crate::document::DocumentService;
use crate::notify::Notifier;
use crate::runner::CellRunner;

/// Runs cells of one notebook, one at a time.
///
/// Holds the shared collaborators, hands out execution order numbers, and
/// keeps the cancellation token of every in-flight run so
/// [`interrupt`](Self::interrupt) can stop them. A run's token is
/// unregistered when the run ends or its future is dropped.
pub struct NotebookController {
    document: Arc<dyn DocumentService>,
    runner: Arc<dyn CellRunner>,
    notifier: Arc<dyn Notifier>,
    config: GlobalConfig,
    execution_order: AtomicU32,
    in_flight: Arc<Mutex<HashMap<u32, CancellationToken>>>,
}

/// Removes one run's token from the in-flight table when dropped.
struct InFlightGuard {
    table: Arc<Mutex<HashMap<u32, CancellationToken>>>,
    order: u32,
}

impl InFlightGuard {
    fn register(
        table: &Arc<Mutex<HashMap<u32, CancellationToken>>>,
        order: u32,
        cancel: CancellationToken,
    ) -> Self {
        if let Ok(mut runs) = table.lock() {
            runs.insert(order, cancel);
        }
        Self {
            table: Arc::clone(table),
            order,
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut runs) = self.table.lock() {
            runs.remove(&self.order);
        }
    }
}

impl NotebookController {
    /// Construct a controller over `document`.
    #[must_use]
    pub fn new(
        document: Arc<dyn DocumentService>,
        runner: Arc<dyn CellRunner>,
        notifier: Arc<dyn Notifier>,
        config: GlobalConfig,
    ) -> Self {
        Self {
            document,
            runner,
            notifier,
            config,
            execution_order: AtomicU32::new(0),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The document this controller drives.
    #[must_use]
    pub fn document(&self) -> &Arc<dyn DocumentService> {
        &self.document
    }

    /// Run the cell at `index` with a fresh cancellation token.
    pub async fn execute_cell(&self, index: usize) -> ExecutionOutcome {
        self.execute_cell_with(index, CancellationToken::new()).await
    }

    /// Run the cell at `index`, observing `cancel`.
    ///
    /// The token stays registered for [`interrupt`](Self::interrupt) until
    /// the run ends or this future is dropped.
    pub async fn execute_cell_with(
        &self,
        index: usize,
        cancel: CancellationToken,
    ) -> ExecutionOutcome {
        let order = self.execution_order.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlightGuard::register(&self.in_flight, order, cancel.clone());

        let session = ExecutionSession::new(
            Arc::clone(&self.document),
            Arc::clone(&self.runner),
            Arc::clone(&self.notifier),
        )
        .with_roles(self.config.roles())
        .with_base_dir(self.config.resolve_base_dir(self.document.base_dir()))
        .with_execution_order(order)
        .with_cancellation(cancel);

        session.run(index).await
    }

    /// Run several cells in the given order.
    ///
    /// Indices refer to the document as it was before the first run; later
    /// indices are shifted past every cell earlier runs added, including
    /// cells left behind by a failed run. Stops once a run has been
    /// interrupted.
    pub async fn execute_cells(&self, indices: &[usize]) -> Vec<ExecutionOutcome> {
        let mut outcomes = Vec::with_capacity(indices.len());
        // (original index, cells inserted directly after it)
        let mut insertions: Vec<(usize, usize)> = Vec::new();

        for &original in indices {
            let shift: usize = insertions
                .iter()
                .filter(|(after, _)| *after < original)
                .map(|(_, count)| count)
                .sum();
            let index = original + shift;
            debug!(original, index, "running batched cell");

            let before = self.document.cell_count();
            let cancel = CancellationToken::new();
            let outcome = self.execute_cell_with(index, cancel.clone()).await;
            let added = self.document.cell_count().saturating_sub(before);
            if added > 0 {
                insertions.push((original, added));
            }
            outcomes.push(outcome);

            if cancel.is_cancelled() {
                info!(remaining = indices.len() - outcomes.len(), "batch interrupted");
                break;
            }
        }

        outcomes
    }

    /// Cancel every in-flight run. Returns whether any run was cancelled.
    pub fn interrupt(&self) -> bool {
        let Ok(runs) = self.in_flight.lock() else {
            return false;
        };
        for token in runs.values() {
            token.cancel();
        }
        if runs.is_empty() {
            false
        } else {
            info!(runs = runs.len(), "interrupt requested");
            true
        }
    }
}
