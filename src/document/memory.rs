//! In-process notebook document.
//!
//! [`InMemoryDocument`] keeps cells, their outputs, and every execution
//! record behind a single mutex. Each edit or command takes the lock once,
//! so individual operations are atomic with respect to each other. It backs
//! the CLI and serves as the host double in tests, including injected
//! command and edit rejections.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{DocumentService, ExecutionHandle, HostFuture};
use crate::models::cell::{CellData, CellKind, OutputItem};
use crate::models::execution::ExecutionRecord;
use crate::{AppError, Result};

#[derive(Debug)]
struct StoredCell {
    id: u64,
    data: CellData,
    outputs: Vec<OutputItem>,
}

#[derive(Debug, Default)]
struct DocumentState {
    cells: Vec<StoredCell>,
    executions: Vec<ExecutionRecord>,
    next_id: u64,
    reject_commands: bool,
    reject_edits: bool,
    rejected_language_changes: usize,
}

impl DocumentState {
    fn push(&mut self, data: CellData) {
        let id = self.allocate_id();
        self.cells.push(StoredCell {
            id,
            data,
            outputs: Vec::new(),
        });
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn cell_mut(&mut self, index: usize) -> Result<&mut StoredCell> {
        self.cells
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("cell {index} does not exist")))
    }

    fn cell_by_id_mut(&mut self, id: u64) -> Result<&mut StoredCell> {
        self.cells
            .iter_mut()
            .find(|cell| cell.id == id)
            .ok_or_else(|| AppError::NotFound("execution cell was removed".into()))
    }

    fn index_of(&self, id: u64) -> Option<usize> {
        self.cells.iter().position(|cell| cell.id == id)
    }

    fn ensure_edits_allowed(&self) -> Result<()> {
        if self.reject_edits {
            Err(AppError::Document("host rejected the edit".into()))
        } else {
            Ok(())
        }
    }

    fn ensure_commands_allowed(&self, command: &str) -> Result<()> {
        if self.reject_commands {
            Err(AppError::Command(format!("host rejected {command}")))
        } else {
            Ok(())
        }
    }
}

/// Mutex-guarded notebook held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocument {
    state: Arc<Mutex<DocumentState>>,
    base_dir: Option<PathBuf>,
}

impl InMemoryDocument {
    /// Construct an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a document holding `cells`, in order.
    #[must_use]
    pub fn with_cells(cells: Vec<CellData>) -> Self {
        let mut state = DocumentState::default();
        for cell in cells {
            state.push(cell);
        }
        Self {
            state: Arc::new(Mutex::new(state)),
            base_dir: None,
        }
    }

    /// Set the directory relative path templates resolve against.
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Append a cell at the end of the document.
    pub fn push_cell(&self, cell: CellData) {
        if let Ok(mut state) = self.state.lock() {
            state.push(cell);
        }
    }

    /// Output entries currently attached to the cell at `index`.
    #[must_use]
    pub fn outputs(&self, index: usize) -> Vec<OutputItem> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.cells.get(index).map(|cell| cell.outputs.clone()))
            .unwrap_or_default()
    }

    /// Every execution record created so far, oldest first.
    #[must_use]
    pub fn executions(&self) -> Vec<ExecutionRecord> {
        self.state
            .lock()
            .map(|state| state.executions.clone())
            .unwrap_or_default()
    }

    /// Make every subsequent cell command fail.
    pub fn set_reject_commands(&self, reject: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.reject_commands = reject;
        }
    }

    /// Make the next `count` language changes fail; other commands still
    /// succeed.
    pub fn reject_next_language_changes(&self, count: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.rejected_language_changes = count;
        }
    }

    /// Make every subsequent text edit fail.
    pub fn set_reject_edits(&self, reject: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.reject_edits = reject;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, DocumentState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Document("document mutex poisoned".into()))
    }

    fn edit_text(&self, index: usize, edit: impl FnOnce(&mut String)) -> Result<()> {
        let mut state = self.lock()?;
        state.ensure_edits_allowed()?;
        let cell = state.cell_mut(index)?;
        edit(&mut cell.data.text);
        Ok(())
    }

    fn insert_below(&self, index: usize) -> Result<()> {
        let mut state = self.lock()?;
        state.ensure_commands_allowed("insert cell below")?;
        let language = state
            .cells
            .get(index)
            .map(|cell| cell.data.language.clone())
            .ok_or_else(|| AppError::NotFound(format!("cell {index} does not exist")))?;
        let id = state.allocate_id();
        state.cells.insert(
            index + 1,
            StoredCell {
                id,
                data: CellData {
                    kind: CellKind::Code,
                    language,
                    text: String::new(),
                },
                outputs: Vec::new(),
            },
        );
        debug!(index = index + 1, "inserted code cell");
        Ok(())
    }

    fn change_language(&self, index: usize, language: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.ensure_commands_allowed("change cell language")?;
        if state.rejected_language_changes > 0 {
            state.rejected_language_changes -= 1;
            return Err(AppError::Command("host rejected change cell language".into()));
        }
        state.cell_mut(index)?.data.language = language.to_owned();
        Ok(())
    }
}

impl DocumentService for InMemoryDocument {
    fn cell_count(&self) -> usize {
        self.state.lock().map(|state| state.cells.len()).unwrap_or(0)
    }

    fn cell(&self, index: usize) -> Option<CellData> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.cells.get(index).map(|cell| cell.data.clone()))
    }

    fn cells(&self) -> Vec<CellData> {
        self.state
            .lock()
            .map(|state| state.cells.iter().map(|cell| cell.data.clone()).collect())
            .unwrap_or_default()
    }

    fn base_dir(&self) -> Option<PathBuf> {
        self.base_dir.clone()
    }

    fn replace_cell_text(&self, index: usize, text: &str) -> HostFuture<'_, ()> {
        let text = text.to_owned();
        Box::pin(async move { self.edit_text(index, |current| *current = text) })
    }

    fn append_cell_text(&self, index: usize, text: &str) -> HostFuture<'_, ()> {
        let text = text.to_owned();
        Box::pin(async move { self.edit_text(index, |current| current.push_str(&text)) })
    }

    fn insert_code_cell_below(&self, index: usize) -> HostFuture<'_, ()> {
        Box::pin(async move { self.insert_below(index) })
    }

    fn set_cell_language(&self, index: usize, language: &str) -> HostFuture<'_, ()> {
        let language = language.to_owned();
        Box::pin(async move { self.change_language(index, &language) })
    }

    fn create_execution(&self, index: usize) -> Result<Arc<dyn ExecutionHandle>> {
        let mut state = self.lock()?;
        let cell_id = state
            .cells
            .get(index)
            .map(|cell| cell.id)
            .ok_or_else(|| AppError::NotFound(format!("cell {index} does not exist")))?;
        state.executions.push(ExecutionRecord::new(index));
        let record = state.executions.len() - 1;

        Ok(Arc::new(InMemoryExecution {
            state: Arc::clone(&self.state),
            cell_id,
            record,
        }))
    }
}

/// Execution handle backed by an [`InMemoryDocument`].
struct InMemoryExecution {
    state: Arc<Mutex<DocumentState>>,
    cell_id: u64,
    record: usize,
}

impl InMemoryExecution {
    fn update_record(&self, update: impl FnOnce(&mut ExecutionRecord, Option<usize>)) {
        if let Ok(mut state) = self.state.lock() {
            let index = state.index_of(self.cell_id);
            if let Some(record) = state.executions.get_mut(self.record) {
                update(record, index);
            }
        }
    }

    fn edit_outputs(&self, edit: impl FnOnce(&mut Vec<OutputItem>)) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AppError::Document("document mutex poisoned".into()))?;
        state.ensure_edits_allowed()?;
        edit(&mut state.cell_by_id_mut(self.cell_id)?.outputs);
        Ok(())
    }
}

impl ExecutionHandle for InMemoryExecution {
    fn set_execution_order(&self, order: u32) {
        self.update_record(|record, _| record.execution_order = Some(order));
    }

    fn start(&self, at: DateTime<Utc>) {
        self.update_record(|record, _| record.started_at = Some(at));
    }

    fn end(&self, success: bool, at: DateTime<Utc>) {
        self.update_record(|record, index| {
            record.ended_at = Some(at);
            record.success = success;
            if let Some(index) = index {
                record.cell_index = index;
            }
        });
    }

    fn clear_outputs(&self) -> HostFuture<'_, ()> {
        Box::pin(async move { self.edit_outputs(Vec::clear) })
    }

    fn append_output(&self, item: OutputItem) -> HostFuture<'_, ()> {
        Box::pin(async move { self.edit_outputs(|outputs| outputs.push(item)) })
    }

    fn append_trace(&self, text: &str) -> HostFuture<'_, ()> {
        let item = OutputItem::trace(text);
        Box::pin(async move { self.edit_outputs(|outputs| outputs.push(item)) })
    }
}
