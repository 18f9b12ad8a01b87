//! Host document abstraction.
//!
//! The [`DocumentService`] trait decouples the execution controller from
//! the editor that owns the notebook. The controller reads cells, applies
//! edits, and dispatches cell commands only through this trait, so the
//! same orchestration runs against a real editor bridge or the
//! [`InMemoryDocument`] used by the CLI and the tests.

pub mod memory;
pub mod notebook_file;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::cell::{CellData, OutputItem};
use crate::Result;

pub use memory::InMemoryDocument;

/// Boxed future returned by host operations.
pub type HostFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Editor-side notebook document.
///
/// Reads are synchronous snapshots. Edits and commands are asynchronous and
/// either succeed as a whole or return an error; the host is authoritative
/// and may reject any of them.
pub trait DocumentService: Send + Sync {
    /// Number of cells currently in the document.
    fn cell_count(&self) -> usize;

    /// Snapshot of the cell at `index`, if present.
    fn cell(&self, index: usize) -> Option<CellData>;

    /// Snapshot of every cell, in document order.
    fn cells(&self) -> Vec<CellData>;

    /// Directory relative path templates resolve against.
    fn base_dir(&self) -> Option<PathBuf>;

    /// Replace the full text of the cell at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Document`](crate::AppError::Document) if the host
    /// rejects the edit or the cell does not exist.
    fn replace_cell_text(&self, index: usize, text: &str) -> HostFuture<'_, ()>;

    /// Insert `text` at the end of the cell at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Document`](crate::AppError::Document) if the host
    /// rejects the edit or the cell does not exist.
    fn append_cell_text(&self, index: usize, text: &str) -> HostFuture<'_, ()>;

    /// Run the host's "insert code cell below" command for the cell at `index`.
    ///
    /// Existing cell handles at positions after `index` are invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Command`](crate::AppError::Command) if the host
    /// rejects the command.
    fn insert_code_cell_below(&self, index: usize) -> HostFuture<'_, ()>;

    /// Run the host's "change cell language" command for the cell at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Command`](crate::AppError::Command) if the host
    /// rejects the command.
    fn set_cell_language(&self, index: usize, language: &str) -> HostFuture<'_, ()>;

    /// Create an execution handle bound to the cell at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`](crate::AppError::NotFound) if the cell
    /// does not exist.
    fn create_execution(&self, index: usize) -> Result<Arc<dyn ExecutionHandle>>;
}

/// Host-side record of one cell execution.
///
/// Timing calls are synchronous so they can run from a drop guard.
pub trait ExecutionHandle: Send + Sync {
    /// Set the run counter shown next to the cell.
    fn set_execution_order(&self, order: u32);

    /// Mark the execution as started.
    fn start(&self, at: DateTime<Utc>);

    /// Mark the execution as finished with the given result.
    fn end(&self, success: bool, at: DateTime<Utc>);

    /// Remove every output entry attached to the cell.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Document`](crate::AppError::Document) if the host
    /// rejects the change.
    fn clear_outputs(&self) -> HostFuture<'_, ()>;

    /// Attach an output entry to the cell.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Document`](crate::AppError::Document) if the host
    /// rejects the change.
    fn append_output(&self, item: OutputItem) -> HostFuture<'_, ()>;

    /// Write diagnostic text to the execution's trace channel.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Document`](crate::AppError::Document) if the host
    /// rejects the change.
    fn append_trace(&self, text: &str) -> HostFuture<'_, ()>;
}
