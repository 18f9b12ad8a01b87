//! JSON notebook files.
//!
//! A notebook file stores only what the controller needs: each cell's kind,
//! language tag, and text. Outputs and execution records are not persisted.
//! Saves go through a temporary file in the target directory and an atomic
//! rename so a crash never leaves a half-written notebook.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::{DocumentService, InMemoryDocument};
use crate::models::cell::CellData;
use crate::{AppError, Result};

/// On-disk notebook layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotebookFile {
    /// Cells in document order.
    #[serde(default)]
    pub cells: Vec<CellData>,
}

/// Load a notebook file into an [`InMemoryDocument`].
///
/// The document's base directory is the directory containing `path`.
///
/// # Errors
///
/// Returns `AppError::Io` if the file cannot be read or is not a valid
/// notebook.
pub fn load_notebook(path: &Path) -> Result<InMemoryDocument> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| AppError::Io(format!("failed to read {}: {err}", path.display())))?;
    let notebook: NotebookFile = serde_json::from_str(&raw)?;

    let document = InMemoryDocument::with_cells(notebook.cells);
    let base_dir = path
        .canonicalize()
        .ok()
        .and_then(|absolute| absolute.parent().map(Path::to_path_buf));

    Ok(match base_dir {
        Some(dir) => document.with_base_dir(dir),
        None => document,
    })
}

/// Write the cells of `document` to `path` atomically.
///
/// # Errors
///
/// Returns `AppError::Io` if serialization, the temporary file write, or the
/// final rename fails.
pub fn save_notebook(document: &dyn DocumentService, path: &Path) -> Result<()> {
    let notebook = NotebookFile {
        cells: document.cells(),
    };
    let mut body = serde_json::to_string_pretty(&notebook)?;
    body.push('\n');

    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|err| AppError::Io(format!("failed to create temporary file: {err}")))?;
    tmp.write_all(body.as_bytes())
        .map_err(|err| AppError::Io(format!("failed to write temporary file: {err}")))?;
    tmp.persist(path).map_err(|err| {
        AppError::Io(format!("failed to persist notebook to {}: {err}", path.display()))
    })?;

    Ok(())
}
