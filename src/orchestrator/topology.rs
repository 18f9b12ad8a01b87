//! Response-slot placement and turn progression.
//!
//! Every triggering cell owns exactly one response cell, located directly
//! below it and tagged with the assistant role. [`ensure_response_cell`]
//! creates or retags that slot before a run; [`append_next_user_cell`]
//! opens the next user turn after a successful run of the last cell.
//!
//! Insertion and the follow-up re-read are separate host calls. A host that
//! lets other editors change the document between them may hand back a
//! shifted cell; the retag check below turns that into a failed run rather
//! than output written to the wrong cell.
//!
//! The host offers no way to delete a cell, so an insert whose retag fails
//! leaves an untagged blank cell behind. [`PlacementError::stray_index`]
//! names it so callers can account for it.

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::CellRoles;
use crate::document::DocumentService;
use crate::AppError;

/// Location of the response cell for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSlot {
    /// Index of the response cell.
    pub index: usize,
    /// Whether the triggering cell was the last cell before insertion.
    pub was_last: bool,
    /// Whether a new cell had to be inserted.
    pub inserted: bool,
}

/// Failure of a topology step.
#[derive(Debug)]
pub struct PlacementError {
    /// The underlying host or lookup error.
    pub error: AppError,
    /// Index of a cell that was inserted but could not be tagged.
    pub stray_index: Option<usize>,
}

impl PlacementError {
    fn stray(error: AppError, index: usize) -> Self {
        warn!(index, %error, "inserted cell left untagged");
        Self {
            error,
            stray_index: Some(index),
        }
    }
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stray_index {
            Some(index) => write!(f, "{} (untagged cell left at {index})", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for PlacementError {}

impl From<AppError> for PlacementError {
    fn from(error: AppError) -> Self {
        Self {
            error,
            stray_index: None,
        }
    }
}

impl From<PlacementError> for AppError {
    fn from(err: PlacementError) -> Self {
        err.error
    }
}

/// Make sure an assistant-tagged cell sits directly below `active_index`.
///
/// Inserts a code cell below the active cell and retags it when the active
/// cell is last or its successor is not tagged with the assistant role.
/// Otherwise the successor is reused untouched.
///
/// # Errors
///
/// Returns `AppError::NotFound` if `active_index` is out of range,
/// `AppError::Command` if the host rejects the insert or retag, or if the
/// cell found after insertion is not assistant-tagged. Once the insert has
/// succeeded, the error carries the inserted cell's index.
pub async fn ensure_response_cell(
    document: &dyn DocumentService,
    active_index: usize,
    roles: &CellRoles,
) -> std::result::Result<ResponseSlot, PlacementError> {
    let count = document.cell_count();
    if active_index >= count {
        return Err(AppError::NotFound(format!(
            "cell {active_index} does not exist ({count} cells)"
        )).into());
    }

    let next_index = active_index + 1;
    let was_last = next_index == count;
    let reusable = !was_last
        && document
            .cell(next_index)
            .is_some_and(|cell| cell.language == roles.assistant);

    if reusable {
        debug!(index = next_index, "reusing existing response cell");
        return Ok(ResponseSlot {
            index: next_index,
            was_last,
            inserted: false,
        });
    }

    document.insert_code_cell_below(active_index).await?;
    document
        .set_cell_language(next_index, &roles.assistant)
        .await
        .map_err(|err| PlacementError::stray(err, next_index))?;

    // Handles taken before the insert are stale; look the cell up again.
    let response = document.cell(next_index).ok_or_else(|| {
        AppError::Command(format!("response cell {next_index} missing after insert"))
    })?;
    if response.language != roles.assistant {
        let err = AppError::Command(format!(
            "response cell {next_index} is tagged `{}` after retag",
            response.language
        ));
        return Err(PlacementError::stray(err, next_index));
    }

    info!(index = next_index, was_last, "inserted response cell");
    Ok(ResponseSlot {
        index: next_index,
        was_last,
        inserted: true,
    })
}

/// Open the next user turn below the response cell.
///
/// Only acts when the triggering cell was the last cell of the document;
/// returns the index of the new user cell in that case.
///
/// # Errors
///
/// Returns `AppError::Command` if the host rejects the insert or retag. A
/// rejected retag carries the inserted cell's index.
pub async fn append_next_user_cell(
    document: &dyn DocumentService,
    slot: ResponseSlot,
    roles: &CellRoles,
) -> std::result::Result<Option<usize>, PlacementError> {
    if !slot.was_last {
        return Ok(None);
    }

    let user_index = slot.index + 1;
    document.insert_code_cell_below(slot.index).await?;
    document
        .set_cell_language(user_index, &roles.user)
        .await
        .map_err(|err| PlacementError::stray(err, user_index))?;

    info!(index = user_index, "appended next user cell");
    Ok(Some(user_index))
}
