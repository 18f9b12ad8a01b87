//! Execution record for one run of a cell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timing and result of a single cell execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ExecutionRecord {
    /// Unique record identifier.
    pub id: String,
    /// Index of the cell that received output.
    pub cell_index: usize,
    /// Monotonic run counter shown next to the cell.
    pub execution_order: Option<u32>,
    /// When the execution started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the execution ended.
    pub ended_at: Option<DateTime<Utc>>,
    /// Whether the run completed successfully; false until set.
    pub success: bool,
}

impl ExecutionRecord {
    /// Construct a fresh record for the given cell.
    #[must_use]
    pub fn new(cell_index: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            cell_index,
            execution_order: None,
            started_at: None,
            ended_at: None,
            success: false,
        }
    }

    /// Whether the execution has been finalized.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Wall-clock duration, once both timestamps are known.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}
