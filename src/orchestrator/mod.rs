//! Cell execution orchestration.
//!
//! - [`topology`] places the response cell and opens the next user turn.
//! - [`execution`] wraps one runner invocation with lifecycle guarantees.
//! - [`controller`] is the notebook-level entry point.

pub mod controller;
pub mod execution;
pub mod topology;

pub use controller::NotebookController;
pub use execution::{ExecutionOutcome, ExecutionSession};
pub use topology::{ResponseSlot, PlacementError};
