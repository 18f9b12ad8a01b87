#![forbid(unsafe_code)]

//! Execution controller for chat-style notebooks.
//!
//! A notebook alternates user, assistant, and code cells. Running a cell
//! places (or reuses) an assistant response cell below it, turns the cells
//! above into a role-tagged conversation, expands `<%% path %%>` file
//! references, and streams a pluggable runner's output into the response
//! cell.

pub mod config;
pub mod conversation;
pub mod document;
pub mod errors;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod runner;
pub mod template;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
