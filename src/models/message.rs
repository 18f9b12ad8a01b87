//! Role-tagged conversation message handed to runners.

use serde::{Deserialize, Serialize};

/// A single conversation turn.
///
/// `role` is the originating cell's language tag, verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Message text, path templates already expanded when handed to a runner.
    pub content: String,
    /// Role tag (`user`, `assistant`, `python`, ...).
    pub role: String,
}

impl Message {
    /// Construct a message from any string-like content and role.
    #[must_use]
    pub fn new(content: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: role.into(),
        }
    }
}
