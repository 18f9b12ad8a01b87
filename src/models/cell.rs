//! Cell snapshots and execution output entries.

use serde::{Deserialize, Serialize};

/// Mime type for error output entries.
pub const ERROR_MIME: &str = "application/vnd.code.notebook.error";

/// Mime type for trace (stderr-like) output entries.
pub const TRACE_MIME: &str = "application/vnd.code.notebook.stderr";

/// Mime type for plain text output entries.
pub const TEXT_MIME: &str = "text/plain";

/// Cell kind as reported by the host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    /// Executable cell; its text takes part in the conversation.
    #[default]
    Code,
    /// Presentational cell; never sent to a runner.
    Markup,
}

impl CellKind {
    /// Whether cells of this kind contribute conversation messages.
    #[must_use]
    pub fn is_content_bearing(self) -> bool {
        matches!(self, Self::Code)
    }
}

/// Snapshot of a host cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellData {
    /// Executable or presentational.
    #[serde(default)]
    pub kind: CellKind,
    /// Language tag; doubles as the conversation role.
    pub language: String,
    /// Raw cell text.
    #[serde(default)]
    pub text: String,
}

impl CellData {
    /// Construct a code cell.
    #[must_use]
    pub fn code(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: CellKind::Code,
            language: language.into(),
            text: text.into(),
        }
    }

    /// Construct a markup cell.
    #[must_use]
    pub fn markup(text: impl Into<String>) -> Self {
        Self {
            kind: CellKind::Markup,
            language: "markdown".into(),
            text: text.into(),
        }
    }
}

/// Error payload serialized into an [`ERROR_MIME`] output entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    /// Error class name.
    pub name: String,
    /// Human-readable message.
    pub message: String,
}

/// One entry in a cell's execution output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputItem {
    /// Mime type of `data`.
    pub mime: String,
    /// Entry body.
    pub data: String,
}

impl OutputItem {
    /// Plain text entry.
    #[must_use]
    pub fn text(data: impl Into<String>) -> Self {
        Self {
            mime: TEXT_MIME.into(),
            data: data.into(),
        }
    }

    /// Trace entry written out of band from the cell body.
    #[must_use]
    pub fn trace(data: impl Into<String>) -> Self {
        Self {
            mime: TRACE_MIME.into(),
            data: data.into(),
        }
    }

    /// Error entry with a JSON `{name, message}` body.
    #[must_use]
    pub fn error(name: &str, message: &str) -> Self {
        Self {
            mime: ERROR_MIME.into(),
            data: serde_json::json!({ "name": name, "message": message }).to_string(),
        }
    }

    /// Whether this entry is an error entry.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.mime == ERROR_MIME
    }

    /// Decode the error payload, if this is a well-formed error entry.
    #[must_use]
    pub fn error_payload(&self) -> Option<ErrorPayload> {
        if !self.is_error() {
            return None;
        }
        serde_json::from_str(&self.data).ok()
    }
}
