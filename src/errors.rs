//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// The host rejected a document edit (replace or insert).
    Document(String),
    /// The host rejected a cell command (insert cell, change language).
    Command(String),
    /// The runner strategy failed while producing output.
    Runner(String),
    /// Path template could not be resolved to a file path.
    Template(String),
    /// Requested cell or entity does not exist.
    NotFound(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Document(msg) => write!(f, "document: {msg}"),
            Self::Command(msg) => write!(f, "command: {msg}"),
            Self::Runner(msg) => write!(f, "runner: {msg}"),
            Self::Template(msg) => write!(f, "template: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Short machine-readable name used for error output entries.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
            Self::Document(_) => "DocumentError",
            Self::Command(_) => "CommandError",
            Self::Runner(_) => "RunnerError",
            Self::Template(_) => "TemplateError",
            Self::NotFound(_) => "NotFoundError",
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Io(format!("invalid json: {err}"))
    }
}
