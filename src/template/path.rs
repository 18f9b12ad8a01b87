//! Path resolution for template tokens.

use std::path::{Component, Path, PathBuf};

use crate::{AppError, Result};

/// Resolve a template path against `base_dir`.
///
/// - `~` and `~/rest` (or `~\rest`) resolve under the user's home directory.
/// - Absolute paths are returned unchanged.
/// - Anything else is joined onto `base_dir`.
///
/// `.` components are dropped; `..` components are kept so the host
/// filesystem decides what they mean.
///
/// # Errors
///
/// Returns `AppError::Template` if the path is empty or refers to the home
/// directory on a system where it cannot be determined.
pub fn resolve_template_path(raw: &str, base_dir: &Path) -> Result<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Template("empty template path".into()));
    }

    if let Some(rest) = trimmed.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with(['/', '\\']) {
            let home = dirs::home_dir()
                .ok_or_else(|| AppError::Template("home directory is unknown".into()))?;
            let rest = rest.trim_start_matches(['/', '\\']);
            return Ok(normalize(&home.join(split_separators(rest))));
        }
    }

    let candidate = split_separators(trimmed);
    if candidate.is_absolute() {
        Ok(normalize(&candidate))
    } else {
        Ok(normalize(&base_dir.join(candidate)))
    }
}

/// Build a path from a string that may use either `/` or `\` separators.
fn split_separators(raw: &str) -> PathBuf {
    if cfg!(windows) {
        return PathBuf::from(raw);
    }

    let mut path = PathBuf::new();
    if raw.starts_with(['/', '\\']) {
        path.push("/");
    }
    for segment in raw.split(['/', '\\']).filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}
