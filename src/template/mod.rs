//! Path-template expansion.
//!
//! Message text may embed file references of the form `<%% path %%>`.
//! [`expand_path_templates`] replaces every such token with the contents
//! of the referenced file, decoded as UTF-8 with invalid bytes replaced.
//! Unreadable files leave the token in place and
//! raise a warning through the supplied [`Notifier`].
//!
//! Files are read one at a time, in the order the tokens appear, so the
//! warning sequence matches the text.

mod path;

use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::notify::Notifier;

pub use path::resolve_template_path;

/// `<%%`, optional whitespace, a path expression, optional whitespace, `%%>`.
///
/// The path expression takes an optional drive (`C:`) or home (`~`) prefix
/// and segments separated by `/` or `\`. Segments may not contain
/// `\0 < > : " | ? * / \`.
static TEMPLATE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"<%%\s*((?:[A-Za-z]:|~)?[\\/]?(?:[^\x00<>:"|?*/\\]+[\\/])*[^\x00<>:"|?*/\\]+)\s*%%>"#,
    )
    .ok()
});

/// A single template token found in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch {
    /// Byte range of the whole token, markers included.
    pub range: Range<usize>,
    /// The token exactly as written.
    pub raw: String,
    /// The path expression with surrounding whitespace removed.
    pub path: String,
}

/// Collect every template token in `text`, in order of appearance.
#[must_use]
pub fn find_path_templates(text: &str) -> Vec<TemplateMatch> {
    let Some(re) = TEMPLATE_RE.as_ref() else {
        return Vec::new();
    };

    re.captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let path = caps.get(1)?.as_str().trim();
            if path.is_empty() {
                return None;
            }
            Some(TemplateMatch {
                range: whole.range(),
                raw: whole.as_str().to_owned(),
                path: path.to_owned(),
            })
        })
        .collect()
}

/// Replace every `<%% path %%>` token in `text` with the referenced file's
/// contents.
///
/// Relative paths resolve against `base_dir`. A token whose file cannot be
/// read stays in the output verbatim and produces exactly one warning
/// naming the path and the underlying error.
pub async fn expand_path_templates(
    text: &str,
    base_dir: &Path,
    notifier: &dyn Notifier,
) -> String {
    let matches = find_path_templates(text);
    if matches.is_empty() {
        return text.to_owned();
    }

    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;

    for template in &matches {
        output.push_str(&text[cursor..template.range.start]);
        cursor = template.range.end;

        match read_template(&template.path, base_dir).await {
            Ok(contents) => {
                debug!(path = %template.path, bytes = contents.len(), "expanded path template");
                output.push_str(&contents);
            }
            Err(message) => {
                notifier.warn(&message);
                output.push_str(&template.raw);
            }
        }
    }

    output.push_str(&text[cursor..]);
    output
}

async fn read_template(raw_path: &str, base_dir: &Path) -> std::result::Result<String, String> {
    let resolved = resolve_template_path(raw_path, base_dir)
        .map_err(|err| format!("Failed to read file \"{raw_path}\": {err}"))?;

    let bytes = tokio::fs::read(&resolved)
        .await
        .map_err(|err| format!("Failed to read file \"{}\": {err}", resolved.display()))?;

    // Invalid sequences decode to U+FFFD.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
