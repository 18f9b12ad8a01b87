//! Conversation extraction from notebook cells.

use std::path::Path;

use crate::models::cell::CellData;
use crate::models::message::Message;
use crate::notify::Notifier;
use crate::template::expand_path_templates;

/// Build the conversation history ending at `active_index`.
///
/// Walks cells `0..=active_index` in order and keeps only content-bearing
/// cells. Each kept cell becomes one [`Message`] whose role is the cell's
/// language tag and whose content is the raw, unexpanded cell text. An
/// index past the end of `cells` takes the whole document.
#[must_use]
pub fn extract_conversation(cells: &[CellData], active_index: usize) -> Vec<Message> {
    let end = active_index.saturating_add(1).min(cells.len());

    cells[..end]
        .iter()
        .filter(|cell| cell.kind.is_content_bearing())
        .map(|cell| Message::new(cell.text.clone(), cell.language.clone()))
        .collect()
}

/// Expand path templates in every message, oldest first.
pub async fn expand_conversation(
    messages: Vec<Message>,
    base_dir: &Path,
    notifier: &dyn Notifier,
) -> Vec<Message> {
    let mut expanded = Vec::with_capacity(messages.len());
    for message in messages {
        let content = expand_path_templates(&message.content, base_dir, notifier).await;
        expanded.push(Message {
            content,
            role: message.role,
        });
    }
    expanded
}
