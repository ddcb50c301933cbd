//! Bounded-context retention for the growing conversation history.
//!
//! Screenshots lose value as the conversation progresses; before each step
//! the oldest image attachments are dropped in place until at most `keep`
//! remain. Text items are never touched and the relative order of surviving
//! items is preserved. Annotated (set-of-marks) screenshots are display-only
//! and are removed unconditionally first.

use crate::llm::types::{ContentItem, Message};

/// Remove every annotated-screenshot reference from the history. These are
/// only valid for the step that produced them.
pub fn remove_marked_images(history: &mut [Message]) {
    for msg in history.iter_mut() {
        msg.content.retain(|item| match item {
            ContentItem::Image { path } => !is_marked_image(path),
            _ => true,
        });
    }
}

fn is_marked_image(path: &str) -> bool {
    std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains("som"))
}

/// Trim the history in place so at most `keep` image items survive,
/// oldest-first. `None` disables trimming entirely.
pub fn retain_recent_images(history: &mut [Message], keep: Option<usize>) {
    let Some(keep) = keep else { return };

    let total = count_images(history);
    let Some(mut excess) = total.checked_sub(keep).filter(|e| *e > 0) else {
        return;
    };
    tracing::debug!(total, keep, excess, "trimming oldest screenshots from history");

    for msg in history.iter_mut() {
        let mut kept = Vec::with_capacity(msg.content.len());
        for mut item in msg.content.drain(..) {
            match &mut item {
                ContentItem::Image { .. } if excess > 0 => {
                    excess -= 1;
                    continue;
                }
                ContentItem::ToolResult { content } => {
                    content.retain(|inner| {
                        if matches!(inner, ContentItem::Image { .. }) && excess > 0 {
                            excess -= 1;
                            false
                        } else {
                            true
                        }
                    });
                }
                _ => {}
            }
            kept.push(item);
        }
        msg.content = kept;
    }
}

fn count_images(history: &[Message]) -> usize {
    history
        .iter()
        .flat_map(|msg| msg.content.iter())
        .map(|item| match item {
            ContentItem::Image { .. } => 1,
            ContentItem::ToolResult { content } => content
                .iter()
                .filter(|inner| matches!(inner, ContentItem::Image { .. }))
                .count(),
            ContentItem::Text { .. } => 0,
        })
        .sum()
}
