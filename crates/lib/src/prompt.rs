//! Shared prompt-assembly helpers used by both the stateless RAG Query
//! Engine and the Streaming Session, so the "Context Documents:" framing
//! and the 200-char source preview truncation have exactly one
//! definition.

use crate::ai::ChatMessage;
use crate::vector_store::SearchHit;

pub fn build_context_messages(hits: &[SearchHit], text: &str, memory: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut context_block = String::from(
        "You are a helpful educational assistant. Answer the user's question using only the \
         provided context documents. If the answer isn't in the context, say so.\n\nContext Documents:\n",
    );
    for (index, hit) in hits.iter().enumerate() {
        context_block.push_str(&format!("--- Document {} ---\n{}\n\n", index + 1, hit.content));
    }

    let mut messages = vec![ChatMessage::system(context_block)];
    messages.extend(memory.iter().cloned());
    messages.push(ChatMessage::user(text));
    messages
}

/// First 200 characters of `content`, with a trailing ellipsis if it was
/// truncated.
pub fn preview_content(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= 200 {
        return content.to_string();
    }
    let truncated: String = chars[..200].iter().collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_previews_with_ellipsis() {
        let long = "a".repeat(250);
        let preview = preview_content(&long);
        assert_eq!(preview.chars().count(), 201);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn keeps_short_previews_unchanged() {
        assert_eq!(preview_content("short"), "short");
    }
}
