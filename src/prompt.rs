//! Prompt assembly for the generation provider.
//!
//! Pure and deterministic: retrieved chunks plus the original question
//! become a fixed two-message conversation. No I/O, cannot fail.

use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Use the following context to answer the user's question.";

/// One role-tagged message in a conversation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Build the conversation prompt for a question and its retrieved chunks.
///
/// Structure is fixed: one system instruction, then one user message
/// holding the chunk texts (blank-line separated) followed by the
/// question. An empty chunk list leaves the context section empty but
/// the question is still asked.
pub fn build_prompt(question: &str, chunks: &[String]) -> Vec<ChatMessage> {
    let context_text = chunks.join("\n\n");

    vec![
        ChatMessage::new("system", SYSTEM_PROMPT),
        ChatMessage::new(
            "user",
            format!("Context:\n{context_text}\n\nQuestion:\n{question}"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_structure() {
        let chunks = vec!["first chunk".to_string(), "second chunk".to_string()];
        let messages = build_prompt("What is Rust?", &chunks);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].role, "user");
        assert_eq!(
            messages[1].content,
            "Context:\nfirst chunk\n\nsecond chunk\n\nQuestion:\nWhat is Rust?"
        );
    }

    #[test]
    fn test_empty_chunks_still_ask_the_question() {
        let messages = build_prompt("What is Rust?", &[]);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "Context:\n\n\nQuestion:\nWhat is Rust?");
        assert!(messages[1].content.contains("What is Rust?"));
    }

    #[test]
    fn test_deterministic() {
        let chunks = vec!["a".to_string(), "b".to_string()];
        assert_eq!(build_prompt("q", &chunks), build_prompt("q", &chunks));
    }
}
