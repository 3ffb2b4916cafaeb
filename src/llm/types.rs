//! Common types for LLM interactions

use crate::a2a::{Message, Role};
use crate::tools::Tool;
use std::sync::Arc;

/// Arguments the prompt template is rendered with
#[derive(Debug, Clone, PartialEq)]
pub struct PromptArgs {
    /// Caller-supplied guidance for the task, if any
    pub goal: Option<String>,
    /// Current time, RFC 3339
    pub now: String,
}

impl PromptArgs {
    pub fn new(goal: Option<String>) -> Self {
        Self {
            goal,
            now: crate::a2a::now_timestamp(),
        }
    }
}

/// Message role as seen by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// One text segment of a model-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextContent {
    pub text: String,
}

/// Message in the model-facing history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: Vec<TextContent>,
}

impl LlmMessage {
    #[cfg(test)]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: vec![TextContent { text: text.into() }],
        }
    }

    #[cfg(test)]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: vec![TextContent { text: text.into() }],
        }
    }

    /// Project a protocol message for the model.
    ///
    /// Non-text and empty text parts are dropped; a message left with no text
    /// segments projects to `None`.
    pub fn from_message(message: &Message) -> Option<Self> {
        let content: Vec<TextContent> = message
            .text_segments()
            .filter(|text| !text.is_empty())
            .map(|text| TextContent {
                text: text.to_string(),
            })
            .collect();
        if content.is_empty() {
            return None;
        }
        let role = match message.role {
            Role::User => MessageRole::User,
            Role::Agent => MessageRole::Assistant,
        };
        Some(Self { role, content })
    }

    /// All text segments joined
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A single model invocation
#[derive(Clone)]
pub struct LlmRequest {
    pub prompt: PromptArgs,
    pub messages: Vec<LlmMessage>,
    /// Tool handles the model may call while producing its answer
    pub tools: Vec<Arc<dyn Tool>>,
}

impl LlmRequest {
    pub fn new(prompt: PromptArgs, messages: Vec<LlmMessage>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            prompt,
            messages,
            tools,
        }
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

impl std::fmt::Debug for LlmRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmRequest")
            .field("prompt", &self.prompt)
            .field("messages", &self.messages)
            .field("tools", &self.tool_names())
            .finish()
    }
}

/// Final free-text answer of the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    pub text: String,
}

impl LlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
