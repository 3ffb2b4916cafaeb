//! Effects produced by state transitions
//!
//! Effects are intents. Message ids and timestamps are assigned by the runtime
//! when it executes them, which keeps [`super::transition`] pure.

use crate::a2a::{Message, TaskState};
use crate::llm::LlmMessage;

/// Placeholder shown while the model works
pub const WORKING_NOTE: &str = "Processing your question, hang tight!";

/// Failure note when no text is left to send to the model
pub const NO_TEXT_NOTE: &str = "No message found to process.";

/// Reply text used when the model's body is empty
pub const EMPTY_REPLY_TEXT: &str = "Completed.";

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Publish the task snapshot in `submitted` state, history seeded with the message
    PublishSubmitted { user_message: Message },

    /// Publish a status update; `note` becomes an agent message when present
    PublishStatus {
        state: TaskState,
        note: Option<String>,
        is_final: bool,
    },

    /// Record the user message in its context and project the history for the model
    AssembleHistory { user_message: Message },

    /// Invoke the model once, then check for cancellation
    RequestModel {
        goal: Option<String>,
        messages: Vec<LlmMessage>,
    },

    /// Append the agent reply to the context history and publish it as the final status
    PublishReply { state: TaskState, text: String },
}

impl Effect {
    pub fn working() -> Self {
        Effect::PublishStatus {
            state: TaskState::Working,
            note: Some(WORKING_NOTE.to_string()),
            is_final: false,
        }
    }

    pub fn finish(state: TaskState, note: Option<String>) -> Self {
        Effect::PublishStatus {
            state,
            note,
            is_final: true,
        }
    }

    /// Whether executing this effect publishes the turn's final event
    #[cfg(test)]
    pub fn is_final_publish(&self) -> bool {
        match self {
            Effect::PublishStatus { is_final, .. } => *is_final,
            Effect::PublishReply { .. } => true,
            Effect::PublishSubmitted { .. }
            | Effect::AssembleHistory { .. }
            | Effect::RequestModel { .. } => false,
        }
    }

    /// Whether executing this effect publishes anything
    #[cfg(test)]
    pub fn is_publish(&self) -> bool {
        matches!(
            self,
            Effect::PublishSubmitted { .. } | Effect::PublishStatus { .. } | Effect::PublishReply { .. }
        )
    }
}
