//! Events that drive a turn

use crate::a2a::{Message, Task};
use crate::llm::LlmMessage;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// A user message arrived, optionally resuming an existing task
    TurnStarted {
        user_message: Message,
        existing_task: Option<Task>,
    },

    /// Context history was updated and projected for the model
    HistoryAssembled { messages: Vec<LlmMessage> },

    // Model events
    ModelReplied { text: String },
    ModelFailed { message: String },

    /// The task was found marked cancelled at the post-call checkpoint
    CancellationObserved,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::TurnStarted { .. } => "turn_started",
            Event::HistoryAssembled { .. } => "history_assembled",
            Event::ModelReplied { .. } => "model_replied",
            Event::ModelFailed { .. } => "model_failed",
            Event::CancellationObserved => "cancellation_observed",
        }
    }
}
