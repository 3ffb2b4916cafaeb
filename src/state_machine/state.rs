//! Turn state types

use super::MarkerPolicy;
use crate::a2a::{Message, Task, TaskState};

/// Progress of a single turn
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Request accepted, nothing published yet
    #[default]
    Received,

    /// Submitted/working events published, history being assembled
    AssemblingHistory { goal: Option<String> },

    /// Model invocation in flight (the only suspension point of a turn)
    AwaitingModel,

    /// Final event published; no further transitions
    Finished { outcome: TaskState },
}

impl TurnState {
    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        matches!(self, TurnState::Finished { .. })
    }

    /// Short label for logs
    pub fn name(&self) -> &'static str {
        match self {
            TurnState::Received => "received",
            TurnState::AssemblingHistory { .. } => "assembling_history",
            TurnState::AwaitingModel => "awaiting_model",
            TurnState::Finished { .. } => "finished",
        }
    }
}

/// Identity and policy of a turn (immutable for its duration)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnContext {
    pub task_id: String,
    pub context_id: String,
    pub marker_policy: MarkerPolicy,
}

impl TurnContext {
    pub fn new(task_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            context_id: context_id.into(),
            marker_policy: MarkerPolicy::default(),
        }
    }

    /// Resolve the identity of a turn.
    ///
    /// The task id is the existing task's, else `fresh_task_id`. The context id
    /// is the message's, else the existing task's, else `fresh_context_id`.
    pub fn resolve(
        user_message: &Message,
        existing_task: Option<&Task>,
        fresh_task_id: String,
        fresh_context_id: String,
    ) -> Self {
        let task_id = existing_task.map_or(fresh_task_id, |task| task.id.clone());
        let context_id = user_message
            .context_id
            .clone()
            .or_else(|| existing_task.map(|task| task.context_id.clone()))
            .unwrap_or(fresh_context_id);
        Self::new(task_id, context_id)
    }

    pub fn with_marker_policy(mut self, policy: MarkerPolicy) -> Self {
        self.marker_policy = policy;
        self
    }
}
