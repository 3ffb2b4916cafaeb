//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects. Ids, timestamps and I/O live in the executor.

use super::effect::{EMPTY_REPLY_TEXT, NO_TEXT_NOTE};
use super::{parse_reply, Effect, Event, TurnContext, TurnState};
use crate::a2a::{Message, Task, TaskState, GOAL_METADATA_KEY};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Turn already finished with state {0}")]
    TurnFinished(TaskState),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &TurnState,
    context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (TurnState::Finished { outcome }, _) => Err(TransitionError::TurnFinished(*outcome)),

        // Received + TurnStarted -> AssemblingHistory
        (
            TurnState::Received,
            Event::TurnStarted {
                user_message,
                existing_task,
            },
        ) => {
            let goal = goal_for(existing_task.as_ref(), &user_message);
            let mut effects = Vec::with_capacity(3);
            if existing_task.is_none() {
                effects.push(Effect::PublishSubmitted {
                    user_message: user_message.clone(),
                });
            }
            effects.push(Effect::working());
            effects.push(Effect::AssembleHistory { user_message });
            Ok(TransitionResult::new(TurnState::AssemblingHistory { goal }).with_effects(effects))
        }

        // Nothing text-bearing to send -> Failed without calling the model
        (TurnState::AssemblingHistory { .. }, Event::HistoryAssembled { messages })
            if messages.is_empty() =>
        {
            Ok(finished(TaskState::Failed)
                .with_effect(Effect::finish(TaskState::Failed, Some(NO_TEXT_NOTE.to_string()))))
        }

        (TurnState::AssemblingHistory { goal }, Event::HistoryAssembled { messages }) => {
            Ok(TransitionResult::new(TurnState::AwaitingModel).with_effect(Effect::RequestModel {
                goal: goal.clone(),
                messages,
            }))
        }

        // AwaitingModel + ModelReplied -> Finished (completed / input-required / unknown)
        (TurnState::AwaitingModel, Event::ModelReplied { text }) => {
            let parsed = parse_reply(&text);
            let outcome = parsed.task_state(context.marker_policy);
            let text = if parsed.body.is_empty() {
                EMPTY_REPLY_TEXT.to_string()
            } else {
                parsed.body
            };
            Ok(finished(outcome).with_effect(Effect::PublishReply {
                state: outcome,
                text,
            }))
        }

        (TurnState::AwaitingModel, Event::CancellationObserved) => {
            Ok(finished(TaskState::Canceled).with_effect(Effect::finish(TaskState::Canceled, None)))
        }

        (TurnState::AwaitingModel, Event::ModelFailed { message }) => Ok(finished(TaskState::Failed)
            .with_effect(Effect::finish(
                TaskState::Failed,
                Some(format!("Agent error: {message}")),
            ))),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {}",
            state.name(),
            event.name()
        ))),
    }
}

fn finished(outcome: TaskState) -> TransitionResult {
    TransitionResult::new(TurnState::Finished { outcome })
}

/// The task's stored goal wins over the one carried by the incoming message
fn goal_for(existing_task: Option<&Task>, user_message: &Message) -> Option<String> {
    existing_task
        .and_then(|task| task.metadata_str(GOAL_METADATA_KEY))
        .or_else(|| user_message.metadata_str(GOAL_METADATA_KEY))
        .map(str::to_string)
}
