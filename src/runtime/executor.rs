//! Turn processor executor
//!
//! Drives the pure turn state machine: each event goes through
//! [`transition`], and the resulting effects are executed here, possibly
//! producing the next event. Every turn ends with exactly one final event,
//! whatever fails along the way.

use super::memory::KeyedLocks;
use super::traits::{CancellationRegistry, ContextStore, EventPublisher, LlmClient};
use crate::a2a::{
    new_id, AgentEvent, Message, Task, TaskState, TaskStatus, TaskStatusUpdateEvent,
};
use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmResponse, PromptArgs};
use crate::state_machine::{
    parse_reply, transition, Effect, Event, MarkerPolicy, TerminalSignal, TurnContext, TurnState,
};
use crate::tools::Tool;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Inbound turn: a user message, optionally resuming an existing task
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_message: Message,
    pub existing_task: Option<Task>,
}

impl TurnRequest {
    pub fn new(user_message: Message) -> Self {
        Self {
            user_message,
            existing_task: None,
        }
    }

    pub fn resuming(user_message: Message, task: Task) -> Self {
        Self {
            user_message,
            existing_task: Some(task),
        }
    }
}

/// Knobs for how turns are executed
#[derive(Debug, Clone)]
pub struct TurnSettings {
    /// Bound on the model call; expiry fails the turn
    pub model_timeout: Option<Duration>,
    /// Race the model call against the task's cancellation token
    pub interrupt_on_cancel: bool,
    /// Hold a per-context lock for the whole turn
    pub serialize_context_turns: bool,
    pub marker_policy: MarkerPolicy,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            model_timeout: None,
            interrupt_on_cancel: false,
            serialize_context_turns: true,
            marker_policy: MarkerPolicy::Lenient,
        }
    }
}

/// Executes turns against the injected stores, model client and tools
pub struct TurnProcessor<C, R, L>
where
    C: ContextStore,
    R: CancellationRegistry,
    L: LlmClient,
{
    contexts: C,
    cancellations: R,
    llm_client: L,
    tools: Vec<Arc<dyn Tool>>,
    settings: TurnSettings,
    context_locks: KeyedLocks,
}

impl<C, R, L> TurnProcessor<C, R, L>
where
    C: ContextStore,
    R: CancellationRegistry,
    L: LlmClient,
{
    pub fn new(contexts: C, cancellations: R, llm_client: L, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            contexts,
            cancellations,
            llm_client,
            tools,
            settings: TurnSettings::default(),
            context_locks: KeyedLocks::new(),
        }
    }

    pub fn with_settings(mut self, settings: TurnSettings) -> Self {
        self.settings = settings;
        self
    }

    /// External cancellation trigger, independent of any running turn
    pub fn cancel(&self, task_id: &str) {
        tracing::info!(task_id = %task_id, "Task marked cancelled");
        self.cancellations.mark_cancelled(task_id);
    }

    #[cfg(test)]
    pub fn contexts(&self) -> &C {
        &self.contexts
    }

    /// Resolve the turn's identity and stamp it onto the user message
    pub fn prepare(&self, request: TurnRequest) -> (TurnContext, TurnRequest) {
        let context = TurnContext::resolve(
            &request.user_message,
            request.existing_task.as_ref(),
            new_id(),
            new_id(),
        )
        .with_marker_policy(self.settings.marker_policy);
        let user_message = request
            .user_message
            .with_task(context.task_id.clone())
            .with_context(context.context_id.clone());
        let request = TurnRequest {
            user_message,
            existing_task: request.existing_task,
        };
        (context, request)
    }

    /// Run one full turn, publishing its events in order. Returns the final state.
    pub async fn process<P>(&self, request: TurnRequest, publisher: &P) -> TaskState
    where
        P: EventPublisher + ?Sized,
    {
        let (context, request) = self.prepare(request);
        self.process_prepared(context, request, publisher).await
    }

    /// Run a turn whose identity was already resolved with [`Self::prepare`]
    pub async fn process_prepared<P>(
        &self,
        context: TurnContext,
        request: TurnRequest,
        publisher: &P,
    ) -> TaskState
    where
        P: EventPublisher + ?Sized,
    {
        let span = tracing::info_span!(
            "turn",
            task_id = %context.task_id,
            context_id = %context.context_id,
        );
        async move {
            let _guard = if self.settings.serialize_context_turns {
                Some(self.context_locks.acquire(&context.context_id).await)
            } else {
                None
            };

            let mut run = TurnRun {
                context,
                state: TurnState::Received,
                publisher,
                final_published: false,
            };
            let outcome = self.run_events(&mut run, request).await;
            tracing::info!(outcome = %outcome, "Turn finished");
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_events<P>(&self, run: &mut TurnRun<'_, P>, request: TurnRequest) -> TaskState
    where
        P: EventPublisher + ?Sized,
    {
        let mut events_to_process = vec![Event::TurnStarted {
            user_message: request.user_message,
            existing_task: request.existing_task,
        }];

        while let Some(event) = events_to_process.pop() {
            let event_name = event.name();
            let result = match transition(&run.state, &run.context, event) {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(
                        event = event_name,
                        state = run.state.name(),
                        error = %e,
                        "Invalid turn transition"
                    );
                    return run.fail(&e.to_string()).await;
                }
            };

            tracing::debug!(
                event = event_name,
                from = run.state.name(),
                to = result.new_state.name(),
                "Turn transition"
            );
            run.state = result.new_state;

            for effect in result.effects {
                match self.execute_effect(run, effect).await {
                    Ok(Some(next)) => events_to_process.push(next),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Turn effect failed");
                        return run.fail(&e).await;
                    }
                }
            }
        }

        if let TurnState::Finished { outcome } = run.state {
            return outcome;
        }
        tracing::error!(state = run.state.name(), "Turn stalled before finishing");
        run.fail("turn ended without a final state").await
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect<P>(
        &self,
        run: &mut TurnRun<'_, P>,
        effect: Effect,
    ) -> Result<Option<Event>, String>
    where
        P: EventPublisher + ?Sized,
    {
        match effect {
            Effect::PublishSubmitted { user_message } => {
                let task = Task::submitted(
                    run.context.task_id.clone(),
                    run.context.context_id.clone(),
                    user_message,
                );
                run.publish(AgentEvent::Task(task)).await;
                Ok(None)
            }

            Effect::PublishStatus {
                state,
                note,
                is_final,
            } => {
                let message = note.map(|text| run.agent_message(text));
                run.publish_status(state, message, is_final).await;
                Ok(None)
            }

            Effect::AssembleHistory { user_message } => {
                let context_id = &run.context.context_id;
                if !self.contexts.append(context_id, user_message).await? {
                    tracing::debug!("User message already in context history");
                }
                let history = self.contexts.history(context_id).await?;
                let messages = project_history(&history);
                tracing::debug!(
                    history = history.len(),
                    projected = messages.len(),
                    "Assembled model history"
                );
                Ok(Some(Event::HistoryAssembled { messages }))
            }

            Effect::RequestModel { goal, messages } => {
                let request = LlmRequest::new(PromptArgs::new(goal), messages, self.tools.clone());
                let Some(result) = self.invoke_model(&run.context, &request).await else {
                    tracing::info!("Model call interrupted by cancellation");
                    return Ok(Some(Event::CancellationObserved));
                };

                let event = match result {
                    Ok(response) => {
                        // Cancellation checkpoint: exactly once, after the call returns
                        if self.cancellations.is_cancelled(&run.context.task_id) {
                            tracing::info!("Discarding model reply for cancelled task");
                            Event::CancellationObserved
                        } else {
                            self.warn_on_missing_marker(&response);
                            Event::ModelReplied {
                                text: response.text,
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, kind = ?e.kind, "Model invocation failed");
                        Event::ModelFailed { message: e.message }
                    }
                };
                Ok(Some(event))
            }

            Effect::PublishReply { state, text } => {
                let reply = run.agent_message(text);
                if let Err(e) = self
                    .contexts
                    .append(&run.context.context_id, reply.clone())
                    .await
                {
                    tracing::warn!(error = %e, "Failed to record reply in context history");
                }
                run.publish_status(state, Some(reply), true).await;
                Ok(None)
            }
        }
    }

    /// The single suspension point of a turn. `None` means cancellation won the race.
    async fn invoke_model(
        &self,
        context: &TurnContext,
        request: &LlmRequest,
    ) -> Option<Result<LlmResponse, LlmError>> {
        let call = async {
            match self.settings.model_timeout {
                Some(limit) => tokio::time::timeout(limit, self.llm_client.complete(request))
                    .await
                    .unwrap_or_else(|_| Err(LlmError::timeout(limit))),
                None => self.llm_client.complete(request).await,
            }
        };

        if !self.settings.interrupt_on_cancel {
            return Some(call.await);
        }

        let token = self.cancellations.token(&context.task_id);
        tokio::select! {
            biased;

            () = token.cancelled() => None,
            result = call => Some(result),
        }
    }

    fn warn_on_missing_marker(&self, response: &LlmResponse) {
        if let TerminalSignal::Unrecognized(marker) = parse_reply(&response.text).signal {
            tracing::warn!(
                marker = %marker,
                policy = ?self.settings.marker_policy,
                "Model reply has no recognized terminal marker"
            );
        }
    }
}

/// Project context history into model input: user stays user, agent becomes
/// assistant, messages without text are dropped
pub fn project_history(history: &[Message]) -> Vec<LlmMessage> {
    history.iter().filter_map(LlmMessage::from_message).collect()
}

/// Mutable state of one executing turn
struct TurnRun<'a, P: ?Sized> {
    context: TurnContext,
    state: TurnState,
    publisher: &'a P,
    final_published: bool,
}

impl<P: EventPublisher + ?Sized> TurnRun<'_, P> {
    fn agent_message(&self, text: String) -> Message {
        Message::agent_text(
            text,
            self.context.task_id.clone(),
            self.context.context_id.clone(),
        )
    }

    async fn publish(&mut self, event: AgentEvent) {
        if self.final_published {
            tracing::error!(state = %event.state(), "Dropping event published after final");
            return;
        }
        if event.is_final() && !event.state().ends_turn() {
            tracing::error!(state = %event.state(), "Final event in a non-terminal state");
        }
        self.final_published = event.is_final();
        self.publisher.publish(event).await;
    }

    async fn publish_status(&mut self, state: TaskState, message: Option<Message>, is_final: bool) {
        let event = AgentEvent::StatusUpdate(TaskStatusUpdateEvent {
            task_id: self.context.task_id.clone(),
            context_id: self.context.context_id.clone(),
            status: TaskStatus::now(state, message),
            is_final,
        });
        self.publish(event).await;
    }

    /// End the turn as failed unless a final event already went out
    async fn fail(&mut self, description: &str) -> TaskState {
        if self.final_published {
            return match self.state {
                TurnState::Finished { outcome } => outcome,
                _ => TaskState::Failed,
            };
        }
        let message = self.agent_message(format!("Agent error: {description}"));
        self.publish_status(TaskState::Failed, Some(message), true).await;
        self.state = TurnState::Finished {
            outcome: TaskState::Failed,
        };
        TaskState::Failed
    }
}
