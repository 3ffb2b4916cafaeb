//! Mock implementations for testing
//!
//! These mocks enable integration testing of the turn processor without real I/O.

use super::traits::*;
use crate::a2a::{AgentEvent, Message};
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a successful plain-text response
    pub fn queue_text(&self, text: impl Into<String>) {
        self.queue_response(LlmResponse::text(text));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<LlmResponse, LlmError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.next_response()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Delayed Mock LLM Client (for cancellation testing)
// ============================================================================

/// Mock LLM client with configurable delay (for testing cancellation)
pub struct DelayedMockLlmClient {
    inner: MockLlmClient,
    delay: Duration,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl DelayedMockLlmClient {
    pub fn new(model_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: MockLlmClient::new(model_id),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_text(&self, text: impl Into<String>) {
        self.inner.queue_text(text);
    }
}

#[async_trait]
impl LlmClient for DelayedMockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.inner.requests.lock().unwrap().push(request.clone());
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.next_response()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// Recording Publisher
// ============================================================================

/// Publisher that keeps every event it receives
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<AgentEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Message carried by the last status update, if any
    pub fn final_message(&self) -> Option<Message> {
        match self.events.lock().unwrap().last() {
            Some(AgentEvent::StatusUpdate(update)) => update.status.message.clone(),
            _ => None,
        }
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: AgentEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ============================================================================
// Failing Context Store
// ============================================================================

/// Context store whose every operation fails
pub struct FailingContextStore;

#[async_trait]
impl ContextStore for FailingContextStore {
    async fn history(&self, _context_id: &str) -> Result<Vec<Message>, String> {
        Err("store offline".to_string())
    }

    async fn append(&self, _context_id: &str, _message: Message) -> Result<bool, String> {
        Err("store offline".to_string())
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::{FileContent, Part, Role, Task, TaskState, GOAL_METADATA_KEY};
    use crate::llm::{LlmErrorKind, MessageRole};
    use crate::runtime::{
        InMemoryCancellations, InMemoryContextStore, TurnProcessor, TurnRequest, TurnSettings,
    };
    use crate::state_machine::MarkerPolicy;
    use serde_json::json;
    use std::collections::HashSet;

    type TestProcessor<L> =
        TurnProcessor<Arc<InMemoryContextStore>, Arc<InMemoryCancellations>, Arc<L>>;

    fn processor<L: LlmClient>(llm: Arc<L>) -> TestProcessor<L> {
        TurnProcessor::new(
            Arc::new(InMemoryContextStore::new()),
            Arc::new(InMemoryCancellations::new()),
            llm,
            vec![],
        )
    }

    fn user(id: &str, text: &str) -> Message {
        Message::user_text(id, text).with_context("ctx-1")
    }

    /// Exactly one final event, and it is the last one
    fn assert_well_formed(events: &[AgentEvent]) {
        let finals = events.iter().filter(|e| e.is_final()).count();
        assert_eq!(finals, 1, "expected one final event in {events:?}");
        assert!(events.last().is_some_and(AgentEvent::is_final));
    }

    fn states(events: &[AgentEvent]) -> Vec<TaskState> {
        events.iter().map(AgentEvent::state).collect()
    }

    #[tokio::test]
    async fn test_mock_llm_client() {
        let mock = MockLlmClient::new("test-model");
        mock.queue_text("Hello!\nCOMPLETED");

        let request = LlmRequest::new(crate::llm::PromptArgs::new(None), vec![], vec![]);
        let response = mock.complete(&request).await.unwrap();
        assert_eq!(response.text, "Hello!\nCOMPLETED");
        assert_eq!(mock.recorded_requests().len(), 1);

        let err = mock.complete(&request).await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Network);
    }

    #[tokio::test]
    async fn test_new_task_full_event_sequence() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_text("The movie is great.\nCOMPLETED");
        let processor = processor(llm.clone());
        let publisher = RecordingPublisher::new();

        let outcome = processor
            .process(TurnRequest::new(user("m1", "Is Inception good?")), &publisher)
            .await;
        assert_eq!(outcome, TaskState::Completed);

        let events = publisher.events();
        assert_well_formed(&events);
        assert_eq!(
            states(&events),
            [TaskState::Submitted, TaskState::Working, TaskState::Completed]
        );

        let AgentEvent::Task(task) = &events[0] else {
            panic!("first event should be the task snapshot");
        };
        assert_eq!(task.context_id, "ctx-1");
        assert_eq!(task.history.len(), 1);
        assert_eq!(task.history[0].message_id, "m1");
        assert!(task.artifacts.is_empty());

        let AgentEvent::StatusUpdate(working) = &events[1] else {
            panic!("second event should be a status update");
        };
        assert!(!working.is_final);
        assert_eq!(
            working.status.message.as_ref().map(Message::text).as_deref(),
            Some("Processing your question, hang tight!")
        );

        let reply = publisher.final_message().expect("reply message");
        assert_eq!(reply.text(), "The movie is great.");
        assert_eq!(reply.role, Role::Agent);
        assert_eq!(reply.task_id.as_deref(), Some(task.id.as_str()));
        assert_eq!(reply.context_id.as_deref(), Some("ctx-1"));

        // All events share the turn's identity
        assert!(events.iter().all(|e| e.task_id() == task.id));
    }

    #[tokio::test]
    async fn test_resumed_task_never_resubmits() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_text("Sure.\nCOMPLETED");
        let processor = processor(llm);
        let publisher = RecordingPublisher::new();
        let task = Task::submitted("task-9", "ctx-1", user("m0", "earlier"));

        processor
            .process(TurnRequest::resuming(user("m1", "more"), task), &publisher)
            .await;

        let events = publisher.events();
        assert_well_formed(&events);
        assert_eq!(states(&events), [TaskState::Working, TaskState::Completed]);
        assert!(events.iter().all(|e| e.task_id() == "task-9"));
    }

    #[tokio::test]
    async fn test_terminal_marker_outcomes() {
        let cases = [
            ("I need more info.\nAWAITING_USER_INPUT", TaskState::InputRequired, "I need more info."),
            ("Some answer.\nMAYBE", TaskState::Completed, "Some answer."),
            ("COMPLETED", TaskState::Completed, "Completed."),
        ];
        for (raw, expected, text) in cases {
            let llm = Arc::new(MockLlmClient::new("test-model"));
            llm.queue_text(raw);
            let publisher = RecordingPublisher::new();
            let outcome = processor(llm)
                .process(TurnRequest::new(user("m1", "q")), &publisher)
                .await;
            assert_eq!(outcome, expected, "{raw}");
            assert_eq!(publisher.final_message().unwrap().text(), text);
        }
    }

    #[tokio::test]
    async fn test_strict_marker_policy_yields_unknown() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_text("Some answer.\nMAYBE");
        let processor = processor(llm).with_settings(TurnSettings {
            marker_policy: MarkerPolicy::Strict,
            ..TurnSettings::default()
        });
        let publisher = RecordingPublisher::new();

        let outcome = processor
            .process(TurnRequest::new(user("m1", "q")), &publisher)
            .await;
        assert_eq!(outcome, TaskState::Unknown);
        assert_eq!(publisher.final_message().unwrap().text(), "Some answer.");
    }

    #[tokio::test]
    async fn test_model_receives_goal_and_projected_history() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_text("First.\nCOMPLETED");
        llm.queue_text("Second.\nCOMPLETED");
        let processor = processor(llm.clone());
        let publisher = RecordingPublisher::new();

        let first = user("m1", "Recommend a comedy").with_metadata(GOAL_METADATA_KEY, json!("laughs"));
        processor.process(TurnRequest::new(first), &publisher).await;
        processor
            .process(TurnRequest::new(user("m2", "Another one")), &publisher)
            .await;

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].prompt.goal.as_deref(), Some("laughs"));
        assert_eq!(requests[1].prompt.goal, None);

        let roles: Vec<MessageRole> = requests[1].messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [MessageRole::User, MessageRole::Assistant, MessageRole::User]
        );
        assert_eq!(requests[1].messages[1].text(), "First.");
    }

    #[tokio::test]
    async fn test_non_text_only_fails_without_model_call() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        let processor = processor(llm.clone());
        let publisher = RecordingPublisher::new();

        let mut message = user("m1", "");
        message.parts = vec![Part::File {
            file: FileContent {
                name: Some("poster.png".into()),
                mime_type: Some("image/png".into()),
                bytes: Some("AAAA".into()),
                uri: None,
            },
            metadata: None,
        }];

        let outcome = processor
            .process(TurnRequest::new(message), &publisher)
            .await;
        assert_eq!(outcome, TaskState::Failed);
        assert!(llm.recorded_requests().is_empty());
        assert_well_formed(&publisher.events());
        assert_eq!(
            publisher.final_message().unwrap().text(),
            "No message found to process."
        );

        // The non-text message is still kept in the context history
        let history = processor.contexts().history("ctx-1").await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_model_error_becomes_failed_event() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_error(LlmError::rate_limit("quota exceeded"));
        let processor = processor(llm);
        let publisher = RecordingPublisher::new();

        let outcome = processor
            .process(TurnRequest::new(user("m1", "q")), &publisher)
            .await;
        assert_eq!(outcome, TaskState::Failed);
        assert_well_formed(&publisher.events());
        assert_eq!(
            publisher.final_message().unwrap().text(),
            "Agent error: quota exceeded"
        );
    }

    #[tokio::test]
    async fn test_context_store_failure_becomes_failed_event() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        let processor = TurnProcessor::new(
            FailingContextStore,
            InMemoryCancellations::new(),
            llm.clone(),
            vec![],
        );
        let publisher = RecordingPublisher::new();

        let outcome = processor
            .process(TurnRequest::new(user("m1", "q")), &publisher)
            .await;
        assert_eq!(outcome, TaskState::Failed);
        assert_well_formed(&publisher.events());
        assert!(llm.recorded_requests().is_empty());
        assert_eq!(
            publisher.final_message().unwrap().text(),
            "Agent error: store offline"
        );
    }

    #[tokio::test]
    async fn test_cancel_during_model_call_discards_reply() {
        let llm = Arc::new(DelayedMockLlmClient::new(
            "test-model",
            Duration::from_millis(200),
        ));
        llm.queue_text("Answer that should be discarded\nCOMPLETED");
        let request_started = llm.request_started.clone();
        let processor = Arc::new(processor(llm));
        let publisher = Arc::new(RecordingPublisher::new());

        let task = Task::submitted("task-c", "ctx-1", user("m0", "earlier"));
        let turn = {
            let processor = processor.clone();
            let publisher = publisher.clone();
            tokio::spawn(async move {
                processor
                    .process(TurnRequest::resuming(user("m1", "q"), task), publisher.as_ref())
                    .await
            })
        };

        tokio::time::timeout(Duration::from_secs(1), request_started.notified())
            .await
            .expect("model request should start");
        processor.cancel("task-c");

        let outcome = turn.await.unwrap();
        assert_eq!(outcome, TaskState::Canceled);

        let events = publisher.events();
        assert_well_formed(&events);
        assert_eq!(states(&events), [TaskState::Working, TaskState::Canceled]);
        assert_eq!(publisher.final_message(), None);

        // The discarded answer never reaches the context history
        let history = processor.contexts().history("ctx-1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_cancel_marked_before_turn_starts() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_text("Answer\nAWAITING_USER_INPUT");
        let processor = processor(llm.clone());
        let publisher = RecordingPublisher::new();

        processor.cancel("task-early");
        let task = Task::submitted("task-early", "ctx-1", user("m0", "earlier"));
        let outcome = processor
            .process(TurnRequest::resuming(user("m1", "q"), task), &publisher)
            .await;

        // Cooperative mode still calls the model, then observes the mark
        assert_eq!(llm.recorded_requests().len(), 1);
        assert_eq!(outcome, TaskState::Canceled);
    }

    #[tokio::test]
    async fn test_interrupt_on_cancel_does_not_wait_for_model() {
        let llm = Arc::new(DelayedMockLlmClient::new("test-model", Duration::from_secs(5)));
        llm.queue_text("Too late\nCOMPLETED");
        let request_started = llm.request_started.clone();
        let processor = Arc::new(processor(llm).with_settings(TurnSettings {
            interrupt_on_cancel: true,
            ..TurnSettings::default()
        }));
        let publisher = Arc::new(RecordingPublisher::new());

        let task = Task::submitted("task-i", "ctx-1", user("m0", "earlier"));
        let start = tokio::time::Instant::now();
        let turn = {
            let processor = processor.clone();
            let publisher = publisher.clone();
            tokio::spawn(async move {
                processor
                    .process(TurnRequest::resuming(user("m1", "q"), task), publisher.as_ref())
                    .await
            })
        };

        tokio::time::timeout(Duration::from_secs(1), request_started.notified())
            .await
            .expect("model request should start");
        processor.cancel("task-i");

        let outcome = turn.await.unwrap();
        assert_eq!(outcome, TaskState::Canceled);
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "cancellation should be fast, took {:?}",
            start.elapsed()
        );
        assert_well_formed(&publisher.events());
    }

    #[tokio::test]
    async fn test_model_timeout_fails_turn() {
        let llm = Arc::new(DelayedMockLlmClient::new("test-model", Duration::from_secs(5)));
        llm.queue_text("Too late\nCOMPLETED");
        let processor = processor(llm).with_settings(TurnSettings {
            model_timeout: Some(Duration::from_millis(50)),
            ..TurnSettings::default()
        });
        let publisher = RecordingPublisher::new();

        let outcome = processor
            .process(TurnRequest::new(user("m1", "q")), &publisher)
            .await;
        assert_eq!(outcome, TaskState::Failed);
        let text = publisher.final_message().unwrap().text();
        assert!(text.starts_with("Agent error: model call timed out"), "{text}");
    }

    #[tokio::test]
    async fn test_redelivered_message_is_not_duplicated() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_text("One.\nCOMPLETED");
        llm.queue_text("Two.\nCOMPLETED");
        let processor = processor(llm);
        let publisher = RecordingPublisher::new();

        processor
            .process(TurnRequest::new(user("m1", "q")), &publisher)
            .await;
        processor
            .process(TurnRequest::new(user("m1", "q")), &publisher)
            .await;

        let history = processor.contexts().history("ctx-1").await.unwrap();
        let ids: HashSet<&str> = history.iter().map(|m| m.message_id.as_str()).collect();
        assert_eq!(ids.len(), history.len());
        assert_eq!(
            history.iter().filter(|m| m.message_id == "m1").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_one_context_alternate() {
        let llm = Arc::new(DelayedMockLlmClient::new(
            "test-model",
            Duration::from_millis(20),
        ));
        for i in 0..4 {
            llm.queue_text(format!("Reply {i}\nCOMPLETED"));
        }
        let processor = Arc::new(processor(llm));

        let turns: Vec<_> = (0..4)
            .map(|i| {
                let processor = processor.clone();
                tokio::spawn(async move {
                    let publisher = RecordingPublisher::new();
                    processor
                        .process(TurnRequest::new(user(&format!("m{i}"), "q")), &publisher)
                        .await;
                    publisher.events()
                })
            })
            .collect();

        for turn in futures::future::join_all(turns).await {
            assert_well_formed(&turn.unwrap());
        }

        let history = processor.contexts().history("ctx-1").await.unwrap();
        assert_eq!(history.len(), 8);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Agent);
        }
    }

    /// Without per-context serialization turns may interleave; alternation of
    /// user and agent entries is not guaranteed, only the counts and ids are.
    #[tokio::test]
    async fn test_unserialized_turns_on_one_context_stay_well_formed() {
        let llm = Arc::new(DelayedMockLlmClient::new(
            "test-model",
            Duration::from_millis(20),
        ));
        for i in 0..4 {
            llm.queue_text(format!("Reply {i}\nCOMPLETED"));
        }
        let processor = Arc::new(processor(llm).with_settings(TurnSettings {
            serialize_context_turns: false,
            ..TurnSettings::default()
        }));

        let turns: Vec<_> = (0..4)
            .map(|i| {
                let processor = processor.clone();
                tokio::spawn(async move {
                    let publisher = RecordingPublisher::new();
                    processor
                        .process(TurnRequest::new(user(&format!("m{i}"), "q")), &publisher)
                        .await;
                    publisher.events()
                })
            })
            .collect();

        for turn in futures::future::join_all(turns).await {
            assert_well_formed(&turn.unwrap());
        }

        let history = processor.contexts().history("ctx-1").await.unwrap();
        assert_eq!(history.len(), 8);
        let ids: HashSet<_> = history.iter().map(|m| m.message_id.as_str()).collect();
        assert_eq!(ids.len(), history.len());
        let users = history.iter().filter(|m| m.role == Role::User).count();
        assert_eq!(users, 4);
    }

    #[tokio::test]
    async fn test_message_without_context_gets_fresh_ids() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_text("Hi.\nCOMPLETED");
        let processor = processor(llm);
        let publisher = RecordingPublisher::new();

        processor
            .process(TurnRequest::new(Message::user_text("m1", "hello")), &publisher)
            .await;

        let events = publisher.events();
        let AgentEvent::Task(task) = &events[0] else {
            panic!("expected task snapshot");
        };
        assert!(!task.context_id.is_empty());
        assert_eq!(task.history[0].context_id.as_deref(), Some(task.context_id.as_str()));
        assert_eq!(task.history[0].task_id.as_deref(), Some(task.id.as_str()));
    }
}
