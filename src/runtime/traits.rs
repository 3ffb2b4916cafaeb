//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the turn processor with mock implementations.

use crate::a2a::{AgentEvent, Message, Task};
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Ordered, append-only message history per context
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Messages of a context in arrival order (empty if unknown)
    async fn history(&self, context_id: &str) -> Result<Vec<Message>, String>;

    /// Append a message; returns false if one with the same id is already present
    async fn append(&self, context_id: &str, message: Message) -> Result<bool, String>;
}

/// Task ids marked for cancellation
pub trait CancellationRegistry: Send + Sync {
    /// Idempotent; valid before the task exists and after it has finished
    fn mark_cancelled(&self, task_id: &str);

    fn is_cancelled(&self, task_id: &str) -> bool;

    /// Token fired when the task is marked cancelled
    fn token(&self, task_id: &str) -> CancellationToken;
}

/// Sink for the events of a turn, delivered in call order
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: AgentEvent);
}

/// Load/save-by-id task persistence
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn load(&self, task_id: &str) -> Result<Option<Task>, String>;

    async fn save(&self, task: Task) -> Result<(), String>;
}

/// Discarding sink
#[async_trait]
impl EventPublisher for () {
    async fn publish(&self, _event: AgentEvent) {}
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

#[async_trait]
impl<T: ContextStore + ?Sized> ContextStore for Arc<T> {
    async fn history(&self, context_id: &str) -> Result<Vec<Message>, String> {
        (**self).history(context_id).await
    }

    async fn append(&self, context_id: &str, message: Message) -> Result<bool, String> {
        (**self).append(context_id, message).await
    }
}

impl<T: CancellationRegistry + ?Sized> CancellationRegistry for Arc<T> {
    fn mark_cancelled(&self, task_id: &str) {
        (**self).mark_cancelled(task_id);
    }

    fn is_cancelled(&self, task_id: &str) -> bool {
        (**self).is_cancelled(task_id)
    }

    fn token(&self, task_id: &str) -> CancellationToken {
        (**self).token(task_id)
    }
}

#[async_trait]
impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    async fn publish(&self, event: AgentEvent) {
        (**self).publish(event).await;
    }
}

#[async_trait]
impl<T: TaskStore + ?Sized> TaskStore for Arc<T> {
    async fn load(&self, task_id: &str) -> Result<Option<Task>, String> {
        (**self).load(task_id).await
    }

    async fn save(&self, task: Task) -> Result<(), String> {
        (**self).save(task).await
    }
}
