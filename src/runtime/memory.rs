//! In-memory implementations of the runtime stores
//!
//! Everything here lives for the life of the process and is never evicted.

use super::traits::{CancellationRegistry, ContextStore, EventPublisher, TaskStore};
use crate::a2a::{AgentEvent, Message, Task};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, OwnedMutexGuard, RwLock};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Context history
// ============================================================================

/// Context histories keyed by context id
#[derive(Default)]
pub struct InMemoryContextStore {
    contexts: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn history(&self, context_id: &str) -> Result<Vec<Message>, String> {
        Ok(self
            .contexts
            .read()
            .await
            .get(context_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, context_id: &str, message: Message) -> Result<bool, String> {
        let mut contexts = self.contexts.write().await;
        let history = contexts.entry(context_id.to_string()).or_default();
        if history.iter().any(|m| m.message_id == message.message_id) {
            return Ok(false);
        }
        history.push(message);
        Ok(true)
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// One cancellation token per task id, created on first use
#[derive(Default)]
pub struct InMemoryCancellations {
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl InMemoryCancellations {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CancellationRegistry for InMemoryCancellations {
    fn mark_cancelled(&self, task_id: &str) {
        self.token(task_id).cancel();
    }

    fn is_cancelled(&self, task_id: &str) -> bool {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task_id)
            .is_some_and(CancellationToken::is_cancelled)
    }

    fn token(&self, task_id: &str) -> CancellationToken {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(task_id.to_string())
            .or_insert_with(CancellationToken::new)
            .clone()
    }
}

// ============================================================================
// Tasks
// ============================================================================

/// Task snapshots keyed by task id
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load(&self, task_id: &str) -> Result<Option<Task>, String> {
        Ok(self.tasks.read().await.get(task_id).cloned())
    }

    async fn save(&self, task: Task) -> Result<(), String> {
        self.tasks.write().await.insert(task.id.clone(), task);
        Ok(())
    }
}

/// Publisher decorator that keeps stored tasks in step with the event stream.
///
/// Snapshots are saved as-is; a status update replaces the stored status and
/// appends its message, if any, to the task history.
pub struct TaskTracker<S, P = ()> {
    store: S,
    inner: P,
}

impl<S: TaskStore> TaskTracker<S> {
    /// Tracker that forwards nothing
    pub fn standalone(store: S) -> Self {
        Self { store, inner: () }
    }
}

impl<S: TaskStore, P: EventPublisher> TaskTracker<S, P> {
    pub fn new(store: S, inner: P) -> Self {
        Self { store, inner }
    }

    async fn record(&self, event: &AgentEvent) -> Result<(), String> {
        match event {
            AgentEvent::Task(task) => self.store.save(task.clone()).await,
            AgentEvent::StatusUpdate(update) => {
                let Some(mut task) = self.store.load(&update.task_id).await? else {
                    return Err(format!("unknown task {}", update.task_id));
                };
                if let Some(message) = &update.status.message {
                    task.history.push(message.clone());
                }
                task.status = update.status.clone();
                self.store.save(task).await
            }
        }
    }
}

#[async_trait]
impl<S: TaskStore, P: EventPublisher> EventPublisher for TaskTracker<S, P> {
    async fn publish(&self, event: AgentEvent) {
        if let Err(e) = self.record(&event).await {
            tracing::warn!(task_id = %event.task_id(), error = %e, "Failed to record task event");
        }
        self.inner.publish(event).await;
    }
}

// ============================================================================
// Publishing and per-context serialization
// ============================================================================

/// Publisher forwarding events into an unbounded channel
#[derive(Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<AgentEvent>,
}

impl ChannelPublisher {
    pub fn new(tx: mpsc::UnboundedSender<AgentEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, event: AgentEvent) {
        // A dropped receiver means the client went away; the turn still runs to completion
        let _ = self.tx.send(event);
    }
}

/// One async mutex per key: context ids for turns, task ids for resumes
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}
