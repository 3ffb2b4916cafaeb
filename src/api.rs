//! HTTP API for the movie agent
//!
//! A thin surface over the turn processor: agent card discovery, streaming
//! and blocking turn endpoints, task lookup and the cancellation trigger.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::a2a::AgentCard;
use crate::runtime::{InMemoryTaskStore, KeyedLocks, ProductionProcessor};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<ProductionProcessor>,
    pub tasks: Arc<InMemoryTaskStore>,
    /// Held while a resume is validated and recorded against a stored task
    pub task_locks: Arc<KeyedLocks>,
    pub agent_card: Arc<AgentCard>,
}

impl AppState {
    pub fn new(processor: ProductionProcessor, agent_card: AgentCard) -> Self {
        Self {
            processor: Arc::new(processor),
            tasks: Arc::new(InMemoryTaskStore::new()),
            task_locks: Arc::new(KeyedLocks::new()),
            agent_card: Arc::new(agent_card),
        }
    }
}
