//! Runtime for executing turns
//!
//! The turn processor wires the pure state machine to its collaborators:
//! context history, the cancellation registry, the model client and the
//! event sink. Everything it touches sits behind a trait in [`traits`].

mod executor;
mod memory;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{TurnProcessor, TurnRequest, TurnSettings};
pub use memory::{
    ChannelPublisher, InMemoryCancellations, InMemoryContextStore, InMemoryTaskStore, KeyedLocks,
    TaskTracker,
};
pub use traits::*;

use std::sync::Arc;

/// Processor used by the server: in-memory stores and a type-erased model client
pub type ProductionProcessor =
    TurnProcessor<Arc<InMemoryContextStore>, Arc<InMemoryCancellations>, Arc<dyn LlmClient>>;
