//! Agent-to-agent protocol data model
//!
//! Only the subset of the protocol the turn processor produces or consumes:
//! messages and their parts, task snapshots, status updates, and the static
//! agent card served for discovery.

mod agent_card;
mod types;

pub use agent_card::{movie_agent_card, AgentCard};
pub use types::*;
