//! Turn state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! runtime feeds [`Event`]s in, [`transition`] returns the next [`TurnState`]
//! and the [`Effect`]s to execute, and only the runtime performs I/O.

mod effect;
pub mod event;
mod marker;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use marker::{
    parse_reply, MarkerPolicy, TerminalSignal, AWAITING_USER_INPUT_MARKER, COMPLETED_MARKER,
};
pub use state::{TurnContext, TurnState};
pub use transition::transition;
