//! Terminal marker decoding
//!
//! The model ends every reply with a marker line classifying the turn. Only
//! mechanical line splitting happens here; the body text is never interpreted.

use crate::a2a::TaskState;

pub const COMPLETED_MARKER: &str = "COMPLETED";
pub const AWAITING_USER_INPUT_MARKER: &str = "AWAITING_USER_INPUT";

/// Marker found on the last line of a model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalSignal {
    Completed,
    AwaitingUserInput,
    /// Anything else, upper-cased; empty when the reply was blank
    Unrecognized(String),
}

/// What to do when the marker is missing or unrecognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerPolicy {
    /// Treat it as a successful completion
    #[default]
    Lenient,
    /// Surface it as `unknown`
    Strict,
}

/// A model reply split into body and marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub body: String,
    pub signal: TerminalSignal,
}

impl ParsedReply {
    /// Task state the turn ends in under the given policy
    pub fn task_state(&self, policy: MarkerPolicy) -> TaskState {
        match (&self.signal, policy) {
            (TerminalSignal::Completed, _) | (TerminalSignal::Unrecognized(_), MarkerPolicy::Lenient) => {
                TaskState::Completed
            }
            (TerminalSignal::AwaitingUserInput, _) => TaskState::InputRequired,
            (TerminalSignal::Unrecognized(_), MarkerPolicy::Strict) => TaskState::Unknown,
        }
    }
}

/// Split a raw reply into body and terminal marker.
///
/// The last line of the trimmed reply is always taken as the marker, even when
/// it is not one; the preceding lines, rejoined and trimmed, form the body.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let lines: Vec<&str> = raw.trim().lines().collect();
    let (marker_line, body_lines) = match lines.split_last() {
        Some((last, rest)) => (*last, rest),
        None => ("", &[][..]),
    };

    let marker = marker_line.trim().to_uppercase();
    let signal = match marker.as_str() {
        COMPLETED_MARKER => TerminalSignal::Completed,
        AWAITING_USER_INPUT_MARKER => TerminalSignal::AwaitingUserInput,
        _ => TerminalSignal::Unrecognized(marker),
    };

    ParsedReply {
        body: body_lines.join("\n").trim().to_string(),
        signal,
    }
}
