//! API request and response types

use crate::a2a::Message;
use serde::{Deserialize, Serialize};

/// Body of the send/stream endpoints
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: Message,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
