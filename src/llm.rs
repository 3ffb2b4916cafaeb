//! Model invocation
//!
//! The turn processor treats the model as an opaque async call taking prompt
//! arguments, projected history and tool handles, and returning free text.
//! This module holds those request/response types, the Gemini-backed client
//! that resolves tool calls before answering, and a logging decorator.

mod error;
mod gemini;
mod types;


pub use error::{LlmError, LlmErrorKind};
pub use gemini::GeminiService;
pub use types::*;

use crate::runtime::LlmClient;
use async_trait::async_trait;

/// Logging wrapper for LLM clients
pub struct LoggingClient<L> {
    inner: L,
}

impl<L: LlmClient> LoggingClient<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<L: LlmClient> LlmClient for LoggingClient<L> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.inner.model_id(),
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    reply_chars = response.text.len(),
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.inner.model_id(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "LLM request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
