//! Google Gemini provider implementation
//!
//! One invocation may take several `generateContent` rounds: whenever the
//! model answers with function calls, the calls are run through the request's
//! tool handles and their outputs are sent back, until the model answers with
//! text only.

use super::types::{LlmMessage, LlmRequest, LlmResponse, MessageRole};
use super::LlmError;
use crate::runtime::LlmClient;
use crate::system_prompt::build_system_prompt;
use crate::tools::{Tool, ToolOutput};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Upper bound on function-calling rounds within one invocation
const MAX_TOOL_ROUNDS: usize = 8;

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    endpoint: String,
    model_id: String,
}

impl GeminiService {
    pub fn new(api_key: String, model: &str, base_url: Option<&str>) -> Result<Self, LlmError> {
        let base = base_url.unwrap_or(GEMINI_API_BASE).trim_end_matches('/');
        let endpoint = format!("{base}/models/{model}:generateContent");

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint,
            model_id: model.to_string(),
        })
    }

    fn translate_messages(messages: &[LlmMessage]) -> Vec<GeminiContent> {
        messages
            .iter()
            .map(|msg| GeminiContent {
                role: Some(
                    match msg.role {
                        MessageRole::User => "user",
                        MessageRole::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: msg
                    .content
                    .iter()
                    .map(|c| GeminiPart::Text {
                        text: c.text.clone(),
                    })
                    .collect(),
            })
            .collect()
    }

    fn translate_tools(tools: &[Arc<dyn Tool>]) -> Option<Vec<GeminiTool>> {
        if tools.is_empty() {
            return None;
        }
        Some(vec![GeminiTool {
            function_declarations: tools
                .iter()
                .map(|t| GeminiFunctionDeclaration {
                    name: t.name().to_string(),
                    description: t.description(),
                    parameters: t.input_schema(),
                })
                .collect(),
        }])
    }

    async fn generate(&self, request: &GeminiRequest) -> Result<GeminiContent, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |r| r.error.message);
            return Err(match status.as_u16() {
                400 => LlmError::invalid_request(format!("Invalid request: {message}")),
                401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
                429 => LlmError::rate_limit(format!("Rate limit exceeded: {message}")),
                500..=599 => LlmError::server_error(format!("Server error: {message}")),
                _ => LlmError::unknown(format!("HTTP {status}: {message}")),
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No candidates in response"))?;

        candidate.content.ok_or_else(|| {
            LlmError::unknown(format!(
                "Candidate has no content (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })
    }
}

/// Run every requested function call concurrently, in call order
async fn run_function_calls(
    calls: Vec<GeminiFunctionCall>,
    tools: &[Arc<dyn Tool>],
) -> Vec<GeminiPart> {
    let runs = calls.into_iter().map(|call| async move {
        let output = match tools.iter().find(|t| t.name() == call.name) {
            Some(tool) => tool.run(call.args).await,
            None => ToolOutput::error(format!("Unknown tool: {}", call.name)),
        };
        tracing::debug!(tool = %call.name, success = output.success, "Tool call finished");
        GeminiPart::FunctionResponse {
            function_response: GeminiFunctionResponse {
                name: call.name,
                response: function_response_body(&output),
            },
        }
    });
    join_all(runs).await
}

fn function_response_body(output: &ToolOutput) -> Value {
    // Prefer structured JSON so the model sees fields rather than a quoted string
    let content = serde_json::from_str::<Value>(&output.output)
        .unwrap_or_else(|_| Value::String(output.output.clone()));
    if output.success {
        json!({ "content": content })
    } else {
        json!({ "error": content })
    }
}

fn split_parts(content: &GeminiContent) -> (String, Vec<GeminiFunctionCall>) {
    let mut text = String::new();
    let mut calls = Vec::new();
    for part in &content.parts {
        match part {
            GeminiPart::Text { text: t } => text.push_str(t),
            GeminiPart::FunctionCall { function_call } => calls.push(function_call.clone()),
            GeminiPart::FunctionResponse { .. } => {}
        }
    }
    (text, calls)
}

#[async_trait]
impl LlmClient for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut gemini_request = GeminiRequest {
            contents: Self::translate_messages(&request.messages),
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text {
                    text: build_system_prompt(&request.prompt),
                }],
            }),
            tools: Self::translate_tools(&request.tools),
        };

        for round in 0..=MAX_TOOL_ROUNDS {
            let content = self.generate(&gemini_request).await?;
            let (text, calls) = split_parts(&content);

            if calls.is_empty() {
                return Ok(LlmResponse { text });
            }
            if round == MAX_TOOL_ROUNDS {
                break;
            }

            tracing::info!(
                round,
                calls = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "Model requested tool calls"
            );
            let responses = run_function_calls(calls, &request.tools).await;
            gemini_request.contents.push(GeminiContent {
                role: Some("model".to_string()),
                parts: content.parts,
            });
            gemini_request.contents.push(GeminiContent {
                role: Some("user".to_string()),
                parts: responses,
            });
        }

        Err(LlmError::unknown(format!(
            "Model kept calling tools after {MAX_TOOL_ROUNDS} rounds"
        )))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
