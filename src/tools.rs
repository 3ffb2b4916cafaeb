//! Domain tools offered to the model
//!
//! Tools are opaque to the turn processor: it hands the handles to the model
//! invocation, which decides when to call them.

mod tmdb;

pub use tmdb::{SearchMoviesTool, SearchPeopleTool, TmdbClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result from tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool
    async fn run(&self, input: Value) -> ToolOutput;
}

/// The fixed tool set of the movie agent
pub fn movie_tools(tmdb: Arc<TmdbClient>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(SearchMoviesTool::new(tmdb.clone())),
        Arc::new(SearchPeopleTool::new(tmdb)),
    ]
}

/// Input shared by both search tools
#[derive(Debug, Deserialize)]
struct SearchInput {
    query: String,
}

fn search_schema(description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "required": ["query"],
        "properties": {
            "query": {
                "type": "string",
                "description": description
            }
        }
    })
}
