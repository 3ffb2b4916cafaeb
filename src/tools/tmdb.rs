//! TMDB-backed search tools

use super::{search_schema, SearchInput, Tool, ToolOutput};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
const IMAGE_FIELDS: &[&str] = &["poster_path", "backdrop_path", "profile_path"];

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("TMDB request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("TMDB returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// How requests authenticate against TMDB
#[derive(Clone)]
enum Credential {
    /// v3 API key, sent as a query parameter
    ApiKey(String),
    /// v4 read access token (a JWT), sent as a bearer token
    Bearer(String),
}

impl Credential {
    fn from_key(key: &str) -> Self {
        // Read access tokens are JWTs; plain v3 keys are 32 hex chars
        if key.starts_with("eyJ") {
            Credential::Bearer(key.to_string())
        } else {
            Credential::ApiKey(key.to_string())
        }
    }
}

/// Minimal TMDB search client
pub struct TmdbClient {
    client: Client,
    credential: Credential,
    base_url: String,
}

impl TmdbClient {
    pub fn new(api_key: &str) -> Result<Self, TmdbError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            credential: Credential::from_key(api_key),
            base_url: TMDB_API_BASE.to_string(),
        })
    }

    /// Run a `/search/{kind}` query and return its results with absolute image URLs
    pub async fn search(&self, kind: &str, query: &str) -> Result<Value, TmdbError> {
        let url = format!("{}/search/{kind}", self.base_url);
        let mut request = self.client.get(&url).query(&[
            ("query", query),
            ("include_adult", "false"),
            ("language", "en-US"),
            ("page", "1"),
        ]);
        request = match &self.credential {
            Credential::ApiKey(key) => request.query(&[("api_key", key.as_str())]),
            Credential::Bearer(token) => request.bearer_auth(token),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TmdbError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut body: Value = response.json().await?;
        rewrite_image_paths(&mut body);
        Ok(body)
    }
}

/// Replace relative image paths with absolute URLs, including those nested in `known_for`
fn rewrite_image_paths(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for field in IMAGE_FIELDS {
                if let Some(Value::String(path)) = map.get_mut(*field) {
                    if path.starts_with('/') {
                        *path = format!("{IMAGE_BASE}{path}");
                    }
                }
            }
            for child in map.values_mut() {
                if child.is_object() || child.is_array() {
                    rewrite_image_paths(child);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(rewrite_image_paths),
        _ => {}
    }
}

async fn run_search(tmdb: &TmdbClient, kind: &str, input: Value) -> ToolOutput {
    let input: SearchInput = match serde_json::from_value(input) {
        Ok(i) => i,
        Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
    };

    tracing::info!(kind, query = %input.query, "TMDB search");
    match tmdb.search(kind, &input.query).await {
        Ok(body) => ToolOutput::success(body.to_string()),
        Err(e) => {
            tracing::warn!(kind, error = %e, "TMDB search failed");
            ToolOutput::error(e.to_string())
        }
    }
}

/// `searchMovies`: look up movies by title
pub struct SearchMoviesTool {
    tmdb: Arc<TmdbClient>,
}

impl SearchMoviesTool {
    pub fn new(tmdb: Arc<TmdbClient>) -> Self {
        Self { tmdb }
    }
}

#[async_trait]
impl Tool for SearchMoviesTool {
    fn name(&self) -> &'static str {
        "searchMovies"
    }

    fn description(&self) -> String {
        "Search TMDB for movies by title".to_string()
    }

    fn input_schema(&self) -> Value {
        search_schema("Movie title to search for")
    }

    async fn run(&self, input: Value) -> ToolOutput {
        run_search(&self.tmdb, "movie", input).await
    }
}

/// `searchPeople`: look up actors, directors and other film people by name
pub struct SearchPeopleTool {
    tmdb: Arc<TmdbClient>,
}

impl SearchPeopleTool {
    pub fn new(tmdb: Arc<TmdbClient>) -> Self {
        Self { tmdb }
    }
}

#[async_trait]
impl Tool for SearchPeopleTool {
    fn name(&self) -> &'static str {
        "searchPeople"
    }

    fn description(&self) -> String {
        "Search TMDB for people in the film industry (actors, directors, etc.)".to_string()
    }

    fn input_schema(&self) -> Value {
        search_schema("Person name to search for")
    }

    async fn run(&self, input: Value) -> ToolOutput {
        run_search(&self.tmdb, "person", input).await
    }
}
