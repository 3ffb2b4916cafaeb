//! Environment-driven configuration

use crate::runtime::TurnSettings;
use crate::state_machine::MarkerPolicy;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 41241;
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings read once at startup
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub gemini_api_key: String,
    pub tmdb_api_key: String,
    pub port: u16,
    pub model: String,
    /// Base URL advertised in the agent card
    pub public_url: String,
    pub turns: TurnSettings,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let gemini_api_key = required("GEMINI_API_KEY")?;
        let tmdb_api_key = required("TMDB_API_KEY")?;

        let port = match var("MOVIE_AGENT_PORT") {
            Some(raw) => parse("MOVIE_AGENT_PORT", &raw)?,
            None => DEFAULT_PORT,
        };
        let model = var("MOVIE_AGENT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let public_url =
            var("MOVIE_AGENT_PUBLIC_URL").unwrap_or_else(|| format!("http://localhost:{port}/"));

        let model_timeout = match var("MOVIE_AGENT_MODEL_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = parse("MOVIE_AGENT_MODEL_TIMEOUT_SECS", &raw)?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };
        let interrupt_on_cancel = flag(&var, "MOVIE_AGENT_INTERRUPT_ON_CANCEL", false)?;
        let serialize_context_turns = flag(&var, "MOVIE_AGENT_SERIALIZE_CONTEXT_TURNS", true)?;
        let marker_policy = if flag(&var, "MOVIE_AGENT_STRICT_MARKER", false)? {
            MarkerPolicy::Strict
        } else {
            MarkerPolicy::Lenient
        };

        Ok(Self {
            gemini_api_key,
            tmdb_api_key,
            port,
            model,
            public_url,
            turns: TurnSettings {
                model_timeout,
                interrupt_on_cancel,
                serialize_context_turns,
                marker_policy,
            },
        })
    }
}

fn parse<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn flag(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = var(name) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw,
            reason: "expected a boolean".to_string(),
        }),
    }
}
