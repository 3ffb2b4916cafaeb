//! Discovery descriptor served at the well-known endpoint

use serde::{Deserialize, Serialize};

/// Protocol version the card advertises
pub const PROTOCOL_VERSION: &str = "0.3.0";

/// Self-describing manifest of the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub protocol_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,
    pub capabilities: AgentCapabilities,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub skills: Vec<AgentSkill>,
    pub supports_authenticated_extended_card: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProvider {
    pub organization: String,
    pub url: String,
}

/// Optional protocol features the agent supports
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
    pub state_transition_history: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub examples: Vec<String>,
    pub input_modes: Vec<String>,
    pub output_modes: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// The movie agent's card.
///
/// Streaming and state transition history are advertised because every turn
/// publishes a status event stream and context history is retained across turns.
pub fn movie_agent_card(url: &str) -> AgentCard {
    AgentCard {
        name: "Movie Agent".to_string(),
        description: "An agent that can answer questions about movies and actors using TMDB."
            .to_string(),
        url: url.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        provider: Some(AgentProvider {
            organization: "Movie Agent".to_string(),
            url: "https://www.themoviedb.org".to_string(),
        }),
        capabilities: AgentCapabilities {
            streaming: true,
            push_notifications: false,
            state_transition_history: true,
        },
        default_input_modes: strings(&["text"]),
        default_output_modes: strings(&["text", "task-status"]),
        skills: vec![AgentSkill {
            id: "general_movie_chat".to_string(),
            name: "General Movie Chat".to_string(),
            description: "Answer general questions or chat about movies, actors, directors."
                .to_string(),
            tags: strings(&["movies", "actors", "directors"]),
            examples: strings(&[
                "Tell me about the plot of Inception.",
                "Recommend a good sci-fi movie.",
                "Who directed The Matrix?",
                "What other movies has Scarlett Johansson been in?",
                "Find action movies starring Keanu Reeves",
                "Which came out first, Jurassic Park or Terminator 2?",
            ]),
            input_modes: strings(&["text"]),
            output_modes: strings(&["text", "task-status"]),
        }],
        supports_authenticated_extended_card: false,
    }
}
