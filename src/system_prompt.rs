//! Movie expert prompt
//!
//! Rendered per invocation from the prompt arguments. The output instructions
//! define the terminal marker protocol decoded by
//! [`crate::state_machine::parse_reply`].

use crate::llm::PromptArgs;
use crate::state_machine::{AWAITING_USER_INPUT_MARKER, COMPLETED_MARKER};
use std::fmt::Write;

const BASE_PROMPT: &str = r"You are a movie expert. Answer the user's question about movies and film industry personalities, using the searchMovies and searchPeople tools to find out more information as needed. Feel free to call them multiple times in parallel if necessary.";

const SEARCH_GUIDANCE: &str = r"If the user asks you for specific information about a movie or person (such as the plot or a specific role an actor played), do a search for that movie/actor using the available functions before responding.";

/// Build the system prompt for one model invocation
pub fn build_system_prompt(args: &PromptArgs) -> String {
    let mut prompt = String::from(BASE_PROMPT);

    if let Some(goal) = args.goal.as_deref().filter(|g| !g.trim().is_empty()) {
        let _ = write!(prompt, "\n\nYour goal in this task is: {goal}");
    }

    let _ = write!(prompt, "\n\nThe current date and time is: {}", args.now);
    let _ = write!(prompt, "\n\n{SEARCH_GUIDANCE}");
    let _ = write!(
        prompt,
        "\n\n## Output Instructions\n\n\
         ALWAYS end your response with either \"{COMPLETED_MARKER}\" or \"{AWAITING_USER_INPUT_MARKER}\" on its own line. \
         If you have answered the user's question, use {COMPLETED_MARKER}. \
         If you need more information to answer the question, use {AWAITING_USER_INPUT_MARKER}."
    );

    prompt
}
