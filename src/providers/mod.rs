//! External AI collaborators: the action planner, the web searcher, and the
//! question generator. The orchestrator in `services::generation` only ever
//! talks to these traits; concrete backends live in the submodules.

pub mod canned;
#[cfg(feature = "llm-provider")]
pub mod http;

use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

/// A fully generated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuestion {
    /// The question text shown to players.
    pub question: String,
    /// The correct answer.
    pub correct: String,
    /// Exactly three plausible wrong answers.
    pub distractors: [String; 3],
}

/// A single web search result snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Result page title.
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Short text excerpt.
    pub snippet: String,
}

/// One completed search step kept in the orchestrator's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRecord {
    /// The query that was executed.
    pub query: String,
    /// The snippets it returned.
    pub hits: Vec<SearchHit>,
}

/// Next step chosen by the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    /// Run a web search with the given query before generating.
    Search {
        /// Query to execute.
        query: String,
    },
    /// Enough context gathered; generate the question now.
    Generate,
}

/// Error raised by any of the AI collaborators.
#[derive(Debug, Error)]
#[error("provider `{provider}` failed: {message}")]
pub struct ProviderError {
    /// Which collaborator failed ("planner", "search", "generator").
    pub provider: &'static str,
    /// Human-readable failure description.
    pub message: String,
}

impl ProviderError {
    /// Construct an error for the named collaborator.
    pub fn new(provider: &'static str, message: impl Into<String>) -> Self {
        Self {
            provider,
            message: message.into(),
        }
    }
}

/// Decides whether the orchestrator should search or generate next.
pub trait ActionPlanner: Send + Sync {
    /// Pick the next action given the loop position and the search history.
    fn decide(
        &self,
        step: u32,
        max_steps: u32,
        history: &[SearchRecord],
        prompt: &str,
    ) -> BoxFuture<'static, Result<PlannedAction, ProviderError>>;
}

/// Executes a web search and returns result snippets.
pub trait WebSearcher: Send + Sync {
    /// Run the query against the search backend.
    fn search(&self, query: &str) -> BoxFuture<'static, Result<Vec<SearchHit>, ProviderError>>;
}

/// Generates a trivia question from a player prompt and optional context.
pub trait QuestionGenerator: Send + Sync {
    /// Produce a question with one correct answer and three distractors.
    fn generate(
        &self,
        prompt: &str,
        context: Option<&str>,
    ) -> BoxFuture<'static, Result<GeneratedQuestion, ProviderError>>;
}

/// Bundle of the three collaborators handed to the orchestrator.
#[derive(Clone)]
pub struct Providers {
    /// Decides between searching and generating.
    pub planner: Arc<dyn ActionPlanner>,
    /// Web search backend.
    pub searcher: Arc<dyn WebSearcher>,
    /// Question generation backend.
    pub generator: Arc<dyn QuestionGenerator>,
}
