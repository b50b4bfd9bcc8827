//! HTTP-backed collaborators: an OpenAI-compatible chat endpoint for the
//! planner and generator, and a SearxNG-style endpoint for web search.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{
    ActionPlanner, GeneratedQuestion, PlannedAction, ProviderError, Providers, QuestionGenerator,
    SearchHit, SearchRecord, WebSearcher,
};

/// Environment variable holding the chat completions base URL.
pub const CHAT_BASE_URL_ENV: &str = "QUIZ_CHAT_BASE_URL";
/// Environment variable holding the chat API key.
pub const CHAT_API_KEY_ENV: &str = "QUIZ_CHAT_API_KEY";
/// Environment variable holding the chat model name.
pub const CHAT_MODEL_ENV: &str = "QUIZ_CHAT_MODEL";
/// Environment variable holding the search base URL.
pub const SEARCH_BASE_URL_ENV: &str = "QUIZ_SEARCH_BASE_URL";

/// Connection settings for the chat endpoint.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base URL up to and excluding `/chat/completions`.
    pub base_url: String,
    /// Bearer token, if the endpoint requires one.
    pub api_key: Option<String>,
    /// Model identifier passed on every request.
    pub model: String,
}

/// Planner + generator talking to an OpenAI-compatible chat endpoint.
#[derive(Clone)]
pub struct ChatProvider {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatProvider {
    /// Build a provider with a fresh HTTP client.
    pub fn new(config: ChatConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Build the provider bundle from environment variables, or `None` when
    /// no chat endpoint is configured (callers fall back to the canned set).
    pub fn providers_from_env() -> Option<Providers> {
        let base_url = std::env::var(CHAT_BASE_URL_ENV).ok()?;
        let config = ChatConfig {
            base_url,
            api_key: std::env::var(CHAT_API_KEY_ENV).ok(),
            model: std::env::var(CHAT_MODEL_ENV).unwrap_or_else(|_| "gpt-4o-mini".into()),
        };
        let chat = Arc::new(ChatProvider::new(config));

        let searcher: Arc<dyn WebSearcher> = match std::env::var(SEARCH_BASE_URL_ENV) {
            Ok(url) => Arc::new(SearxSearcher::new(url)),
            Err(_) => Arc::new(super::canned::CannedSearcher),
        };

        Some(Providers {
            planner: chat.clone(),
            searcher,
            generator: chat,
        })
    }

    async fn complete(&self, system: String, user: String) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": 0.7,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ProviderError::new("chat", err.to_string()))?
            .error_for_status()
            .map_err(|err| ProviderError::new("chat", err.to_string()))?;

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|err| ProviderError::new("chat", err.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::new("chat", "completion returned no choices"))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct PlannerReply {
    action: String,
    #[serde(default)]
    search_query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratorReply {
    question: String,
    correct: String,
    distractors: Vec<String>,
}

/// Strip markdown code fences some models wrap around JSON replies.
fn strip_fences(content: &str) -> &str {
    content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

impl ActionPlanner for ChatProvider {
    fn decide(
        &self,
        step: u32,
        max_steps: u32,
        history: &[SearchRecord],
        prompt: &str,
    ) -> BoxFuture<'static, Result<PlannedAction, ProviderError>> {
        let this = self.clone();
        let queries: Vec<String> = history.iter().map(|record| record.query.clone()).collect();
        let prompt = prompt.to_owned();

        Box::pin(async move {
            let system = "You plan research for a trivia question. Reply with JSON only: \
                          {\"action\":\"search\",\"search_query\":\"...\"} or {\"action\":\"generate\"}."
                .to_owned();
            let user = format!(
                "Topic: {prompt}\nStep {step} of {max_steps}. Searches already done: {queries:?}. \
                 Decide whether one more search would improve the question."
            );
            let content = this.complete(system, user).await?;
            let reply: PlannerReply = serde_json::from_str(strip_fences(&content))
                .map_err(|err| ProviderError::new("planner", err.to_string()))?;

            debug!(action = %reply.action, "planner decided next step");
            match reply.action.as_str() {
                "search" => {
                    let query = reply.search_query.unwrap_or_else(|| prompt.clone());
                    Ok(PlannedAction::Search { query })
                }
                _ => Ok(PlannedAction::Generate),
            }
        })
    }
}

impl QuestionGenerator for ChatProvider {
    fn generate(
        &self,
        prompt: &str,
        context: Option<&str>,
    ) -> BoxFuture<'static, Result<GeneratedQuestion, ProviderError>> {
        let this = self.clone();
        let prompt = prompt.to_owned();
        let context = context.map(str::to_owned);

        Box::pin(async move {
            let system = "You write one multiple-choice trivia question. Reply with JSON only: \
                          {\"question\":\"...\",\"correct\":\"...\",\"distractors\":[\"...\",\"...\",\"...\"]}."
                .to_owned();
            let user = match context {
                Some(context) => format!("Topic: {prompt}\nResearch notes:\n{context}"),
                None => format!("Topic: {prompt}"),
            };
            let content = this.complete(system, user).await?;
            let reply: GeneratorReply = serde_json::from_str(strip_fences(&content))
                .map_err(|err| ProviderError::new("generator", err.to_string()))?;

            let distractors: [String; 3] = reply.distractors.try_into().map_err(|got: Vec<_>| {
                ProviderError::new(
                    "generator",
                    format!("expected exactly 3 distractors, got {}", got.len()),
                )
            })?;

            Ok(GeneratedQuestion {
                question: reply.question,
                correct: reply.correct,
                distractors,
            })
        })
    }
}

/// Web search against a SearxNG-compatible JSON endpoint.
#[derive(Clone)]
pub struct SearxSearcher {
    client: reqwest::Client,
    base_url: String,
}

impl SearxSearcher {
    /// Build a searcher for the given instance base URL.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearxResponse {
    results: Vec<SearxResult>,
}

#[derive(Debug, Deserialize)]
struct SearxResult {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl WebSearcher for SearxSearcher {
    fn search(&self, query: &str) -> BoxFuture<'static, Result<Vec<SearchHit>, ProviderError>> {
        let this = self.clone();
        let query = query.to_owned();

        Box::pin(async move {
            let url = format!("{}/search", this.base_url.trim_end_matches('/'));
            let response = this
                .client
                .get(&url)
                .query(&[("q", query.as_str()), ("format", "json")])
                .send()
                .await
                .map_err(|err| ProviderError::new("search", err.to_string()))?
                .error_for_status()
                .map_err(|err| ProviderError::new("search", err.to_string()))?;

            let payload: SearxResponse = response
                .json()
                .await
                .map_err(|err| ProviderError::new("search", err.to_string()))?;

            Ok(payload
                .results
                .into_iter()
                .take(5)
                .map(|result| SearchHit {
                    title: result.title,
                    url: result.url,
                    snippet: result.content,
                })
                .collect())
        })
    }
}
