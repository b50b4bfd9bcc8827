//! Offline collaborators used when no AI endpoint is configured, and by the
//! integration tests. Deterministic on purpose.

use std::sync::Arc;

use futures::future::{self, BoxFuture};

use super::{
    ActionPlanner, GeneratedQuestion, PlannedAction, ProviderError, Providers, QuestionGenerator,
    SearchHit, SearchRecord, WebSearcher,
};

/// Planner that never searches: the first decision is already `Generate`.
#[derive(Debug, Default)]
pub struct CannedPlanner;

impl ActionPlanner for CannedPlanner {
    fn decide(
        &self,
        _step: u32,
        _max_steps: u32,
        _history: &[SearchRecord],
        _prompt: &str,
    ) -> BoxFuture<'static, Result<PlannedAction, ProviderError>> {
        Box::pin(future::ready(Ok(PlannedAction::Generate)))
    }
}

/// Searcher that returns no hits.
#[derive(Debug, Default)]
pub struct CannedSearcher;

impl WebSearcher for CannedSearcher {
    fn search(&self, _query: &str) -> BoxFuture<'static, Result<Vec<SearchHit>, ProviderError>> {
        Box::pin(future::ready(Ok(Vec::new())))
    }
}

/// Generator that derives a placeholder question from the prompt text.
#[derive(Debug, Default)]
pub struct CannedGenerator;

impl QuestionGenerator for CannedGenerator {
    fn generate(
        &self,
        prompt: &str,
        _context: Option<&str>,
    ) -> BoxFuture<'static, Result<GeneratedQuestion, ProviderError>> {
        let topic = prompt.trim().to_owned();
        Box::pin(future::ready(Ok(GeneratedQuestion {
            question: format!("Which statement about \"{topic}\" is true?"),
            correct: format!("The one fact about {topic} everyone agrees on"),
            distractors: [
                format!("A common misconception about {topic}"),
                format!("Something unrelated to {topic}"),
                format!("A myth about {topic}"),
            ],
        })))
    }
}

/// Assemble the full offline provider bundle.
pub fn providers() -> Providers {
    Providers {
        planner: Arc::new(CannedPlanner),
        searcher: Arc::new(CannedSearcher),
        generator: Arc::new(CannedGenerator),
    }
}
