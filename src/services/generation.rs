//! The AI generation orchestrator: a bounded decide/search/generate loop
//! running outside the mutation gates, with every write-back re-validated
//! by the round lifecycle functions.

use std::time::Duration;

use rand::seq::SliceRandom;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::models::AnswerOptionEntity,
    providers::{
        ActionPlanner, GeneratedQuestion, PlannedAction, QuestionGenerator, SearchRecord,
        WebSearcher,
    },
    scheduler::DeadlineScheduler,
    services::round_service::{self, RecordOutcome},
    state::SharedState,
};

/// Enqueue a generation run for a freshly prompted round.
///
/// Goes through the scheduler rather than spawning directly so the caller's
/// commit and the enqueue stay two separate steps, and so tests can drive
/// the orchestrator deterministically.
pub fn enqueue(state: &SharedState, session_id: Uuid, round_id: Uuid, prompt: String) {
    let scheduler = state.scheduler().clone();
    let state = state.clone();
    scheduler.schedule(
        Duration::ZERO,
        Box::pin(async move {
            run(state, session_id, round_id, prompt).await;
        }),
    );
}

/// Run the bounded decide/search/generate loop for one round.
///
/// Search and planner failures abandon the research phase and fall through
/// to generation with whatever context was gathered; an exhausted step
/// budget forces one final context-free generation. Only a *generation*
/// failure marks the round errored.
pub async fn run(state: SharedState, session_id: Uuid, round_id: Uuid, prompt: String) {
    let providers = state.providers().clone();
    let max_steps = state.config().max_generation_steps;

    let mut history: Vec<SearchRecord> = Vec::new();
    let mut context: Option<String> = None;
    let mut exhausted = true;

    for step in 0..max_steps {
        match providers
            .planner
            .decide(step, max_steps, &history, &prompt)
            .await
        {
            Ok(PlannedAction::Generate) => {
                context = build_context(&history);
                exhausted = false;
                break;
            }
            Ok(PlannedAction::Search { query }) => {
                match providers.searcher.search(&query).await {
                    Ok(hits) => {
                        debug!(%session_id, %query, hits = hits.len(), "search step completed");
                        history.push(SearchRecord { query, hits });
                    }
                    Err(err) => {
                        warn!(%session_id, error = %err, "search failed, generating with current context");
                        context = build_context(&history);
                        exhausted = false;
                        break;
                    }
                }
            }
            Err(err) => {
                warn!(%session_id, error = %err, "planner failed, generating with current context");
                context = build_context(&history);
                exhausted = false;
                break;
            }
        }
    }

    if exhausted {
        // Step budget ran out without a generate decision: one unconditional
        // generation with no search context.
        debug!(%session_id, %round_id, "step budget exhausted, forcing generation");
        context = None;
    }

    let generated = match providers.generator.generate(&prompt, context.as_deref()).await {
        Ok(generated) => generated,
        Err(err) => {
            if let Err(mark_err) =
                round_service::mark_errored(&state, session_id, round_id, &err.to_string()).await
            {
                warn!(%session_id, %round_id, error = %mark_err, "failed to mark round errored");
            }
            return;
        }
    };

    let options = state.with_rand(|rng| build_options(&generated, rng));

    match round_service::record_answer_options(
        &state,
        session_id,
        round_id,
        generated.question,
        options,
    )
    .await
    {
        Ok(RecordOutcome::Recorded { deadline_ms }) => {
            debug!(%session_id, %round_id, deadline_ms, "generation completed");
        }
        Ok(RecordOutcome::Skipped) => {
            debug!(%session_id, %round_id, "session moved on mid-generation, result dropped");
        }
        Err(err) => {
            warn!(%session_id, %round_id, error = %err, "failed to record answer options");
        }
    }
}

/// Flatten the search history into a context block for the generator.
/// Returns `None` when no snippets were gathered.
fn build_context(history: &[SearchRecord]) -> Option<String> {
    let mut lines = Vec::new();
    for record in history {
        for hit in &record.hits {
            lines.push(format!("- {}: {}", hit.title, hit.snippet));
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Build the four answer options (one correct, three distractors) and
/// shuffle them with an unbiased Fisher–Yates permutation.
fn build_options(generated: &GeneratedQuestion, rng: &mut impl rand::Rng) -> Vec<AnswerOptionEntity> {
    let mut options = Vec::with_capacity(4);
    options.push(AnswerOptionEntity {
        id: Uuid::new_v4(),
        text: generated.correct.clone(),
        is_correct: true,
    });
    for distractor in &generated.distractors {
        options.push(AnswerOptionEntity {
            id: Uuid::new_v4(),
            text: distractor.clone(),
            is_correct: false,
        });
    }

    options.shuffle(rng);
    options
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::providers::SearchHit;

    fn sample_question() -> GeneratedQuestion {
        GeneratedQuestion {
            question: "Which planet is known as the red planet?".into(),
            correct: "Mars".into(),
            distractors: ["Venus".into(), "Jupiter".into(), "Mercury".into()],
        }
    }

    #[test]
    fn build_options_has_exactly_one_correct_entry() {
        let mut rng = StdRng::seed_from_u64(7);
        let options = build_options(&sample_question(), &mut rng);
        assert_eq!(options.len(), 4);
        assert_eq!(options.iter().filter(|option| option.is_correct).count(), 1);
        let correct = options.iter().find(|option| option.is_correct).unwrap();
        assert_eq!(correct.text, "Mars");
    }

    #[test]
    fn build_options_is_deterministic_for_a_fixed_seed() {
        let order = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            build_options(&sample_question(), &mut rng)
                .into_iter()
                .map(|option| option.text)
                .collect::<Vec<_>>()
        };
        assert_eq!(order(42), order(42));
    }

    #[test]
    fn build_context_skips_empty_history() {
        assert_eq!(build_context(&[]), None);
        let empty_record = SearchRecord {
            query: "mars facts".into(),
            hits: Vec::new(),
        };
        assert_eq!(build_context(&[empty_record]), None);
    }

    #[test]
    fn build_context_joins_snippets_across_records() {
        let history = vec![
            SearchRecord {
                query: "mars".into(),
                hits: vec![SearchHit {
                    title: "Mars".into(),
                    url: "https://example.com/mars".into(),
                    snippet: "Fourth planet".into(),
                }],
            },
            SearchRecord {
                query: "red planet".into(),
                hits: vec![SearchHit {
                    title: "Red Planet".into(),
                    url: "https://example.com/red".into(),
                    snippet: "Iron oxide surface".into(),
                }],
            },
        ];
        let context = build_context(&history).unwrap();
        assert!(context.contains("Fourth planet"));
        assert!(context.contains("Iron oxide surface"));
    }
}
