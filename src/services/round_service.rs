//! Round lifecycle: prompter selection, prompt capture, recording the
//! generated answer set, and the errored-generation marker.

use rand::seq::IndexedRandom;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{AnswerOptionEntity, RoundEntity, SessionEntity},
    dao::store::QuizStore,
    error::ServiceError,
    services::{answer_service, generation, session_service},
    state::{
        SharedState, epoch_ms,
        state_machine::{QuizEvent, QuizPhase, next_phase},
    },
};

/// Shortest prompt accepted, after trimming.
const MIN_PROMPT_CHARS: usize = 5;
/// Longest prompt accepted, after trimming.
const MAX_PROMPT_CHARS: usize = 500;
/// Number of answer options every round must end up with.
pub(crate) const OPTIONS_PER_ROUND: usize = 4;

/// Create the round at `session.current_round_index` with a random prompter
/// and stamp the prompt deadline onto the session.
///
/// The caller owns the session row: it sets the phase and persists the
/// session after this returns. Fails with [`ServiceError::NoPlayersAvailable`]
/// when no non-host player is left, in which case the caller must not
/// transition the phase.
pub(crate) async fn start_round(
    state: &SharedState,
    session: &mut SessionEntity,
) -> Result<RoundEntity, ServiceError> {
    let candidates = session_service::eligible_players(state, session.id).await?;
    let prompter = state
        .with_rand(|rng| candidates.choose(rng).cloned())
        .ok_or(ServiceError::NoPlayersAvailable)?;

    let round = RoundEntity {
        id: Uuid::new_v4(),
        session_id: session.id,
        round_index: session.current_round_index,
        prompter_player_id: prompter.id,
        prompt_text: None,
        question_text: None,
        answer_options: None,
        errored: false,
        completed_at_ms: None,
    };
    state.store().insert_round(round.clone()).await?;

    let now = epoch_ms();
    session.prompt_deadline_at_ms =
        Some(now + i64::from(session.config.seconds_for_prompt) * 1000);
    session.updated_at_ms = now;

    info!(
        session_id = %session.id,
        round_index = round.round_index,
        prompter = %prompter.id,
        "round started"
    );
    Ok(round)
}

/// Record the prompter's topic, move to the generating phase, and enqueue
/// the AI orchestrator once the state change is committed.
pub async fn submit_prompt(
    state: &SharedState,
    session_id: Uuid,
    round_id: Uuid,
    fingerprint: &str,
    text: &str,
) -> Result<RoundEntity, ServiceError> {
    let gate = state.session_gate(session_id);
    let _guard = gate.lock().await;

    let mut session = session_service::load_session(state, session_id).await?;
    if session.phase != QuizPhase::Prompting {
        return Err(ServiceError::WrongPhase(format!(
            "prompts are not accepted while in {:?}",
            session.phase
        )));
    }

    let mut round = session_service::active_round(state, &session).await?;
    if round.id != round_id {
        return Err(ServiceError::WrongPhase(
            "this round is no longer active".into(),
        ));
    }

    let player = session_service::find_caller_player(state, &session, fingerprint).await?;
    if player.id != round.prompter_player_id {
        return Err(ServiceError::Unauthorized(
            "only the selected prompter may submit the topic".into(),
        ));
    }

    let text = text.trim();
    let length = text.chars().count();
    if !(MIN_PROMPT_CHARS..=MAX_PROMPT_CHARS).contains(&length) {
        return Err(ServiceError::InvalidInput(format!(
            "prompt must be between {MIN_PROMPT_CHARS} and {MAX_PROMPT_CHARS} characters"
        )));
    }

    round.prompt_text = Some(text.to_owned());
    state.store().update_round(round.clone()).await?;

    session.phase = next_phase(session.phase, QuizEvent::PromptSubmitted)?;
    session.prompt_deadline_at_ms = None;
    session.updated_at_ms = epoch_ms();
    state.store().update_session(session).await?;

    // Commit first, enqueue second: the orchestrator runs outside the gate
    // and re-validates before every write.
    generation::enqueue(state, session_id, round_id, text.to_owned());

    Ok(round)
}

/// Outcome of an orchestrator write-back. `Skipped` means the session moved
/// on (host skip or end) while generation was in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Options were stored and the answering window opened.
    Recorded {
        /// The answering deadline stamped onto the session (epoch ms).
        deadline_ms: i64,
    },
    /// The round was no longer waiting for options.
    Skipped,
}

/// Store the generated answer set, open the answering window, and schedule
/// the deadline timeout for the exact stored deadline value.
pub async fn record_answer_options(
    state: &SharedState,
    session_id: Uuid,
    round_id: Uuid,
    question_text: String,
    options: Vec<AnswerOptionEntity>,
) -> Result<RecordOutcome, ServiceError> {
    if options.len() != OPTIONS_PER_ROUND
        || options.iter().filter(|option| option.is_correct).count() != 1
    {
        return Err(ServiceError::InvalidInput(
            "a round needs exactly 4 options with exactly one correct".into(),
        ));
    }

    let gate = state.session_gate(session_id);
    let _guard = gate.lock().await;

    let Some(mut session) = state.store().find_session(session_id).await? else {
        return Ok(RecordOutcome::Skipped);
    };
    if session.phase != QuizPhase::Generating {
        return Ok(RecordOutcome::Skipped);
    }

    let Some(mut round) = state.store().find_round(round_id).await? else {
        return Ok(RecordOutcome::Skipped);
    };
    if round.round_index != session.current_round_index || round.completed_at_ms.is_some() {
        return Ok(RecordOutcome::Skipped);
    }

    round.question_text = Some(question_text);
    round.answer_options = Some(options);
    state.store().update_round(round).await?;

    let now = epoch_ms();
    let deadline_ms = now + i64::from(session.config.seconds_per_question) * 1000;
    session.phase = next_phase(session.phase, QuizEvent::OptionsReady)?;
    session.answer_deadline_at_ms = Some(deadline_ms);
    session.updated_at_ms = now;
    state.store().update_session(session).await?;

    answer_service::schedule_answer_timeout(state, session_id, round_id, deadline_ms);

    info!(%session_id, %round_id, deadline_ms, "answer options recorded, answering open");
    Ok(RecordOutcome::Recorded { deadline_ms })
}

/// Flag the round as errored after a failed generation.
///
/// The session deliberately stays in the generating phase: recovery is
/// host-driven (skip or end), never an automatic retry against a provider
/// that may keep failing.
pub async fn mark_errored(
    state: &SharedState,
    session_id: Uuid,
    round_id: Uuid,
    reason: &str,
) -> Result<bool, ServiceError> {
    let gate = state.session_gate(session_id);
    let _guard = gate.lock().await;

    let Some(session) = state.store().find_session(session_id).await? else {
        return Ok(false);
    };
    if session.phase != QuizPhase::Generating {
        return Ok(false);
    }

    let Some(mut round) = state.store().find_round(round_id).await? else {
        return Ok(false);
    };
    if round.round_index != session.current_round_index {
        return Ok(false);
    }

    round.errored = true;
    state.store().update_round(round).await?;

    warn!(%session_id, %round_id, %reason, "generation failed, waiting for host");
    Ok(true)
}
