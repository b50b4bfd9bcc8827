//! Answer ingestion: validated, deduplicated submission plus the idempotent
//! lock path shared by the deadline timer, the "everyone answered" race, and
//! the host's early lock.

use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{PlayerAnswerEntity, RoundEntity, SessionEntity},
    dao::store::QuizStore,
    error::ServiceError,
    scheduler::DeadlineScheduler,
    services::{scoring, session_service},
    state::{
        SharedState, epoch_ms,
        state_machine::{QuizEvent, QuizPhase, next_phase},
    },
};

/// Result of a successful answer submission.
#[derive(Debug)]
pub struct SubmittedAnswer {
    /// The recorded answer row.
    pub answer: PlayerAnswerEntity,
    /// Whether this submission completed the round for all eligible players.
    pub all_answered: bool,
}

/// Outcome of a lock attempt. `Skipped` is a successful no-op, not an error:
/// the phase had already moved on when the call ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// The round was locked by this call.
    Locked {
        /// Number of synthetic "no answer" rows created.
        synthesized: usize,
    },
    /// The round was already locked (or the deadline was stale).
    Skipped,
}

/// Record one player's answer for the active round, exactly once.
pub async fn submit_answer(
    state: &SharedState,
    session_id: Uuid,
    round_id: Uuid,
    fingerprint: &str,
    option_id: Uuid,
) -> Result<SubmittedAnswer, ServiceError> {
    let gate = state.session_gate(session_id);
    let _guard = gate.lock().await;

    let session = session_service::load_session(state, session_id).await?;
    if session.phase != QuizPhase::Answering {
        return Err(ServiceError::WrongPhase(format!(
            "answers are not accepted while in {:?}",
            session.phase
        )));
    }

    let round = session_service::active_round(state, &session).await?;
    if round.id != round_id {
        return Err(ServiceError::WrongPhase(
            "this round is no longer active".into(),
        ));
    }

    let player = session_service::find_caller_player(state, &session, fingerprint).await?;
    if player.is_host {
        return Err(ServiceError::Unauthorized("the host cannot answer".into()));
    }

    let Some(option) = round.option(option_id) else {
        return Err(ServiceError::InvalidInput(format!(
            "option `{option_id}` does not belong to this round"
        )));
    };

    // Dedup check and insert happen under the session gate, so two
    // concurrent submissions for the same player cannot both pass.
    if state
        .store()
        .find_answer(player.id, round.id)
        .await?
        .is_some()
    {
        return Err(ServiceError::AlreadyAnswered);
    }

    let now = epoch_ms();
    let deadline = session.answer_deadline_at_ms.unwrap_or(now);
    let awarded = scoring::score(
        option.is_correct,
        deadline,
        session.config.seconds_per_question,
        now,
    );

    let answer = PlayerAnswerEntity {
        id: Uuid::new_v4(),
        session_id,
        round_id: round.id,
        player_id: player.id,
        selected_option_id: Some(option_id),
        is_correct: option.is_correct,
        submitted_at_ms: now,
    };
    state.store().insert_answer(answer.clone()).await?;

    let mut player = player;
    player.score += awarded;
    player.last_seen_at_ms = now;
    state.store().update_player(player.clone()).await?;

    debug!(
        session_id = %session_id,
        player_id = %player.id,
        awarded,
        "answer recorded"
    );

    let all_answered = maybe_schedule_all_answered(state, &session).await?;

    Ok(SubmittedAnswer {
        answer,
        all_answered,
    })
}

/// Re-count eligible players against recorded answers and, when everyone
/// has answered, enqueue a zero-delay lock for the current deadline.
///
/// Idempotent with the deadline timer: both funnel into [`lock_answers`],
/// and whichever runs second observes the phase has moved and no-ops.
pub(crate) async fn maybe_schedule_all_answered(
    state: &SharedState,
    session: &SessionEntity,
) -> Result<bool, ServiceError> {
    let round = session_service::active_round(state, session).await?;
    let eligible = session_service::eligible_players(state, session.id).await?;
    let answers = state.store().answers_by_round(round.id).await?;

    if eligible.is_empty() || answers.len() < eligible.len() {
        return Ok(false);
    }

    debug!(session_id = %session.id, round_id = %round.id, "all players answered");
    schedule_lock(
        state,
        session.id,
        round.id,
        session.answer_deadline_at_ms,
        Duration::ZERO,
    );
    Ok(true)
}

/// Schedule the answering-phase timeout for the exact deadline value stored
/// on the session.
pub(crate) fn schedule_answer_timeout(
    state: &SharedState,
    session_id: Uuid,
    round_id: Uuid,
    deadline_ms: i64,
) {
    let delay_ms = (deadline_ms - epoch_ms()).max(0) as u64;
    schedule_lock(
        state,
        session_id,
        round_id,
        Some(deadline_ms),
        Duration::from_millis(delay_ms),
    );
}

fn schedule_lock(
    state: &SharedState,
    session_id: Uuid,
    round_id: Uuid,
    expected_deadline_ms: Option<i64>,
    delay: Duration,
) {
    let scheduler = state.scheduler().clone();
    let state = state.clone();
    scheduler.schedule(
        delay,
        Box::pin(async move {
            match lock_answers(&state, session_id, round_id, expected_deadline_ms).await {
                Ok(LockOutcome::Locked { synthesized }) => {
                    debug!(%session_id, %round_id, synthesized, "round locked by deferred job");
                }
                Ok(LockOutcome::Skipped) => {
                    debug!(%session_id, %round_id, "deferred lock was stale, skipped");
                }
                Err(err) => {
                    warn!(%session_id, %round_id, error = %err, "deferred lock failed");
                }
            }
        }),
    );
}

/// Close the answering window: synthesize zero-point answers for everyone
/// who never submitted, complete the round, and move to the reveal.
///
/// Safe to call twice, concurrently or sequentially. When `expected_deadline`
/// is set (timer path) the lock only proceeds if it still matches the
/// session's current deadline; stale timers become silent no-ops.
pub async fn lock_answers(
    state: &SharedState,
    session_id: Uuid,
    round_id: Uuid,
    expected_deadline_ms: Option<i64>,
) -> Result<LockOutcome, ServiceError> {
    let gate = state.session_gate(session_id);
    let _guard = gate.lock().await;

    lock_answers_gated(state, session_id, round_id, expected_deadline_ms).await
}

/// Lock body shared with the host skip path, which already holds the gate.
pub(crate) async fn lock_answers_gated(
    state: &SharedState,
    session_id: Uuid,
    round_id: Uuid,
    expected_deadline_ms: Option<i64>,
) -> Result<LockOutcome, ServiceError> {
    let Some(mut session) = state.store().find_session(session_id).await? else {
        return Ok(LockOutcome::Skipped);
    };

    if session.phase != QuizPhase::Answering {
        return Ok(LockOutcome::Skipped);
    }

    if let Some(expected) = expected_deadline_ms
        && session.answer_deadline_at_ms != Some(expected)
    {
        return Ok(LockOutcome::Skipped);
    }

    let Some(mut round) = state.store().find_round(round_id).await? else {
        return Ok(LockOutcome::Skipped);
    };
    if round.session_id != session_id || round.round_index != session.current_round_index {
        return Ok(LockOutcome::Skipped);
    }

    let synthesized = synthesize_missing_answers(state, &session, &round).await?;

    let now = epoch_ms();
    round.completed_at_ms = Some(now);
    state.store().update_round(round).await?;

    session.phase = next_phase(session.phase, QuizEvent::LockAnswers)?;
    session.answer_deadline_at_ms = None;
    session.updated_at_ms = now;
    state.store().update_session(session).await?;

    info!(%session_id, %round_id, synthesized, "answers locked, revealing");
    Ok(LockOutcome::Locked { synthesized })
}

/// Insert a zero-point "no answer" row for every eligible player without one.
pub(crate) async fn synthesize_missing_answers(
    state: &SharedState,
    session: &SessionEntity,
    round: &RoundEntity,
) -> Result<usize, ServiceError> {
    let eligible = session_service::eligible_players(state, session.id).await?;
    let answers = state.store().answers_by_round(round.id).await?;
    let now = epoch_ms();

    let mut synthesized = 0;
    for player in eligible {
        if answers.iter().any(|answer| answer.player_id == player.id) {
            continue;
        }
        let blank = PlayerAnswerEntity {
            id: Uuid::new_v4(),
            session_id: session.id,
            round_id: round.id,
            player_id: player.id,
            selected_option_id: None,
            is_correct: false,
            submitted_at_ms: now,
        };
        state.store().insert_answer(blank).await?;
        synthesized += 1;
    }

    Ok(synthesized)
}
