//! The phase controller: the only writer of `session.phase`. Every host
//! action re-validates the current phase under the session gate before
//! touching anything.

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{RoundEntity, SessionEntity},
    dao::store::QuizStore,
    error::ServiceError,
    services::{
        answer_service::{self, LockOutcome},
        round_service, session_service,
    },
    state::{
        SharedState, epoch_ms,
        state_machine::{QuizEvent, QuizPhase, next_phase},
    },
};

/// Start the game: create round 0 with a random prompter and move the
/// session from the lobby into the prompting phase.
pub async fn start_game(
    state: &SharedState,
    caller: &str,
    session_id: Uuid,
) -> Result<(SessionEntity, RoundEntity), ServiceError> {
    let gate = state.session_gate(session_id);
    let _guard = gate.lock().await;

    let mut session = session_service::load_session(state, session_id).await?;
    session_service::require_owner(&session, caller)?;

    let next = next_phase(session.phase, QuizEvent::StartGame)?;
    let round = round_service::start_round(state, &mut session).await?;

    session.phase = next;
    state.store().update_session(session.clone()).await?;

    info!(%session_id, "game started");
    Ok((session, round))
}

/// What an `advance` call did.
#[derive(Debug)]
pub struct AdvanceOutcome {
    /// The session after the transition.
    pub session: SessionEntity,
    /// The freshly created round when moving scoreboard → prompting.
    pub new_round: Option<RoundEntity>,
}

/// Advance out of the reveal or scoreboard phase. From the scoreboard this
/// either starts the next round (incrementing the round index by exactly
/// one) or finishes the quiz when every round has been played.
pub async fn advance_phase(
    state: &SharedState,
    caller: &str,
    session_id: Uuid,
) -> Result<AdvanceOutcome, ServiceError> {
    let gate = state.session_gate(session_id);
    let _guard = gate.lock().await;

    let mut session = session_service::load_session(state, session_id).await?;
    session_service::require_owner(&session, caller)?;

    match session.phase {
        QuizPhase::Reveal => {
            session.phase = next_phase(session.phase, QuizEvent::ShowScoreboard)?;
            session.updated_at_ms = epoch_ms();
            state.store().update_session(session.clone()).await?;
            Ok(AdvanceOutcome {
                session,
                new_round: None,
            })
        }
        QuizPhase::Scoreboard => {
            if session.current_round_index + 1 < session.config.total_rounds {
                let next = next_phase(session.phase, QuizEvent::NextRound)?;
                session.current_round_index += 1;
                let round = round_service::start_round(state, &mut session).await?;
                session.phase = next;
                state.store().update_session(session.clone()).await?;
                Ok(AdvanceOutcome {
                    session,
                    new_round: Some(round),
                })
            } else {
                session.phase = next_phase(session.phase, QuizEvent::FinishQuiz)?;
                session.updated_at_ms = epoch_ms();
                state.store().update_session(session.clone()).await?;
                info!(%session_id, "quiz finished");
                Ok(AdvanceOutcome {
                    session,
                    new_round: None,
                })
            }
        }
        other => Err(ServiceError::WrongPhase(format!(
            "advance is not valid while in {other:?}"
        ))),
    }
}

/// Skip the current round: from the answering phase this behaves like a
/// host-initiated lock; from the generating phase (typically after a failed
/// generation) the round is completed without options.
pub async fn skip_round(
    state: &SharedState,
    caller: &str,
    session_id: Uuid,
) -> Result<SessionEntity, ServiceError> {
    let gate = state.session_gate(session_id);
    let _guard = gate.lock().await;

    let mut session = session_service::load_session(state, session_id).await?;
    session_service::require_owner(&session, caller)?;

    match session.phase {
        QuizPhase::Answering => {
            let round = session_service::active_round(state, &session).await?;
            answer_service::lock_answers_gated(state, session_id, round.id, None).await?;
            session_service::load_session(state, session_id).await
        }
        QuizPhase::Generating => {
            let mut round = session_service::active_round(state, &session).await?;
            let now = epoch_ms();
            round.completed_at_ms = Some(now);
            state.store().update_round(round).await?;

            session.phase = next_phase(session.phase, QuizEvent::SkipRound)?;
            session.updated_at_ms = now;
            state.store().update_session(session.clone()).await?;

            info!(%session_id, "round skipped during generation");
            Ok(session)
        }
        other => Err(ServiceError::WrongPhase(format!(
            "skip is not valid while in {other:?}"
        ))),
    }
}

/// Close the answering window ahead of the deadline on the host's request.
///
/// Returns the lock outcome unchanged: a host call that races the timer or
/// the all-answered job can legitimately observe `Skipped`.
pub async fn lock_answers_early(
    state: &SharedState,
    caller: &str,
    session_id: Uuid,
    round_id: Uuid,
) -> Result<LockOutcome, ServiceError> {
    let session = session_service::load_session(state, session_id).await?;
    session_service::require_owner(&session, caller)?;

    answer_service::lock_answers(state, session_id, round_id, None).await
}

/// End the quiz from any non-terminal phase, clearing both deadlines.
pub async fn end_quiz(
    state: &SharedState,
    caller: &str,
    session_id: Uuid,
) -> Result<SessionEntity, ServiceError> {
    let gate = state.session_gate(session_id);
    let _guard = gate.lock().await;

    let mut session = session_service::load_session(state, session_id).await?;
    session_service::require_owner(&session, caller)?;

    session.phase = next_phase(session.phase, QuizEvent::EndQuiz)?;
    session.answer_deadline_at_ms = None;
    session.prompt_deadline_at_ms = None;
    session.updated_at_ms = epoch_ms();
    state.store().update_session(session.clone()).await?;

    info!(%session_id, "quiz ended by host");
    Ok(session)
}
