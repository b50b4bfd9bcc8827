use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Phases a quiz session moves through, in gameplay order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    /// Players are joining; the game has not started yet.
    Lobby,
    /// The selected prompter is writing the topic for the current round.
    Prompting,
    /// The AI orchestrator is producing the answer options.
    Generating,
    /// Players are answering against the round deadline.
    Answering,
    /// The correct answer is shown to everyone.
    Reveal,
    /// Intermediate standings are displayed between rounds.
    Scoreboard,
    /// The quiz is over; no further transitions are possible.
    Finished,
}

impl QuizPhase {
    /// Whether the session can still accept transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, QuizPhase::Finished)
    }
}

/// Events that can be applied to a session's phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizEvent {
    /// Host starts the game from the lobby.
    StartGame,
    /// The round prompter submitted a topic.
    PromptSubmitted,
    /// The AI orchestrator recorded the answer options.
    OptionsReady,
    /// The answering window closed (timeout, all answered, or host lock).
    LockAnswers,
    /// Host skips the current round, from generation or answering.
    SkipRound,
    /// Host advances from the reveal to the scoreboard.
    ShowScoreboard,
    /// Host advances from the scoreboard into the next round.
    NextRound,
    /// Host advances from the scoreboard of the last round.
    FinishQuiz,
    /// Host ends the quiz from any non-terminal phase.
    EndQuiz,
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the session was in when the invalid event was received.
    pub from: QuizPhase,
    /// The event that cannot be applied from this phase.
    pub event: QuizEvent,
}

/// Compute the phase an event leads to, or reject it.
///
/// This is the whole transition table; the phase controller in
/// `services::phase_service` is the only caller that persists the result.
pub fn next_phase(from: QuizPhase, event: QuizEvent) -> Result<QuizPhase, InvalidTransition> {
    let next = match (from, event) {
        (QuizPhase::Lobby, QuizEvent::StartGame) => QuizPhase::Prompting,
        (QuizPhase::Prompting, QuizEvent::PromptSubmitted) => QuizPhase::Generating,
        (QuizPhase::Generating, QuizEvent::OptionsReady) => QuizPhase::Answering,
        (QuizPhase::Answering, QuizEvent::LockAnswers) => QuizPhase::Reveal,
        (QuizPhase::Generating | QuizPhase::Answering, QuizEvent::SkipRound) => QuizPhase::Reveal,
        (QuizPhase::Reveal, QuizEvent::ShowScoreboard) => QuizPhase::Scoreboard,
        (QuizPhase::Scoreboard, QuizEvent::NextRound) => QuizPhase::Prompting,
        (QuizPhase::Scoreboard, QuizEvent::FinishQuiz) => QuizPhase::Finished,
        (from, QuizEvent::EndQuiz) if !from.is_terminal() => QuizPhase::Finished,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(phase: QuizPhase, event: QuizEvent) -> QuizPhase {
        next_phase(phase, event).unwrap()
    }

    #[test]
    fn full_happy_path_through_one_round() {
        let mut phase = QuizPhase::Lobby;
        phase = advance(phase, QuizEvent::StartGame);
        assert_eq!(phase, QuizPhase::Prompting);
        phase = advance(phase, QuizEvent::PromptSubmitted);
        assert_eq!(phase, QuizPhase::Generating);
        phase = advance(phase, QuizEvent::OptionsReady);
        assert_eq!(phase, QuizPhase::Answering);
        phase = advance(phase, QuizEvent::LockAnswers);
        assert_eq!(phase, QuizPhase::Reveal);
        phase = advance(phase, QuizEvent::ShowScoreboard);
        assert_eq!(phase, QuizPhase::Scoreboard);
        assert_eq!(
            advance(phase, QuizEvent::NextRound),
            QuizPhase::Prompting,
            "scoreboard loops back into the next round"
        );
        assert_eq!(advance(phase, QuizEvent::FinishQuiz), QuizPhase::Finished);
    }

    #[test]
    fn skip_round_is_valid_from_generating_and_answering() {
        assert_eq!(
            advance(QuizPhase::Generating, QuizEvent::SkipRound),
            QuizPhase::Reveal
        );
        assert_eq!(
            advance(QuizPhase::Answering, QuizEvent::SkipRound),
            QuizPhase::Reveal
        );
        assert!(next_phase(QuizPhase::Lobby, QuizEvent::SkipRound).is_err());
    }

    #[test]
    fn end_quiz_is_valid_from_every_non_terminal_phase() {
        for phase in [
            QuizPhase::Lobby,
            QuizPhase::Prompting,
            QuizPhase::Generating,
            QuizPhase::Answering,
            QuizPhase::Reveal,
            QuizPhase::Scoreboard,
        ] {
            assert_eq!(advance(phase, QuizEvent::EndQuiz), QuizPhase::Finished);
        }
    }

    #[test]
    fn finished_rejects_everything() {
        for event in [
            QuizEvent::StartGame,
            QuizEvent::PromptSubmitted,
            QuizEvent::OptionsReady,
            QuizEvent::LockAnswers,
            QuizEvent::SkipRound,
            QuizEvent::ShowScoreboard,
            QuizEvent::NextRound,
            QuizEvent::FinishQuiz,
            QuizEvent::EndQuiz,
        ] {
            let err = next_phase(QuizPhase::Finished, event).unwrap_err();
            assert_eq!(err.from, QuizPhase::Finished);
            assert_eq!(err.event, event);
        }
    }

    #[test]
    fn invalid_transition_reports_origin() {
        let err = next_phase(QuizPhase::Lobby, QuizEvent::LockAnswers).unwrap_err();
        assert_eq!(err.from, QuizPhase::Lobby);
        assert_eq!(err.event, QuizEvent::LockAnswers);
    }

    #[test]
    fn lock_answers_only_valid_while_answering() {
        for phase in [
            QuizPhase::Lobby,
            QuizPhase::Prompting,
            QuizPhase::Generating,
            QuizPhase::Reveal,
            QuizPhase::Scoreboard,
            QuizPhase::Finished,
        ] {
            assert!(next_phase(phase, QuizEvent::LockAnswers).is_err());
        }
    }
}
