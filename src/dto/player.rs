//! DTO definitions for player-facing endpoints: joining, prompting, and
//! answering.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::validation::validate_fingerprint,
    services::{answer_service::SubmittedAnswer, session_service::JoinOutcome},
    state::state_machine::QuizPhase,
};

/// Payload for joining a session by code.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionRequest {
    /// Join code displayed by the host.
    #[validate(length(min = 4, max = 12))]
    pub join_code: String,
    /// Desired display name.
    #[validate(length(min = 1, max = 20))]
    pub name: String,
    /// Opaque device fingerprint identifying this client.
    #[validate(custom(function = "validate_fingerprint"))]
    pub fingerprint: String,
}

/// Result of a join call.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionResponse {
    /// Identifier of the joined session.
    pub session_id: Uuid,
    /// Identifier of the caller's player row.
    pub player_id: Uuid,
    /// Display name actually stored (reconnects keep the original name).
    pub name: String,
    /// Phase the session is currently in.
    pub phase: QuizPhase,
    /// True when the fingerprint was already known and this was a reconnect.
    pub reconnected: bool,
}

impl From<JoinOutcome> for JoinSessionResponse {
    fn from(outcome: JoinOutcome) -> Self {
        Self {
            session_id: outcome.session.id,
            player_id: outcome.player.id,
            name: outcome.player.name,
            phase: outcome.session.phase,
            reconnected: outcome.reconnected,
        }
    }
}

/// Payload for the round prompter's topic submission.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitPromptRequest {
    /// Opaque device fingerprint identifying this client.
    #[validate(custom(function = "validate_fingerprint"))]
    pub fingerprint: String,
    /// Free-text topic for question generation, 5 to 500 characters.
    #[validate(length(min = 5, max = 500))]
    pub text: String,
}

/// Payload for an answer submission.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    /// Opaque device fingerprint identifying this client.
    #[validate(custom(function = "validate_fingerprint"))]
    pub fingerprint: String,
    /// Identifier of the chosen answer option.
    pub option_id: Uuid,
}

/// Acknowledgement of a recorded answer.
///
/// Deliberately omits correctness and awarded points: those stay hidden
/// until the reveal.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerResponse {
    /// Identifier of the recorded answer row.
    pub answer_id: Uuid,
    /// True when this submission completed the round for all players.
    pub all_answered: bool,
}

impl From<SubmittedAnswer> for SubmitAnswerResponse {
    fn from(submitted: SubmittedAnswer) -> Self {
        Self {
            answer_id: submitted.answer.id,
            all_answered: submitted.all_answered,
        }
    }
}
