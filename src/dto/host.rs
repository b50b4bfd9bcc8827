//! DTO definitions used by the host REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{SessionConfigEntity, SessionEntity},
    state::state_machine::QuizPhase,
};

/// Gameplay configuration supplied when creating a session.
#[derive(Debug, Clone, Copy, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfigInput {
    /// Number of rounds the quiz runs for.
    #[validate(range(min = 1, max = 50))]
    pub total_rounds: u32,
    /// Answering window per question, in seconds.
    #[validate(range(min = 5, max = 300))]
    pub seconds_per_question: u32,
    /// Time the prompter has to submit a topic, in seconds.
    #[validate(range(min = 5, max = 300))]
    pub seconds_for_prompt: u32,
}

impl From<SessionConfigInput> for SessionConfigEntity {
    fn from(input: SessionConfigInput) -> Self {
        Self {
            total_rounds: input.total_rounds,
            seconds_per_question: input.seconds_per_question,
            seconds_for_prompt: input.seconds_for_prompt,
        }
    }
}

/// Payload for spinning up a new quiz session.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSessionRequest {
    /// Display name of the quiz.
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    /// Gameplay configuration.
    #[validate(nested)]
    pub config: SessionConfigInput,
}

/// Result of creating a session.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    /// Identifier of the new session.
    pub session_id: Uuid,
    /// Code players use to join.
    pub join_code: String,
}

impl From<SessionEntity> for CreateSessionResponse {
    fn from(session: SessionEntity) -> Self {
        Self {
            session_id: session.id,
            join_code: session.join_code,
        }
    }
}

/// Result of starting the game or advancing the phase.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResponse {
    /// Phase the session is in after the call.
    pub phase: QuizPhase,
    /// Index of the active round.
    pub round_index: u32,
    /// Identifier of the freshly created round, when one was started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_round_id: Option<Uuid>,
}

/// Result of an explicit or host-raced answer lock.
#[derive(Debug, Serialize, ToSchema)]
pub struct LockAnswersResponse {
    /// True when the round had already moved on and the call was a no-op.
    pub skipped: bool,
    /// Number of synthetic "no answer" rows created by this call.
    pub synthesized: usize,
}
