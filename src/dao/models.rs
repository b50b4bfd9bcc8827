use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::state_machine::QuizPhase;

/// Per-session gameplay configuration chosen by the host at creation time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfigEntity {
    /// Number of rounds the quiz runs for (at least 1).
    pub total_rounds: u32,
    /// Answering window per question, in seconds.
    pub seconds_per_question: u32,
    /// Time the prompter has to submit a topic, in seconds.
    pub seconds_for_prompt: u32,
}

/// Aggregate session entity persisted by the storage layer.
///
/// Invariant: at most one of `answer_deadline_at_ms` / `prompt_deadline_at_ms`
/// is set, and only while the session is in the matching phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Opaque identity of the host who created the session.
    pub owner_id: String,
    /// Display name of the quiz.
    pub name: String,
    /// Gameplay configuration.
    pub config: SessionConfigEntity,
    /// Current phase; written exclusively by the phase controller.
    pub phase: QuizPhase,
    /// Index of the active round, 0-based, monotonically non-decreasing.
    pub current_round_index: u32,
    /// Short code players use to join.
    pub join_code: String,
    /// Answering deadline (epoch ms), present iff `phase == Answering`.
    pub answer_deadline_at_ms: Option<i64>,
    /// Prompt deadline (epoch ms), present iff `phase == Prompting`.
    pub prompt_deadline_at_ms: Option<i64>,
    /// Creation timestamp (epoch ms).
    pub created_at_ms: i64,
    /// Last update timestamp (epoch ms).
    pub updated_at_ms: i64,
}

/// A participant of a session, host included.
///
/// Kicking is a soft delete: `kicked_at_ms` is set and the row is kept for
/// history, but the player disappears from every gameplay query and count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Primary key of the player.
    pub id: Uuid,
    /// Session this player belongs to.
    pub session_id: Uuid,
    /// Display name, unique among non-kicked players of the session.
    pub name: String,
    /// Opaque per-device token used to scope self-service calls.
    pub device_fingerprint: String,
    /// Whether this row is the session host.
    pub is_host: bool,
    /// Cumulative score, never negative.
    pub score: i64,
    /// Join timestamp (epoch ms).
    pub connected_at_ms: i64,
    /// Last activity timestamp (epoch ms).
    pub last_seen_at_ms: i64,
    /// Soft-delete marker (epoch ms).
    pub kicked_at_ms: Option<i64>,
}

impl PlayerEntity {
    /// Whether this player counts towards answers and leaderboards.
    pub fn is_eligible(&self) -> bool {
        !self.is_host && self.kicked_at_ms.is_none()
    }
}

/// One multiple-choice option attached to a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerOptionEntity {
    /// Stable identifier players submit back.
    pub id: Uuid,
    /// Option text shown to players.
    pub text: String,
    /// Whether this option is the correct one (exactly one per round).
    pub is_correct: bool,
}

/// One round of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Primary key of the round.
    pub id: Uuid,
    /// Session this round belongs to.
    pub session_id: Uuid,
    /// 0-based index, unique per session.
    pub round_index: u32,
    /// Non-host player chosen to supply the topic for this round.
    pub prompter_player_id: Uuid,
    /// Topic text, set once by the prompter.
    pub prompt_text: Option<String>,
    /// Question text produced by the generator.
    pub question_text: Option<String>,
    /// Exactly 4 entries once set, exactly one with `is_correct`.
    pub answer_options: Option<Vec<AnswerOptionEntity>>,
    /// Set when AI generation failed; recovery is host-driven.
    pub errored: bool,
    /// Set when the answering window closed (epoch ms).
    pub completed_at_ms: Option<i64>,
}

impl RoundEntity {
    /// Look up an answer option by its identifier.
    pub fn option(&self, option_id: Uuid) -> Option<&AnswerOptionEntity> {
        self.answer_options
            .as_deref()
            .and_then(|options| options.iter().find(|option| option.id == option_id))
    }
}

/// A single player's answer to a round.
///
/// At most one row exists per `(player_id, round_id)` pair. Rows with an
/// empty `selected_option_id` are synthetic "no answer" records created by
/// the lock path for players who never submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerAnswerEntity {
    /// Primary key of the answer.
    pub id: Uuid,
    /// Session the answer belongs to.
    pub session_id: Uuid,
    /// Round the answer belongs to.
    pub round_id: Uuid,
    /// Player who answered.
    pub player_id: Uuid,
    /// Selected option id, or `None` for a synthetic "no answer".
    pub selected_option_id: Option<Uuid>,
    /// Whether the selected option was the correct one.
    pub is_correct: bool,
    /// Submission timestamp (epoch ms).
    pub submitted_at_ms: i64,
}
