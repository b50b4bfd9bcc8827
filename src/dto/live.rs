//! Read-only projections served to polling clients. Correct answers are
//! redacted until the session reaches the reveal.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{AnswerOptionEntity, PlayerEntity, RoundEntity, SessionEntity},
    dto::format_epoch_ms,
    services::session_service::LiveView,
    state::state_machine::QuizPhase,
};

/// One answer option as shown to players.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOptionSummary {
    pub id: Uuid,
    pub text: String,
    /// Present only once the round has been revealed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

impl AnswerOptionSummary {
    fn from_entity(option: &AnswerOptionEntity, revealed: bool) -> Self {
        Self {
            id: option.id,
            text: option.text.clone(),
            is_correct: revealed.then_some(option.is_correct),
        }
    }
}

/// Projection of the active round.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub id: Uuid,
    pub round_index: u32,
    /// Player chosen to supply this round's topic.
    pub prompter_player_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_options: Option<Vec<AnswerOptionSummary>>,
    /// True when question generation failed and the host must skip or end.
    pub errored: bool,
}

impl RoundSummary {
    fn from_entity(round: &RoundEntity, phase: QuizPhase) -> Self {
        let revealed = matches!(
            phase,
            QuizPhase::Reveal | QuizPhase::Scoreboard | QuizPhase::Finished
        );
        Self {
            id: round.id,
            round_index: round.round_index,
            prompter_player_id: round.prompter_player_id,
            question_text: round.question_text.clone(),
            answer_options: round.answer_options.as_deref().map(|options| {
                options
                    .iter()
                    .map(|option| AnswerOptionSummary::from_entity(option, revealed))
                    .collect()
            }),
            errored: round.errored,
        }
    }
}

/// Projection of a single roster entry.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: Uuid,
    pub name: String,
    pub is_host: bool,
    pub score: i64,
    /// RFC 3339 timestamp of when the player joined.
    pub connected_at: String,
}

impl From<&PlayerEntity> for PlayerSummary {
    fn from(player: &PlayerEntity) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            is_host: player.is_host,
            score: player.score,
            connected_at: format_epoch_ms(player.connected_at_ms),
        }
    }
}

/// Projection of the session row.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub name: String,
    pub phase: QuizPhase,
    pub current_round_index: u32,
    pub total_rounds: u32,
    pub join_code: String,
    /// Answering deadline in epoch milliseconds, present while answering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_deadline_at_ms: Option<i64>,
    /// Prompt deadline in epoch milliseconds, present while prompting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_deadline_at_ms: Option<i64>,
    /// RFC 3339 timestamp of session creation.
    pub created_at: String,
}

impl From<&SessionEntity> for SessionSummary {
    fn from(session: &SessionEntity) -> Self {
        Self {
            id: session.id,
            name: session.name.clone(),
            phase: session.phase,
            current_round_index: session.current_round_index,
            total_rounds: session.config.total_rounds,
            join_code: session.join_code.clone(),
            answer_deadline_at_ms: session.answer_deadline_at_ms,
            prompt_deadline_at_ms: session.prompt_deadline_at_ms,
            created_at: format_epoch_ms(session.created_at_ms),
        }
    }
}

/// Full point-in-time snapshot returned by the live endpoint.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiveSessionResponse {
    pub session: SessionSummary,
    /// Non-kicked players in join order, host included.
    pub players: Vec<PlayerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_round: Option<RoundSummary>,
    /// Number of answers recorded for the active round.
    pub answer_count: usize,
}

impl From<LiveView> for LiveSessionResponse {
    fn from(view: LiveView) -> Self {
        let phase = view.session.phase;
        Self {
            session: SessionSummary::from(&view.session),
            players: view.players.iter().map(PlayerSummary::from).collect(),
            active_round: view
                .active_round
                .as_ref()
                .map(|round| RoundSummary::from_entity(round, phase)),
            answer_count: view.answer_count,
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// 1-based rank, best score first.
    pub position: usize,
    pub name: String,
    pub score: i64,
}

/// Turn a sorted player list into 1-based leaderboard rows.
pub fn leaderboard_entries(players: &[PlayerEntity]) -> Vec<LeaderboardEntry> {
    players
        .iter()
        .enumerate()
        .map(|(index, player)| LeaderboardEntry {
            position: index + 1,
            name: player.name.clone(),
            score: player.score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(text: &str, is_correct: bool) -> AnswerOptionEntity {
        AnswerOptionEntity {
            id: Uuid::new_v4(),
            text: text.into(),
            is_correct,
        }
    }

    fn round_with_options() -> RoundEntity {
        RoundEntity {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            round_index: 0,
            prompter_player_id: Uuid::new_v4(),
            prompt_text: Some("space travel".into()),
            question_text: Some("Which was the first satellite?".into()),
            answer_options: Some(vec![
                option("Sputnik 1", true),
                option("Explorer 1", false),
                option("Vanguard 1", false),
                option("Luna 1", false),
            ]),
            errored: false,
            completed_at_ms: None,
        }
    }

    #[test]
    fn correctness_is_redacted_while_answering() {
        let summary = RoundSummary::from_entity(&round_with_options(), QuizPhase::Answering);
        let options = summary.answer_options.unwrap();
        assert!(options.iter().all(|option| option.is_correct.is_none()));
    }

    #[test]
    fn correctness_is_exposed_from_reveal_onwards() {
        for phase in [QuizPhase::Reveal, QuizPhase::Scoreboard, QuizPhase::Finished] {
            let summary = RoundSummary::from_entity(&round_with_options(), phase);
            let options = summary.answer_options.unwrap();
            assert_eq!(
                options
                    .iter()
                    .filter(|option| option.is_correct == Some(true))
                    .count(),
                1
            );
        }
    }

    #[test]
    fn leaderboard_positions_are_one_based() {
        let players: Vec<PlayerEntity> = ["Ada", "Bo"]
            .iter()
            .enumerate()
            .map(|(index, name)| PlayerEntity {
                id: Uuid::new_v4(),
                session_id: Uuid::new_v4(),
                name: (*name).into(),
                device_fingerprint: format!("device-{index}00"),
                is_host: false,
                score: 100 - index as i64,
                connected_at_ms: 0,
                last_seen_at_ms: 0,
                kicked_at_ms: None,
            })
            .collect();

        let entries = leaderboard_entries(&players);
        assert_eq!(entries[0].position, 1);
        assert_eq!(entries[1].position, 2);
        assert_eq!(entries[0].name, "Ada");
    }
}
