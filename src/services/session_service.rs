//! Session bootstrap, joining, kicking, and the read-only projections.
//! Shared lookup helpers for the other services also live here.

use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::models::{PlayerEntity, RoundEntity, SessionConfigEntity, SessionEntity},
    dao::storage::StorageError,
    dao::store::QuizStore,
    error::ServiceError,
    services::answer_service,
    state::{SharedState, epoch_ms, state_machine::QuizPhase},
};

/// Reserved fingerprint of the host's own player row; real devices may not
/// claim it.
pub(crate) const HOST_FINGERPRINT: &str = "__host__";
/// Display name given to the host's player row.
const HOST_NAME: &str = "Host";
/// Join code alphabet without easily confused characters.
const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// How many join-code collisions to tolerate before giving up.
const JOIN_CODE_ATTEMPTS: usize = 8;

/// Create a session in the lobby phase together with its host player row.
pub async fn create_session(
    state: &SharedState,
    owner_id: String,
    name: String,
    config: SessionConfigEntity,
) -> Result<SessionEntity, ServiceError> {
    let name = name.trim().to_owned();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "session name must not be empty".into(),
        ));
    }

    let now = epoch_ms();
    let mut last_conflict = None;

    for _ in 0..JOIN_CODE_ATTEMPTS {
        let join_code = generate_join_code(state);
        let session = SessionEntity {
            id: Uuid::new_v4(),
            owner_id: owner_id.clone(),
            name: name.clone(),
            config,
            phase: QuizPhase::Lobby,
            current_round_index: 0,
            join_code,
            answer_deadline_at_ms: None,
            prompt_deadline_at_ms: None,
            created_at_ms: now,
            updated_at_ms: now,
        };

        match state.store().insert_session(session.clone()).await {
            Ok(()) => {
                let host = PlayerEntity {
                    id: Uuid::new_v4(),
                    session_id: session.id,
                    name: HOST_NAME.into(),
                    device_fingerprint: HOST_FINGERPRINT.into(),
                    is_host: true,
                    score: 0,
                    connected_at_ms: now,
                    last_seen_at_ms: now,
                    kicked_at_ms: None,
                };
                state.store().insert_player(host).await?;

                info!(session_id = %session.id, join_code = %session.join_code, "session created");
                return Ok(session);
            }
            Err(StorageError::Conflict(message)) => {
                debug!(%message, "join code collision, retrying");
                last_conflict = Some(message);
            }
            Err(other) => return Err(other.into()),
        }
    }

    Err(ServiceError::InvalidInput(
        last_conflict.unwrap_or_else(|| "could not allocate a unique join code".into()),
    ))
}

/// Result of a join call: the player row plus whether it was a reconnect.
#[derive(Debug)]
pub struct JoinOutcome {
    /// The joining (or reconnecting) player.
    pub player: PlayerEntity,
    /// The session that was joined.
    pub session: SessionEntity,
    /// True when the fingerprint already had a player row.
    pub reconnected: bool,
}

/// Join a session by code, or reconnect a known device fingerprint.
///
/// New players are only admitted during the lobby phase; a fingerprint that
/// already has a non-kicked row bypasses the phase check and reconnects.
pub async fn join_session(
    state: &SharedState,
    join_code: &str,
    name: &str,
    fingerprint: &str,
) -> Result<JoinOutcome, ServiceError> {
    let join_code = join_code.trim().to_uppercase();
    let session = load_session_by_code(state, &join_code).await?;

    let gate = state.session_gate(session.id);
    let _guard = gate.lock().await;

    // Re-read under the gate so concurrent joins see each other.
    let session = load_session(state, session.id).await?;

    if fingerprint == HOST_FINGERPRINT {
        return Err(ServiceError::InvalidInput(
            "device fingerprint is reserved".into(),
        ));
    }

    if let Some(existing) = state
        .store()
        .find_player_by_fingerprint(session.id, fingerprint)
        .await?
    {
        if existing.kicked_at_ms.is_some() {
            return Err(ServiceError::Unauthorized(
                "this device was removed from the session".into(),
            ));
        }
        let mut player = existing;
        player.last_seen_at_ms = epoch_ms();
        state.store().update_player(player.clone()).await?;
        return Ok(JoinOutcome {
            player,
            session,
            reconnected: true,
        });
    }

    if session.phase != QuizPhase::Lobby {
        return Err(ServiceError::WrongPhase(
            "new players can only join during the lobby".into(),
        ));
    }

    let name = name.trim();
    if name.is_empty() || name.chars().count() > 20 {
        return Err(ServiceError::InvalidInput(
            "player name must be between 1 and 20 characters".into(),
        ));
    }

    let roster = state.store().players_by_session(session.id).await?;
    let active: Vec<&PlayerEntity> = roster
        .iter()
        .filter(|player| player.kicked_at_ms.is_none())
        .collect();

    if active.len() >= state.config().max_players {
        return Err(ServiceError::InvalidInput(format!(
            "session is full ({} players max)",
            state.config().max_players
        )));
    }

    if active
        .iter()
        .any(|player| player.name.eq_ignore_ascii_case(name))
    {
        return Err(ServiceError::InvalidInput(format!(
            "name `{name}` is already taken"
        )));
    }

    let now = epoch_ms();
    let player = PlayerEntity {
        id: Uuid::new_v4(),
        session_id: session.id,
        name: name.to_owned(),
        device_fingerprint: fingerprint.to_owned(),
        is_host: false,
        score: 0,
        connected_at_ms: now,
        last_seen_at_ms: now,
        kicked_at_ms: None,
    };
    state.store().insert_player(player.clone()).await?;

    info!(session_id = %session.id, player_id = %player.id, "player joined");
    Ok(JoinOutcome {
        player,
        session,
        reconnected: false,
    })
}

/// Soft-delete a player. The row stays for history but the player vanishes
/// from every gameplay query and count.
pub async fn kick_player(
    state: &SharedState,
    caller: &str,
    session_id: Uuid,
    player_id: Uuid,
) -> Result<PlayerEntity, ServiceError> {
    let gate = state.session_gate(session_id);
    let _guard = gate.lock().await;

    let session = load_session(state, session_id).await?;
    require_owner(&session, caller)?;

    let mut player = state
        .store()
        .find_player(player_id)
        .await?
        .filter(|player| player.session_id == session_id)
        .ok_or_else(|| ServiceError::NotFound(format!("player `{player_id}` not found")))?;

    if player.is_host {
        return Err(ServiceError::InvalidInput("cannot kick the host".into()));
    }

    if player.kicked_at_ms.is_none() {
        player.kicked_at_ms = Some(epoch_ms());
        state.store().update_player(player.clone()).await?;
        info!(session_id = %session_id, player_id = %player_id, "player kicked");

        // Removing a player can satisfy the "everyone answered" condition
        // for the round in flight.
        if session.phase == QuizPhase::Answering {
            answer_service::maybe_schedule_all_answered(state, &session).await?;
        }
    }

    Ok(player)
}

/// Point-in-time view of a session as served to polling clients.
#[derive(Debug)]
pub struct LiveView {
    /// The session row.
    pub session: SessionEntity,
    /// Non-kicked players, host included, in join order.
    pub players: Vec<PlayerEntity>,
    /// The active round, when the session is mid-game.
    pub active_round: Option<RoundEntity>,
    /// Number of answers recorded for the active round.
    pub answer_count: usize,
}

/// Consistent point-in-time read of a session by join code.
pub async fn get_live_session(
    state: &SharedState,
    join_code: &str,
) -> Result<LiveView, ServiceError> {
    let join_code = join_code.trim().to_uppercase();
    let session = load_session_by_code(state, &join_code).await?;

    let players = state
        .store()
        .players_by_session(session.id)
        .await?
        .into_iter()
        .filter(|player| player.kicked_at_ms.is_none())
        .collect();

    let active_round = match session.phase {
        QuizPhase::Lobby | QuizPhase::Finished => None,
        _ => {
            state
                .store()
                .find_round_by_index(session.id, session.current_round_index)
                .await?
        }
    };

    let answer_count = match &active_round {
        Some(round) => state.store().answers_by_round(round.id).await?.len(),
        None => 0,
    };

    Ok(LiveView {
        session,
        players,
        active_round,
        answer_count,
    })
}

/// Eligible players sorted by score descending, ties broken by name
/// ascending. Positions are 1-based in the DTO layer.
pub async fn get_leaderboard(
    state: &SharedState,
    session_id: Uuid,
) -> Result<Vec<PlayerEntity>, ServiceError> {
    let session = load_session(state, session_id).await?;
    let mut players: Vec<PlayerEntity> = state
        .store()
        .players_by_session(session.id)
        .await?
        .into_iter()
        .filter(PlayerEntity::is_eligible)
        .collect();

    players.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    Ok(players)
}

// ---------------------------------------------------------------------------
// Shared lookup helpers
// ---------------------------------------------------------------------------

pub(crate) async fn load_session(
    state: &SharedState,
    id: Uuid,
) -> Result<SessionEntity, ServiceError> {
    state
        .store()
        .find_session(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session `{id}` not found")))
}

pub(crate) async fn load_session_by_code(
    state: &SharedState,
    join_code: &str,
) -> Result<SessionEntity, ServiceError> {
    state
        .store()
        .find_session_by_join_code(join_code)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no session with join code `{join_code}`")))
}

pub(crate) fn require_owner(session: &SessionEntity, caller: &str) -> Result<(), ServiceError> {
    if session.owner_id == caller {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(
            "only the session host may perform this action".into(),
        ))
    }
}

/// The round whose index matches `current_round_index`.
pub(crate) async fn active_round(
    state: &SharedState,
    session: &SessionEntity,
) -> Result<RoundEntity, ServiceError> {
    state
        .store()
        .find_round_by_index(session.id, session.current_round_index)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "round {} of session `{}` not found",
                session.current_round_index, session.id
            ))
        })
}

/// Non-host, non-kicked players of a session.
pub(crate) async fn eligible_players(
    state: &SharedState,
    session_id: Uuid,
) -> Result<Vec<PlayerEntity>, ServiceError> {
    Ok(state
        .store()
        .players_by_session(session_id)
        .await?
        .into_iter()
        .filter(PlayerEntity::is_eligible)
        .collect())
}

/// The caller's own player row, resolved through the device fingerprint.
pub(crate) async fn find_caller_player(
    state: &SharedState,
    session: &SessionEntity,
    fingerprint: &str,
) -> Result<PlayerEntity, ServiceError> {
    let player = state
        .store()
        .find_player_by_fingerprint(session.id, fingerprint)
        .await?
        .ok_or_else(|| ServiceError::NotFound("no player for this device".into()))?;

    if player.kicked_at_ms.is_some() {
        return Err(ServiceError::Unauthorized(
            "this device was removed from the session".into(),
        ));
    }

    Ok(player)
}

fn generate_join_code(state: &SharedState) -> String {
    let length = state.config().join_code_length;
    state.with_rand(|rng| {
        (0..length)
            .map(|_| {
                let index = rng.random_range(0..JOIN_CODE_ALPHABET.len());
                JOIN_CODE_ALPHABET[index] as char
            })
            .collect()
    })
}
