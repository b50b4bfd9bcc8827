use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State},
    http::request::Parts,
    routing::{delete, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        common::ActionResponse,
        host::{AdvanceResponse, CreateSessionRequest, CreateSessionResponse, LockAnswersResponse},
    },
    error::AppError,
    services::{
        answer_service::LockOutcome,
        phase_service::{self, AdvanceOutcome},
        session_service,
    },
    state::SharedState,
};

const HOST_TOKEN_HEADER: &str = "x-host-token";

/// Opaque host identity carried in the `x-host-token` header.
///
/// The token doubles as the session's `owner_id`: whoever created the
/// session with a token owns it, and every host endpoint checks the
/// caller's token against it.
pub struct HostToken(pub String);

impl<S> FromRequestParts<S> for HostToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(HOST_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("missing x-host-token header".into()))?;

        Ok(HostToken(token.to_owned()))
    }
}

/// Host-only endpoints for creating and driving quiz sessions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/host/sessions", post(create_session))
        .route("/host/sessions/{id}/start", post(start_game))
        .route("/host/sessions/{id}/advance", post(advance_phase))
        .route("/host/sessions/{id}/skip", post(skip_round))
        .route("/host/sessions/{id}/end", post(end_quiz))
        .route(
            "/host/sessions/{id}/rounds/{round_id}/lock",
            post(lock_answers),
        )
        .route(
            "/host/sessions/{id}/players/{player_id}",
            delete(kick_player),
        )
}

/// Create a quiz session in the lobby phase.
#[utoipa::path(
    post,
    path = "/host/sessions",
    tag = "host",
    params(("x-host-token" = String, Header, description = "Opaque host identity token")),
    request_body = CreateSessionRequest,
    responses((status = 200, description = "Session created", body = CreateSessionResponse))
)]
pub async fn create_session(
    HostToken(owner_id): HostToken,
    State(state): State<SharedState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    payload.validate()?;
    let session = session_service::create_session(
        &state,
        owner_id,
        payload.name,
        payload.config.into(),
    )
    .await?;
    Ok(Json(session.into()))
}

/// Start the game, creating round 0 with a random prompter.
#[utoipa::path(
    post,
    path = "/host/sessions/{id}/start",
    tag = "host",
    params(("x-host-token" = String, Header, description = "Opaque host identity token"),
    ("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Game started", body = AdvanceResponse))
)]
pub async fn start_game(
    HostToken(caller): HostToken,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdvanceResponse>, AppError> {
    let (session, round) = phase_service::start_game(&state, &caller, id).await?;
    Ok(Json(AdvanceResponse {
        phase: session.phase,
        round_index: session.current_round_index,
        new_round_id: Some(round.id),
    }))
}

/// Advance out of the reveal or scoreboard phase.
#[utoipa::path(
    post,
    path = "/host/sessions/{id}/advance",
    tag = "host",
    params(("x-host-token" = String, Header, description = "Opaque host identity token"),
    ("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Phase advanced", body = AdvanceResponse))
)]
pub async fn advance_phase(
    HostToken(caller): HostToken,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdvanceResponse>, AppError> {
    let AdvanceOutcome { session, new_round } =
        phase_service::advance_phase(&state, &caller, id).await?;
    Ok(Json(AdvanceResponse {
        phase: session.phase,
        round_index: session.current_round_index,
        new_round_id: new_round.map(|round| round.id),
    }))
}

/// Skip the current round from the generating or answering phase.
#[utoipa::path(
    post,
    path = "/host/sessions/{id}/skip",
    tag = "host",
    params(("x-host-token" = String, Header, description = "Opaque host identity token"),
    ("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Round skipped", body = AdvanceResponse))
)]
pub async fn skip_round(
    HostToken(caller): HostToken,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdvanceResponse>, AppError> {
    let session = phase_service::skip_round(&state, &caller, id).await?;
    Ok(Json(AdvanceResponse {
        phase: session.phase,
        round_index: session.current_round_index,
        new_round_id: None,
    }))
}

/// End the quiz immediately from any non-terminal phase.
#[utoipa::path(
    post,
    path = "/host/sessions/{id}/end",
    tag = "host",
    params(("x-host-token" = String, Header, description = "Opaque host identity token"),
    ("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Quiz ended", body = AdvanceResponse))
)]
pub async fn end_quiz(
    HostToken(caller): HostToken,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdvanceResponse>, AppError> {
    let session = phase_service::end_quiz(&state, &caller, id).await?;
    Ok(Json(AdvanceResponse {
        phase: session.phase,
        round_index: session.current_round_index,
        new_round_id: None,
    }))
}

/// Close the answering window ahead of the deadline.
#[utoipa::path(
    post,
    path = "/host/sessions/{id}/rounds/{round_id}/lock",
    tag = "host",
    params(("x-host-token" = String, Header, description = "Opaque host identity token"),
    ("id" = Uuid, Path, description = "Session identifier"),
    ("round_id" = Uuid, Path, description = "Round identifier")),
    responses((status = 200, description = "Lock outcome", body = LockAnswersResponse))
)]
pub async fn lock_answers(
    HostToken(caller): HostToken,
    State(state): State<SharedState>,
    Path((id, round_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<LockAnswersResponse>, AppError> {
    let outcome = phase_service::lock_answers_early(&state, &caller, id, round_id).await?;
    let response = match outcome {
        LockOutcome::Locked { synthesized } => LockAnswersResponse {
            skipped: false,
            synthesized,
        },
        LockOutcome::Skipped => LockAnswersResponse {
            skipped: true,
            synthesized: 0,
        },
    };
    Ok(Json(response))
}

/// Remove a player from the session (soft delete).
#[utoipa::path(
    delete,
    path = "/host/sessions/{id}/players/{player_id}",
    tag = "host",
    params(("x-host-token" = String, Header, description = "Opaque host identity token"),
    ("id" = Uuid, Path, description = "Session identifier"),
    ("player_id" = Uuid, Path, description = "Player to remove")),
    responses((status = 200, description = "Player removed", body = ActionResponse))
)]
pub async fn kick_player(
    HostToken(caller): HostToken,
    State(state): State<SharedState>,
    Path((id, player_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ActionResponse>, AppError> {
    let player = session_service::kick_player(&state, &caller, id, player_id).await?;
    Ok(Json(ActionResponse::new(format!(
        "player `{}` removed",
        player.name
    ))))
}
