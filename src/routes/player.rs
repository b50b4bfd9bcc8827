use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        common::ActionResponse,
        player::{
            JoinSessionRequest, JoinSessionResponse, SubmitAnswerRequest, SubmitAnswerResponse,
            SubmitPromptRequest,
        },
    },
    error::AppError,
    services::{answer_service, round_service, session_service},
    state::SharedState,
};

/// Player-facing endpoints: joining, prompting, and answering.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/play/join", post(join_session))
        .route(
            "/play/sessions/{id}/rounds/{round_id}/prompt",
            post(submit_prompt),
        )
        .route(
            "/play/sessions/{id}/rounds/{round_id}/answer",
            post(submit_answer),
        )
}

/// Join a session by code, or reconnect a known device.
#[utoipa::path(
    post,
    path = "/play/join",
    tag = "play",
    request_body = JoinSessionRequest,
    responses((status = 200, description = "Joined or reconnected", body = JoinSessionResponse))
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Json(payload): Json<JoinSessionRequest>,
) -> Result<Json<JoinSessionResponse>, AppError> {
    payload.validate()?;
    let outcome = session_service::join_session(
        &state,
        &payload.join_code,
        &payload.name,
        &payload.fingerprint,
    )
    .await?;
    Ok(Json(outcome.into()))
}

/// Submit the topic for the current round. Prompter only.
#[utoipa::path(
    post,
    path = "/play/sessions/{id}/rounds/{round_id}/prompt",
    tag = "play",
    params(("id" = Uuid, Path, description = "Session identifier"),
    ("round_id" = Uuid, Path, description = "Round identifier")),
    request_body = SubmitPromptRequest,
    responses((status = 200, description = "Prompt accepted, generation queued", body = ActionResponse))
)]
pub async fn submit_prompt(
    State(state): State<SharedState>,
    Path((id, round_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SubmitPromptRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    payload.validate()?;
    round_service::submit_prompt(&state, id, round_id, &payload.fingerprint, &payload.text)
        .await?;
    Ok(Json(ActionResponse::new("prompt accepted")))
}

/// Submit an answer for the current round, once per player.
#[utoipa::path(
    post,
    path = "/play/sessions/{id}/rounds/{round_id}/answer",
    tag = "play",
    params(("id" = Uuid, Path, description = "Session identifier"),
    ("round_id" = Uuid, Path, description = "Round identifier")),
    request_body = SubmitAnswerRequest,
    responses((status = 200, description = "Answer recorded", body = SubmitAnswerResponse))
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path((id, round_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    payload.validate()?;
    let submitted = answer_service::submit_answer(
        &state,
        id,
        round_id,
        &payload.fingerprint,
        payload.option_id,
    )
    .await?;
    Ok(Json(submitted.into()))
}
