use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::live::{LeaderboardEntry, LiveSessionResponse, leaderboard_entries},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Read-only endpoints polled by all clients.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/live/{join_code}", get(live_session))
        .route("/live/sessions/{id}/leaderboard", get(leaderboard))
}

/// Point-in-time snapshot of a session, looked up by join code.
#[utoipa::path(
    get,
    path = "/live/{join_code}",
    tag = "live",
    params(("join_code" = String, Path, description = "Join code of the session")),
    responses((status = 200, description = "Session snapshot", body = LiveSessionResponse))
)]
pub async fn live_session(
    State(state): State<SharedState>,
    Path(join_code): Path<String>,
) -> Result<Json<LiveSessionResponse>, AppError> {
    let view = session_service::get_live_session(&state, &join_code).await?;
    Ok(Json(view.into()))
}

/// Final or in-progress standings, best score first.
#[utoipa::path(
    get,
    path = "/live/sessions/{id}/leaderboard",
    tag = "live",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Leaderboard rows", body = [LeaderboardEntry]))
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let players = session_service::get_leaderboard(&state, id).await?;
    Ok(Json(leaderboard_entries(&players)))
}
