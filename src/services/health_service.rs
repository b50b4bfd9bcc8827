use tracing::warn;

use crate::{dao::store::QuizStore, dto::health::HealthResponse, state::SharedState};

/// Respond with a health payload, degraded when the store stops answering.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.store().health_check().await {
        Ok(()) => HealthResponse::ok(),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded()
        }
    }
}
