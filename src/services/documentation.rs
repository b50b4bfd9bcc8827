use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Prompt Quiz Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::host::create_session,
        crate::routes::host::start_game,
        crate::routes::host::advance_phase,
        crate::routes::host::skip_round,
        crate::routes::host::end_quiz,
        crate::routes::host::lock_answers,
        crate::routes::host::kick_player,
        crate::routes::player::join_session,
        crate::routes::player::submit_prompt,
        crate::routes::player::submit_answer,
        crate::routes::live::live_session,
        crate::routes::live::leaderboard,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::common::ActionResponse,
            crate::dto::host::SessionConfigInput,
            crate::dto::host::CreateSessionRequest,
            crate::dto::host::CreateSessionResponse,
            crate::dto::host::AdvanceResponse,
            crate::dto::host::LockAnswersResponse,
            crate::dto::player::JoinSessionRequest,
            crate::dto::player::JoinSessionResponse,
            crate::dto::player::SubmitPromptRequest,
            crate::dto::player::SubmitAnswerRequest,
            crate::dto::player::SubmitAnswerResponse,
            crate::dto::live::LiveSessionResponse,
            crate::dto::live::SessionSummary,
            crate::dto::live::PlayerSummary,
            crate::dto::live::RoundSummary,
            crate::dto::live::AnswerOptionSummary,
            crate::dto::live::LeaderboardEntry,
            crate::state::state_machine::QuizPhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "host", description = "Session management driven by the host"),
        (name = "play", description = "Player-facing gameplay endpoints"),
        (name = "live", description = "Read-only polling endpoints"),
    )
)]
pub struct ApiDoc;
