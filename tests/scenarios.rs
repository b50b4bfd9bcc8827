//! End-to-end gameplay scenarios driven through the service layer with a
//! manual scheduler, a seeded random source, and the canned AI providers,
//! so every race and timer firing is under test control.

use std::{sync::Arc, time::Duration};

use futures::future::{self, BoxFuture};
use rand::{SeedableRng, rngs::StdRng};
use uuid::Uuid;

use prompt_quiz_back::{
    config::AppConfig,
    dao::{
        memory::MemoryStore,
        models::{RoundEntity, SessionConfigEntity, SessionEntity},
        store::QuizStore,
    },
    error::ServiceError,
    providers::{
        GeneratedQuestion, ProviderError, Providers, QuestionGenerator, canned,
    },
    scheduler::{ManualScheduler, ScheduledJob},
    services::{
        answer_service::{self, LockOutcome},
        phase_service, round_service, session_service,
    },
    state::{AppState, SharedState, epoch_ms, state_machine::QuizPhase},
};

const HOST: &str = "host-token-1";
const ADA: (&str, &str) = ("Ada", "device-ada-0001");
const BO: (&str, &str) = ("Bo", "device-bo-00002");

struct TestApp {
    state: SharedState,
    scheduler: Arc<ManualScheduler>,
}

fn app() -> TestApp {
    app_with_providers(canned::providers())
}

fn app_with_providers(providers: Providers) -> TestApp {
    let scheduler = Arc::new(ManualScheduler::new());
    let state = AppState::with_rng(
        AppConfig::default(),
        Arc::new(MemoryStore::new()),
        scheduler.clone(),
        providers,
        StdRng::seed_from_u64(42),
    );
    TestApp { state, scheduler }
}

/// Generator that always fails, standing in for an unreachable AI endpoint.
struct FailingGenerator;

impl QuestionGenerator for FailingGenerator {
    fn generate(
        &self,
        _prompt: &str,
        _context: Option<&str>,
    ) -> BoxFuture<'static, Result<GeneratedQuestion, ProviderError>> {
        Box::pin(future::ready(Err(ProviderError::new(
            "generator",
            "endpoint unreachable",
        ))))
    }
}

fn failing_providers() -> Providers {
    let canned = canned::providers();
    Providers {
        planner: canned.planner,
        searcher: canned.searcher,
        generator: Arc::new(FailingGenerator),
    }
}

async fn run_jobs(jobs: Vec<(Duration, ScheduledJob)>) {
    for (_, job) in jobs {
        job.await;
    }
}

async fn lobby_with_players(
    app: &TestApp,
    total_rounds: u32,
    players: &[(&str, &str)],
) -> SessionEntity {
    let config = SessionConfigEntity {
        total_rounds,
        seconds_per_question: 30,
        seconds_for_prompt: 30,
    };
    let session =
        session_service::create_session(&app.state, HOST.into(), "Friday quiz".into(), config)
            .await
            .unwrap();

    for (name, fingerprint) in players {
        session_service::join_session(&app.state, &session.join_code, name, fingerprint)
            .await
            .unwrap();
    }

    session
}

async fn reload(app: &TestApp, session_id: Uuid) -> SessionEntity {
    app.state
        .store()
        .find_session(session_id)
        .await
        .unwrap()
        .unwrap()
}

async fn active_round(app: &TestApp, session: &SessionEntity) -> RoundEntity {
    app.state
        .store()
        .find_round_by_index(session.id, session.current_round_index)
        .await
        .unwrap()
        .unwrap()
}

async fn prompter_fingerprint(app: &TestApp, round: &RoundEntity) -> String {
    app.state
        .store()
        .find_player(round.prompter_player_id)
        .await
        .unwrap()
        .unwrap()
        .device_fingerprint
}

/// Drive a session from the lobby into the answering phase: start the game,
/// let the prompter submit a topic, and run the queued generation job.
///
/// Leaves the answering-deadline timer job in the scheduler queue.
async fn into_answering(app: &TestApp, session_id: Uuid) -> RoundEntity {
    let (session, round) = phase_service::start_game(&app.state, HOST, session_id)
        .await
        .unwrap();
    assert_eq!(session.phase, QuizPhase::Prompting);

    let fingerprint = prompter_fingerprint(app, &round).await;
    round_service::submit_prompt(
        &app.state,
        session_id,
        round.id,
        &fingerprint,
        "test prompt would you rather",
    )
    .await
    .unwrap();
    assert_eq!(reload(app, session_id).await.phase, QuizPhase::Generating);

    // One queued job: the generation orchestrator.
    run_jobs(app.scheduler.drain()).await;

    let session = reload(app, session_id).await;
    assert_eq!(session.phase, QuizPhase::Answering);
    active_round(app, &session).await
}

fn option_ids(round: &RoundEntity) -> Vec<Uuid> {
    round
        .answer_options
        .as_deref()
        .unwrap()
        .iter()
        .map(|option| option.id)
        .collect()
}

#[tokio::test]
async fn full_round_reaches_answering_with_deadline() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;

    let round = into_answering(&app, session.id).await;
    let options = round.answer_options.as_deref().unwrap();
    assert_eq!(options.len(), 4);
    assert_eq!(options.iter().filter(|option| option.is_correct).count(), 1);

    let session = reload(&app, session.id).await;
    let deadline = session.answer_deadline_at_ms.unwrap();
    let expected = epoch_ms() + 30_000;
    assert!((deadline - expected).abs() < 2_000, "deadline ≈ now+30s");
    assert!(session.prompt_deadline_at_ms.is_none());

    // The deadline timer is queued with the full answering window.
    assert_eq!(app.scheduler.pending(), 1);
}

#[tokio::test]
async fn deadline_fields_are_mutually_exclusive_across_phases() {
    let app = app();
    let created = lobby_with_players(&app, 1, &[ADA, BO]).await;
    assert!(created.answer_deadline_at_ms.is_none());
    assert!(created.prompt_deadline_at_ms.is_none());

    let (session, _) = phase_service::start_game(&app.state, HOST, created.id)
        .await
        .unwrap();
    assert!(session.prompt_deadline_at_ms.is_some());
    assert!(session.answer_deadline_at_ms.is_none());

    into_answering(&app, created.id).await;
    let session = reload(&app, created.id).await;
    assert!(session.answer_deadline_at_ms.is_some());
    assert!(session.prompt_deadline_at_ms.is_none());

    let session = phase_service::end_quiz(&app.state, HOST, created.id)
        .await
        .unwrap();
    assert!(session.answer_deadline_at_ms.is_none());
    assert!(session.prompt_deadline_at_ms.is_none());
}

#[tokio::test]
async fn all_answered_advances_without_waiting_for_the_timer() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;
    let round = into_answering(&app, session.id).await;
    let options = option_ids(&round);

    let first = answer_service::submit_answer(&app.state, session.id, round.id, ADA.1, options[0])
        .await
        .unwrap();
    assert!(!first.all_answered);

    let second = answer_service::submit_answer(&app.state, session.id, round.id, BO.1, options[1])
        .await
        .unwrap();
    assert!(second.all_answered);

    // Queue now holds the deadline timer plus the zero-delay lock. Run the
    // lock first, then the timer, which must observe the phase moved on.
    let (instant, delayed): (Vec<_>, Vec<_>) = app
        .scheduler
        .drain()
        .into_iter()
        .partition(|(delay, _)| delay.is_zero());
    run_jobs(instant).await;

    let session = reload(&app, session.id).await;
    assert_eq!(session.phase, QuizPhase::Reveal);
    assert!(session.answer_deadline_at_ms.is_none());

    let answers = app.state.store().answers_by_round(round.id).await.unwrap();
    assert_eq!(answers.len(), 2);
    assert!(answers.iter().all(|answer| answer.selected_option_id.is_some()));

    run_jobs(delayed).await;
    assert_eq!(reload(&app, session.id).await.phase, QuizPhase::Reveal);
    assert_eq!(
        app.state
            .store()
            .answers_by_round(round.id)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn timeout_synthesizes_answers_for_silent_players() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA]).await;
    let round = into_answering(&app, session.id).await;

    // Nobody answers; the deadline timer fires.
    run_jobs(app.scheduler.drain()).await;

    let session = reload(&app, session.id).await;
    assert_eq!(session.phase, QuizPhase::Reveal);

    let answers = app.state.store().answers_by_round(round.id).await.unwrap();
    assert_eq!(answers.len(), 1);
    assert!(answers[0].selected_option_id.is_none());
    assert!(!answers[0].is_correct);
}

#[tokio::test]
async fn second_answer_for_the_same_round_is_rejected() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;
    let round = into_answering(&app, session.id).await;
    let options = option_ids(&round);

    answer_service::submit_answer(&app.state, session.id, round.id, ADA.1, options[0])
        .await
        .unwrap();
    let score_after_first = session_service::get_leaderboard(&app.state, session.id)
        .await
        .unwrap()
        .iter()
        .find(|player| player.name == "Ada")
        .unwrap()
        .score;

    let err = answer_service::submit_answer(&app.state, session.id, round.id, ADA.1, options[1])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyAnswered));

    let score_after_retry = session_service::get_leaderboard(&app.state, session.id)
        .await
        .unwrap()
        .iter()
        .find(|player| player.name == "Ada")
        .unwrap()
        .score;
    assert_eq!(score_after_first, score_after_retry);
}

#[tokio::test]
async fn concurrent_submissions_record_exactly_one_answer() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;
    let round = into_answering(&app, session.id).await;
    let options = option_ids(&round);

    let (first, second) = tokio::join!(
        answer_service::submit_answer(&app.state, session.id, round.id, ADA.1, options[0]),
        answer_service::submit_answer(&app.state, session.id, round.id, ADA.1, options[1]),
    );
    assert_eq!(
        first.is_ok() as usize + second.is_ok() as usize,
        1,
        "exactly one submission wins"
    );

    let answers = app.state.store().answers_by_round(round.id).await.unwrap();
    assert_eq!(answers.len(), 1);
}

#[tokio::test]
async fn advance_from_last_scoreboard_finishes_the_quiz() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;
    let round = into_answering(&app, session.id).await;
    let options = option_ids(&round);

    for (_, fingerprint) in [ADA, BO] {
        answer_service::submit_answer(&app.state, session.id, round.id, fingerprint, options[0])
            .await
            .unwrap();
    }
    run_jobs(app.scheduler.drain()).await;
    assert_eq!(reload(&app, session.id).await.phase, QuizPhase::Reveal);

    let outcome = phase_service::advance_phase(&app.state, HOST, session.id)
        .await
        .unwrap();
    assert_eq!(outcome.session.phase, QuizPhase::Scoreboard);
    assert!(outcome.new_round.is_none());

    let outcome = phase_service::advance_phase(&app.state, HOST, session.id)
        .await
        .unwrap();
    assert_eq!(outcome.session.phase, QuizPhase::Finished);
    assert!(outcome.new_round.is_none());
    assert_eq!(outcome.session.current_round_index, 0);

    // Terminal phase: further host actions are rejected.
    let err = phase_service::advance_phase(&app.state, HOST, session.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::WrongPhase(_)));
}

#[tokio::test]
async fn advance_from_scoreboard_starts_the_next_round() {
    let app = app();
    let session = lobby_with_players(&app, 2, &[ADA, BO]).await;
    let round = into_answering(&app, session.id).await;
    let options = option_ids(&round);

    for (_, fingerprint) in [ADA, BO] {
        answer_service::submit_answer(&app.state, session.id, round.id, fingerprint, options[0])
            .await
            .unwrap();
    }
    run_jobs(app.scheduler.drain()).await;

    phase_service::advance_phase(&app.state, HOST, session.id)
        .await
        .unwrap();
    let outcome = phase_service::advance_phase(&app.state, HOST, session.id)
        .await
        .unwrap();

    assert_eq!(outcome.session.phase, QuizPhase::Prompting);
    assert_eq!(outcome.session.current_round_index, 1);
    let new_round = outcome.new_round.unwrap();
    assert_eq!(new_round.round_index, 1);
    assert!(outcome.session.prompt_deadline_at_ms.is_some());
}

#[tokio::test]
async fn failed_generation_flags_the_round_and_skip_recovers() {
    let app = app_with_providers(failing_providers());
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;

    let (_, round) = phase_service::start_game(&app.state, HOST, session.id)
        .await
        .unwrap();
    let fingerprint = prompter_fingerprint(&app, &round).await;
    round_service::submit_prompt(
        &app.state,
        session.id,
        round.id,
        &fingerprint,
        "a topic that will not generate",
    )
    .await
    .unwrap();

    run_jobs(app.scheduler.drain()).await;

    // Generation failed: the round is flagged but the phase stays put.
    let session_row = reload(&app, session.id).await;
    assert_eq!(session_row.phase, QuizPhase::Generating);
    let round = active_round(&app, &session_row).await;
    assert!(round.errored);
    assert!(round.answer_options.is_none());

    let session_row = phase_service::skip_round(&app.state, HOST, session.id)
        .await
        .unwrap();
    assert_eq!(session_row.phase, QuizPhase::Reveal);
    let round = active_round(&app, &session_row).await;
    assert!(round.completed_at_ms.is_some());
}

#[tokio::test]
async fn skip_while_answering_locks_like_the_timer() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;
    let round = into_answering(&app, session.id).await;
    let options = option_ids(&round);

    answer_service::submit_answer(&app.state, session.id, round.id, ADA.1, options[0])
        .await
        .unwrap();

    let session_row = phase_service::skip_round(&app.state, HOST, session.id)
        .await
        .unwrap();
    assert_eq!(session_row.phase, QuizPhase::Reveal);

    // Bo never answered and gets a synthetic row.
    let answers = app.state.store().answers_by_round(round.id).await.unwrap();
    assert_eq!(answers.len(), 2);
    assert_eq!(
        answers
            .iter()
            .filter(|answer| answer.selected_option_id.is_none())
            .count(),
        1
    );

    // The pending deadline timer is now stale and must not double-complete.
    run_jobs(app.scheduler.drain()).await;
    assert_eq!(reload(&app, session.id).await.phase, QuizPhase::Reveal);
    assert_eq!(
        app.state
            .store()
            .answers_by_round(round.id)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn host_early_lock_wins_and_the_timer_no_ops() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;
    let round = into_answering(&app, session.id).await;

    let outcome = phase_service::lock_answers_early(&app.state, HOST, session.id, round.id)
        .await
        .unwrap();
    assert_eq!(outcome, LockOutcome::Locked { synthesized: 2 });
    assert_eq!(reload(&app, session.id).await.phase, QuizPhase::Reveal);

    // A second explicit lock is a successful no-op.
    let outcome = phase_service::lock_answers_early(&app.state, HOST, session.id, round.id)
        .await
        .unwrap();
    assert_eq!(outcome, LockOutcome::Skipped);

    run_jobs(app.scheduler.drain()).await;
    assert_eq!(
        app.state
            .store()
            .answers_by_round(round.id)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn end_quiz_neutralizes_the_pending_timer() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;
    let round = into_answering(&app, session.id).await;

    let session_row = phase_service::end_quiz(&app.state, HOST, session.id)
        .await
        .unwrap();
    assert_eq!(session_row.phase, QuizPhase::Finished);

    run_jobs(app.scheduler.drain()).await;
    assert_eq!(reload(&app, session.id).await.phase, QuizPhase::Finished);
    assert!(
        app.state
            .store()
            .answers_by_round(round.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn kicking_the_last_silent_player_closes_the_round() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;
    let round = into_answering(&app, session.id).await;
    let options = option_ids(&round);

    answer_service::submit_answer(&app.state, session.id, round.id, ADA.1, options[0])
        .await
        .unwrap();

    let bo = app
        .state
        .store()
        .find_player_by_fingerprint(session.id, BO.1)
        .await
        .unwrap()
        .unwrap();
    session_service::kick_player(&app.state, HOST, session.id, bo.id)
        .await
        .unwrap();

    let (instant, _delayed): (Vec<_>, Vec<_>) = app
        .scheduler
        .drain()
        .into_iter()
        .partition(|(delay, _)| delay.is_zero());
    assert_eq!(instant.len(), 1, "kick queued an all-answered check");
    run_jobs(instant).await;

    let session_row = reload(&app, session.id).await;
    assert_eq!(session_row.phase, QuizPhase::Reveal);

    // Kicked players get no synthetic answer.
    let answers = app.state.store().answers_by_round(round.id).await.unwrap();
    assert_eq!(answers.len(), 1);
    assert_ne!(answers[0].player_id, bo.id);
}

#[tokio::test]
async fn correct_answers_score_within_bounds_and_wrong_score_zero() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;
    let round = into_answering(&app, session.id).await;
    let options = round.answer_options.as_deref().unwrap();
    let correct = options.iter().find(|option| option.is_correct).unwrap().id;
    let wrong = options.iter().find(|option| !option.is_correct).unwrap().id;

    answer_service::submit_answer(&app.state, session.id, round.id, ADA.1, correct)
        .await
        .unwrap();
    answer_service::submit_answer(&app.state, session.id, round.id, BO.1, wrong)
        .await
        .unwrap();

    let leaderboard = session_service::get_leaderboard(&app.state, session.id)
        .await
        .unwrap();
    let ada = leaderboard.iter().find(|player| player.name == "Ada").unwrap();
    let bo = leaderboard.iter().find(|player| player.name == "Bo").unwrap();

    assert!((100..=150).contains(&ada.score), "fast correct answer");
    assert_eq!(bo.score, 0);
    assert_eq!(leaderboard[0].name, "Ada");
}

#[tokio::test]
async fn join_is_lobby_only_but_reconnect_works_mid_game() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;
    into_answering(&app, session.id).await;

    let err = session_service::join_session(&app.state, &session.join_code, "Cleo", "device-cleo-003")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::WrongPhase(_)));

    let outcome = session_service::join_session(&app.state, &session.join_code, "Ada", ADA.1)
        .await
        .unwrap();
    assert!(outcome.reconnected);
    assert_eq!(outcome.player.name, "Ada");
}

#[tokio::test]
async fn only_the_selected_prompter_may_submit_the_topic() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;
    let (_, round) = phase_service::start_game(&app.state, HOST, session.id)
        .await
        .unwrap();

    let prompter = prompter_fingerprint(&app, &round).await;
    let intruder = if prompter == ADA.1 { BO.1 } else { ADA.1 };

    let err = round_service::submit_prompt(
        &app.state,
        session.id,
        round.id,
        intruder,
        "stolen topic attempt",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn starting_with_an_empty_lobby_fails_cleanly() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[]).await;

    let err = phase_service::start_game(&app.state, HOST, session.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NoPlayersAvailable));

    // The failed start must not leak a phase change or a deadline.
    let session = reload(&app, session.id).await;
    assert_eq!(session.phase, QuizPhase::Lobby);
    assert!(session.prompt_deadline_at_ms.is_none());
}

#[tokio::test]
async fn non_owner_cannot_drive_the_session() {
    let app = app();
    let session = lobby_with_players(&app, 1, &[ADA, BO]).await;

    let err = phase_service::start_game(&app.state, "someone-else", session.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}
