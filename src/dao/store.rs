use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{PlayerAnswerEntity, PlayerEntity, RoundEntity, SessionEntity};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for quiz sessions.
///
/// Collections and secondary indexes: sessions by id and by join code,
/// players by session and by `(session, fingerprint)`, rounds by id and by
/// `(session, round_index)`, answers by round and by `(player, round)`.
///
/// Individual calls are atomic; multi-step invariants (answer dedup,
/// phase guards) are enforced by the service layer, which serializes all
/// mutations of one session behind its gate before calling in here.
pub trait QuizStore: Send + Sync {
    /// Insert a new session; fails on a join-code collision.
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Point read of a session by primary key.
    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Indexed lookup of a session by its join code.
    fn find_session_by_join_code(
        &self,
        join_code: &str,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Replace a session row.
    fn update_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// Insert a new player row.
    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Point read of a player by primary key.
    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// All players of a session, kicked rows included, in join order.
    fn players_by_session(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Indexed lookup of a player by device fingerprint within a session.
    fn find_player_by_fingerprint(
        &self,
        session_id: Uuid,
        fingerprint: &str,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Replace a player row.
    fn update_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// Insert a new round; fails when the `(session, round_index)` pair exists.
    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Point read of a round by primary key.
    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Indexed lookup of a round by its index within a session.
    fn find_round_by_index(
        &self,
        session_id: Uuid,
        round_index: u32,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Replace a round row.
    fn update_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// Insert a new answer; fails when the `(player, round)` pair exists.
    fn insert_answer(&self, answer: PlayerAnswerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// All answers recorded for a round.
    fn answers_by_round(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerAnswerEntity>>>;
    /// Indexed lookup of the unique answer for a `(player, round)` pair.
    fn find_answer(
        &self,
        player_id: Uuid,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerAnswerEntity>>>;

    /// Backend liveness probe used by the health route.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
