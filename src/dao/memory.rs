use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::{self, BoxFuture};
use uuid::Uuid;

use crate::dao::models::{PlayerAnswerEntity, PlayerEntity, RoundEntity, SessionEntity};
use crate::dao::storage::{StorageError, StorageResult};
use crate::dao::store::QuizStore;

/// In-process store backing the default deployment and every test.
///
/// Each method is an atomic unit on its own, matching the contract of
/// [`QuizStore`]; cross-row invariants are the service layer's job.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: DashMap<Uuid, SessionEntity>,
    sessions_by_code: DashMap<String, Uuid>,
    players: DashMap<Uuid, PlayerEntity>,
    session_players: DashMap<Uuid, Vec<Uuid>>,
    rounds: DashMap<Uuid, RoundEntity>,
    rounds_by_index: DashMap<(Uuid, u32), Uuid>,
    answers: DashMap<Uuid, PlayerAnswerEntity>,
    round_answers: DashMap<Uuid, Vec<Uuid>>,
    answers_by_pair: DashMap<(Uuid, Uuid), Uuid>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn ready<T: Send + 'static>(value: StorageResult<T>) -> BoxFuture<'static, StorageResult<T>> {
    Box::pin(future::ready(value))
}

impl QuizStore for MemoryStore {
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let result = match self.sessions_by_code.entry(session.join_code.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(format!(
                "join code `{}` already in use",
                session.join_code
            ))),
            Entry::Vacant(slot) => {
                slot.insert(session.id);
                self.sessions.insert(session.id, session);
                Ok(())
            }
        };
        ready(result)
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        ready(Ok(self.sessions.get(&id).map(|row| row.clone())))
    }

    fn find_session_by_join_code(
        &self,
        join_code: &str,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let session = self
            .sessions_by_code
            .get(join_code)
            .and_then(|id| self.sessions.get(&id).map(|row| row.clone()));
        ready(Ok(session))
    }

    fn update_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.sessions.insert(session.id, session);
        ready(Ok(()))
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.session_players
            .entry(player.session_id)
            .or_default()
            .push(player.id);
        self.players.insert(player.id, player);
        ready(Ok(()))
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        ready(Ok(self.players.get(&id).map(|row| row.clone())))
    }

    fn players_by_session(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let players = self
            .session_players
            .get(&session_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.players.get(id).map(|row| row.clone()))
                    .collect()
            })
            .unwrap_or_default();
        ready(Ok(players))
    }

    fn find_player_by_fingerprint(
        &self,
        session_id: Uuid,
        fingerprint: &str,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let player = self
            .session_players
            .get(&session_id)
            .and_then(|ids| {
                ids.iter()
                    .filter_map(|id| self.players.get(id))
                    .find(|row| row.device_fingerprint == fingerprint)
                    .map(|row| row.clone())
            });
        ready(Ok(player))
    }

    fn update_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.players.insert(player.id, player);
        ready(Ok(()))
    }

    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
        let result = match self
            .rounds_by_index
            .entry((round.session_id, round.round_index))
        {
            Entry::Occupied(_) => Err(StorageError::Conflict(format!(
                "round {} already exists for session `{}`",
                round.round_index, round.session_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(round.id);
                self.rounds.insert(round.id, round);
                Ok(())
            }
        };
        ready(result)
    }

    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        ready(Ok(self.rounds.get(&id).map(|row| row.clone())))
    }

    fn find_round_by_index(
        &self,
        session_id: Uuid,
        round_index: u32,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let round = self
            .rounds_by_index
            .get(&(session_id, round_index))
            .and_then(|id| self.rounds.get(&id).map(|row| row.clone()));
        ready(Ok(round))
    }

    fn update_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.rounds.insert(round.id, round);
        ready(Ok(()))
    }

    fn insert_answer(&self, answer: PlayerAnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let result = match self
            .answers_by_pair
            .entry((answer.player_id, answer.round_id))
        {
            Entry::Occupied(_) => Err(StorageError::Conflict(format!(
                "player `{}` already answered round `{}`",
                answer.player_id, answer.round_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(answer.id);
                self.round_answers
                    .entry(answer.round_id)
                    .or_default()
                    .push(answer.id);
                self.answers.insert(answer.id, answer);
                Ok(())
            }
        };
        ready(result)
    }

    fn answers_by_round(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerAnswerEntity>>> {
        let answers = self
            .round_answers
            .get(&round_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.answers.get(id).map(|row| row.clone()))
                    .collect()
            })
            .unwrap_or_default();
        ready(Ok(answers))
    }

    fn find_answer(
        &self,
        player_id: Uuid,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerAnswerEntity>>> {
        let answer = self
            .answers_by_pair
            .get(&(player_id, round_id))
            .and_then(|id| self.answers.get(&id).map(|row| row.clone()));
        ready(Ok(answer))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        ready(Ok(()))
    }
}
