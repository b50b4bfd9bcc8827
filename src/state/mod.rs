//! Shared application state and the per-session mutation gates.

pub mod state_machine;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::store::QuizStore,
    providers::Providers,
    scheduler::DeadlineScheduler,
};

/// Cheaply cloneable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state: the store, the scheduler, the AI providers,
/// and one mutation gate per session.
///
/// Every mutating service operation acquires its session's gate before the
/// read-validate-write sequence, which makes mutations serializable per
/// session. Async work (generation, timers) re-acquires the gate and
/// re-validates before committing.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn QuizStore>,
    scheduler: Arc<dyn DeadlineScheduler>,
    providers: Providers,
    rng: std::sync::Mutex<StdRng>,
    session_gates: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl AppState {
    /// Construct the shared state with an OS-seeded random source.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn QuizStore>,
        scheduler: Arc<dyn DeadlineScheduler>,
        providers: Providers,
    ) -> SharedState {
        Self::with_rng(config, store, scheduler, providers, StdRng::from_os_rng())
    }

    /// Construct the shared state with an explicit random source, so tests
    /// can fix the seed and assert prompter selection and option order.
    pub fn with_rng(
        config: AppConfig,
        store: Arc<dyn QuizStore>,
        scheduler: Arc<dyn DeadlineScheduler>,
        providers: Providers,
        rng: StdRng,
    ) -> SharedState {
        Arc::new(Self {
            config,
            store,
            scheduler,
            providers,
            rng: std::sync::Mutex::new(rng),
            session_gates: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the persistence backend.
    pub fn store(&self) -> &Arc<dyn QuizStore> {
        &self.store
    }

    /// Handle to the deferred-execution backend.
    pub fn scheduler(&self) -> &Arc<dyn DeadlineScheduler> {
        &self.scheduler
    }

    /// The AI collaborator bundle.
    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Run a closure against the shared random source.
    pub fn with_rand<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().expect("rng mutex poisoned");
        f(&mut rng)
    }

    /// The mutation gate for one session. Gates are created lazily and kept
    /// for the lifetime of the process; finished sessions stop being locked.
    pub fn session_gate(&self, session_id: Uuid) -> Arc<Mutex<()>> {
        self.session_gates
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Current wall-clock time as epoch milliseconds.
pub fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
