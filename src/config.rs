//! Application-level configuration loading with baked-in defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PROMPT_QUIZ_CONFIG_PATH";
/// The generation loop never runs with fewer steps than this.
const MIN_GENERATION_STEPS: u32 = 6;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Hard cap on players per session, host included.
    pub max_players: usize,
    /// Upper bound on decide/search/generate iterations per round.
    pub max_generation_steps: u32,
    /// Length of generated join codes.
    pub join_code_length: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// built-in defaults when the file is missing or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.clamped()
    }

    fn clamped(mut self) -> Self {
        if self.max_generation_steps < MIN_GENERATION_STEPS {
            warn!(
                configured = self.max_generation_steps,
                minimum = MIN_GENERATION_STEPS,
                "max_generation_steps below minimum; clamping"
            );
            self.max_generation_steps = MIN_GENERATION_STEPS;
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_players: 50,
            max_generation_steps: 8,
            join_code_length: 6,
        }
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    max_players: Option<usize>,
    #[serde(default)]
    max_generation_steps: Option<u32>,
    #[serde(default)]
    join_code_length: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            max_players: value.max_players.unwrap_or(defaults.max_players),
            max_generation_steps: value
                .max_generation_steps
                .unwrap_or(defaults.max_generation_steps),
            join_code_length: value.join_code_length.unwrap_or(defaults.join_code_length),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
