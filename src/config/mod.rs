//! Configuration module - environment variable parsing

pub mod maps;

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub use maps::{load_game_config, parse_game_config, GameConfig};

use crate::game::MapError;

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,

    /// JSON file with maps and loot generator settings
    pub game_config_path: PathBuf,
    /// Built-in ticker period; `None` means clients drive time
    pub tick_period: Option<Duration>,
    pub randomize_spawn_points: bool,
    /// Where world state is loaded from at startup and saved to at shutdown
    pub state_file: Option<PathBuf>,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
    /// Directory of static frontend files served for unmatched paths
    pub www_root: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup, so tests never touch the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT wins over SERVER_ADDR on hosted platforms
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") | Some("plain") => LogFormat::Plain,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::invalid("LOG_FORMAT", other)),
        };

        let tick_period = match lookup("TICK_PERIOD_MS") {
            None => None,
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) | Err(_) => return Err(ConfigError::invalid("TICK_PERIOD_MS", &raw)),
                Ok(ms) => Some(Duration::from_millis(ms)),
            },
        };

        let randomize_spawn_points = match lookup("RANDOMIZE_SPAWN_POINTS").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => return Err(ConfigError::invalid("RANDOMIZE_SPAWN_POINTS", other)),
        };

        let seed = match lookup("GAME_SEED") {
            None => None,
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|_| ConfigError::invalid("GAME_SEED", &raw))?,
            ),
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,

            game_config_path: lookup("GAME_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/config.json")),
            tick_period,
            randomize_spawn_points,
            state_file: lookup("STATE_FILE").filter(|s| !s.is_empty()).map(PathBuf::from),
            seed,
            www_root: lookup("WWW_ROOT").filter(|s| !s.is_empty()).map(PathBuf::from),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("Cannot read game config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed game config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error("Invalid loot generator settings: {0}")]
    InvalidLootGenerator(String),
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str) -> Self {
        ConfigError::Invalid {
            var,
            value: value.to_string(),
        }
    }
}
