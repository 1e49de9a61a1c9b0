//! Application state shared across routes

use std::sync::Arc;

use crate::app::GameEngine;
use crate::config::Config;
use crate::game::SpawnStrategy;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<GameEngine>,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<GameEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }

    /// Spawn strategy for new players
    pub fn spawn_strategy(&self) -> SpawnStrategy {
        SpawnStrategy::from_flag(self.config.randomize_spawn_points)
    }

    /// Whether time is driven by the built-in ticker rather than by requests
    pub fn auto_tick(&self) -> bool {
        self.config.tick_period.is_some()
    }
}
