//! Application layer: engine facade, shared state and background tasks

pub mod engine;
pub mod persistence;
pub mod state;
pub mod ticker;

pub use engine::{GameEngine, GameStateView, JoinOutcome, MapSummary};
pub use state::AppState;
