//! Persisted world state
//!
//! Captures everything needed to bring sessions and the player directory
//! back after a restart.

use serde::{Deserialize, Serialize};

use super::actor::Actor;
use super::ids::{ActorId, MapId, PlayerId};
use super::loot::LootItem;
use crate::players::Token;

/// One session's actors and loot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub map_id: MapId,
    pub actors: Vec<Actor>,
    pub loot: Vec<LootItem>,
    pub next_loot_id: u64,
    pub next_actor_id: u32,
}

/// A player's binding to its actor, plus the token it was issued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    pub map_id: MapId,
    pub actor_id: ActorId,
    pub token: Token,
}

/// Whole-world state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub sessions: Vec<SessionSnapshot>,
    pub players: Vec<PlayerRecord>,
    pub next_player_id: u64,
}

impl WorldSnapshot {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.players.is_empty()
    }
}
