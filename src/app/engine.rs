//! Engine facade: the operations request handlers call
//!
//! Locks are never nested across domains: the player registry lock and a
//! session lock are always taken one after the other, never together.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::error::GameError;
use crate::game::{
    BagItem, Direction, LootId, MapDefinition, MapError, MapId, MoveCommand, PlayerId,
    PlayerRecord, SessionHandle, SpawnStrategy, WorldRegistry, WorldSettings, WorldSnapshot,
};
use crate::players::{Player, PlayerRegistry, Token};

/// Result of a successful join
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinOutcome {
    #[serde(rename = "authToken")]
    pub token: Token,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSummary {
    pub id: MapId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub pos: [f64; 2],
    pub speed: [f64; 2],
    pub dir: Direction,
    pub bag: Vec<BagItem>,
    pub score: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LootView {
    #[serde(rename = "type")]
    pub loot_type: usize,
    pub pos: [f64; 2],
}

/// One session as seen by one of its players
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub players: BTreeMap<PlayerId, PlayerView>,
    pub lost_objects: BTreeMap<LootId, LootView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerListing {
    pub name: String,
}

/// The simulation and session engine
pub struct GameEngine {
    world: WorldRegistry,
    players: PlayerRegistry,
}

impl GameEngine {
    pub fn new(maps: Vec<MapDefinition>, settings: WorldSettings) -> Result<Self, MapError> {
        Ok(Self {
            world: WorldRegistry::new(maps, settings)?,
            players: PlayerRegistry::new(settings.seed),
        })
    }

    pub fn world(&self) -> &WorldRegistry {
        &self.world
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn join_game(
        &self,
        name: &str,
        map_id: &MapId,
        spawn: SpawnStrategy,
    ) -> Result<JoinOutcome, GameError> {
        if name.trim().is_empty() {
            return Err(GameError::InvalidName);
        }
        let (session_id, handle) = self.world.resolve_or_create_session(map_id)?;

        let actor_id = {
            let mut session = handle.lock();
            let position = session.spawn_position(spawn);
            session.add_actor(name, position).id()
        };

        let (player, token) = match self
            .players
            .register(name, actor_id, session_id, map_id.clone())
        {
            Ok(registered) => registered,
            Err(e) => {
                handle.lock().remove_actor(actor_id);
                return Err(e);
            }
        };

        let spawned = handle.lock().rebalance_loot();

        info!(
            player_id = %player.id,
            session_id = %session_id,
            map_id = %map_id,
            loot_spawned = spawned,
            "Player joined"
        );

        Ok(JoinOutcome {
            token,
            player_id: player.id,
        })
    }

    /// Resolve a token to its player
    pub fn authenticate(&self, token: &Token) -> Result<Player, GameError> {
        self.players.resolve(token).ok_or(GameError::InvalidToken)
    }

    pub fn set_action(&self, token: &Token, move_code: &str) -> Result<(), GameError> {
        let command: MoveCommand = move_code.parse()?;
        self.apply_command(&self.authenticate(token)?, command)
    }

    /// Same as [`set_action`](Self::set_action) for an already authenticated player
    pub fn set_player_action(&self, player: &Player, move_code: &str) -> Result<(), GameError> {
        self.apply_command(player, move_code.parse()?)
    }

    fn apply_command(&self, player: &Player, command: MoveCommand) -> Result<(), GameError> {
        let handle = self.session_of(player)?;

        let mut session = handle.lock();
        let speed = session.map().dog_speed();
        let actor = session
            .actor_mut(player.actor)
            .ok_or(GameError::UnknownActor {
                session: player.session,
                actor: player.actor,
            })?;
        actor.apply(command, speed);
        Ok(())
    }

    pub fn game_state(&self, token: &Token) -> Result<GameStateView, GameError> {
        self.player_game_state(&self.authenticate(token)?)
    }

    pub fn player_game_state(&self, player: &Player) -> Result<GameStateView, GameError> {
        let roster = self.players.players_in_session(player.session)?;
        let handle = self.session_of(player)?;
        let session = handle.lock();

        let players = roster
            .iter()
            .filter_map(|p| session.actor(p.actor).map(|actor| (p.id, actor)))
            .map(|(id, actor)| {
                (
                    id,
                    PlayerView {
                        pos: actor.position().into(),
                        speed: actor.velocity().into(),
                        dir: actor.facing(),
                        bag: actor.bag().to_vec(),
                        score: actor.score(),
                    },
                )
            })
            .collect();

        let lost_objects = session
            .loot()
            .iter()
            .map(|item| {
                (
                    item.id,
                    LootView {
                        loot_type: item.loot_type,
                        pos: item.position.into(),
                    },
                )
            })
            .collect();

        Ok(GameStateView {
            players,
            lost_objects,
        })
    }

    /// Names of every player sharing the caller's session
    pub fn list_players(&self, token: &Token) -> Result<BTreeMap<PlayerId, PlayerListing>, GameError> {
        self.session_roster(&self.authenticate(token)?)
    }

    pub fn session_roster(
        &self,
        player: &Player,
    ) -> Result<BTreeMap<PlayerId, PlayerListing>, GameError> {
        Ok(self
            .players
            .players_in_session(player.session)?
            .into_iter()
            .map(|p| (p.id, PlayerListing { name: p.name }))
            .collect())
    }

    pub fn advance_time(&self, delta: Duration) -> Result<(), GameError> {
        self.world.advance_time(delta)
    }

    pub fn generate_loot(&self, delta: Duration) -> usize {
        self.world.generate_loot(delta)
    }

    /// Movement then loot, as one tick
    pub fn tick(&self, delta: Duration) -> Result<(), GameError> {
        let moved = self.advance_time(delta);
        self.generate_loot(delta);
        moved
    }

    pub fn list_maps(&self) -> Vec<MapSummary> {
        self.world
            .maps()
            .iter()
            .map(|map| MapSummary {
                id: map.id().clone(),
                name: map.name().to_string(),
            })
            .collect()
    }

    pub fn map_description(&self, map_id: &MapId) -> Result<Arc<MapDefinition>, GameError> {
        self.world
            .map(map_id)
            .cloned()
            .ok_or_else(|| GameError::UnknownMap(map_id.clone()))
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let players = self
            .players
            .entries()
            .into_iter()
            .map(|(player, token)| PlayerRecord {
                id: player.id,
                name: player.name,
                map_id: player.map,
                actor_id: player.actor,
                token,
            })
            .collect();

        WorldSnapshot {
            sessions: self.world.snapshot_sessions(),
            players,
            next_player_id: self.players.next_player_id().0,
        }
    }

    /// Load persisted state into an engine nobody has joined yet
    pub fn restore(&self, snapshot: WorldSnapshot) -> Result<(), GameError> {
        if !self.players.is_empty() || self.world.session_count() > 0 {
            return Err(GameError::Restore("engine already has live state".to_string()));
        }

        let session_count = snapshot.sessions.len();
        for session in snapshot.sessions {
            self.world.restore_session(session)?;
        }

        let player_count = snapshot.players.len();
        for record in snapshot.players {
            let session_id = self.world.session_id(&record.map_id).ok_or_else(|| {
                GameError::Restore(format!(
                    "player {} refers to map {} without a session",
                    record.id, record.map_id
                ))
            })?;
            let handle = self
                .world
                .session(session_id)
                .ok_or(GameError::UnknownSession(session_id))?;
            if handle.lock().actor(record.actor_id).is_none() {
                return Err(GameError::Restore(format!(
                    "player {} refers to missing actor {}",
                    record.id, record.actor_id
                )));
            }
            self.players.restore(
                Player {
                    id: record.id,
                    name: record.name,
                    actor: record.actor_id,
                    session: session_id,
                    map: record.map_id,
                },
                record.token,
            )?;
        }
        self.players.reserve_ids_from(snapshot.next_player_id);
        if let Some(seed) = self.world.settings().seed {
            self.players.resume_seeded(seed);
        }

        info!(sessions = session_count, players = player_count, "World state restored");
        Ok(())
    }

    fn session_of(&self, player: &Player) -> Result<SessionHandle, GameError> {
        self.world
            .session(player.session)
            .ok_or(GameError::UnknownSession(player.session))
    }
}
