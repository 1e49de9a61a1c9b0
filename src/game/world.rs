//! World registry: registered maps and the live session of each

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{error, info};

use super::ids::{MapId, SessionId};
use super::loot::{LootGenerator, LootGeneratorConfig};
use super::map::{MapDefinition, MapError};
use super::session::GameSession;
use super::snapshot::SessionSnapshot;
use crate::error::GameError;

/// Shared handle to one session; the mutex is the session's exclusion domain
pub type SessionHandle = Arc<Mutex<GameSession>>;

/// World-wide simulation settings
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldSettings {
    pub loot_generator: LootGeneratorConfig,
    /// Fixed seed for every session RNG; entropy when `None`
    pub seed: Option<u64>,
}

/// Owns all maps and at most one live session per map
pub struct WorldRegistry {
    maps: Vec<Arc<MapDefinition>>,
    map_index: HashMap<MapId, usize>,
    /// Session arena, indexed by `SessionId`
    sessions: RwLock<Vec<SessionHandle>>,
    session_by_map: DashMap<MapId, SessionId>,
    settings: WorldSettings,
}

impl WorldRegistry {
    pub fn new(maps: Vec<MapDefinition>, settings: WorldSettings) -> Result<Self, MapError> {
        let mut map_index = HashMap::with_capacity(maps.len());
        let mut registered = Vec::with_capacity(maps.len());
        for map in maps {
            if map_index.contains_key(map.id()) {
                return Err(MapError::DuplicateMap(map.id().clone()));
            }
            map_index.insert(map.id().clone(), registered.len());
            registered.push(Arc::new(map));
        }

        Ok(Self {
            maps: registered,
            map_index,
            sessions: RwLock::new(Vec::new()),
            session_by_map: DashMap::new(),
            settings,
        })
    }

    /// Maps in registration order
    pub fn maps(&self) -> &[Arc<MapDefinition>] {
        &self.maps
    }

    pub fn map(&self, id: &MapId) -> Option<&Arc<MapDefinition>> {
        self.map_index.get(id).map(|&idx| &self.maps[idx])
    }

    pub fn session(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.read().get(id.0).cloned()
    }

    pub fn session_id(&self, map_id: &MapId) -> Option<SessionId> {
        self.session_by_map.get(map_id).map(|entry| *entry.value())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// The map's live session, created on first use
    pub fn resolve_or_create_session(
        &self,
        map_id: &MapId,
    ) -> Result<(SessionId, SessionHandle), GameError> {
        let map = self
            .map(map_id)
            .ok_or_else(|| GameError::UnknownMap(map_id.clone()))?;

        let id = *self
            .session_by_map
            .entry(map_id.clone())
            .or_insert_with(|| {
                let mut arena = self.sessions.write();
                let id = SessionId(arena.len());
                let session = GameSession::new(
                    id,
                    Arc::clone(map),
                    LootGenerator::new(self.settings.loot_generator),
                    self.session_rng(id, 0),
                );
                arena.push(Arc::new(Mutex::new(session)));
                info!(session_id = %id, map_id = %map_id, "Session created");
                id
            })
            .value();

        let handle = self
            .session(id)
            .ok_or(GameError::UnknownSession(id))?;
        Ok((id, handle))
    }

    /// Move every actor in every session. Sessions are independent: one
    /// failing session does not stop the others.
    pub fn advance_time(&self, delta: Duration) -> Result<(), GameError> {
        let sessions = self.sessions.read().clone();
        let mut first_error = None;
        for handle in sessions {
            let mut session = handle.lock();
            if let Err(e) = session.advance(delta) {
                error!(session_id = %session.id(), error = %e, "Session tick failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Run the periodic loot controller for every session. Returns the total spawned.
    pub fn generate_loot(&self, delta: Duration) -> usize {
        let sessions = self.sessions.read().clone();
        sessions
            .iter()
            .map(|handle| handle.lock().generate_loot(delta))
            .sum()
    }

    pub fn snapshot_sessions(&self) -> Vec<SessionSnapshot> {
        let sessions = self.sessions.read().clone();
        sessions.iter().map(|handle| handle.lock().snapshot()).collect()
    }

    pub fn restore_session(&self, snapshot: SessionSnapshot) -> Result<SessionId, GameError> {
        let (id, handle) = self.resolve_or_create_session(&snapshot.map_id)?;
        // a seeded restart must not replay the spawns of the previous run
        let rng = self.session_rng(id, snapshot.next_loot_id);
        let mut session = handle.lock();
        session.restore(snapshot)?;
        session.reseed(rng);
        Ok(id)
    }

    pub fn settings(&self) -> WorldSettings {
        self.settings
    }

    /// Session RNG, keyed on how many loot ids the session has already used
    fn session_rng(&self, id: SessionId, loot_issued: u64) -> ChaCha8Rng {
        match self.settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(
                seed ^ (id.0 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
                    ^ loot_issued.wrapping_mul(0xBF58_476D_1CE4_E5B9),
            ),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::actor::{Direction, MoveCommand};
    use crate::game::geometry::{Point, Road, Vec2};

    fn map(id: &str) -> MapDefinition {
        MapDefinition::new(
            MapId::new(id),
            id.to_uppercase(),
            vec![Road::horizontal(Point::new(0, 0), 10).unwrap()],
            1.0,
        )
        .unwrap()
    }

    fn world() -> WorldRegistry {
        WorldRegistry::new(
            vec![map("a"), map("b")],
            WorldSettings {
                seed: Some(3),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn duplicate_maps_are_rejected() {
        assert!(matches!(
            WorldRegistry::new(vec![map("a"), map("a")], WorldSettings::default()),
            Err(MapError::DuplicateMap(_))
        ));
    }

    #[test]
    fn unknown_map_creates_no_session() {
        let world = world();
        assert!(matches!(
            world.resolve_or_create_session(&MapId::new("zzz")),
            Err(GameError::UnknownMap(_))
        ));
        assert_eq!(world.session_count(), 0);
    }

    #[test]
    fn session_creation_is_idempotent_per_map() {
        let world = world();
        let (first, handle) = world.resolve_or_create_session(&MapId::new("a")).unwrap();
        let (again, same) = world.resolve_or_create_session(&MapId::new("a")).unwrap();
        let (other, _) = world.resolve_or_create_session(&MapId::new("b")).unwrap();
        assert_eq!(first, again);
        assert!(Arc::ptr_eq(&handle, &same));
        assert_ne!(first, other);
        assert_eq!(world.session_count(), 2);
    }

    #[test]
    fn advance_time_moves_actors_in_every_session() {
        let world = world();
        let mut ids = Vec::new();
        for map_id in ["a", "b"] {
            let (_, handle) = world.resolve_or_create_session(&MapId::new(map_id)).unwrap();
            let mut session = handle.lock();
            let id = session.add_actor("rex", Vec2::ZERO).id();
            session.actor_mut(id).unwrap().apply(MoveCommand::Go(Direction::East), 1.0);
            ids.push((handle.clone(), id));
        }

        world.advance_time(Duration::from_millis(2500)).unwrap();

        for (handle, id) in ids {
            assert_eq!(handle.lock().actor(id).unwrap().position(), Vec2::new(2.5, 0.0));
        }
    }

    #[test]
    fn concurrent_joins_share_one_session() {
        let world = Arc::new(world());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let world = Arc::clone(&world);
                std::thread::spawn(move || world.resolve_or_create_session(&MapId::new("a")).unwrap().0)
            })
            .collect();
        let ids: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(world.session_count(), 1);
    }
}
