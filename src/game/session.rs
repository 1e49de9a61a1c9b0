//! One map's live world: its actors and its loot

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, warn};

use super::actor::{Actor, BagItem};
use super::geometry::Vec2;
use super::ids::{ActorId, LootId, SessionId};
use super::loot::{rebalance_count, LootField, LootGenerator};
use super::map::{MapDefinition, SpawnStrategy};
use super::physics::{
    project_onto_path, MovementStep, MovementSystem, ACTOR_HALF_WIDTH, LOOT_HALF_WIDTH,
    OFFICE_HALF_WIDTH,
};
use super::snapshot::SessionSnapshot;
use crate::error::GameError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum GatherTarget {
    Loot(LootId),
    Office,
}

#[derive(Debug, Clone, Copy)]
struct GatherEvent {
    actor: ActorId,
    target: GatherTarget,
    /// Fraction of the actor's path travelled when the hit happens
    time: f64,
}

/// Live simulation state for one map
pub struct GameSession {
    id: SessionId,
    map: Arc<MapDefinition>,
    actors: BTreeMap<ActorId, Actor>,
    next_actor_id: u32,
    loot: LootField,
    generator: LootGenerator,
    rng: ChaCha8Rng,
}

impl GameSession {
    pub fn new(id: SessionId, map: Arc<MapDefinition>, generator: LootGenerator, rng: ChaCha8Rng) -> Self {
        Self {
            id,
            map,
            actors: BTreeMap::new(),
            next_actor_id: 0,
            loot: LootField::new(),
            generator,
            rng,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn map(&self) -> &Arc<MapDefinition> {
        &self.map
    }

    /// Actors in id order
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn loot(&self) -> &LootField {
        &self.loot
    }

    /// Pick a start position using the session's random source
    pub fn spawn_position(&mut self, strategy: SpawnStrategy) -> Vec2 {
        self.map.spawn_position(strategy, &mut self.rng)
    }

    /// Add a stationary, north-facing actor under the next session-local id
    pub fn add_actor(&mut self, name: impl Into<String>, position: Vec2) -> &Actor {
        let id = ActorId(self.next_actor_id);
        self.next_actor_id += 1;
        let actor = Actor::new(id, name, position, self.map.bag_capacity());
        self.actors.entry(id).or_insert(actor)
    }

    /// Drop an actor whose player could not be registered. Its id is not reused.
    pub fn remove_actor(&mut self, id: ActorId) -> Option<Actor> {
        self.actors.remove(&id)
    }

    pub(crate) fn reseed(&mut self, rng: ChaCha8Rng) {
        self.rng = rng;
    }

    /// Spawn loot until there is one item per actor. Returns the number spawned.
    pub fn rebalance_loot(&mut self) -> usize {
        let count = rebalance_count(self.actors.len(), self.loot.len());
        self.update_loot(count)
    }

    /// Spawn `count` items of random type at random road positions
    pub fn update_loot(&mut self, count: usize) -> usize {
        if count == 0 {
            return 0;
        }
        let map = Arc::clone(&self.map);
        let mut spawned = 0;
        for _ in 0..count {
            let Some(loot_type) = map.random_loot_type(&mut self.rng) else {
                warn!(
                    session_id = %self.id,
                    map_id = %map.id(),
                    "Map has no loot types, skipping loot spawn"
                );
                break;
            };
            let position = map.random_position(&mut self.rng);
            self.loot.spawn(loot_type, position);
            spawned += 1;
        }
        spawned
    }

    /// Periodic loot tick
    pub fn generate_loot(&mut self, delta: Duration) -> usize {
        let count = self.generator.generate(
            delta,
            self.loot.len(),
            self.actors.len(),
            &mut self.rng,
        );
        let spawned = self.update_loot(count);
        if spawned > 0 {
            debug!(session_id = %self.id, spawned, total = self.loot.len(), "Loot spawned");
        }
        spawned
    }

    /// Integrate every actor over `delta`, then resolve loot pickups and
    /// office deposits along the paths travelled.
    ///
    /// Nothing is committed if any actor is found off the road network.
    pub fn advance(&mut self, delta: Duration) -> Result<(), GameError> {
        let dt = delta.as_secs_f64();
        let mut moves: Vec<(ActorId, Vec2, MovementStep)> = Vec::with_capacity(self.actors.len());

        for actor in self.actors.values() {
            let from = actor.position();
            let step = MovementSystem::step(self.map.roads(), from, actor.velocity(), dt)
                .ok_or_else(|| {
                    error!(
                        session_id = %self.id,
                        actor_id = %actor.id(),
                        x = from.x,
                        y = from.y,
                        "Actor is off the road network"
                    );
                    GameError::OffRoad {
                        session: self.id,
                        actor: actor.id(),
                        x: from.x,
                        y: from.y,
                    }
                })?;
            moves.push((actor.id(), from, step));
        }

        let events = self.gather_events(&moves);

        for (id, _, step) in moves {
            if let Some(actor) = self.actors.get_mut(&id) {
                actor.set_motion(step.position, step.velocity);
            }
        }

        self.apply_gather_events(events);
        Ok(())
    }

    fn gather_events(&self, moves: &[(ActorId, Vec2, MovementStep)]) -> Vec<GatherEvent> {
        let mut events = Vec::new();
        for &(actor, from, step) in moves {
            let to = step.position;
            if from == to {
                continue;
            }
            for item in self.loot.iter() {
                let hit = project_onto_path(from, to, item.position);
                if hit.is_hit(ACTOR_HALF_WIDTH + LOOT_HALF_WIDTH) {
                    events.push(GatherEvent {
                        actor,
                        target: GatherTarget::Loot(item.id),
                        time: hit.proj_ratio,
                    });
                }
            }
            for office in self.map.offices() {
                let hit = project_onto_path(from, to, office.position());
                if hit.is_hit(ACTOR_HALF_WIDTH + OFFICE_HALF_WIDTH) {
                    events.push(GatherEvent {
                        actor,
                        target: GatherTarget::Office,
                        time: hit.proj_ratio,
                    });
                }
            }
        }
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        events
    }

    fn apply_gather_events(&mut self, events: Vec<GatherEvent>) {
        let map = Arc::clone(&self.map);
        for event in events {
            let Some(actor) = self.actors.get_mut(&event.actor) else {
                continue;
            };
            match event.target {
                GatherTarget::Loot(loot_id) => {
                    if actor.is_bag_full() {
                        continue;
                    }
                    if let Some(item) = self.loot.take(loot_id) {
                        actor.pick_up(BagItem {
                            id: item.id,
                            loot_type: item.loot_type,
                        });
                        debug!(session_id = %self.id, actor_id = %event.actor, loot_id = %loot_id, "Loot picked up");
                    }
                }
                GatherTarget::Office => {
                    if actor.bag().is_empty() {
                        continue;
                    }
                    let gained = actor.deposit(|loot_type| map.loot_value(loot_type));
                    debug!(
                        session_id = %self.id,
                        actor_id = %event.actor,
                        gained,
                        score = actor.score(),
                        "Loot deposited"
                    );
                }
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            map_id: self.map.id().clone(),
            actors: self.actors.values().cloned().collect(),
            loot: self.loot.iter().copied().collect(),
            next_loot_id: self.loot.next_id(),
            next_actor_id: self.next_actor_id,
        }
    }

    /// Replace the contents of an empty session with persisted state
    pub fn restore(&mut self, snapshot: SessionSnapshot) -> Result<(), GameError> {
        if !self.actors.is_empty() || !self.loot.is_empty() {
            return Err(GameError::Restore(format!(
                "session for map {} already has live state",
                self.map.id()
            )));
        }
        if snapshot.map_id != *self.map.id() {
            return Err(GameError::Restore(format!(
                "snapshot of map {} cannot restore a session of map {}",
                snapshot.map_id,
                self.map.id()
            )));
        }
        let catalog = self.map.loot_types().len();
        if let Some(item) = snapshot.loot.iter().find(|item| item.loot_type >= catalog) {
            return Err(GameError::Restore(format!(
                "loot {} has unknown type {}",
                item.id, item.loot_type
            )));
        }

        let mut actors = BTreeMap::new();
        for actor in snapshot.actors {
            let id = actor.id();
            if actors.insert(id, actor).is_some() {
                return Err(GameError::Restore(format!("actor {id} appears twice")));
            }
        }
        let next_actor_id = actors
            .keys()
            .map(|id| id.0 + 1)
            .max()
            .unwrap_or(0)
            .max(snapshot.next_actor_id);

        self.actors = actors;
        self.next_actor_id = next_actor_id;
        self.loot = LootField::restore(snapshot.loot, snapshot.next_loot_id);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn place_loot(&mut self, loot_type: usize, position: Vec2) -> super::loot::LootItem {
        let id = self.loot.spawn(loot_type, position);
        *self.loot.get(id).expect("just spawned")
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::game::actor::{Direction, MoveCommand};
    use crate::game::geometry::{Point, Road, ROAD_HALF_WIDTH};
    use crate::game::ids::{MapId, OfficeId};
    use crate::game::loot::LootGeneratorConfig;
    use crate::game::map::{LootType, Office};

    fn map() -> Arc<MapDefinition> {
        Arc::new(
            MapDefinition::new(
                MapId::new("town"),
                "Town",
                vec![
                    Road::horizontal(Point::new(0, 0), 20).unwrap(),
                    Road::vertical(Point::new(20, 0), 20).unwrap(),
                ],
                2.0,
            )
            .unwrap()
            .with_loot_types(vec![
                LootType {
                    value: Some(10),
                    ..Default::default()
                },
                LootType {
                    value: Some(30),
                    ..Default::default()
                },
            ])
            .with_offices(vec![Office {
                id: OfficeId::new("o1"),
                x: 20,
                y: 10,
                offset_x: 5,
                offset_y: 0,
            }])
            .unwrap()
            .with_bag_capacity(2),
        )
    }

    fn session() -> GameSession {
        GameSession::new(
            SessionId(0),
            map(),
            LootGenerator::new(LootGeneratorConfig {
                period: Duration::from_secs(1),
                probability: 1.0,
            }),
            ChaCha8Rng::seed_from_u64(5),
        )
    }

    #[test]
    fn actor_ids_are_sequential() {
        let mut s = session();
        assert_eq!(s.add_actor("a", Vec2::ZERO).id(), ActorId(0));
        assert_eq!(s.add_actor("b", Vec2::ZERO).id(), ActorId(1));
        assert_eq!(s.actor_count(), 2);
    }

    #[test]
    fn removed_actor_id_is_not_reused() {
        let mut s = session();
        let a = s.add_actor("a", Vec2::ZERO).id();
        let b = s.add_actor("b", Vec2::ZERO).id();
        assert_eq!(s.remove_actor(b).map(|actor| actor.id()), Some(b));
        assert!(s.remove_actor(b).is_none());
        assert_eq!(s.actor_count(), 1);
        assert!(s.actor(a).is_some());
        assert_eq!(s.add_actor("c", Vec2::ZERO).id(), ActorId(2));
    }

    #[test]
    fn rebalance_with_three_actors_and_one_item_spawns_three() {
        let mut s = session();
        for name in ["a", "b", "c"] {
            s.add_actor(name, Vec2::ZERO);
        }
        s.place_loot(0, Vec2::new(5.0, 0.0));
        s.add_actor("d", Vec2::ZERO);

        assert_eq!(s.rebalance_loot(), 3);
        assert_eq!(s.loot().len(), 4);
        let ids: Vec<_> = s.loot().iter().map(|item| item.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn surplus_loot_requests_nothing() {
        let mut s = session();
        s.add_actor("a", Vec2::ZERO);
        s.place_loot(0, Vec2::ZERO);
        s.place_loot(0, Vec2::ZERO);
        assert_eq!(s.rebalance_loot(), 0);
    }

    #[test]
    fn spawned_loot_lies_on_roads_with_catalog_types() {
        let mut s = session();
        assert_eq!(s.update_loot(50), 50);
        for item in s.loot().iter() {
            assert!(item.loot_type < 2);
            assert!(!s.map().roads().containing(item.position).is_empty());
        }
    }

    #[test]
    fn periodic_generation_tops_up_to_actor_count() {
        let mut s = session();
        for name in ["a", "b", "c"] {
            s.add_actor(name, Vec2::ZERO);
        }
        let spawned = s.generate_loot(Duration::from_secs(60));
        assert!(spawned <= 3);
        assert!(s.loot().len() <= 3);
    }

    #[test]
    fn advance_moves_and_clamps() {
        let mut s = session();
        let id = s.add_actor("a", Vec2::new(1.0, 0.0)).id();
        s.actor_mut(id).unwrap().apply(MoveCommand::Go(Direction::West), 2.0);

        s.advance(Duration::from_secs(3)).unwrap();

        let actor = s.actor(id).unwrap();
        assert_eq!(actor.position(), Vec2::new(-ROAD_HALF_WIDTH, 0.0));
        assert_eq!(actor.velocity(), Vec2::ZERO);
        assert_eq!(actor.facing(), Direction::West);
    }

    #[test]
    fn off_road_actor_fails_without_moving_anyone() {
        let mut s = session();
        let ok = s.add_actor("a", Vec2::new(1.0, 0.0)).id();
        s.actor_mut(ok).unwrap().apply(MoveCommand::Go(Direction::East), 1.0);
        s.add_actor("lost", Vec2::new(5.0, 5.0));

        let err = s.advance(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, GameError::OffRoad { actor: ActorId(1), .. }));
        assert_eq!(s.actor(ok).unwrap().position(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn picks_up_loot_along_the_path_and_deposits_at_office() {
        let mut s = session();
        let id = s.add_actor("a", Vec2::new(0.0, 0.0)).id();
        s.place_loot(0, Vec2::new(4.0, 0.0));
        s.place_loot(1, Vec2::new(8.0, 0.1));
        s.place_loot(0, Vec2::new(12.0, 0.0));
        s.actor_mut(id).unwrap().apply(MoveCommand::Go(Direction::East), 2.0);

        s.advance(Duration::from_secs(5)).unwrap();
        {
            let actor = s.actor(id).unwrap();
            assert_eq!(actor.position(), Vec2::new(10.0, 0.0));
            let carried: Vec<_> = actor.bag().iter().map(|item| item.id.0).collect();
            assert_eq!(carried, vec![0, 1]);
        }
        assert_eq!(s.loot().len(), 1);

        // bag is full: passing over the third item leaves it on the road
        s.advance(Duration::from_secs(5)).unwrap();
        assert_eq!(s.actor(id).unwrap().bag().len(), 2);
        assert_eq!(s.loot().len(), 1);

        // turn at the corner and walk past the office at (20, 10)
        s.actor_mut(id).unwrap().apply(MoveCommand::Go(Direction::South), 2.0);
        s.advance(Duration::from_secs(6)).unwrap();
        let actor = s.actor(id).unwrap();
        assert!(actor.bag().is_empty());
        assert_eq!(actor.score(), 40);
    }

    #[test]
    fn stationary_actor_gathers_nothing() {
        let mut s = session();
        s.add_actor("a", Vec2::new(3.0, 0.0));
        s.place_loot(0, Vec2::new(3.0, 0.0));
        s.advance(Duration::from_secs(1)).unwrap();
        assert_eq!(s.loot().len(), 1);
    }

    #[test]
    fn snapshot_restores_into_a_fresh_session() {
        let mut s = session();
        let id = s.add_actor("a", Vec2::new(2.0, 0.0)).id();
        s.actor_mut(id).unwrap().apply(MoveCommand::Go(Direction::East), 2.0);
        s.place_loot(1, Vec2::new(15.0, 0.0));
        let snapshot = s.snapshot();

        let mut restored = session();
        restored.restore(snapshot).unwrap();
        assert_eq!(restored.actor(id), s.actor(id));
        assert_eq!(restored.add_actor("b", Vec2::ZERO).id(), ActorId(1));
        assert_eq!(restored.loot().iter().next().unwrap().loot_type, 1);
    }

    #[test]
    fn restore_refuses_a_live_session() {
        let mut s = session();
        let snapshot = s.snapshot();
        s.add_actor("a", Vec2::ZERO);
        assert!(matches!(s.restore(snapshot), Err(GameError::Restore(_))));
    }
}
