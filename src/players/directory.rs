//! Player directory: which actor in which session each player controls

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::error::GameError;
use crate::game::{ActorId, MapId, PlayerId, SessionId};

/// An authenticated player. The actor/session binding never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub actor: ActorId,
    pub session: SessionId,
    pub map: MapId,
}

#[derive(Debug, Default)]
pub struct PlayerDirectory {
    players: BTreeMap<PlayerId, Player>,
    bindings: HashMap<(SessionId, ActorId), PlayerId>,
    by_session: HashMap<SessionId, Vec<PlayerId>>,
    next_id: u64,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player for an actor that has no player yet
    pub fn register(
        &mut self,
        name: impl Into<String>,
        actor: ActorId,
        session: SessionId,
        map: MapId,
    ) -> Result<&Player, GameError> {
        let player = Player {
            id: PlayerId(self.next_id),
            name: name.into(),
            actor,
            session,
            map,
        };
        let id = self.insert(player)?;
        Ok(&self.players[&id])
    }

    /// Insert a player with a known id
    pub fn insert(&mut self, player: Player) -> Result<PlayerId, GameError> {
        if self.players.contains_key(&player.id) {
            return Err(GameError::DuplicateRegistration(format!(
                "player {} already exists",
                player.id
            )));
        }
        match self.bindings.entry((player.session, player.actor)) {
            Entry::Occupied(entry) => {
                return Err(GameError::DuplicateRegistration(format!(
                    "actor {} in session {} already belongs to player {}",
                    player.actor,
                    player.session,
                    entry.get()
                )));
            }
            Entry::Vacant(entry) => {
                entry.insert(player.id);
            }
        }

        let id = player.id;
        self.next_id = self.next_id.max(id.0 + 1);
        self.by_session.entry(player.session).or_default().push(id);
        self.players.insert(id, player);
        Ok(id)
    }

    /// Undo a registration whose token could not be issued
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        self.bindings.remove(&(player.session, player.actor));
        if let Some(ids) = self.by_session.get_mut(&player.session) {
            ids.retain(|&other| other != id);
        }
        Some(player)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Players of a session in join order. Fails for a session no player ever joined.
    pub fn players_in_session(&self, session: SessionId) -> Result<Vec<&Player>, GameError> {
        let ids = self
            .by_session
            .get(&session)
            .ok_or(GameError::UnknownSession(session))?;
        Ok(ids.iter().filter_map(|id| self.players.get(id)).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub(crate) fn reserve_ids_from(&mut self, next_id: u64) {
        self.next_id = self.next_id.max(next_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> MapId {
        MapId::new("town")
    }

    #[test]
    fn ids_are_assigned_in_order() {
        let mut dir = PlayerDirectory::new();
        let a = dir.register("a", ActorId(0), SessionId(0), map()).unwrap().id;
        let b = dir.register("b", ActorId(0), SessionId(1), map()).unwrap().id;
        assert_eq!((a, b), (PlayerId(0), PlayerId(1)));
    }

    #[test]
    fn double_registration_of_an_actor_fails() {
        let mut dir = PlayerDirectory::new();
        dir.register("a", ActorId(4), SessionId(0), map()).unwrap();
        assert!(matches!(
            dir.register("b", ActorId(4), SessionId(0), map()),
            Err(GameError::DuplicateRegistration(_))
        ));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn listing_an_unknown_session_fails() {
        let mut dir = PlayerDirectory::new();
        dir.register("a", ActorId(0), SessionId(0), map()).unwrap();
        assert!(matches!(
            dir.players_in_session(SessionId(7)),
            Err(GameError::UnknownSession(SessionId(7)))
        ));
    }

    #[test]
    fn listing_is_per_session_in_join_order() {
        let mut dir = PlayerDirectory::new();
        dir.register("a", ActorId(0), SessionId(0), map()).unwrap();
        dir.register("x", ActorId(0), SessionId(1), map()).unwrap();
        dir.register("b", ActorId(1), SessionId(0), map()).unwrap();

        let names: Vec<_> = dir
            .players_in_session(SessionId(0))
            .unwrap()
            .into_iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn removed_player_frees_its_binding() {
        let mut dir = PlayerDirectory::new();
        let id = dir.register("a", ActorId(0), SessionId(0), map()).unwrap().id;
        dir.remove(id).unwrap();
        assert!(dir.players_in_session(SessionId(0)).unwrap().is_empty());
        assert!(dir.register("a", ActorId(0), SessionId(0), map()).is_ok());
    }
}
