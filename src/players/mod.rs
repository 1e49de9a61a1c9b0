//! Player registry: the directory and token table behind one lock

pub mod directory;
pub mod token;

pub use directory::{Player, PlayerDirectory};
pub use token::{Token, TokenError, TokenRegistry};

use parking_lot::RwLock;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::error;

use crate::error::GameError;
use crate::game::{ActorId, MapId, PlayerId, SessionId};

struct Registry {
    directory: PlayerDirectory,
    tokens: TokenRegistry,
}

/// Thread-safe player registry. Registration and lookup share one exclusion domain.
pub struct PlayerRegistry {
    inner: RwLock<Registry>,
}

impl PlayerRegistry {
    pub fn new(seed: Option<u64>) -> Self {
        let tokens = match seed {
            Some(seed) => TokenRegistry::with_seed(seed),
            None => TokenRegistry::new(),
        };
        Self {
            inner: RwLock::new(Registry {
                directory: PlayerDirectory::new(),
                tokens,
            }),
        }
    }

    /// Register a player and issue its token as one step
    pub fn register(
        &self,
        name: &str,
        actor: ActorId,
        session: SessionId,
        map: MapId,
    ) -> Result<(Player, Token), GameError> {
        let mut inner = self.inner.write();
        let player = inner
            .directory
            .register(name, actor, session, map)
            .map_err(|e| {
                error!(actor_id = %actor, session_id = %session, error = %e, "Player registration failed");
                e
            })?
            .clone();

        match inner.tokens.issue(player.id) {
            Ok(token) => Ok((player, token)),
            Err(e) => {
                error!(player_id = %player.id, error = %e, "Token collision");
                inner.directory.remove(player.id);
                Err(e)
            }
        }
    }

    /// Bind a persisted player and token
    pub fn restore(&self, player: Player, token: Token) -> Result<(), GameError> {
        let mut inner = self.inner.write();
        let id = inner.directory.insert(player)?;
        if let Err(e) = inner.tokens.insert(token, id) {
            inner.directory.remove(id);
            return Err(e);
        }
        Ok(())
    }

    pub fn resolve(&self, token: &Token) -> Option<Player> {
        let inner = self.inner.read();
        let id = inner.tokens.resolve(token)?;
        inner.directory.get(id).cloned()
    }

    pub fn players_in_session(&self, session: SessionId) -> Result<Vec<Player>, GameError> {
        let inner = self.inner.read();
        Ok(inner
            .directory
            .players_in_session(session)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Every player with its token, in player id order
    pub fn entries(&self) -> Vec<(Player, Token)> {
        let inner = self.inner.read();
        let mut entries: Vec<(Player, Token)> = inner
            .tokens
            .iter()
            .filter_map(|(token, id)| {
                inner
                    .directory
                    .get(id)
                    .map(|player| (player.clone(), token.clone()))
            })
            .collect();
        entries.sort_by_key(|(player, _)| player.id);
        entries
    }

    /// Continue a seeded token stream after restored players took ids.
    ///
    /// Reusing the bare seed would replay the tokens the restored players
    /// already hold, so the stream is keyed on the next free player id.
    pub(crate) fn resume_seeded(&self, seed: u64) {
        let mut inner = self.inner.write();
        let next_id = inner.directory.next_id();
        inner.tokens.reseed(ChaCha20Rng::seed_from_u64(
            seed ^ next_id.wrapping_mul(0xD1B5_4A32_D192_ED03),
        ));
    }

    pub fn next_player_id(&self) -> PlayerId {
        PlayerId(self.inner.read().directory.next_id())
    }

    pub(crate) fn reserve_ids_from(&self, next_id: u64) {
        self.inner.write().directory.reserve_ids_from(next_id);
    }

    pub fn len(&self) -> usize {
        self.inner.read().directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().directory.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn registered_player_resolves_by_token() {
        let registry = PlayerRegistry::new(Some(1));
        let (player, token) = registry
            .register("rex", ActorId(0), SessionId(0), MapId::new("town"))
            .unwrap();
        assert_eq!(registry.resolve(&token), Some(player));
    }

    #[test]
    fn failed_registration_leaves_no_trace() {
        let registry = PlayerRegistry::new(Some(1));
        registry
            .register("rex", ActorId(0), SessionId(0), MapId::new("town"))
            .unwrap();
        assert!(registry
            .register("rex", ActorId(0), SessionId(0), MapId::new("town"))
            .is_err());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entries().len(), 1);
    }

    #[test]
    fn resumed_seed_does_not_replay_restored_tokens() {
        let original = PlayerRegistry::new(Some(11));
        let (player, token) = original
            .register("rex", ActorId(0), SessionId(0), MapId::new("town"))
            .unwrap();

        let restarted = PlayerRegistry::new(Some(11));
        restarted.restore(player, token.clone()).unwrap();
        restarted.resume_seeded(11);

        let (_, fresh) = restarted
            .register("fido", ActorId(1), SessionId(0), MapId::new("town"))
            .unwrap();
        assert_ne!(fresh, token);
        assert_eq!(restarted.len(), 2);
    }

    #[test]
    fn concurrent_registrations_get_unique_tokens() {
        let registry = Arc::new(PlayerRegistry::new(None));
        let threads: Vec<_> = (0..8u32)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..50u32)
                        .map(|i| {
                            let (_, token) = registry
                                .register("dog", ActorId(t * 100 + i), SessionId(0), MapId::new("town"))
                                .unwrap();
                            assert!(registry.resolve(&token).is_some());
                            token
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut tokens: Vec<Token> = threads
            .into_iter()
            .flat_map(|t| t.join().unwrap())
            .collect();
        let total = tokens.len();
        tokens.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        tokens.dedup();
        assert_eq!(tokens.len(), total);
        assert_eq!(registry.players_in_session(SessionId(0)).unwrap().len(), 400);
    }
}
