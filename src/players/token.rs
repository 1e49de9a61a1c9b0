//! Bearer tokens

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::game::PlayerId;

/// Token length in hex characters (128 bits)
pub const TOKEN_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token must be 32 characters, got {0}")]
    Length(usize),

    #[error("Token must be hexadecimal")]
    NotHex,
}

/// Opaque bearer credential: 32 lowercase hex characters
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Token(String);

impl Token {
    /// Validate and normalize to lowercase
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        if raw.len() != TOKEN_LEN {
            return Err(TokenError::Length(raw.len()));
        }
        if !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TokenError::NotHex);
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}…)", &self.0[..4])
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Token {
    type Error = TokenError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Token::parse(&raw)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

/// Issues tokens and maps them back to players
pub struct TokenRegistry {
    tokens: HashMap<Token, PlayerId>,
    rng: ChaCha20Rng,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::with_rng(ChaCha20Rng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha20Rng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: ChaCha20Rng) -> Self {
        Self {
            tokens: HashMap::new(),
            rng,
        }
    }

    /// Swap the random source, keeping every bound token
    pub fn reseed(&mut self, rng: ChaCha20Rng) {
        self.rng = rng;
    }

    fn generate(&mut self) -> Token {
        let mut bytes = [0u8; TOKEN_LEN / 2];
        self.rng.fill_bytes(&mut bytes);
        Token(hex::encode(bytes))
    }

    /// Mint a fresh token for `player`. A collision is reported, not retried.
    pub fn issue(&mut self, player: PlayerId) -> Result<Token, GameError> {
        let token = self.generate();
        self.insert(token.clone(), player)?;
        Ok(token)
    }

    /// Bind a known token, e.g. when restoring persisted state
    pub fn insert(&mut self, token: Token, player: PlayerId) -> Result<(), GameError> {
        match self.tokens.entry(token) {
            Entry::Occupied(entry) => Err(GameError::DuplicateRegistration(format!(
                "token {:?} is already bound to player {}",
                entry.key(),
                entry.get()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(player);
                Ok(())
            }
        }
    }

    pub fn resolve(&self, token: &Token) -> Option<PlayerId> {
        self.tokens.get(token).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Token, PlayerId)> {
        self.tokens.iter().map(|(token, &player)| (token, player))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn issued_tokens_are_distinct_hex() {
        let mut registry = TokenRegistry::with_seed(1);
        let mut seen = HashSet::new();
        for i in 0..1000 {
            let token = registry.issue(PlayerId(i)).unwrap();
            assert_eq!(token.as_str().len(), TOKEN_LEN);
            assert!(Token::parse(token.as_str()).is_ok());
            assert!(seen.insert(token));
        }
        assert_eq!(registry.len(), 1000);
    }

    #[test]
    fn never_issued_token_resolves_to_nothing() {
        let mut registry = TokenRegistry::with_seed(2);
        let issued = registry.issue(PlayerId(0)).unwrap();
        assert_eq!(registry.resolve(&issued), Some(PlayerId(0)));
        let stranger = Token::parse("0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(registry.resolve(&stranger), None);
    }

    #[test]
    fn same_seed_reproduces_tokens() {
        let a = TokenRegistry::with_seed(9).issue(PlayerId(0)).unwrap();
        let b = TokenRegistry::with_seed(9).issue(PlayerId(0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_token_is_rejected() {
        let mut registry = TokenRegistry::with_seed(3);
        let token = registry.issue(PlayerId(0)).unwrap();
        assert!(matches!(
            registry.insert(token, PlayerId(1)),
            Err(GameError::DuplicateRegistration(_))
        ));
    }

    #[test]
    fn parse_normalizes_case_and_rejects_garbage() {
        let token = Token::parse("ABCDEF0123456789ABCDEF0123456789").unwrap();
        assert_eq!(token.as_str(), "abcdef0123456789abcdef0123456789");
        assert_eq!(Token::parse("abc"), Err(TokenError::Length(3)));
        assert_eq!(
            Token::parse("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"),
            Err(TokenError::NotHex)
        );
    }
}
