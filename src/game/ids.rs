//! Tagged identifiers
//!
//! Every id is its own type so a loot id can never be passed where an
//! actor id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! tagged_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

tagged_id!(
    /// Map identifier, unique within the world registry
    MapId(String)
);
tagged_id!(
    /// Office identifier, unique within its map
    OfficeId(String)
);
tagged_id!(
    /// Index of a session in the world's session arena
    SessionId(usize)
);
tagged_id!(
    /// Actor identifier, unique within its session
    ActorId(u32)
);
tagged_id!(
    /// Loot item identifier, unique within its session
    LootId(u64)
);
tagged_id!(
    /// Player identifier, unique across the registry
    PlayerId(u64)
);

impl MapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MapId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl OfficeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Copy for SessionId {}
impl Copy for ActorId {}
impl Copy for LootId {}
impl Copy for PlayerId {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_their_inner_value() {
        assert_eq!(serde_json::to_string(&MapId::new("town")).unwrap(), "\"town\"");
        assert_eq!(serde_json::to_string(&LootId(7)).unwrap(), "7");
        assert_eq!(PlayerId(3).to_string(), "3");
    }

    #[test]
    fn integer_ids_work_as_json_object_keys() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(PlayerId(2), "rex");
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"2":"rex"}"#);
    }
}
