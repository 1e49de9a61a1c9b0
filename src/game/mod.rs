//! Game simulation modules

pub mod actor;
pub mod geometry;
pub mod ids;
pub mod loot;
pub mod map;
pub mod physics;
pub mod session;
pub mod snapshot;
pub mod world;

pub use actor::{Actor, BagItem, Direction, MoveCommand};
pub use geometry::{Envelope, GeometryError, Point, Road, RoadIndex, Vec2, ROAD_HALF_WIDTH};
pub use ids::{ActorId, LootId, MapId, OfficeId, PlayerId, SessionId};
pub use loot::{LootField, LootGenerator, LootGeneratorConfig, LootItem};
pub use map::{Building, LootType, MapDefinition, MapError, Office, SpawnStrategy};
pub use session::GameSession;
pub use snapshot::{PlayerRecord, SessionSnapshot, WorldSnapshot};
pub use world::{SessionHandle, WorldRegistry, WorldSettings};
