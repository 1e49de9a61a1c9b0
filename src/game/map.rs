//! Static map definitions

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::geometry::{Road, RoadIndex, Vec2};
use super::ids::{MapId, OfficeId};

pub const DEFAULT_DOG_SPEED: f64 = 1.0;
pub const DEFAULT_BAG_CAPACITY: usize = 3;

/// Map construction errors
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Map {0} has no roads")]
    NoRoads(MapId),

    #[error("Map {map} has invalid dog speed {speed}")]
    InvalidSpeed { map: MapId, speed: f64 },

    #[error("Map {map} has duplicate office {office}")]
    DuplicateOffice { map: MapId, office: OfficeId },

    #[error("Map {0} is registered twice")]
    DuplicateMap(MapId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Loot deposit point. Collision uses `x`/`y`; the offsets only matter to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    pub id: OfficeId,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "offsetX")]
    pub offset_x: i32,
    #[serde(rename = "offsetY")]
    pub offset_y: i32,
}

impl Office {
    pub fn position(&self) -> Vec2 {
        Vec2::new(f64::from(self.x), f64::from(self.y))
    }
}

/// Catalog entry. Everything except `value` is a render hint passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LootType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
}

/// Where a joining actor appears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpawnStrategy {
    /// Start of the first registered road
    #[default]
    First,
    /// Uniform point on a uniformly chosen road
    Random,
}

impl SpawnStrategy {
    pub fn from_flag(randomize: bool) -> Self {
        if randomize {
            SpawnStrategy::Random
        } else {
            SpawnStrategy::First
        }
    }
}

/// Immutable per-map data
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDefinition {
    id: MapId,
    name: String,
    roads: RoadIndex,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    loot_types: Vec<LootType>,
    dog_speed: f64,
    bag_capacity: usize,
}

impl MapDefinition {
    pub fn new(
        id: MapId,
        name: impl Into<String>,
        roads: Vec<Road>,
        dog_speed: f64,
    ) -> Result<Self, MapError> {
        if roads.is_empty() {
            return Err(MapError::NoRoads(id));
        }
        if !dog_speed.is_finite() || dog_speed < 0.0 {
            return Err(MapError::InvalidSpeed { map: id, speed: dog_speed });
        }
        Ok(Self {
            id,
            name: name.into(),
            roads: RoadIndex::new(roads),
            buildings: Vec::new(),
            offices: Vec::new(),
            loot_types: Vec::new(),
            dog_speed,
            bag_capacity: DEFAULT_BAG_CAPACITY,
        })
    }

    pub fn with_buildings(mut self, buildings: Vec<Building>) -> Self {
        self.buildings = buildings;
        self
    }

    pub fn with_offices(mut self, offices: Vec<Office>) -> Result<Self, MapError> {
        let mut seen = HashSet::new();
        for office in &offices {
            if !seen.insert(office.id.clone()) {
                return Err(MapError::DuplicateOffice {
                    map: self.id,
                    office: office.id.clone(),
                });
            }
        }
        self.offices = offices;
        Ok(self)
    }

    pub fn with_loot_types(mut self, loot_types: Vec<LootType>) -> Self {
        self.loot_types = loot_types;
        self
    }

    pub fn with_bag_capacity(mut self, bag_capacity: usize) -> Self {
        self.bag_capacity = bag_capacity;
        self
    }

    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roads(&self) -> &RoadIndex {
        &self.roads
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn offices(&self) -> &[Office] {
        &self.offices
    }

    pub fn loot_types(&self) -> &[LootType] {
        &self.loot_types
    }

    pub fn dog_speed(&self) -> f64 {
        self.dog_speed
    }

    pub fn bag_capacity(&self) -> usize {
        self.bag_capacity
    }

    /// Score awarded for depositing one item of the given type
    pub fn loot_value(&self, loot_type: usize) -> u64 {
        self.loot_types
            .get(loot_type)
            .and_then(|t| t.value)
            .unwrap_or(0)
    }

    pub fn first_position(&self) -> Vec2 {
        // construction guarantees at least one road
        self.roads.roads()[0].point_at(0.0)
    }

    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        let roads = self.roads.roads();
        let road = &roads[rng.gen_range(0..roads.len())];
        road.point_at(rng.gen_range(0.0..=1.0))
    }

    pub fn spawn_position<R: Rng + ?Sized>(&self, strategy: SpawnStrategy, rng: &mut R) -> Vec2 {
        match strategy {
            SpawnStrategy::First => self.first_position(),
            SpawnStrategy::Random => self.random_position(rng),
        }
    }

    /// Uniformly chosen catalog index, `None` for an empty catalog
    pub fn random_loot_type<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        if self.loot_types.is_empty() {
            None
        } else {
            Some(rng.gen_range(0..self.loot_types.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::game::geometry::Point;

    fn town() -> MapDefinition {
        MapDefinition::new(
            MapId::new("town"),
            "Town",
            vec![
                Road::horizontal(Point::new(0, 0), 40).unwrap(),
                Road::vertical(Point::new(40, 0), 30).unwrap(),
            ],
            4.0,
        )
        .unwrap()
        .with_loot_types(vec![
            LootType {
                name: Some("key".into()),
                value: Some(10),
                ..Default::default()
            },
            LootType::default(),
        ])
    }

    #[test]
    fn first_position_is_start_of_first_road() {
        assert_eq!(town().first_position(), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn random_positions_lie_on_roads() {
        let map = town();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let pos = map.random_position(&mut rng);
            assert!(!map.roads().containing(pos).is_empty(), "{pos:?}");
        }
    }

    #[test]
    fn loot_values_default_to_zero() {
        let map = town();
        assert_eq!(map.loot_value(0), 10);
        assert_eq!(map.loot_value(1), 0);
        assert_eq!(map.loot_value(9), 0);
    }

    #[test]
    fn empty_catalog_yields_no_loot_type() {
        let map = town().with_loot_types(Vec::new());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(map.random_loot_type(&mut rng), None);
    }

    #[test]
    fn construction_is_validated() {
        assert!(matches!(
            MapDefinition::new(MapId::new("x"), "X", Vec::new(), 1.0),
            Err(MapError::NoRoads(_))
        ));
        let office = Office {
            id: OfficeId::new("o"),
            x: 0,
            y: 0,
            offset_x: 0,
            offset_y: 0,
        };
        assert!(matches!(
            town().with_offices(vec![office.clone(), office]),
            Err(MapError::DuplicateOffice { .. })
        ));
    }

    #[test]
    fn description_uses_wire_names() {
        let json = serde_json::to_value(town()).unwrap();
        assert_eq!(json["id"], "town");
        assert_eq!(json["dogSpeed"], 4.0);
        assert_eq!(json["bagCapacity"], 3);
        assert_eq!(json["roads"][1], serde_json::json!({"x0": 40, "y0": 0, "y1": 30}));
        assert_eq!(json["lootTypes"][0]["value"], 10);
    }
}
