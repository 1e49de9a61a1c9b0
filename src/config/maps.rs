//! Game config file: maps and loot generator settings

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use super::ConfigError;
use crate::game::map::{DEFAULT_BAG_CAPACITY, DEFAULT_DOG_SPEED};
use crate::game::{Building, LootGeneratorConfig, LootType, MapDefinition, MapId, Office, Road};

/// Everything the engine needs from the game config file
#[derive(Debug)]
pub struct GameConfig {
    pub maps: Vec<MapDefinition>,
    pub loot_generator: LootGeneratorConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameConfigFile {
    default_dog_speed: Option<f64>,
    default_bag_capacity: Option<usize>,
    loot_generator_config: Option<LootGeneratorFile>,
    maps: Vec<MapFile>,
}

#[derive(Debug, Deserialize)]
struct LootGeneratorFile {
    /// Seconds
    period: f64,
    probability: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapFile {
    id: String,
    name: String,
    roads: Vec<Road>,
    #[serde(default)]
    buildings: Vec<Building>,
    #[serde(default)]
    offices: Vec<Office>,
    #[serde(default)]
    loot_types: Vec<LootType>,
    dog_speed: Option<f64>,
    bag_capacity: Option<usize>,
}

impl LootGeneratorFile {
    fn into_config(self) -> Result<LootGeneratorConfig, ConfigError> {
        let period = match Duration::try_from_secs_f64(self.period) {
            Ok(period) if !period.is_zero() => period,
            _ => {
                return Err(ConfigError::InvalidLootGenerator(format!(
                    "period must be a positive number of seconds, got {}",
                    self.period
                )))
            }
        };
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(ConfigError::InvalidLootGenerator(format!(
                "probability must be within [0, 1], got {}",
                self.probability
            )));
        }
        Ok(LootGeneratorConfig {
            period,
            probability: self.probability,
        })
    }
}

/// Parse a game config document
pub fn parse_game_config(raw: &str) -> Result<GameConfig, ConfigError> {
    let file: GameConfigFile = serde_json::from_str(raw)?;
    let default_speed = file.default_dog_speed.unwrap_or(DEFAULT_DOG_SPEED);
    let default_capacity = file.default_bag_capacity.unwrap_or(DEFAULT_BAG_CAPACITY);

    let loot_generator = match file.loot_generator_config {
        Some(generator) => generator.into_config()?,
        None => LootGeneratorConfig::default(),
    };

    let maps = file
        .maps
        .into_iter()
        .map(|map| {
            let definition = MapDefinition::new(
                MapId::new(map.id),
                map.name,
                map.roads,
                map.dog_speed.unwrap_or(default_speed),
            )?
            .with_buildings(map.buildings)
            .with_offices(map.offices)?
            .with_loot_types(map.loot_types)
            .with_bag_capacity(map.bag_capacity.unwrap_or(default_capacity));
            Ok(definition)
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    Ok(GameConfig {
        maps,
        loot_generator,
    })
}

/// Read and parse the game config file
pub fn load_game_config(path: &Path) -> Result<GameConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_game_config(&raw)?;
    info!(
        path = %path.display(),
        maps = config.maps.len(),
        "Game config loaded"
    );
    Ok(config)
}
