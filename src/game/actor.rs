//! Player avatars

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::geometry::Vec2;
use super::ids::{ActorId, LootId};
use crate::error::GameError;

/// Cardinal facing, encoded on the wire by its move code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "U")]
    North,
    #[serde(rename = "D")]
    South,
    #[serde(rename = "L")]
    West,
    #[serde(rename = "R")]
    East,
}

impl Direction {
    /// Unit vector in map coordinates (y grows southward)
    pub fn unit(self) -> Vec2 {
        match self {
            Direction::North => Vec2::new(0.0, -1.0),
            Direction::South => Vec2::new(0.0, 1.0),
            Direction::West => Vec2::new(-1.0, 0.0),
            Direction::East => Vec2::new(1.0, 0.0),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Direction::North => "U",
            Direction::South => "D",
            Direction::West => "L",
            Direction::East => "R",
        }
    }
}

/// A parsed move request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveCommand {
    Go(Direction),
    Stop,
}

impl FromStr for MoveCommand {
    type Err = GameError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "U" => Ok(MoveCommand::Go(Direction::North)),
            "D" => Ok(MoveCommand::Go(Direction::South)),
            "L" => Ok(MoveCommand::Go(Direction::West)),
            "R" => Ok(MoveCommand::Go(Direction::East)),
            "" => Ok(MoveCommand::Stop),
            other => Err(GameError::InvalidMoveCode(other.to_string())),
        }
    }
}

/// Item carried in an actor's bag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagItem {
    pub id: LootId,
    #[serde(rename = "type")]
    pub loot_type: usize,
}

/// Authoritative actor state inside a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    id: ActorId,
    name: String,
    position: Vec2,
    velocity: Vec2,
    facing: Direction,
    bag: Vec<BagItem>,
    bag_capacity: usize,
    score: u64,
}

impl Actor {
    pub fn new(id: ActorId, name: impl Into<String>, position: Vec2, bag_capacity: usize) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            velocity: Vec2::ZERO,
            facing: Direction::North,
            bag: Vec::new(),
            bag_capacity,
            score: 0,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn bag(&self) -> &[BagItem] {
        &self.bag
    }

    pub fn bag_capacity(&self) -> usize {
        self.bag_capacity
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn is_bag_full(&self) -> bool {
        self.bag.len() >= self.bag_capacity
    }

    /// Stopping keeps the current facing
    pub fn apply(&mut self, command: MoveCommand, speed: f64) {
        match command {
            MoveCommand::Go(direction) => {
                self.velocity = direction.unit() * speed;
                self.facing = direction;
            }
            MoveCommand::Stop => self.velocity = Vec2::ZERO,
        }
    }

    pub(crate) fn set_motion(&mut self, position: Vec2, velocity: Vec2) {
        self.position = position;
        self.velocity = velocity;
    }

    /// Returns false when the bag is already full
    pub(crate) fn pick_up(&mut self, item: BagItem) -> bool {
        if self.is_bag_full() {
            return false;
        }
        self.bag.push(item);
        true
    }

    /// Empty the bag, scoring each item; returns the points gained
    pub(crate) fn deposit(&mut self, value_of: impl Fn(usize) -> u64) -> u64 {
        let gained: u64 = self.bag.drain(..).map(|item| value_of(item.loot_type)).sum();
        self.score += gained;
        gained
    }
}
