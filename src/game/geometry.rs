//! Road geometry and the axis-indexed containment lookup
//!
//! Static map geometry is integral; live actor state is continuous. Roads are
//! strictly horizontal or vertical, which lets every collision question be
//! answered one axis at a time.

use std::collections::BTreeMap;
use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};

pub type Coord = i32;

/// Half-width of a road's collision envelope
pub const ROAD_HALF_WIDTH: f64 = 0.4;

/// Slack for the ordered-key scan; the exact test happens on the envelope.
const KEY_SLACK: f64 = 1e-9;

/// Integral map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }
}

/// Continuous coordinates used for positions and velocities
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl From<Point> for Vec2 {
    fn from(p: Point) -> Self {
        Vec2::new(f64::from(p.x), f64::from(p.y))
    }
}

impl From<Vec2> for [f64; 2] {
    fn from(v: Vec2) -> Self {
        [v.x, v.y]
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Road from {start:?} to {end:?} is neither horizontal nor vertical")]
    Diagonal { start: Point, end: Point },

    #[error("Road at {0:?} has zero length")]
    ZeroLength(Point),

    #[error("Road must carry exactly one of x1 or y1")]
    AmbiguousEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// A straight road segment. Endpoints differ in exactly one axis and may be
/// stored in either order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RoadRecord", into = "RoadRecord")]
pub struct Road {
    start: Point,
    end: Point,
}

impl Road {
    pub fn new(start: Point, end: Point) -> Result<Self, GeometryError> {
        match (start.x == end.x, start.y == end.y) {
            (true, true) => Err(GeometryError::ZeroLength(start)),
            (false, false) => Err(GeometryError::Diagonal { start, end }),
            _ => Ok(Self { start, end }),
        }
    }

    pub fn horizontal(start: Point, end_x: Coord) -> Result<Self, GeometryError> {
        Self::new(start, Point::new(end_x, start.y))
    }

    pub fn vertical(start: Point, end_y: Coord) -> Result<Self, GeometryError> {
        Self::new(start, Point::new(start.x, end_y))
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn axis(&self) -> Axis {
        if self.start.y == self.end.y {
            Axis::Horizontal
        } else {
            Axis::Vertical
        }
    }

    /// The coordinate that stays fixed along the road
    fn fixed_coord(&self) -> Coord {
        match self.axis() {
            Axis::Horizontal => self.start.y,
            Axis::Vertical => self.start.x,
        }
    }

    /// Normalized bounds widened by [`ROAD_HALF_WIDTH`]
    pub fn envelope(&self) -> Envelope {
        Envelope {
            min_x: f64::from(self.start.x.min(self.end.x)) - ROAD_HALF_WIDTH,
            max_x: f64::from(self.start.x.max(self.end.x)) + ROAD_HALF_WIDTH,
            min_y: f64::from(self.start.y.min(self.end.y)) - ROAD_HALF_WIDTH,
            max_y: f64::from(self.start.y.max(self.end.y)) + ROAD_HALF_WIDTH,
        }
    }

    /// Point on the center line, `t` in `0..=1` from start to end
    pub fn point_at(&self, t: f64) -> Vec2 {
        let start = Vec2::from(self.start);
        let end = Vec2::from(self.end);
        Vec2::new(
            start.x + (end.x - start.x) * t,
            start.y + (end.y - start.y) * t,
        )
    }
}

/// Road shape as it appears in config files and map descriptions
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoadRecord {
    x0: Coord,
    y0: Coord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x1: Option<Coord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y1: Option<Coord>,
}

impl TryFrom<RoadRecord> for Road {
    type Error = GeometryError;

    fn try_from(record: RoadRecord) -> Result<Self, Self::Error> {
        let start = Point::new(record.x0, record.y0);
        match (record.x1, record.y1) {
            (Some(x1), None) => Road::horizontal(start, x1),
            (None, Some(y1)) => Road::vertical(start, y1),
            _ => Err(GeometryError::AmbiguousEnd),
        }
    }
}

impl From<Road> for RoadRecord {
    fn from(road: Road) -> Self {
        let (x1, y1) = match road.axis() {
            Axis::Horizontal => (Some(road.end.x), None),
            Axis::Vertical => (None, Some(road.end.y)),
        };
        RoadRecord {
            x0: road.start.x,
            y0: road.start.y,
            x1,
            y1,
        }
    }
}

/// Axis-aligned bounds, inclusive on every side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn union(self, other: Envelope) -> Envelope {
        Envelope {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Clamp each axis independently
    pub fn clamp(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.min_x, self.max_x),
            p.y.clamp(self.min_y, self.max_y),
        )
    }
}

/// Roads of one map, indexed by their fixed coordinate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<Road>", into = "Vec<Road>")]
pub struct RoadIndex {
    roads: Vec<Road>,
    /// Horizontal roads keyed by y
    horizontal: BTreeMap<Coord, Vec<usize>>,
    /// Vertical roads keyed by x
    vertical: BTreeMap<Coord, Vec<usize>>,
}

impl RoadIndex {
    pub fn new(roads: Vec<Road>) -> Self {
        let mut horizontal: BTreeMap<Coord, Vec<usize>> = BTreeMap::new();
        let mut vertical: BTreeMap<Coord, Vec<usize>> = BTreeMap::new();
        for (idx, road) in roads.iter().enumerate() {
            let bucket = match road.axis() {
                Axis::Horizontal => &mut horizontal,
                Axis::Vertical => &mut vertical,
            };
            bucket.entry(road.fixed_coord()).or_default().push(idx);
        }
        Self {
            roads,
            horizontal,
            vertical,
        }
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn is_empty(&self) -> bool {
        self.roads.is_empty()
    }

    /// All roads whose envelope contains `pos`
    pub fn containing(&self, pos: Vec2) -> Vec<&Road> {
        let mut found = Vec::new();
        self.scan(&self.horizontal, pos.y, pos, &mut found);
        self.scan(&self.vertical, pos.x, pos, &mut found);
        found
    }

    /// Union of the envelopes of every road containing `pos`
    pub fn reachable_envelope(&self, pos: Vec2) -> Option<Envelope> {
        self.containing(pos)
            .into_iter()
            .map(Road::envelope)
            .reduce(Envelope::union)
    }

    fn scan<'a>(
        &'a self,
        bucket: &BTreeMap<Coord, Vec<usize>>,
        coord: f64,
        pos: Vec2,
        found: &mut Vec<&'a Road>,
    ) {
        let lo = (coord - ROAD_HALF_WIDTH - KEY_SLACK).ceil();
        let hi = (coord + ROAD_HALF_WIDTH + KEY_SLACK).floor();
        if !(lo <= hi) {
            return;
        }
        for indices in bucket.range(lo as Coord..=hi as Coord).map(|(_, v)| v) {
            for &idx in indices {
                let road = &self.roads[idx];
                if road.envelope().contains(pos) {
                    found.push(road);
                }
            }
        }
    }
}

impl From<Vec<Road>> for RoadIndex {
    fn from(roads: Vec<Road>) -> Self {
        RoadIndex::new(roads)
    }
}

impl From<RoadIndex> for Vec<Road> {
    fn from(index: RoadIndex) -> Self {
        index.roads
    }
}
