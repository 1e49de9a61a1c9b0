//! Actor movement on the road network and path collision tests

use super::geometry::{RoadIndex, Vec2};

/// Half-width of an actor when gathering
pub const ACTOR_HALF_WIDTH: f64 = 0.3;
/// Loot items are points
pub const LOOT_HALF_WIDTH: f64 = 0.0;
/// Half-width of an office when depositing
pub const OFFICE_HALF_WIDTH: f64 = 0.25;

/// Result of one integration step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementStep {
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Movement system for actors constrained to roads
pub struct MovementSystem;

impl MovementSystem {
    /// Move `position` by `velocity * dt`, clamped to the union of the
    /// envelopes of the roads containing the pre-move position. Any axis that
    /// was clamped loses its velocity component.
    ///
    /// Returns `None` when no road contains `position`.
    pub fn step(roads: &RoadIndex, position: Vec2, velocity: Vec2, dt: f64) -> Option<MovementStep> {
        let bounds = roads.reachable_envelope(position)?;
        let tentative = position + velocity * dt;
        let clamped = bounds.clamp(tentative);

        let mut velocity = velocity;
        if clamped.x != tentative.x {
            velocity.x = 0.0;
        }
        if clamped.y != tentative.y {
            velocity.y = 0.0;
        }

        Some(MovementStep {
            position: clamped,
            velocity,
        })
    }
}

/// Projection of a point onto a movement path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathProjection {
    /// Squared distance from the point to the path's line
    pub sq_distance: f64,
    /// Position of the projection along the path, 0 at the start and 1 at the end
    pub proj_ratio: f64,
}

impl PathProjection {
    /// Whether a body of the given radius touches the point along the path
    pub fn is_hit(&self, radius: f64) -> bool {
        (0.0..=1.0).contains(&self.proj_ratio) && self.sq_distance <= radius * radius
    }
}

/// Project `point` onto the path `from -> to`. `from` and `to` must differ.
pub fn project_onto_path(from: Vec2, to: Vec2, point: Vec2) -> PathProjection {
    let u_x = point.x - from.x;
    let u_y = point.y - from.y;
    let v_x = to.x - from.x;
    let v_y = to.y - from.y;
    let u_dot_v = u_x * v_x + u_y * v_y;
    let u_len2 = u_x * u_x + u_y * u_y;
    let v_len2 = v_x * v_x + v_y * v_y;

    PathProjection {
        sq_distance: u_len2 - (u_dot_v * u_dot_v) / v_len2,
        proj_ratio: u_dot_v / v_len2,
    }
}
