//! Movement integration.
//!
//! One integration step per moving entity per tick: displace the position by
//! `direction * speed * dt`, then clamp each axis into the map. Clamping
//! never touches the direction or the moving flag; an entity pinned at a
//! boundary while pointing outward simply stops gaining ground.

use std::time::Duration;

use crate::env::MapDimensions;
use crate::geometry::{Direction, Point};

/// Integrates one entity's position for the tick. Returns the clamped result
/// without mutating anything; callers decide where to store it.
pub(crate) fn integrate(
    position: Point,
    direction: Direction,
    speed: f64,
    dt: Duration,
    dims: Option<MapDimensions>,
) -> Point {
    let delta = speed.max(0.0) * dt.as_secs_f64();
    let displaced = Point::new(
        position.x + f64::from(direction.dx) * delta,
        position.y + f64::from(direction.dy) * delta,
    );
    match dims {
        Some(dims) => dims.clamp(displaced),
        None => displaced,
    }
}
