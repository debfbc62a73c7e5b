//! Tile-space geometry primitives shared by every simulation pass.
//!
//! Positions are measured in tiles, not pixels; fractional coordinates are
//! legal everywhere except the pathfinder, which floors its endpoints.

use std::fmt;

/// Minimum meaningful vector length. Anything shorter is treated as zero.
pub const EPSILON: f64 = 0.0001;

/// Continuous position expressed in fractional tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The tile this point falls in (floor of both coordinates).
    pub fn tile(self) -> Tile {
        Tile::new(self.x.floor() as i32, self.y.floor() as i32)
    }

    /// Euclidean distance to another point, in tiles.
    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Discrete grid position expressed in whole tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The continuous point at this tile's top-left corner.
    pub fn point(self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    /// Manhattan distance to another tile.
    pub fn manhattan_distance(self, other: Tile) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Per-axis movement direction with both components quantized to {-1, 0, 1}.
///
/// Diagonal motion is expressed by both axes being nonzero at once; the
/// simulation is 8-directional even though the pathfinder is 4-directional.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Direction {
    pub dx: i8,
    pub dy: i8,
}

impl Direction {
    pub const ZERO: Self = Self { dx: 0, dy: 0 };

    /// Quantizes an arbitrary delta to a unit direction per axis.
    pub fn from_delta(dx: f64, dy: f64) -> Self {
        Self {
            dx: quantize(dx, 0.0),
            dy: quantize(dy, 0.0),
        }
    }

    /// Quantizes a delta, treating anything within `deadband` of zero as
    /// zero on that axis. Used while homing on a waypoint so floating
    /// rounding noise cannot flip the facing back and forth.
    pub fn from_delta_deadband(dx: f64, dy: f64, deadband: f64) -> Self {
        Self {
            dx: quantize(dx, deadband),
            dy: quantize(dy, deadband),
        }
    }

    /// Axis-wise unit direction from one tile toward another.
    pub fn between_tiles(from: Tile, to: Tile) -> Self {
        Self {
            dx: (to.x - from.x).signum() as i8,
            dy: (to.y - from.y).signum() as i8,
        }
    }

    pub fn is_zero(self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

fn quantize(value: f64, deadband: f64) -> i8 {
    if value > deadband {
        1
    } else if value < -deadband {
        -1
    } else {
        0
    }
}

/// Facing angle of a continuous vector, in degrees within `[0, 360)`.
///
/// # Panics
///
/// Panics when the vector is shorter than [`EPSILON`]. A zero-length vector
/// has no orientation; defaulting silently would hide a logic error upstream.
pub fn orientation_degrees(dx: f64, dy: f64) -> f64 {
    let length = (dx * dx + dy * dy).sqrt();
    assert!(
        length >= EPSILON,
        "cannot compute the orientation of degenerate vector ({dx}, {dy})"
    );
    let two_pi = 2.0 * std::f64::consts::PI;
    let radians = (dy.atan2(dx) + two_pi) % two_pi;
    radians / two_pi * 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_floors_into_tile() {
        assert_eq!(Point::new(3.9, 7.1).tile(), Tile::new(3, 7));
        assert_eq!(Point::new(-0.5, 2.0).tile(), Tile::new(-1, 2));
    }

    #[test]
    fn direction_quantizes_to_unit_components() {
        assert_eq!(
            Direction::from_delta(4.2, -0.3),
            Direction { dx: 1, dy: -1 }
        );
        assert_eq!(Direction::from_delta(0.0, 0.0), Direction::ZERO);
    }

    #[test]
    fn deadband_suppresses_small_components() {
        let direction = Direction::from_delta_deadband(0.05, -0.5, 0.1);
        assert_eq!(direction, Direction { dx: 0, dy: -1 });
    }

    #[test]
    fn between_tiles_points_axis_wise() {
        let direction = Direction::between_tiles(Tile::new(2, 2), Tile::new(5, 0));
        assert_eq!(direction, Direction { dx: 1, dy: -1 });
    }

    #[test]
    fn orientation_covers_cardinal_axes() {
        assert_eq!(orientation_degrees(1.0, 0.0), 0.0);
        assert_eq!(orientation_degrees(0.0, 1.0), 90.0);
        assert_eq!(orientation_degrees(-1.0, 0.0), 180.0);
    }

    #[test]
    #[should_panic(expected = "degenerate vector")]
    fn orientation_rejects_zero_vector() {
        orientation_degrees(0.0, 0.00001);
    }
}
