//! Traits describing read-only world data.
//!
//! The map oracle answers walkability questions for the behavior and
//! pathfinding passes without coupling them to a concrete tile-map format;
//! the RNG oracle supplies deterministic randomness for patrol targets.
mod map;
mod rng;

pub use map::{GridMap, MapDimensions, MapOracle, PASSABLE, TileLayer};
pub use rng::{PcgRng, RngOracle, actor_key, compute_seed};
