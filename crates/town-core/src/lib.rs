//! Deterministic town-simulation core shared across embeddings.
//!
//! `town-core` owns the canonical NPC state, the per-tick behavior and
//! movement passes, the grid pathfinder, and the notification bus that feeds
//! rendering layers. All state mutation flows through
//! [`controller::TownController`]; everything underneath it is pure data and
//! pure functions, so the same world can be driven headless in tests, from an
//! async runtime, or by a frame loop.
pub mod config;
pub mod controller;
pub mod env;
pub mod geometry;
pub mod path;
pub mod state;

mod behavior;
mod motion;

pub use config::SimConfig;
pub use controller::{NpcPatch, PathfindError, SubscriptionId, TownController};
pub use env::{GridMap, MapDimensions, MapOracle, PASSABLE, PcgRng, RngOracle, TileLayer};
pub use geometry::{Direction, EPSILON, Point, Tile, orientation_degrees};
pub use path::{PathError, find_path};
pub use state::{
    Behavior, BehaviorKind, NameTag, NamePlacement, NpcId, NpcSpec, NpcState, PathProgress,
    PlayerState, SpeechState,
};
