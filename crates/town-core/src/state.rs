//! Canonical entity state shared between the simulation passes and embedders.
//!
//! Everything here is plain data: snapshots handed to subscribers are clones
//! of these types, and the rendering layer is expected to treat them as
//! read-only.

use std::fmt;

use crate::config::SimConfig;
use crate::geometry::{Direction, Point, Tile};

/// Unique identifier for an NPC within a controller's registry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NpcId(String);

impl NpcId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NpcId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NpcId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where a display name is anchored relative to the sprite.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NamePlacement {
    #[default]
    Above,
    Below,
}

/// Display-name text plus its placement.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NameTag {
    pub text: String,
    pub placement: NamePlacement,
}

impl NameTag {
    pub fn new(text: impl Into<String>, placement: NamePlacement) -> Self {
        Self {
            text: text.into(),
            placement,
        }
    }
}

/// Speech-bubble state for one NPC.
///
/// The generation token increments on every `show_speech` request; a pending
/// auto-hide whose token no longer matches is stale and must not fire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeechState {
    pub text: Option<String>,
    pub visible: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) token: u64,
}

/// Progress along a precomputed waypoint path.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathProgress {
    waypoints: Vec<Tile>,
    index: usize,
}

impl PathProgress {
    /// Wraps a pathfinder result. The waypoint list must be non-empty; the
    /// pathfinder always returns at least the start tile.
    pub fn new(waypoints: Vec<Tile>) -> Self {
        debug_assert!(!waypoints.is_empty());
        Self {
            waypoints,
            index: 0,
        }
    }

    pub fn waypoints(&self) -> &[Tile] {
        &self.waypoints
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The waypoint currently being homed on.
    pub fn current(&self) -> Option<Tile> {
        self.waypoints.get(self.index).copied()
    }

    /// The waypoint after the current one, if any.
    pub fn next(&self) -> Option<Tile> {
        self.waypoints.get(self.index + 1).copied()
    }

    /// Moves on to the next waypoint. Returns false when the path is spent.
    pub fn advance(&mut self) -> bool {
        if self.index + 1 < self.waypoints.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }
}

/// Autonomous-motion policy assigned to an NPC, evaluated once per tick.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Behavior {
    /// No autonomous change; motion only changes via explicit API calls.
    #[default]
    Idle,
    /// The core applies whatever direction the caller last set. Direction
    /// selection for this behavior is deliberately the caller's policy.
    Random,
    /// Head toward the player's tile, stopping when colocated.
    Follow,
    /// Walk toward a target tile, drawing a new random one on arrival.
    Patrol,
    /// Head straight toward the stored target, ignoring obstacles.
    MoveTo,
    /// Walk a precomputed waypoint path produced by the pathfinder.
    Pathfind(PathProgress),
}

impl Behavior {
    pub fn kind(&self) -> BehaviorKind {
        match self {
            Behavior::Idle => BehaviorKind::Idle,
            Behavior::Random => BehaviorKind::Random,
            Behavior::Follow => BehaviorKind::Follow,
            Behavior::Patrol => BehaviorKind::Patrol,
            Behavior::MoveTo => BehaviorKind::MoveTo,
            Behavior::Pathfind(_) => BehaviorKind::Pathfind,
        }
    }
}

/// Payload-free behavior tag, for logging and API surfaces that only care
/// which policy is active.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BehaviorKind {
    Idle,
    Random,
    Follow,
    Patrol,
    MoveTo,
    Pathfind,
}

/// Complete state for one NPC.
///
/// # Invariants
///
/// - `direction` components are always in {-1, 0, 1}.
/// - `moving` is true only while at least one direction component is nonzero,
///   except within the tick that resets a just-arrived NPC to idle.
/// - A `Behavior::Pathfind` payload always carries a non-empty waypoint list
///   with a valid index.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NpcState {
    pub id: NpcId,
    pub position: Point,
    pub direction: Direction,
    /// Walking speed in tiles per second. Never negative.
    pub speed: f64,
    pub moving: bool,
    /// Opaque sprite-sheet reference resolved by the rendering layer.
    pub look: String,
    pub behavior: Behavior,
    /// Target for `MoveTo`, `Patrol`, and `Pathfind` behaviors.
    pub target: Option<Point>,
    pub name: Option<NameTag>,
    pub speech: SpeechState,
    pub thinking: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) thinking_token: u64,
}

impl NpcState {
    pub fn new(id: NpcId, position: Point, look: impl Into<String>, behavior: Behavior) -> Self {
        Self {
            id,
            position,
            direction: Direction::ZERO,
            speed: SimConfig::DEFAULT_SPEED,
            moving: false,
            look: look.into(),
            behavior,
            target: None,
            name: None,
            speech: SpeechState::default(),
            thinking: false,
            thinking_token: 0,
        }
    }

    /// Zeroes direction and clears the moving flag, leaving behavior as-is.
    pub(crate) fn halt(&mut self) {
        self.direction = Direction::ZERO;
        self.moving = false;
    }
}

/// Blueprint for a new NPC handed to `add_npc`.
#[derive(Clone, Debug, PartialEq)]
pub struct NpcSpec {
    pub id: NpcId,
    pub position: Point,
    pub look: String,
    pub behavior: Behavior,
    /// Defaults to the id text when absent.
    pub display_name: Option<String>,
    pub name_placement: NamePlacement,
}

impl NpcSpec {
    pub fn new(id: impl Into<NpcId>, position: Point) -> Self {
        Self {
            id: id.into(),
            position,
            look: SimConfig::DEFAULT_LOOK.to_owned(),
            behavior: Behavior::Idle,
            display_name: None,
            name_placement: NamePlacement::Above,
        }
    }

    pub fn with_look(mut self, look: impl Into<String>) -> Self {
        self.look = look.into();
        self
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>, placement: NamePlacement) -> Self {
        self.display_name = Some(name.into());
        self.name_placement = placement;
        self
    }
}

/// State of the player character, mirrored into the core by the embedding.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerState {
    pub position: Point,
    pub direction: Direction,
    /// Walking speed in tiles per second.
    pub speed: f64,
    pub moving: bool,
}

impl PlayerState {
    pub fn new(position: Point) -> Self {
        Self {
            position,
            direction: Direction::ZERO,
            speed: SimConfig::DEFAULT_SPEED,
            moving: false,
        }
    }
}
