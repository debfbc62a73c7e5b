/// Simulation configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Base seed for deterministic patrol-target selection. Two controllers
    /// built with the same seed replay identical patrol routes.
    pub game_seed: u64,
}

impl SimConfig {
    /// Default walking speed for newly added NPCs, in tiles per second.
    pub const DEFAULT_SPEED: f64 = 0.75;

    /// Nominal tick interval embeddings are expected to drive the core at.
    pub const DEFAULT_TICK_MS: u64 = 16;

    /// Sprite-sheet reference assigned to NPCs that do not specify a look.
    /// Opaque to the core; the rendering layer resolves it.
    pub const DEFAULT_LOOK: &'static str = "f2";

    /// Distance (tiles) at which a waypoint or direct move target counts as
    /// reached.
    pub const ARRIVAL_RADIUS: f64 = 0.1;

    /// Distance (tiles) at which a patrol target counts as reached and a new
    /// one is drawn.
    pub const PATROL_ARRIVAL_RADIUS: f64 = 0.5;

    /// Per-axis deadband applied when steering toward a waypoint, so rounding
    /// noise near the axis cannot flip the facing every tick.
    pub const STEER_DEADBAND: f64 = 0.1;

    pub fn new() -> Self {
        Self { game_seed: 0 }
    }

    pub fn with_seed(game_seed: u64) -> Self {
        Self { game_seed }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}
