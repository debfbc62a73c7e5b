//! Events broadcast by the runtime while the simulation runs.

use town_core::{NpcState, PlayerState};

/// Events emitted on the runtime's broadcast channel.
///
/// `NpcsChanged` and `PlayerChanged` mirror the controller's notification
/// bus: they fire on discrete control-API changes, not per tick. `Frame`
/// fires once per tick with a full snapshot, for consumers that render every
/// frame rather than react to changes.
#[derive(Clone, Debug, serde::Serialize)]
pub enum GameEvent {
    NpcsChanged(Vec<NpcState>),
    PlayerChanged(PlayerState),
    Frame {
        tick: u64,
        npcs: Vec<NpcState>,
        player: Option<PlayerState>,
    },
}
