//! Tick worker that owns the authoritative [`TownController`].
//!
//! Receives commands from [`TownHandle`], applies them to the controller,
//! and drives the simulation clock with a tokio interval. Every tick ends
//! with a `Frame` broadcast carrying a full snapshot.
//!
//! [`TownHandle`]: crate::handle::TownHandle

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use town_core::{
    Behavior, MapOracle, NamePlacement, NpcId, NpcSpec, NpcState, PathfindError, PlayerState,
    TownController,
};

use crate::event::GameEvent;

/// Commands that can be sent to the tick worker.
pub(crate) enum Command {
    SetMap {
        map: Arc<dyn MapOracle>,
    },
    AddNpc {
        spec: NpcSpec,
        reply: oneshot::Sender<NpcState>,
    },
    RemoveNpc {
        id: NpcId,
    },
    SetDirection {
        id: NpcId,
        dx: f64,
        dy: f64,
    },
    SetBehavior {
        id: NpcId,
        behavior: Behavior,
    },
    Stop {
        id: NpcId,
    },
    MoveTo {
        id: NpcId,
        x: f64,
        y: f64,
    },
    PathfindTo {
        id: NpcId,
        x: f64,
        y: f64,
        reply: oneshot::Sender<Result<(), PathfindError>>,
    },
    ShowSpeech {
        id: NpcId,
        text: String,
        duration_ms: u64,
    },
    HideSpeech {
        id: NpcId,
    },
    ShowThinking {
        id: NpcId,
        duration_ms: u64,
    },
    HideThinking {
        id: NpcId,
    },
    SetDisplayName {
        id: NpcId,
        text: String,
        placement: NamePlacement,
    },
    HideDisplayName {
        id: NpcId,
    },
    UpdatePlayer {
        state: PlayerState,
    },
    SetPlayerPosition {
        x: f64,
        y: f64,
    },
    QueryNpc {
        id: NpcId,
        reply: oneshot::Sender<Option<NpcState>>,
    },
    QueryNpcs {
        reply: oneshot::Sender<Vec<NpcState>>,
    },
    QueryPlayer {
        reply: oneshot::Sender<Option<PlayerState>>,
    },
}

/// Background task that applies commands and advances the simulation.
pub(crate) struct TickWorker {
    controller: TownController,
    tick: Duration,
    frame: u64,
    command_rx: mpsc::Receiver<Command>,
    event_tx: broadcast::Sender<GameEvent>,
}

impl TickWorker {
    pub(crate) fn new(
        controller: TownController,
        tick: Duration,
        command_rx: mpsc::Receiver<Command>,
        event_tx: broadcast::Sender<GameEvent>,
    ) -> Self {
        Self {
            controller,
            tick,
            frame: 0,
            command_rx,
            event_tx,
        }
    }

    /// Main worker loop. Exits when every handle has been dropped.
    pub(crate) async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.advance(),
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
            }
        }
        debug!(frames = self.frame, "tick worker stopped");
    }

    fn advance(&mut self) {
        self.frame += 1;
        self.controller.tick(self.tick);
        let _ = self.event_tx.send(GameEvent::Frame {
            tick: self.frame,
            npcs: self.controller.npcs(),
            player: self.controller.player(),
        });
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetMap { map } => self.controller.set_map(map),
            Command::AddNpc { spec, reply } => {
                let _ = reply.send(self.controller.add_npc(spec));
            }
            Command::RemoveNpc { id } => self.controller.remove_npc(&id),
            Command::SetDirection { id, dx, dy } => self.controller.set_direction(&id, dx, dy),
            Command::SetBehavior { id, behavior } => self.controller.set_behavior(&id, behavior),
            Command::Stop { id } => self.controller.stop(&id),
            Command::MoveTo { id, x, y } => self.controller.move_to(&id, x, y),
            Command::PathfindTo { id, x, y, reply } => {
                let _ = reply.send(self.controller.pathfind_to(&id, x, y));
            }
            Command::ShowSpeech {
                id,
                text,
                duration_ms,
            } => self.controller.show_speech(&id, text, duration_ms),
            Command::HideSpeech { id } => self.controller.hide_speech(&id),
            Command::ShowThinking { id, duration_ms } => {
                self.controller.show_thinking(&id, duration_ms);
            }
            Command::HideThinking { id } => self.controller.hide_thinking(&id),
            Command::SetDisplayName {
                id,
                text,
                placement,
            } => self.controller.set_display_name(&id, text, placement),
            Command::HideDisplayName { id } => self.controller.hide_display_name(&id),
            Command::UpdatePlayer { state } => self.controller.update_player(state),
            Command::SetPlayerPosition { x, y } => self.controller.set_player_position(x, y),
            Command::QueryNpc { id, reply } => {
                let _ = reply.send(self.controller.npc(&id));
            }
            Command::QueryNpcs { reply } => {
                let _ = reply.send(self.controller.npcs());
            }
            Command::QueryPlayer { reply } => {
                let _ = reply.send(self.controller.player());
            }
        }
    }
}
