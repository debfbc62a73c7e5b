//! Client-facing handle for the running simulation.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};

use town_core::{
    Behavior, MapOracle, NamePlacement, NpcId, NpcSpec, NpcState, PlayerState,
};

use crate::error::{Result, RuntimeError};
use crate::event::GameEvent;
use crate::worker::Command;

/// Cloneable façade over the tick worker's command channel.
///
/// All mutation is serialized through the worker, so any number of handles
/// can be shared across tasks.
#[derive(Clone)]
pub struct TownHandle {
    command_tx: mpsc::Sender<Command>,
    event_tx: broadcast::Sender<GameEvent>,
}

impl TownHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        event_tx: broadcast::Sender<GameEvent>,
    ) -> Self {
        Self {
            command_tx,
            event_tx,
        }
    }

    /// Subscribe to change and frame events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<GameEvent> {
        self.event_tx.subscribe()
    }

    pub async fn set_map(&self, map: Arc<dyn MapOracle>) -> Result<()> {
        self.send(Command::SetMap { map }).await
    }

    pub async fn add_npc(&self, spec: NpcSpec) -> Result<NpcState> {
        self.request(|reply| Command::AddNpc { spec, reply }).await
    }

    pub async fn remove_npc(&self, id: NpcId) -> Result<()> {
        self.send(Command::RemoveNpc { id }).await
    }

    pub async fn set_direction(&self, id: NpcId, dx: f64, dy: f64) -> Result<()> {
        self.send(Command::SetDirection { id, dx, dy }).await
    }

    pub async fn set_behavior(&self, id: NpcId, behavior: Behavior) -> Result<()> {
        self.send(Command::SetBehavior { id, behavior }).await
    }

    pub async fn stop(&self, id: NpcId) -> Result<()> {
        self.send(Command::Stop { id }).await
    }

    pub async fn move_to(&self, id: NpcId, x: f64, y: f64) -> Result<()> {
        self.send(Command::MoveTo { id, x, y }).await
    }

    /// Routes the NPC to `(x, y)` through the pathfinder. Fails with the
    /// search error when no route exists; the NPC is untouched in that case.
    pub async fn pathfind_to(&self, id: NpcId, x: f64, y: f64) -> Result<()> {
        self.request(|reply| Command::PathfindTo { id, x, y, reply })
            .await??;
        Ok(())
    }

    pub async fn show_speech(
        &self,
        id: NpcId,
        text: impl Into<String>,
        duration_ms: u64,
    ) -> Result<()> {
        self.send(Command::ShowSpeech {
            id,
            text: text.into(),
            duration_ms,
        })
        .await
    }

    pub async fn hide_speech(&self, id: NpcId) -> Result<()> {
        self.send(Command::HideSpeech { id }).await
    }

    pub async fn show_thinking(&self, id: NpcId, duration_ms: u64) -> Result<()> {
        self.send(Command::ShowThinking { id, duration_ms }).await
    }

    pub async fn hide_thinking(&self, id: NpcId) -> Result<()> {
        self.send(Command::HideThinking { id }).await
    }

    pub async fn set_display_name(
        &self,
        id: NpcId,
        text: impl Into<String>,
        placement: NamePlacement,
    ) -> Result<()> {
        self.send(Command::SetDisplayName {
            id,
            text: text.into(),
            placement,
        })
        .await
    }

    pub async fn hide_display_name(&self, id: NpcId) -> Result<()> {
        self.send(Command::HideDisplayName { id }).await
    }

    pub async fn update_player(&self, state: PlayerState) -> Result<()> {
        self.send(Command::UpdatePlayer { state }).await
    }

    pub async fn set_player_position(&self, x: f64, y: f64) -> Result<()> {
        self.send(Command::SetPlayerPosition { x, y }).await
    }

    pub async fn npc(&self, id: NpcId) -> Result<Option<NpcState>> {
        self.request(|reply| Command::QueryNpc { id, reply }).await
    }

    pub async fn npcs(&self) -> Result<Vec<NpcState>> {
        self.request(|reply| Command::QueryNpcs { reply }).await
    }

    pub async fn player(&self) -> Result<Option<PlayerState>> {
        self.request(|reply| Command::QueryPlayer { reply }).await
    }

    async fn send(&self, cmd: Command) -> Result<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }
}
