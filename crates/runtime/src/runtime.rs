//! High-level runtime orchestrator.
//!
//! The runtime owns the background tick worker, wires up command/event
//! channels, and hands out cloneable [`TownHandle`]s for clients to drive
//! the simulation.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use town_core::{SimConfig, TownController};

use crate::error::{Result, RuntimeError};
use crate::event::GameEvent;
use crate::handle::TownHandle;
use crate::worker::TickWorker;

/// Runtime configuration shared across the orchestrator and worker.
#[derive(Debug, Clone)]
pub struct TownRuntimeConfig {
    pub sim: SimConfig,
    /// Interval the tick worker advances the simulation at.
    pub tick: Duration,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl Default for TownRuntimeConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            tick: Duration::from_millis(SimConfig::DEFAULT_TICK_MS),
            event_buffer_size: 256,
            command_buffer_size: 32,
        }
    }
}

/// Owns the tick worker and coordinates shutdown.
///
/// [`TownHandle`] provides a cloneable façade for clients; the runtime itself
/// stays with whoever is responsible for tearing the simulation down.
pub struct TownRuntime {
    handle: TownHandle,
    worker_handle: JoinHandle<()>,
}

impl TownRuntime {
    /// Spawns the tick worker and starts the simulation clock immediately.
    pub fn start(config: TownRuntimeConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size);
        let (event_tx, _) = broadcast::channel(config.event_buffer_size);

        let controller = TownController::new(config.sim);

        // Bridge controller notifications onto the broadcast channel. Send
        // errors only mean nobody is subscribed right now.
        let changes = event_tx.clone();
        controller.subscribe_npcs(move |batch| {
            let _ = changes.send(GameEvent::NpcsChanged(batch.to_vec()));
        });
        let changes = event_tx.clone();
        controller.subscribe_player(move |player| {
            let _ = changes.send(GameEvent::PlayerChanged(*player));
        });

        let worker = TickWorker::new(controller, config.tick, command_rx, event_tx.clone());
        let worker_handle = tokio::spawn(worker.run());

        Self {
            handle: TownHandle::new(command_tx, event_tx),
            worker_handle,
        }
    }

    /// Get a cloneable handle to this runtime.
    pub fn handle(&self) -> TownHandle {
        self.handle.clone()
    }

    /// Subscribe to change and frame events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<GameEvent> {
        self.handle.subscribe_events()
    }

    /// Shutdown the runtime gracefully. The worker exits once every handle
    /// clone has been dropped.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);
        self.worker_handle.await.map_err(RuntimeError::WorkerJoin)?;
        Ok(())
    }
}
