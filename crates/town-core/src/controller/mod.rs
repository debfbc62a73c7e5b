//! Authoritative world controller: entity registry, notification bus, and
//! control API.
//!
//! [`TownController`] owns every NPC record plus the mirrored player state.
//! All mutation flows through its methods: control-API calls publish a full
//! snapshot to batch subscribers, while the per-tick passes write through the
//! no-notify path and expect the rendering layer to pull [`npcs`] once per
//! tick instead.
//!
//! The controller is a cheap clone over a shared mutex, so embeddings pass
//! instances around explicitly (there is no global) and listeners may call
//! back into the controller during dispatch; nested publishes are queued
//! and drained in order rather than dropped.
//!
//! [`npcs`]: TownController::npcs

mod bus;
mod indicator;

pub use bus::SubscriptionId;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::behavior::{self, SteerContext};
use crate::config::SimConfig;
use crate::env::{MapOracle, PcgRng};
use crate::geometry::{Direction, Point};
use crate::motion;
use crate::path::{self, PathError};
use crate::state::{
    Behavior, NameTag, NamePlacement, NpcId, NpcSpec, NpcState, PathProgress, PlayerState,
};
use bus::ListenerSet;
use indicator::{ExpiryQueue, IndicatorKind};

/// Why a pathfinding request failed. Entity state is untouched on failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathfindError {
    #[error("npc {0} not found")]
    UnknownNpc(NpcId),

    #[error("no world map set")]
    MapUnset,

    #[error(transparent)]
    Search(#[from] PathError),
}

/// Field-level update applied through the no-notify bypass path.
///
/// Intended for high-frequency per-tick writes where the caller pulls a
/// fresh snapshot itself instead of relying on push notification.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NpcPatch {
    pub position: Option<Point>,
    pub direction: Option<Direction>,
    pub moving: Option<bool>,
    pub speed: Option<f64>,
}

impl NpcPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_moving(mut self, moving: bool) -> Self {
        self.moving = Some(moving);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    fn apply(&self, npc: &mut NpcState) {
        if let Some(position) = self.position {
            npc.position = position;
        }
        if let Some(direction) = self.direction {
            npc.direction = direction;
        }
        if let Some(moving) = self.moving {
            npc.moving = moving;
        }
        if let Some(speed) = self.speed {
            npc.speed = speed.max(0.0);
        }
    }
}

struct Inner {
    config: SimConfig,
    npcs: BTreeMap<NpcId, NpcState>,
    player: Option<PlayerState>,
    map: Option<Arc<dyn MapOracle>>,
    npc_listeners: ListenerSet<Vec<NpcState>>,
    player_listeners: ListenerSet<PlayerState>,
    expiries: ExpiryQueue,
    /// Simulation clock in milliseconds, advanced by [`TownController::tick`].
    clock_ms: u64,
    /// Per-draw nonce feeding the patrol target RNG.
    patrol_nonce: u64,
}

impl Inner {
    fn snapshot(&self) -> Vec<NpcState> {
        self.npcs.values().cloned().collect()
    }
}

/// Shared handle to one simulation world. Clones refer to the same state.
#[derive(Clone)]
pub struct TownController {
    inner: Arc<Mutex<Inner>>,
}

impl Default for TownController {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl TownController {
    pub fn new(config: SimConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                config,
                npcs: BTreeMap::new(),
                player: None,
                map: None,
                npc_listeners: ListenerSet::default(),
                player_listeners: ListenerSet::default(),
                expiries: ExpiryQueue::default(),
                clock_ms: 0,
                patrol_nonce: 0,
            })),
        }
    }

    /// Installs or swaps the world map consulted for bounds and walkability.
    pub fn set_map(&self, map: Arc<dyn MapOracle>) {
        self.inner.lock().map = Some(map);
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Adds an NPC and notifies batch subscribers.
    ///
    /// Duplicate ids are last-write-wins: inserting an existing id replaces
    /// the previous record wholesale.
    pub fn add_npc(&self, spec: NpcSpec) -> NpcState {
        let record = {
            let mut npc = NpcState::new(
                spec.id.clone(),
                spec.position,
                spec.look,
                spec.behavior,
            );
            let text = spec
                .display_name
                .unwrap_or_else(|| spec.id.as_str().to_owned());
            npc.name = Some(NameTag::new(text, spec.name_placement));

            let mut guard = self.inner.lock();
            guard.npcs.insert(spec.id, npc.clone());
            npc
        };
        self.publish_npcs();
        record
    }

    /// Removes an NPC and notifies batch subscribers. Removing an unknown id
    /// still publishes, so subscribers always converge on the registry state.
    pub fn remove_npc(&self, id: &NpcId) {
        {
            let mut guard = self.inner.lock();
            if guard.npcs.remove(id).is_none() {
                debug!(npc = %id, "remove_npc: id not present");
            }
        }
        self.publish_npcs();
    }

    pub fn npc(&self, id: &NpcId) -> Option<NpcState> {
        self.inner.lock().npcs.get(id).cloned()
    }

    /// Snapshot of every NPC. Ordering follows the registry's key order and
    /// carries no semantic meaning.
    pub fn npcs(&self) -> Vec<NpcState> {
        self.inner.lock().snapshot()
    }

    pub fn player(&self) -> Option<PlayerState> {
        self.inner.lock().player
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Subscribes to batch NPC updates published by mutating control calls.
    pub fn subscribe_npcs(
        &self,
        mut listener: impl FnMut(&[NpcState]) + Send + 'static,
    ) -> SubscriptionId {
        self.inner
            .lock()
            .npc_listeners
            .subscribe(Box::new(move |batch: &Vec<NpcState>| listener(batch)))
    }

    pub fn unsubscribe_npcs(&self, id: SubscriptionId) {
        self.inner.lock().npc_listeners.unsubscribe(id);
    }

    /// Subscribes to player updates. When a player state is already present
    /// the listener fires immediately with it.
    pub fn subscribe_player(
        &self,
        mut listener: impl FnMut(&PlayerState) + Send + 'static,
    ) -> SubscriptionId {
        let current = self.inner.lock().player;
        if let Some(player) = current {
            listener(&player);
        }
        self.inner
            .lock()
            .player_listeners
            .subscribe(Box::new(move |player: &PlayerState| listener(player)))
    }

    pub fn unsubscribe_player(&self, id: SubscriptionId) {
        self.inner.lock().player_listeners.unsubscribe(id);
    }

    // ------------------------------------------------------------------
    // Control API
    // ------------------------------------------------------------------

    /// Sets an absolute direction, quantized per axis. Calls that change
    /// neither direction nor the moving flag publish nothing.
    pub fn set_direction(&self, id: &NpcId, dx: f64, dy: f64) {
        let changed = {
            let mut guard = self.inner.lock();
            let Some(npc) = guard.npcs.get_mut(id) else {
                warn!(npc = %id, "set_direction: npc not found");
                return;
            };
            let direction = Direction::from_delta(dx, dy);
            let moving = dx != 0.0 || dy != 0.0;
            if npc.direction == direction && npc.moving == moving {
                false
            } else {
                npc.direction = direction;
                npc.moving = moving;
                true
            }
        };
        if changed {
            self.publish_npcs();
        }
    }

    /// Replaces the behavior. Switching to idle also stops the NPC.
    pub fn set_behavior(&self, id: &NpcId, behavior: Behavior) {
        {
            let mut guard = self.inner.lock();
            let Some(npc) = guard.npcs.get_mut(id) else {
                warn!(npc = %id, "set_behavior: npc not found");
                return;
            };
            npc.behavior = behavior;
            if matches!(npc.behavior, Behavior::Idle) {
                npc.halt();
            }
        }
        self.publish_npcs();
    }

    /// Stops the NPC: zero direction, moving false. Behavior is untouched.
    pub fn stop(&self, id: &NpcId) {
        {
            let mut guard = self.inner.lock();
            let Some(npc) = guard.npcs.get_mut(id) else {
                warn!(npc = %id, "stop: npc not found");
                return;
            };
            npc.halt();
        }
        self.publish_npcs();
    }

    /// Heads straight for `(x, y)` without pathfinding. A target within the
    /// arrival radius stops the NPC instead.
    pub fn move_to(&self, id: &NpcId, x: f64, y: f64) {
        {
            let mut guard = self.inner.lock();
            let Some(npc) = guard.npcs.get_mut(id) else {
                warn!(npc = %id, "move_to: npc not found");
                return;
            };
            let target = Point::new(x, y);
            if npc.position.distance(target) < SimConfig::ARRIVAL_RADIUS {
                npc.halt();
            } else {
                npc.direction =
                    Direction::from_delta(target.x - npc.position.x, target.y - npc.position.y);
                npc.moving = true;
                npc.target = Some(target);
                npc.behavior = Behavior::MoveTo;
            }
        }
        self.publish_npcs();
    }

    /// Runs the pathfinder from the NPC's tile to `(x, y)` and starts it
    /// walking the result. On any failure the NPC is left untouched and the
    /// error is returned for the caller to handle.
    pub fn pathfind_to(&self, id: &NpcId, x: f64, y: f64) -> Result<(), PathfindError> {
        {
            let mut guard = self.inner.lock();
            let Some(npc) = guard.npcs.get(id) else {
                warn!(npc = %id, "pathfind_to: npc not found");
                return Err(PathfindError::UnknownNpc(id.clone()));
            };
            let start = npc.position;
            let map = guard.map.clone().ok_or(PathfindError::MapUnset)?;

            let goal = Point::new(x, y);
            let waypoints = path::find_path(map.as_ref(), start, goal).inspect_err(|error| {
                warn!(npc = %id, %start, %goal, %error, "pathfind_to: no path");
            })?;

            let progress = PathProgress::new(waypoints);
            let Some(npc) = guard.npcs.get_mut(id) else {
                return Err(PathfindError::UnknownNpc(id.clone()));
            };
            if let Some(next) = progress.next() {
                npc.direction = Direction::from_delta(
                    next.x as f64 - npc.position.x,
                    next.y as f64 - npc.position.y,
                );
                npc.moving = true;
            }
            npc.target = Some(goal);
            npc.behavior = Behavior::Pathfind(progress);
        }
        self.publish_npcs();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Indicators & name tags
    // ------------------------------------------------------------------

    /// Shows a speech bubble. A nonzero duration schedules an auto-hide on
    /// the simulation clock; zero means the bubble stays until hidden.
    pub fn show_speech(&self, id: &NpcId, text: impl Into<String>, duration_ms: u64) {
        {
            let mut guard = self.inner.lock();
            let Some(npc) = guard.npcs.get_mut(id) else {
                warn!(npc = %id, "show_speech: npc not found");
                return;
            };
            npc.speech.token += 1;
            let token = npc.speech.token;
            npc.speech.text = Some(text.into());
            npc.speech.visible = true;
            if duration_ms > 0 {
                let deadline = guard.clock_ms.saturating_add(duration_ms);
                guard
                    .expiries
                    .schedule(id.clone(), IndicatorKind::Speech, token, deadline);
            }
        }
        self.publish_npcs();
    }

    /// Hides the speech bubble and invalidates any pending auto-hide.
    pub fn hide_speech(&self, id: &NpcId) {
        {
            let mut guard = self.inner.lock();
            let Some(npc) = guard.npcs.get_mut(id) else {
                warn!(npc = %id, "hide_speech: npc not found");
                return;
            };
            npc.speech.token += 1;
            npc.speech.visible = false;
            npc.speech.text = None;
        }
        self.publish_npcs();
    }

    /// Shows the thinking indicator with the same duration semantics as
    /// [`show_speech`](Self::show_speech).
    pub fn show_thinking(&self, id: &NpcId, duration_ms: u64) {
        {
            let mut guard = self.inner.lock();
            let Some(npc) = guard.npcs.get_mut(id) else {
                warn!(npc = %id, "show_thinking: npc not found");
                return;
            };
            npc.thinking = true;
            npc.thinking_token += 1;
            let token = npc.thinking_token;
            if duration_ms > 0 {
                let deadline = guard.clock_ms.saturating_add(duration_ms);
                guard
                    .expiries
                    .schedule(id.clone(), IndicatorKind::Thinking, token, deadline);
            }
        }
        self.publish_npcs();
    }

    pub fn hide_thinking(&self, id: &NpcId) {
        {
            let mut guard = self.inner.lock();
            let Some(npc) = guard.npcs.get_mut(id) else {
                warn!(npc = %id, "hide_thinking: npc not found");
                return;
            };
            npc.thinking = false;
            npc.thinking_token += 1;
        }
        self.publish_npcs();
    }

    pub fn set_display_name(&self, id: &NpcId, text: impl Into<String>, placement: NamePlacement) {
        {
            let mut guard = self.inner.lock();
            let Some(npc) = guard.npcs.get_mut(id) else {
                warn!(npc = %id, "set_display_name: npc not found");
                return;
            };
            npc.name = Some(NameTag::new(text, placement));
        }
        self.publish_npcs();
    }

    pub fn hide_display_name(&self, id: &NpcId) {
        {
            let mut guard = self.inner.lock();
            let Some(npc) = guard.npcs.get_mut(id) else {
                warn!(npc = %id, "hide_display_name: npc not found");
                return;
            };
            npc.name = None;
        }
        self.publish_npcs();
    }

    // ------------------------------------------------------------------
    // Player
    // ------------------------------------------------------------------

    /// Replaces the mirrored player state and notifies player subscribers.
    pub fn update_player(&self, state: PlayerState) {
        self.inner.lock().player = Some(state);
        self.publish_player();
    }

    /// Teleports the player, when a player state is present.
    pub fn set_player_position(&self, x: f64, y: f64) {
        {
            let mut guard = self.inner.lock();
            let Some(player) = guard.player.as_mut() else {
                debug!("set_player_position: no player state yet");
                return;
            };
            player.position = Point::new(x, y);
        }
        self.publish_player();
    }

    // ------------------------------------------------------------------
    // Bypass path
    // ------------------------------------------------------------------

    /// Applies a field patch without publishing any notification.
    pub fn patch_npc(&self, id: &NpcId, patch: NpcPatch) {
        let mut guard = self.inner.lock();
        let Some(npc) = guard.npcs.get_mut(id) else {
            warn!(npc = %id, "patch_npc: npc not found");
            return;
        };
        patch.apply(npc);
    }

    /// Applies many field patches without publishing any notification.
    pub fn patch_npcs(&self, patches: impl IntoIterator<Item = (NpcId, NpcPatch)>) {
        let mut guard = self.inner.lock();
        for (id, patch) in patches {
            if let Some(npc) = guard.npcs.get_mut(&id) {
                patch.apply(npc);
            }
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advances the world by one tick: behavior steering, movement
    /// integration with bounds clamping, waypoint arrival, and indicator
    /// expiry. Per-tick writes bypass the notification bus; only indicator
    /// expiry publishes, since it is a discrete change.
    pub fn tick(&self, dt: Duration) {
        let expired_any = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            inner.clock_ms = inner.clock_ms.saturating_add(dt.as_millis() as u64);

            let dims = inner.map.as_ref().map(|map| map.dimensions());
            let ctx = SteerContext {
                player: inner.player,
                dims,
                rng: PcgRng,
                game_seed: inner.config.game_seed,
            };

            let mut patrol_nonce = inner.patrol_nonce;
            for npc in inner.npcs.values_mut() {
                behavior::steer(npc, &ctx, &mut patrol_nonce);
            }
            inner.patrol_nonce = patrol_nonce;

            for npc in inner.npcs.values_mut() {
                if !npc.moving {
                    continue;
                }
                npc.position = motion::integrate(npc.position, npc.direction, npc.speed, dt, dims);
                behavior::arrive(npc);
            }

            if let Some(player) = inner.player.as_mut() {
                if player.moving {
                    player.position =
                        motion::integrate(player.position, player.direction, player.speed, dt, dims);
                }
            }

            let mut expired_any = false;
            for entry in inner.expiries.take_due(inner.clock_ms) {
                let Some(npc) = inner.npcs.get_mut(&entry.id) else {
                    // NPC removed while the expiry was pending.
                    continue;
                };
                match entry.kind {
                    IndicatorKind::Speech => {
                        if npc.speech.token == entry.token {
                            npc.speech.visible = false;
                            npc.speech.text = None;
                            expired_any = true;
                        }
                    }
                    IndicatorKind::Thinking => {
                        if npc.thinking_token == entry.token {
                            npc.thinking = false;
                            expired_any = true;
                        }
                    }
                }
            }
            expired_any
        };

        if expired_any {
            self.publish_npcs();
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn publish_npcs(&self) {
        let mut guard = self.inner.lock();
        let snapshot = guard.snapshot();
        guard.npc_listeners.enqueue(snapshot);
        if !guard.npc_listeners.try_begin_dispatch() {
            // A dispatch further up the stack drains the queue we extended.
            return;
        }
        loop {
            let Some(batch) = guard.npc_listeners.next_pending() else {
                break;
            };
            let mut entries = guard.npc_listeners.take_entries();
            drop(guard);
            for entry in &mut entries {
                entry.invoke(&batch);
            }
            guard = self.inner.lock();
            guard.npc_listeners.restore_entries(entries);
        }
        guard.npc_listeners.finish_dispatch();
    }

    fn publish_player(&self) {
        let mut guard = self.inner.lock();
        let Some(snapshot) = guard.player else {
            return;
        };
        guard.player_listeners.enqueue(snapshot);
        if !guard.player_listeners.try_begin_dispatch() {
            return;
        }
        loop {
            let Some(update) = guard.player_listeners.next_pending() else {
                break;
            };
            let mut entries = guard.player_listeners.take_entries();
            drop(guard);
            for entry in &mut entries {
                entry.invoke(&update);
            }
            guard = self.inner.lock();
            guard.player_listeners.restore_entries(entries);
        }
        guard.player_listeners.finish_dispatch();
    }
}

#[cfg(test)]
mod tests;
