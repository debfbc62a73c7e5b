//! Per-tick behavior state machine.
//!
//! Each tick runs two passes over every NPC: [`steer`] before integration
//! (follow and patrol pick a direction from world state) and [`arrive`] after
//! integration (move-to and pathfind check the freshly clamped position
//! against their target). Direction writes are gated on the quantized value
//! actually changing, so floating rounding noise near an axis cannot flip the
//! facing every tick.
//!
//! `Idle` never changes motion autonomously, and `Random` only applies
//! whatever direction the caller last set: direction selection for it is
//! deliberately caller policy, not core mechanism.

use crate::config::SimConfig;
use crate::env::{MapDimensions, PcgRng, RngOracle, actor_key, compute_seed};
use crate::geometry::{Direction, Point};
use crate::state::{Behavior, NpcState, PlayerState};

/// World context consulted by the pre-integration steering pass.
pub(crate) struct SteerContext {
    pub player: Option<PlayerState>,
    pub dims: Option<MapDimensions>,
    pub rng: PcgRng,
    pub game_seed: u64,
}

/// Pre-integration pass: follow and patrol recompute their direction.
pub(crate) fn steer(npc: &mut NpcState, ctx: &SteerContext, patrol_nonce: &mut u64) {
    match npc.behavior {
        Behavior::Follow => {
            if let Some(player) = ctx.player {
                steer_follow(npc, player);
            }
        }
        Behavior::Patrol => {
            if let Some(dims) = ctx.dims {
                steer_patrol(npc, dims, ctx.rng, ctx.game_seed, patrol_nonce);
            }
        }
        // Idle, Random, MoveTo, and Pathfind do not steer here.
        _ => {}
    }
}

fn steer_follow(npc: &mut NpcState, player: PlayerState) {
    let player_tile = player.position.tile();
    let npc_tile = npc.position.tile();

    if player_tile == npc_tile {
        npc.halt();
        return;
    }

    let candidate = Direction::between_tiles(npc_tile, player_tile);
    if candidate != npc.direction {
        npc.direction = candidate;
        npc.moving = true;
    }
}

fn steer_patrol(
    npc: &mut NpcState,
    dims: MapDimensions,
    rng: PcgRng,
    game_seed: u64,
    patrol_nonce: &mut u64,
) {
    let arrived = npc
        .target
        .is_none_or(|target| npc.position.distance(target) < SimConfig::PATROL_ARRIVAL_RADIUS);
    if arrived {
        npc.target = Some(pick_patrol_target(npc, dims, rng, game_seed, patrol_nonce));
    }

    let Some(target) = npc.target else {
        return;
    };
    let candidate = Direction::from_delta(target.x - npc.position.x, target.y - npc.position.y);
    if candidate != npc.direction {
        npc.direction = candidate;
        npc.moving = true;
    }
}

/// Uniformly random in-bounds tile, drawn from the deterministic RNG oracle.
fn pick_patrol_target(
    npc: &NpcState,
    dims: MapDimensions,
    rng: PcgRng,
    game_seed: u64,
    patrol_nonce: &mut u64,
) -> Point {
    *patrol_nonce += 1;
    let actor = actor_key(npc.id.as_str());
    let x = rng.range(
        compute_seed(game_seed, *patrol_nonce, actor, 0),
        0,
        dims.width.saturating_sub(1),
    );
    let y = rng.range(
        compute_seed(game_seed, *patrol_nonce, actor, 1),
        0,
        dims.height.saturating_sub(1),
    );
    Point::new(f64::from(x), f64::from(y))
}

/// Post-integration pass: advance waypoint paths and settle direct moves.
///
/// Tolerant by construction: a stale target or an exhausted path stops the
/// NPC instead of failing the tick.
pub(crate) fn arrive(npc: &mut NpcState) {
    match &mut npc.behavior {
        Behavior::Pathfind(progress) => {
            let Some(current) = progress.current() else {
                // Defensive: an empty payload should not exist, but a stale
                // one must not break the tick.
                npc.behavior = Behavior::Idle;
                npc.target = None;
                npc.halt();
                return;
            };

            let waypoint = current.point();
            if npc.position.distance(waypoint) < SimConfig::ARRIVAL_RADIUS {
                if let Some(next) = progress.next() {
                    let candidate = Direction::between_tiles(current, next);
                    if candidate != npc.direction {
                        npc.direction = candidate;
                    }
                    progress.advance();
                } else {
                    npc.behavior = Behavior::Idle;
                    npc.target = None;
                    npc.halt();
                }
            } else {
                let candidate = Direction::from_delta_deadband(
                    waypoint.x - npc.position.x,
                    waypoint.y - npc.position.y,
                    SimConfig::STEER_DEADBAND,
                );
                if candidate != npc.direction {
                    npc.direction = candidate;
                }
            }
        }
        Behavior::MoveTo => {
            let Some(target) = npc.target else {
                // Stale direct move with no target left; stop drifting.
                npc.halt();
                return;
            };
            if npc.position.distance(target) < SimConfig::ARRIVAL_RADIUS {
                npc.halt();
            } else {
                let candidate = Direction::from_delta_deadband(
                    target.x - npc.position.x,
                    target.y - npc.position.y,
                    SimConfig::STEER_DEADBAND,
                );
                if candidate != npc.direction {
                    npc.direction = candidate;
                }
            }
        }
        _ => {}
    }
}
