//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination and simulation operations so
//! clients can bubble them up with consistent context.

use thiserror::Error;
use tokio::sync::oneshot;

use town_core::PathfindError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("tick worker command channel closed")]
    CommandChannelClosed,

    #[error("tick worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("tick worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Pathfind(#[from] PathfindError),
}
