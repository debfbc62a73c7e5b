//! Async runtime for the town simulation.
//!
//! Wires the deterministic [`town_core`] controller to a tokio tick loop.
//! Consumers embed [`TownRuntime`] to start the simulation, then drive it
//! through cloneable [`TownHandle`]s and react to [`GameEvent`]s from the
//! broadcast channel.
pub mod error;
pub mod event;
pub mod handle;
pub mod runtime;

mod worker;

pub use error::{Result, RuntimeError};
pub use event::GameEvent;
pub use handle::TownHandle;
pub use runtime::{TownRuntime, TownRuntimeConfig};
