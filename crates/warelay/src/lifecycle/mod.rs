//! Connection lifecycle: state machine, reconnect policy, and the single
//! actor task that owns both.
//!
//! All connection state is mutated in exactly one place: the controller's
//! event loop. The HTTP layer only ever sees read-only [`StatusSnapshot`]s
//! through a watch channel.

mod controller;
mod state;

pub use controller::{Command, LifecycleController, LifecycleHandle, LifecyclePolicy};
pub use state::{ConnectionState, PairingCode, StatusSnapshot};
