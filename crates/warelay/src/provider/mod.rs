//! Provider implementations.
//!
//! The WhatsApp multi-device protocol is deliberately kept out of this
//! crate. The one provider shipped here runs the protocol library as an
//! external sidecar process and talks to it over stdio.

mod subprocess;

pub use subprocess::SubprocessProvider;
