//! Peer sessions and their registry

mod registry;
mod session;

pub use registry::PeerRegistry;
pub use session::{NegotiationRole, PeerSession};
