//! The peer-to-peer transport: RLPx authentication and framing, the
//! LES/PIP light-client subprotocol, UDP node discovery, and the
//! provisioner that turns one high-level request into wire messages.
//!
//! `photon-net` owns exactly one connected peer's sockets and session
//! state. Fetching many peers, scoring them, and picking which one to ask
//! is a peer-manager concern the component design places outside this
//! core (see the "Multi-peer extension" design note).

pub mod auth;
pub mod callbacks;
pub mod discovery_route;
pub mod error;
pub mod frame;
pub mod messages;
pub mod node_state;
pub mod peer;
pub mod provision;
pub mod provisioner;

pub use callbacks::PeerEventSink;
pub use error::{DisconnectReason, PeerError, ProtocolErrorReason};
pub use peer::{PeerConfig, PeerNode};
pub use provision::{Provision, ProvisionError, ProvisionResult};
