//! The blockchain-consensus-surface engine: a synchronous state machine
//! over a header chain, its orphan set, a watched account's pending
//! transactions, and the active-block body/receipt fetch pipeline, plus
//! the driver that wires that state machine to a live peer connection.
//!
//! `photon-chain` owns no socket and runs no I/O directly: [`engine`]
//! decides what to fetch next and [`driver`] is the only part of this
//! crate that touches a [`photon_net::PeerNode`].

pub mod active_block;
pub mod callbacks;
pub mod constants;
pub mod driver;
pub mod engine;
pub mod error;
pub mod header_set;
pub mod pending;
pub mod replay;
pub mod sync;

pub use callbacks::{ChainCallbacks, HeaderStore, NullHeaderStore, WatchedAccount};
pub use constants::EngineTunables;
pub use driver::ChainDriver;
pub use engine::{ChainEngine, PendingRequest, ProvisionPurpose};
pub use error::ChainError;
