//! Primitive types shared by the wire protocol and the chain-tracking
//! engine: hashes, block headers, transactions, logs, and peer identity.
//!
//! This crate intentionally does not carry an EVM, a state trie, or a
//! store: those belong to a full node, not a light client that only
//! watches one account's header chain and transaction status.

pub mod header;
pub mod log;
pub mod node;
pub mod receipt;
pub mod transaction;

pub use header::{BlockHash, BlockHeader, BlockNumber};
pub use log::Log;
pub use node::Node;
pub use receipt::{BlockBody, RawReceipt};
pub use transaction::{Transaction, TxHash, TxStatus};

/// Content-addressed 32-byte identity, used as the primary key for
/// headers, transactions, and logs.
pub type Hash = ethereum_types::H256;
