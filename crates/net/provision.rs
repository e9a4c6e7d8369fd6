//! Provisions: the abstract requests the chain engine issues against a
//! peer, independent of how many wire messages it takes to satisfy them.

use photon_common::header::{BlockHash, BlockHeader, BlockNumber};
use photon_common::receipt::{BlockBody, RawReceipt};
use photon_common::transaction::{ReceivedTxStatus, Transaction, TxHash};
use ethereum_types::Address;

/// A single high-level request the chain engine can issue against a peer.
/// Each carries a stable id the caller uses to correlate the eventual
/// [`ProvisionResult`] or [`ProvisionError`].
#[derive(Debug, Clone)]
pub enum Provision {
    GetHeaders {
        from: BlockNumber,
        count: u32,
        skip: u32,
        reverse: bool,
    },
    GetBodies {
        hashes: Vec<BlockHash>,
    },
    GetReceipts {
        hashes: Vec<BlockHash>,
    },
    GetAccounts {
        hashes: Vec<BlockHash>,
        address: Address,
    },
    GetTxStatuses {
        hashes: Vec<TxHash>,
    },
    SubmitTx {
        transaction: Transaction,
    },
}

impl Provision {
    /// Number of distinct items this provision covers, used to compute how
    /// many wire messages the provisioner needs to split it into.
    pub fn item_count(&self) -> usize {
        match self {
            Provision::GetHeaders { count, .. } => *count as usize,
            Provision::GetBodies { hashes } => hashes.len(),
            Provision::GetReceipts { hashes } => hashes.len(),
            Provision::GetAccounts { hashes, .. } => hashes.len(),
            Provision::GetTxStatuses { hashes } => hashes.len(),
            Provision::SubmitTx { .. } => 1,
        }
    }
}

/// The assembled result of a completed provision, delivered through the
/// peer node's provide callback.
#[derive(Debug, Clone)]
pub enum ProvisionResult {
    Headers(Vec<BlockHeader>),
    Bodies(Vec<BlockBody>),
    Receipts(Vec<Vec<RawReceipt>>),
    TxStatuses(Vec<ReceivedTxStatus>),
    Submitted,
}

/// Why a provision never completed. Surfaced via the provide callback
/// rather than propagated synchronously, since provision failures happen
/// on the peer's own task.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProvisionError {
    #[error("peer reported an unknown error")]
    UnknownError,
    #[error("peer unreachable")]
    NetworkUnreachable,
    #[error("provision timed out")]
    Timeout,
}
