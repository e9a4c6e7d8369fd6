//! The capability interfaces the chain engine reports through. Split in
//! two, matching the purpose-and-scope split in the specification: the
//! owner-facing callbacks (transaction/log/state/announce/provide) are a
//! small trait any embedder implements directly; historic-chain
//! persistence is a separate collaborator the engine treats as an opaque
//! store, exactly as the specification calls out ("a store callback" is
//! explicitly out of scope for this core).

use ethereum_types::Address;
use photon_common::header::{BlockHash, BlockHeader, BlockNumber};
use photon_common::log::Log;
use photon_common::transaction::Transaction;
use photon_net::ProvisionError;

/// Events the embedding application observes as the chain engine runs.
/// Invoked only on the chain engine's own task — implementations must not
/// block it.
pub trait ChainCallbacks: Send + Sync {
    /// A tracked transaction's stored status changed (§4.4.6, §4.4.7).
    fn on_transaction(&self, transaction: &Transaction);

    /// A log matching the watched address was confirmed via receipts
    /// (§4.4.5).
    fn on_log(&self, log: &Log);

    /// Extension point for account-state tracking. The specification
    /// leaves `handleAccountState`'s effect on block handling undefined
    /// (see the "AccountState handling" open question); this core models
    /// no `AccountState` type and never calls this with anything beyond
    /// the block that was being examined when a `GetAccounts` provision
    /// was issued.
    fn on_state(&self, block_hash: BlockHash) {
        let _ = block_hash;
    }

    /// The local chain's head moved — by direct extension, by adopting
    /// an orphan, or by reorg (§4.4.2).
    fn on_announce(&self, head_hash: BlockHash, head_number: BlockNumber);

    /// A provision this engine issued completed or failed. Surfaced for
    /// observability; the engine has already applied the result (or, on
    /// failure, already run its own recovery per §4.4.7) before this
    /// fires.
    fn on_provide(&self, provision_id: u64, result: Result<(), ProvisionError>);
}

/// The persistence collaborator `reclaimAndSave` hands released headers
/// to. Out of scope for this core per §1 ("Persistence/serialization of
/// the historic chain (a store callback)") — an embedder backs this with
/// whatever storage it wants, in-memory, a file, a database.
pub trait HeaderStore: Send + Sync {
    /// Headers being released by the tail's advance, oldest-first, as
    /// described in §6's persisted state layout.
    fn save_headers(&self, headers: &[BlockHeader]);
}

/// A [`HeaderStore`] that discards everything, for callers that track the
/// live chain only and have no replay requirement.
pub struct NullHeaderStore;

impl HeaderStore for NullHeaderStore {
    fn save_headers(&self, _headers: &[BlockHeader]) {}
}

/// Extension point mirrored from [`ChainCallbacks::on_state`]: what the
/// engine would need to call `GetAccounts` for. No caller in this core
/// constructs one today; it exists so an embedder's account-state
/// extension has a concrete type to target without changing the
/// `Provision` enum's shape.
pub struct WatchedAccount {
    pub address: Address,
}
