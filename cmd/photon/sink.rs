//! The embedder-side wiring a real application needs to supply per the
//! capability-interface design note in §9: a [`ChainCallbacks`] that
//! just logs (§10.2 wants every handler branch observable, and that's
//! exactly what `photon` is for), plus a [`PeerEventSink`] wrapper that
//! seeds the chain's first header fetch from the peer's Status message
//! (§4.4.1's announce path, bootstrapped from the handshake's own head
//! instead of waiting on an unsolicited Announce).

use std::sync::Arc;

use ethereum_types::{H256, U256};
use photon_chain::{ChainCallbacks, ChainDriver, HeaderStore};
use photon_common::header::{BlockHash, BlockNumber};
use photon_common::log::Log;
use photon_common::transaction::Transaction;
use photon_net::messages::discovery::NeighborRecord;
use photon_net::messages::les::StatusMessage;
use photon_net::node_state::{TcpState, UdpState};
use photon_net::{PeerEventSink, ProvisionError, ProvisionResult};
use tracing::{info, warn};

/// Logs every callback the specification names for an embedder (§9):
/// transaction status changes, confirmed logs, head movement, and
/// provision completion. Account-state tracking (`on_state`) is left at
/// its default no-op, per the open question this core leaves as an
/// extension point.
pub struct TracingChainCallbacks;

impl ChainCallbacks for TracingChainCallbacks {
    fn on_transaction(&self, transaction: &Transaction) {
        info!(hash = %transaction.hash(), status = ?transaction.status, "transaction status changed");
    }

    fn on_log(&self, log: &Log) {
        info!(
            address = %log.address,
            tx_hash = %log.tx_hash,
            block_hash = %log.block_hash,
            log_index = log.log_index,
            "watched log"
        );
    }

    fn on_announce(&self, head_hash: BlockHash, head_number: BlockNumber) {
        info!(%head_hash, head_number, "chain head moved");
    }

    fn on_provide(&self, provision_id: u64, result: Result<(), ProvisionError>) {
        match result {
            Ok(()) => info!(provision_id, "provision completed"),
            Err(err) => warn!(provision_id, %err, "provision failed"),
        }
    }
}

/// A [`HeaderStore`] that just logs what would be persisted. §1 explicitly
/// places real persistence out of scope ("a store callback" is a
/// collaborator); an embedder with a real database implements its own.
pub struct LoggingHeaderStore;

impl HeaderStore for LoggingHeaderStore {
    fn save_headers(&self, headers: &[photon_common::header::BlockHeader]) {
        for header in headers {
            info!(number = header.number, hash = %header.hash(), "releasing header from the live chain window");
        }
    }
}

/// Wraps a [`ChainDriver`] to additionally seed the engine's first header
/// fetch from the handshake's own Status message, so the chain has
/// somewhere to start even if the remote peer never sends an unsolicited
/// Announce. Every other callback passes straight through to the driver.
pub struct StatusSeedingSink<C, S> {
    inner: Arc<ChainDriver<C, S>>,
}

impl<C, S> StatusSeedingSink<C, S>
where
    C: ChainCallbacks + 'static,
    S: HeaderStore + 'static,
{
    pub fn new(inner: Arc<ChainDriver<C, S>>) -> Self {
        Self { inner }
    }
}

impl<C, S> PeerEventSink for StatusSeedingSink<C, S>
where
    C: ChainCallbacks + 'static,
    S: HeaderStore + 'static,
{
    fn on_tcp_state_change(&self, node_id: H256, state: &TcpState) {
        self.inner.on_tcp_state_change(node_id, state);
    }

    fn on_udp_state_change(&self, node_id: H256, state: &UdpState) {
        self.inner.on_udp_state_change(node_id, state);
    }

    fn on_status(&self, node_id: H256, status: &StatusMessage) {
        self.inner.on_status(node_id, status);
        info!(head_number = status.head_number, head_hash = %status.head_hash, "peer status received, seeding header fetch");
        self.inner.on_announce(
            node_id,
            status.head_hash,
            status.head_number,
            status.head_td,
            0,
        );
    }

    fn on_announce(&self, node_id: H256, head_hash: H256, head_number: u64, head_td: U256, reorg_depth: u64) {
        self.inner.on_announce(node_id, head_hash, head_number, head_td, reorg_depth);
    }

    fn on_neighbor(&self, record: &NeighborRecord) {
        self.inner.on_neighbor(record);
    }

    fn on_provide(&self, provision_id: u64, result: Result<ProvisionResult, ProvisionError>) {
        self.inner.on_provide(provision_id, result);
    }
}
