//! The capability interface a peer node reports through. Modeled as a
//! plain trait object rather than a channel: the chain engine must
//! observe the post-handler state synchronously, the same reasoning the
//! component design gives for keeping `ChainCallbacks` (the BCS-side
//! counterpart) a trait rather than an mpsc sender.

use crate::messages::discovery::NeighborRecord;
use crate::messages::les::StatusMessage;
use crate::node_state::{TcpState, UdpState};
use crate::provision::{ProvisionError, ProvisionResult};
use ethereum_types::{H256, U256};

/// Events a peer node reports as it runs the handshake, multiplexes
/// frames, and completes provisions. Invoked only on the owning task —
/// implementations must not block.
pub trait PeerEventSink: Send + Sync {
    fn on_tcp_state_change(&self, node_id: H256, state: &TcpState);
    fn on_udp_state_change(&self, node_id: H256, state: &UdpState);

    fn on_status(&self, node_id: H256, status: &StatusMessage);
    fn on_announce(&self, node_id: H256, head_hash: H256, head_number: u64, head_td: U256, reorg_depth: u64);
    fn on_neighbor(&self, record: &NeighborRecord);

    fn on_provide(&self, provision_id: u64, result: Result<ProvisionResult, ProvisionError>);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// An in-memory sink that records every callback invocation, used by
    /// peer-node and provisioner tests that need to assert on what was
    /// reported without a real socket.
    #[derive(Default)]
    pub struct RecordingSink {
        pub provides: Mutex<Vec<(u64, Result<ProvisionResult, ProvisionError>)>>,
    }

    impl PeerEventSink for RecordingSink {
        fn on_tcp_state_change(&self, _node_id: H256, _state: &TcpState) {}
        fn on_udp_state_change(&self, _node_id: H256, _state: &UdpState) {}
        fn on_status(&self, _node_id: H256, _status: &StatusMessage) {}
        fn on_announce(&self, _node_id: H256, _head_hash: H256, _head_number: u64, _head_td: U256, _reorg_depth: u64) {}
        fn on_neighbor(&self, _record: &NeighborRecord) {}

        fn on_provide(&self, provision_id: u64, result: Result<ProvisionResult, ProvisionError>) {
            self.provides.lock().unwrap().push((provision_id, result));
        }
    }
}
