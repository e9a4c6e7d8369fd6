//! Transient per-block fetch state (§3's `ActiveBlock`), driven by the
//! active-block pipeline in §4.4.5.

use photon_common::header::{BlockHash, BlockHeader};
use photon_common::log::Log;
use photon_common::receipt::BlockBody;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveBlockState {
    PendingBodies,
    PendingReceipts,
}

pub struct ActiveBlock {
    pub header: BlockHeader,
    pub state: ActiveBlockState,
    pub body: Option<BlockBody>,
    pub logs_scratch: Vec<Log>,
}

impl ActiveBlock {
    pub fn new(header: BlockHeader) -> Self {
        Self {
            header,
            state: ActiveBlockState::PendingBodies,
            body: None,
            logs_scratch: Vec::new(),
        }
    }

    pub fn block_hash(&self) -> BlockHash {
        self.header.hash()
    }
}
