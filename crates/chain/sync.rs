//! The synchronization driver (§4.4.4): batches header requests when the
//! chain falls far enough behind an orphan (or an announced head) that
//! catching up one header at a time would be too slow.

use photon_common::header::BlockNumber;

use crate::constants::SYNC_BATCH;

/// A batch of headers to request: `GetHeaders{from, count}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncBatch {
    pub from: BlockNumber,
    pub count: u32,
}

pub struct SyncState {
    pub active: bool,
    pub tail: BlockNumber,
    pub head: BlockNumber,
    pub next: BlockNumber,
    batch_size: u32,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            active: false,
            tail: 0,
            head: 0,
            next: 0,
            batch_size: SYNC_BATCH,
        }
    }
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same as [`Self::new`] but with a caller-supplied batch size,
    /// overriding the `SYNC_BATCH` default (§10.4's configurable
    /// `sync_batch`).
    pub fn with_batch_size(batch_size: u32) -> Self {
        Self {
            batch_size: batch_size.max(1),
            ..Self::default()
        }
    }

    /// `syncFrom`: called when a header becomes an orphan because its
    /// parent is unknown. `orphan_min` is the current minimum number
    /// across the orphan set.
    pub fn sync_from(
        &mut self,
        chain_number: BlockNumber,
        orphan_min: Option<BlockNumber>,
    ) -> Option<SyncBatch> {
        if self.active {
            return self.sync_continue(chain_number);
        }
        let orphan_min = orphan_min?;
        if orphan_min <= chain_number + 1 {
            return None;
        }
        self.active = true;
        self.tail = chain_number + 1;
        self.head = orphan_min;
        let count = self.batch_size.min((self.head - self.tail + 1) as u32);
        self.next = self.tail + count as u64 - 1;
        Some(SyncBatch {
            from: self.tail,
            count,
        })
    }

    /// `syncContinue`: requests the next batch once the chain has caught
    /// up to the end of the previous one. Returns `None` while a batch is
    /// still in flight, or once the target head has been reached.
    pub fn sync_continue(&mut self, chain_number: BlockNumber) -> Option<SyncBatch> {
        if !self.active {
            return None;
        }
        if chain_number >= self.head {
            self.active = false;
            return None;
        }
        if chain_number < self.next {
            return None;
        }
        let from = self.next + 1;
        if from > self.head {
            self.active = false;
            return None;
        }
        let remaining = self.head - from + 1;
        let count = self.batch_size.min(remaining as u32);
        self.next = from + count as u64 - 1;
        Some(SyncBatch { from, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_trigger_issues_first_batch() {
        let mut sync = SyncState::new();
        let batch = sync.sync_from(50, Some(500)).unwrap();
        assert_eq!(batch, SyncBatch { from: 51, count: 100 });
        assert!(sync.active);
        assert_eq!(sync.tail, 51);
        assert_eq!(sync.head, 500);
        assert_eq!(sync.next, 150);
    }

    #[test]
    fn no_trigger_when_gap_is_small() {
        let mut sync = SyncState::new();
        assert_eq!(sync.sync_from(50, Some(51)), None);
        assert!(!sync.active);
    }

    #[test]
    fn continue_waits_for_batch_completion() {
        let mut sync = SyncState::new();
        sync.sync_from(50, Some(500)).unwrap();

        assert_eq!(sync.sync_continue(149), None);

        let next = sync.sync_continue(150).unwrap();
        assert_eq!(next, SyncBatch { from: 151, count: 100 });
        assert_eq!(sync.next, 250);
    }

    #[test]
    fn continue_stops_at_head() {
        let mut sync = SyncState::new();
        sync.sync_from(450, Some(500)).unwrap();
        assert_eq!(sync.head, 500);

        assert!(sync.sync_continue(500).is_none());
        assert!(!sync.active);
    }
}
