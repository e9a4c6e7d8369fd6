//! Reconstructs a linear header chain from persisted state (§6's
//! "Persisted state layout"): `reclaimAndSave` hands released headers to
//! the store oldest-first as the tail advances, but a store is free to
//! hold more than one header per block number (a reorg can persist both
//! branches before the stale one is purged). Replay resolves that back
//! down to one header per number before it is threaded onto the chain.

use photon_common::header::BlockHeader;

/// Sorts ascending on `(number, timestamp)`, keeps the last entry per
/// unique number (the most recently seen header at that height wins),
/// then chains by `parentHash` from the earliest surviving header.
///
/// Headers whose parent isn't among the survivors are dropped rather
/// than threaded in out of order — a gap in the persisted set means the
/// chain before that point cannot be reconstructed and replay starts
/// fresh from the first unbroken run.
pub fn reconstruct(mut headers: Vec<BlockHeader>) -> Vec<BlockHeader> {
    headers.sort_by_key(|header| (header.number, header.timestamp));

    let mut by_number = Vec::with_capacity(headers.len());
    for header in headers {
        match by_number.last_mut() {
            Some(last) if matches_number(last, &header) => *last = header,
            _ => by_number.push(header),
        }
    }

    let mut chained = Vec::with_capacity(by_number.len());
    let mut expected_parent = None;
    for header in by_number {
        if let Some(parent) = expected_parent {
            if header.parent_hash != parent {
                break;
            }
        }
        expected_parent = Some(header.hash());
        chained.push(header);
    }
    chained
}

fn matches_number(a: &BlockHeader, b: &BlockHeader) -> bool {
    a.number == b.number
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::{Address, Bloom, H256, U256};

    fn header(number: u64, parent_hash: H256, timestamp: u64) -> BlockHeader {
        BlockHeader::new(
            parent_hash,
            H256::zero(),
            Address::zero(),
            H256::zero(),
            H256::zero(),
            H256::zero(),
            Bloom::zero(),
            U256::one(),
            number,
            30_000_000,
            0,
            timestamp,
            bytes::Bytes::new(),
            number,
        )
    }

    #[test]
    fn chains_a_clean_linear_sequence() {
        let g = header(0, H256::zero(), 100);
        let g_hash = g.hash();
        let h1 = header(1, g_hash, 101);
        let h1_hash = h1.hash();
        let h2 = header(2, h1_hash, 102);

        let out = reconstruct(vec![h2.clone(), g.clone(), h1.clone()]);
        assert_eq!(out, vec![g, h1, h2]);
    }

    #[test]
    fn keeps_the_latest_entry_per_number() {
        let g = header(0, H256::zero(), 100);
        let g_hash = g.hash();
        let stale = header(1, g_hash, 101);
        let replacement = header(1, g_hash, 105);

        let out = reconstruct(vec![g.clone(), stale, replacement.clone()]);
        assert_eq!(out, vec![g, replacement]);
    }

    #[test]
    fn stops_at_the_first_broken_link() {
        let g = header(0, H256::zero(), 100);
        let orphaned = header(1, H256::repeat_byte(0xAB), 101);

        let out = reconstruct(vec![g.clone(), orphaned]);
        assert_eq!(out, vec![g]);
    }
}
