//! The header set, chain view, and orphan set (§3's `HeaderSet`, `Chain`,
//! `OrphanSet`). A header's membership in the canonical chain is tracked
//! by number rather than by walking `parentHash` pointers on every query:
//! the data model's own invariant ("no two chain members share a number")
//! makes a `BTreeMap<BlockNumber, BlockHash>` an exact, O(log n)-queryable
//! mirror of "is this hash on the chain".

use std::collections::{BTreeMap, HashMap};

use photon_common::header::{BlockHash, BlockHeader, BlockNumber};

use crate::constants::ORPHAN_AGE_OFFSET;

/// Superset of chain + orphans, keyed by hash, plus the derived chain and
/// orphan views. Headers are owned here exclusively — removing an entry
/// is the only way a header is destroyed (genesis and any caller-pinned
/// checkpoint are simply never removed).
pub struct ChainState {
    headers: HashMap<BlockHash, BlockHeader>,
    chain_by_number: BTreeMap<BlockNumber, BlockHash>,
    chain_head: Option<BlockHash>,
    chain_tail: Option<BlockHash>,
    orphans: HashMap<BlockHash, u64>,
    orphan_seq: u64,
    orphan_age_offset: u64,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            chain_by_number: BTreeMap::new(),
            chain_head: None,
            chain_tail: None,
            orphans: HashMap::new(),
            orphan_seq: 0,
            orphan_age_offset: ORPHAN_AGE_OFFSET,
        }
    }
}

impl ChainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same as [`Self::new`] but with a caller-supplied purge threshold,
    /// overriding the `ORPHAN_AGE_OFFSET` default (§10.4's configurable
    /// `orphan_age_offset`).
    pub fn with_orphan_age_offset(orphan_age_offset: u64) -> Self {
        Self {
            orphan_age_offset,
            ..Self::default()
        }
    }

    pub fn has_header(&self, hash: &BlockHash) -> bool {
        self.headers.contains_key(hash)
    }

    pub fn header(&self, hash: &BlockHash) -> Option<&BlockHeader> {
        self.headers.get(hash)
    }

    pub fn head_hash(&self) -> Option<BlockHash> {
        self.chain_head
    }

    pub fn tail_hash(&self) -> Option<BlockHash> {
        self.chain_tail
    }

    pub fn head(&self) -> Option<&BlockHeader> {
        self.chain_head.and_then(|h| self.headers.get(&h))
    }

    pub fn tail(&self) -> Option<&BlockHeader> {
        self.chain_tail.and_then(|h| self.headers.get(&h))
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.chain_head.is_some()
    }

    /// Whether `hash` is the unique chain member at its own header's
    /// number — the chain-membership test invariant 2 (§8) relies on.
    pub fn is_on_chain(&self, hash: &BlockHash) -> bool {
        let Some(header) = self.headers.get(hash) else {
            return false;
        };
        self.chain_by_number.get(&header.number) == Some(hash)
    }

    pub fn is_orphan(&self, hash: &BlockHash) -> bool {
        self.orphans.contains_key(hash)
    }

    /// Inserts a newly-validated header into the header set. Does not
    /// place it on the chain or mark it an orphan — callers decide that
    /// next per the three cases in §4.4.2 step 6.
    pub fn insert_header(&mut self, header: BlockHeader) {
        self.headers.insert(header.hash(), header);
    }

    /// Case (a): no chain yet. Adopts `hash` as both head and tail.
    pub fn bootstrap(&mut self, hash: BlockHash) {
        let number = self.headers[&hash].number;
        self.chain_by_number.insert(number, hash);
        self.chain_head = Some(hash);
        self.chain_tail = Some(hash);
    }

    /// Case (c), the non-reorg half: `hash`'s parent is the current head.
    /// Extends the chain by one block.
    pub fn extend_head(&mut self, hash: BlockHash) {
        let number = self.headers[&hash].number;
        self.chain_by_number.insert(number, hash);
        self.chain_head = Some(hash);
    }

    /// Case (c), the reorg half: `hash`'s parent `fork_point` is on the
    /// chain but is not the current head. Walks the current head back to
    /// `fork_point`, re-marking every intermediate header as an orphan,
    /// then adopts `hash` as the new head.
    ///
    /// Returns the hashes demoted to orphans, oldest-first (closest to
    /// the fork point first), for the caller to re-evaluate any
    /// transaction whose `blockHash` pointed at one of them.
    pub fn reorg_to(&mut self, fork_point: BlockHash, hash: BlockHash) -> Vec<BlockHash> {
        let fork_number = self.headers[&fork_point].number;
        let mut demoted = Vec::new();

        let stale: Vec<BlockNumber> = self
            .chain_by_number
            .range((fork_number + 1)..)
            .map(|(&n, _)| n)
            .collect();
        for number in stale {
            if let Some(stale_hash) = self.chain_by_number.remove(&number) {
                self.orphan_seq += 1;
                self.orphans.insert(stale_hash, self.orphan_seq);
                demoted.push(stale_hash);
            }
        }

        let new_number = self.headers[&hash].number;
        self.chain_by_number.insert(new_number, hash);
        self.chain_head = Some(hash);
        demoted
    }

    /// Marks `hash` as an orphan without touching the chain (§4.4.2 step
    /// 6b: parent absent or itself an orphan).
    pub fn mark_orphan(&mut self, hash: BlockHash) {
        self.orphan_seq += 1;
        self.orphans.insert(hash, self.orphan_seq);
    }

    /// Repeatedly extends the head by any orphan whose parent is the
    /// current head, breaking ties between siblings by insertion order,
    /// then purges orphans older than `head.number - self.orphan_age_offset`.
    /// Returns the hashes adopted onto the chain, in adoption order.
    pub fn chain_then_purge_orphans(&mut self) -> Vec<BlockHash> {
        let mut adopted = Vec::new();
        loop {
            let Some(head) = self.head_hash() else { break };
            let next = self
                .orphans
                .keys()
                .filter(|candidate| {
                    self.headers
                        .get(*candidate)
                        .is_some_and(|h| h.parent_hash == head)
                })
                .min_by_key(|candidate| self.orphans[*candidate])
                .copied();
            let Some(next_hash) = next else { break };
            self.orphans.remove(&next_hash);
            self.extend_head(next_hash);
            adopted.push(next_hash);
        }

        if let Some(head) = self.head() {
            let cutoff = head.number.saturating_sub(self.orphan_age_offset);
            let stale: Vec<BlockHash> = self
                .orphans
                .keys()
                .filter(|hash| {
                    self.headers
                        .get(*hash)
                        .is_some_and(|h| h.number < cutoff)
                })
                .copied()
                .collect();
            for hash in stale {
                self.orphans.remove(&hash);
                self.headers.remove(&hash);
            }
        }

        adopted
    }

    /// Advances the tail to `new_tail`, returning the headers released
    /// (the ones strictly older than it, on the canonical chain),
    /// oldest-first — the order `reclaimAndSave`'s save callback expects.
    /// The tail is never moved backward or past the head; callers enforce
    /// that before calling (see the chainTail reorg open question).
    pub fn advance_tail(&mut self, new_tail: BlockHash) -> Vec<BlockHeader> {
        let Some(old_tail) = self.tail() else {
            return Vec::new();
        };
        let old_number = old_tail.number;
        let new_number = self.headers[&new_tail].number;

        let stale_numbers: Vec<BlockNumber> = self
            .chain_by_number
            .range(old_number..new_number)
            .map(|(&n, _)| n)
            .collect();

        let mut released = Vec::with_capacity(stale_numbers.len());
        for number in stale_numbers {
            if let Some(hash) = self.chain_by_number.remove(&number) {
                if let Some(header) = self.headers.remove(&hash) {
                    released.push(header);
                }
            }
        }
        self.chain_tail = Some(new_tail);
        released
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    /// Minimum block number among current orphans, the `orphanMin` the
    /// sync driver compares against the chain head (§4.4.4).
    pub fn orphan_min_number(&self) -> Option<BlockNumber> {
        self.orphans
            .keys()
            .filter_map(|hash| self.headers.get(hash))
            .map(|header| header.number)
            .min()
    }

    pub fn chain_len(&self) -> Option<u64> {
        match (self.head(), self.tail()) {
            (Some(head), Some(tail)) => Some(head.number - tail.number),
            _ => None,
        }
    }

    pub fn hash_at(&self, number: BlockNumber) -> Option<BlockHash> {
        self.chain_by_number.get(&number).copied()
    }

    /// Canonical-chain headers from `from` (inclusive) to the current
    /// head, ascending. Used by `fetchBodiesFrom` (§4.4.2 step 9) to
    /// scan newly-adopted blocks for ones worth fetching a body for.
    pub fn chain_headers_from(&self, from: BlockNumber) -> impl Iterator<Item = &BlockHeader> {
        self.chain_by_number
            .range(from..)
            .filter_map(|(_, hash)| self.headers.get(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::{Address, Bloom, H256, U256};

    fn header_with_nonce(number: BlockNumber, parent_hash: BlockHash, nonce: u64) -> BlockHeader {
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
            1_700_000_000 + number,
            bytes::Bytes::new(),
            nonce,
        )
    }

    fn header(number: BlockNumber, parent_hash: BlockHash) -> BlockHeader {
        header_with_nonce(number, parent_hash, number)
    }

    #[test]
    fn linear_extension_keeps_tail_reachable() {
        let mut state = ChainState::new();
        let genesis = header(0, H256::zero());
        let genesis_hash = genesis.hash();
        state.insert_header(genesis);
        state.bootstrap(genesis_hash);

        let h1 = header(1, genesis_hash);
        let h1_hash = h1.hash();
        state.insert_header(h1);
        state.extend_head(h1_hash);

        assert_eq!(state.head_hash(), Some(h1_hash));
        assert_eq!(state.tail_hash(), Some(genesis_hash));
        assert_eq!(state.chain_len(), Some(1));
        assert!(state.is_on_chain(&h1_hash));
    }

    #[test]
    fn reorg_demotes_stale_branch_to_orphans() {
        let mut state = ChainState::new();
        let g = header(0, H256::zero());
        let g_hash = g.hash();
        state.insert_header(g);
        state.bootstrap(g_hash);

        let a1 = header(1, g_hash);
        let a1_hash = a1.hash();
        state.insert_header(a1);
        state.extend_head(a1_hash);

        let a2 = header(2, a1_hash);
        let a2_hash = a2.hash();
        state.insert_header(a2);
        state.extend_head(a2_hash);

        let b2 = header_with_nonce(2, a1_hash, 999);
        let b2_hash = b2.hash();
        state.insert_header(b2);
        let demoted = state.reorg_to(a1_hash, b2_hash);

        assert_eq!(demoted, vec![a2_hash]);
        assert!(state.is_orphan(&a2_hash));
        assert!(!state.is_on_chain(&a2_hash));
        assert_eq!(state.head_hash(), Some(b2_hash));
    }

    #[test]
    fn orphan_purge_removes_only_stale_entries() {
        let mut state = ChainState::new();
        let g = header(0, H256::zero());
        let g_hash = g.hash();
        state.insert_header(g);
        state.bootstrap(g_hash);

        // Build a head at number 96 directly (skipping intermediate
        // inserts since only the purge threshold matters here).
        let head = header(96, g_hash);
        let head_hash = head.hash();
        state.insert_header(head);
        state.extend_head(head_hash);

        let stale_orphan = header(85, H256::repeat_byte(0x5));
        let stale_hash = stale_orphan.hash();
        state.insert_header(stale_orphan);
        state.mark_orphan(stale_hash);

        let fresh_orphan = header(90, H256::repeat_byte(0x6));
        let fresh_hash = fresh_orphan.hash();
        state.insert_header(fresh_orphan);
        state.mark_orphan(fresh_hash);

        state.chain_then_purge_orphans();

        assert!(!state.has_header(&stale_hash));
        assert!(state.has_header(&fresh_hash));
    }

    #[test]
    fn advance_tail_releases_oldest_first() {
        let mut state = ChainState::new();
        let g = header(0, H256::zero());
        let g_hash = g.hash();
        state.insert_header(g);
        state.bootstrap(g_hash);

        let mut parent = g_hash;
        let mut hashes = vec![g_hash];
        for n in 1..=5u64 {
            let h = header(n, parent);
            let hash = h.hash();
            state.insert_header(h);
            state.extend_head(hash);
            parent = hash;
            hashes.push(hash);
        }

        let new_tail = hashes[3];
        let released = state.advance_tail(new_tail);

        assert_eq!(
            released.iter().map(|h| h.hash()).collect::<Vec<_>>(),
            hashes[0..3].to_vec()
        );
        assert_eq!(state.tail_hash(), Some(new_tail));
        assert!(!state.has_header(&hashes[0]));
        assert!(state.has_header(&new_tail));
    }
}
