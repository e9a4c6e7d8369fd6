//! The BCS engine core (§4.4): a synchronous state machine over the
//! header chain, orphan set, pending transactions, and active-block
//! fetches. No I/O happens here — every handler returns the
//! [`PendingRequest`]s its caller (the [`crate::driver::ChainDriver`])
//! must submit to the peer layer, and every result the peer layer later
//! reports comes back in through another handler call.

use std::collections::HashMap;

use ethereum_types::Address;
use photon_common::header::{BlockHash, BlockHeader, BlockNumber};
use photon_common::log::Log;
use photon_common::receipt::{BlockBody, RawReceipt};
use photon_common::transaction::{ReceivedTxStatus, Transaction, TxHash, TxStatus};
use photon_crypto::keccak::keccak_hash;
use photon_net::{Provision, ProvisionError};
use photon_rlp::encode::RLPEncode;

use crate::active_block::{ActiveBlock, ActiveBlockState};
use crate::callbacks::{ChainCallbacks, HeaderStore};
use crate::constants::EngineTunables;
use crate::header_set::ChainState;
use crate::pending::PendingTransactions;
use crate::sync::SyncState;

/// A provision the engine wants issued, tagged with what it's for so the
/// eventual result can be routed back to the right handler.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub provision: Provision,
    pub purpose: ProvisionPurpose,
}

#[derive(Debug, Clone)]
pub enum ProvisionPurpose {
    Headers,
    Bodies { hashes: Vec<BlockHash> },
    Receipts { hashes: Vec<BlockHash> },
    TxStatuses { hashes: Vec<TxHash> },
    SubmitTx { tx_hash: TxHash },
}

impl PendingRequest {
    fn headers(from: BlockNumber, count: u32) -> Self {
        PendingRequest {
            provision: Provision::GetHeaders {
                from,
                count,
                skip: 0,
                reverse: false,
            },
            purpose: ProvisionPurpose::Headers,
        }
    }

    fn bodies(hashes: Vec<BlockHash>) -> Self {
        PendingRequest {
            provision: Provision::GetBodies {
                hashes: hashes.clone(),
            },
            purpose: ProvisionPurpose::Bodies { hashes },
        }
    }

    fn receipts(hashes: Vec<BlockHash>) -> Self {
        PendingRequest {
            provision: Provision::GetReceipts {
                hashes: hashes.clone(),
            },
            purpose: ProvisionPurpose::Receipts { hashes },
        }
    }

    fn tx_statuses(hashes: Vec<TxHash>) -> Self {
        PendingRequest {
            provision: Provision::GetTxStatuses {
                hashes: hashes.clone(),
            },
            purpose: ProvisionPurpose::TxStatuses { hashes },
        }
    }

    fn submit(transaction: Transaction, tx_hash: TxHash) -> Self {
        PendingRequest {
            provision: Provision::SubmitTx { transaction },
            purpose: ProvisionPurpose::SubmitTx { tx_hash },
        }
    }
}

/// Minimal header sanity check. The light client is explicitly not a
/// full validator (no difficulty/PoW or state-root verification here);
/// this is the hook `handleBlockHeader` step 2 calls `isValid`.
fn is_valid(header: &BlockHeader) -> bool {
    header.gas_used <= header.gas_limit
}

/// Whether `body` is consistent with `header`. This core defines
/// `transactionsRoot`/`ommersHash` as the direct Keccak256 of the RLP-
/// encoded list rather than a Merkle-Patricia trie root — full trie
/// verification is out of scope for a non-validating light client, and
/// this definition is self-consistent as long as every header this
/// engine trusts was produced the same way.
fn body_matches_header(header: &BlockHeader, body: &BlockBody) -> bool {
    let tx_hash = BlockHash(keccak_hash(&body.transactions.encode_to_vec()));
    let ommers_hash = BlockHash(keccak_hash(&body.ommers.encode_to_vec()));
    tx_hash == header.transactions_root && ommers_hash == header.ommers_hash
}

pub struct ChainEngine<C, S> {
    chain: ChainState,
    sync: SyncState,
    pending: PendingTransactions,
    transactions: HashMap<TxHash, Transaction>,
    logs: Vec<Log>,
    active_blocks: HashMap<BlockHash, ActiveBlock>,
    watched_address: Address,
    save_count: u64,
    callbacks: C,
    store: S,
}

impl<C: ChainCallbacks, S: HeaderStore> ChainEngine<C, S> {
    pub fn new(watched_address: Address, callbacks: C, store: S) -> Self {
        Self::with_tunables(watched_address, callbacks, store, EngineTunables::default())
    }

    /// Same as [`Self::new`] but with the engine's constants (§10.4)
    /// overridden by a config-derived [`EngineTunables`], e.g. to load
    /// per-deployment values from a TOML config file.
    pub fn with_tunables(
        watched_address: Address,
        callbacks: C,
        store: S,
        tunables: EngineTunables,
    ) -> Self {
        Self {
            chain: ChainState::with_orphan_age_offset(tunables.orphan_age_offset),
            sync: SyncState::with_batch_size(tunables.sync_batch),
            pending: PendingTransactions::new(),
            transactions: HashMap::new(),
            logs: Vec::new(),
            active_blocks: HashMap::new(),
            watched_address,
            save_count: tunables.save_count,
            callbacks,
            store,
        }
    }

    pub fn head(&self) -> Option<&BlockHeader> {
        self.chain.head()
    }

    pub fn tail(&self) -> Option<&BlockHeader> {
        self.chain.tail()
    }

    pub fn orphan_count(&self) -> usize {
        self.chain.orphan_count()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn transaction(&self, hash: &TxHash) -> Option<&Transaction> {
        self.transactions.get(hash)
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Seeds the chain directly with a single known-good header (used at
    /// startup for a genesis/checkpoint primer, or by replay when no
    /// persisted state exists yet).
    pub fn bootstrap(&mut self, genesis: BlockHeader) {
        let hash = genesis.hash();
        self.chain.insert_header(genesis);
        self.chain.bootstrap(hash);
    }

    /// Re-threads a linear, already-deduplicated header sequence
    /// (oldest-first) onto the chain, as produced by
    /// [`crate::replay::reconstruct`].
    pub fn replay_headers(&mut self, headers: Vec<BlockHeader>) {
        for header in headers {
            let hash = header.hash();
            self.chain.insert_header(header);
            if !self.chain.is_bootstrapped() {
                self.chain.bootstrap(hash);
            } else {
                self.chain.extend_head(hash);
            }
        }
    }

    /// §4.4.1: an announce only triggers a single-header fetch.
    pub fn handle_announce(&self, head_number: BlockNumber) -> PendingRequest {
        PendingRequest::headers(head_number, 1)
    }

    /// §4.4.2's `handleBlockHeader`.
    pub fn handle_block_header(&mut self, header: BlockHeader) -> Vec<PendingRequest> {
        let hash = header.hash();
        if self.chain.has_header(&hash) {
            return Vec::new(); // step 1
        }
        if !is_valid(&header) {
            return Vec::new(); // step 2
        }

        let parent_hash = header.parent_hash;
        let parent_number = self.chain.header(&parent_hash).map(|parent| parent.number);
        if let Some(parent_number) = parent_number {
            if header.number != parent_number + 1 {
                return Vec::new(); // step 4
            }
        }

        let old_head_number = self.chain.head().map(|head| head.number);
        self.chain.insert_header(header.clone()); // step 5

        let mut requests = Vec::new();
        let mut reorg_demoted: Vec<BlockHash> = Vec::new();
        // The baseline step 9 scans bodies from: for a fresh bootstrap (case
        // a) there is no prior chain, so the whole thing is new; otherwise
        // (case c) it's the fork point P — the parent `reorg_to` rejoined
        // onto, which equals the old head for a plain extension but can be
        // far behind it for a true reorg (S2: head A2@2, parent A1@1).
        let mut fetch_from = 0;

        if !self.chain.is_bootstrapped() {
            self.chain.bootstrap(hash); // case a
        } else if parent_number.is_none() || self.chain.is_orphan(&parent_hash) {
            self.chain.mark_orphan(hash); // case b
            let chain_number = self.chain.head().expect("bootstrapped").number;
            let orphan_min = self.chain.orphan_min_number();
            if let Some(batch) = self.sync.sync_from(chain_number, orphan_min) {
                requests.push(PendingRequest::headers(batch.from, batch.count));
            }
            return requests;
        } else {
            reorg_demoted = self.chain.reorg_to(parent_hash, hash); // case c
            fetch_from = parent_number.expect("case c always has a known parent") + 1;
        }

        self.chain.chain_then_purge_orphans(); // step 7

        if !reorg_demoted.is_empty() {
            self.reevaluate_orphaned_transactions(&reorg_demoted); // step 8
        }

        requests.extend(self.fetch_bodies_from(fetch_from)); // step 9

        self.reclaim_and_save(); // step 10
        let head = self.chain.head().expect("bootstrapped");
        let (head_hash, head_number) = (head.hash(), head.number);
        if old_head_number != Some(head_number) || old_head_number.is_none() {
            self.callbacks.on_announce(head_hash, head_number);
        }
        if let Some(batch) = self.sync.sync_continue(head_number) {
            requests.push(PendingRequest::headers(batch.from, batch.count));
        }

        requests
    }

    fn reevaluate_orphaned_transactions(&mut self, orphaned_hashes: &[BlockHash]) {
        let affected: Vec<TxHash> = self
            .transactions
            .iter()
            .filter(|(_, tx)| {
                matches!(&tx.status, TxStatus::Included { block_hash, .. } if orphaned_hashes.contains(block_hash))
            })
            .map(|(hash, _)| *hash)
            .collect();
        for tx_hash in affected {
            if let Some(tx) = self.transactions.get_mut(&tx_hash) {
                tx.status = TxStatus::Pending;
            }
            self.pending.add(tx_hash);
            if let Some(tx) = self.transactions.get(&tx_hash) {
                self.callbacks.on_transaction(tx);
            }
        }
    }

    fn fetch_bodies_from(&mut self, from_number: BlockNumber) -> Vec<PendingRequest> {
        let mut hashes = Vec::new();
        for header in self.chain.chain_headers_from(from_number) {
            let hash = header.hash();
            if self.active_blocks.contains_key(&hash) {
                continue;
            }
            let tracks_included_tx = self.transactions.values().any(
                |tx| matches!(&tx.status, TxStatus::Included { block_hash, .. } if *block_hash == hash),
            );
            if header.bloom_matches(&self.watched_address) || tracks_included_tx {
                self.active_blocks.insert(hash, ActiveBlock::new(header));
                hashes.push(hash);
            }
        }
        if hashes.is_empty() {
            Vec::new()
        } else {
            vec![PendingRequest::bodies(hashes)]
        }
    }

    fn reclaim_and_save(&mut self) {
        let (Some(head_number), Some(tail_number)) =
            (self.chain.head().map(|h| h.number), self.chain.tail().map(|t| t.number))
        else {
            return;
        };
        if head_number.saturating_sub(tail_number) < 2 * self.save_count {
            return;
        }
        let new_tail_number = head_number - self.save_count;
        if let Some(new_tail_hash) = self.chain.hash_at(new_tail_number) {
            let released = self.chain.advance_tail(new_tail_hash);
            if !released.is_empty() {
                self.store.save_headers(&released);
            }
        }
    }

    /// §4.4.5, the bodies half. `results` pairs each fetched block hash
    /// with its body.
    pub fn handle_bodies_result(&mut self, results: Vec<(BlockHash, BlockBody)>) -> Vec<PendingRequest> {
        let mut requests = Vec::new();
        for (hash, body) in results {
            let Some(active) = self.active_blocks.get_mut(&hash) else {
                continue;
            };
            if active.state != ActiveBlockState::PendingBodies {
                continue;
            }
            if !body_matches_header(&active.header, &body) {
                self.active_blocks.remove(&hash); // ValidationError: dropped silently
                continue;
            }

            let mut watched_tx_hashes = Vec::new();
            for (index, tx) in body.transactions.iter().enumerate() {
                if tx.from != self.watched_address && tx.to != Some(self.watched_address) {
                    continue;
                }
                let tx_hash = tx.hash();
                let mut tracked = tx.clone();
                tracked.status = TxStatus::Included {
                    block_hash: hash,
                    block_number: active.header.number,
                    tx_index: index as u64,
                    gas_used: 0,
                };
                self.transactions.insert(tx_hash, tracked);
                self.pending.remove(&tx_hash);
                self.callbacks.on_transaction(&self.transactions[&tx_hash]);
                watched_tx_hashes.push(tx_hash);
            }
            if !watched_tx_hashes.is_empty() {
                requests.push(PendingRequest::tx_statuses(watched_tx_hashes));
            }

            let bloom_interesting = active.header.bloom_matches(&self.watched_address);
            active.body = Some(body);
            if bloom_interesting {
                active.state = ActiveBlockState::PendingReceipts;
                requests.push(PendingRequest::receipts(vec![hash]));
            } else {
                self.active_blocks.remove(&hash);
            }
        }
        requests
    }

    /// §4.4.5, the receipts half.
    pub fn handle_receipts_result(&mut self, results: Vec<(BlockHash, Vec<RawReceipt>)>) {
        for (hash, receipts) in results {
            let Some(active) = self.active_blocks.remove(&hash) else {
                continue;
            };
            if active.state != ActiveBlockState::PendingReceipts {
                continue;
            }
            let Some(body) = &active.body else { continue };

            for (tx_index, receipt) in receipts.iter().enumerate() {
                if !receipt.bloom_matches(&self.watched_address) {
                    continue;
                }
                let Some(tx) = body.transactions.get(tx_index) else {
                    continue;
                };
                let tx_hash = tx.hash();
                for (log_index, raw_log) in receipt.logs.iter().enumerate() {
                    if raw_log.address == self.watched_address {
                        let log = raw_log.clone().into_log(hash, tx_hash, log_index as u64);
                        self.logs.push(log.clone());
                        self.callbacks.on_log(&log);
                    }
                }
            }
        }
    }

    /// §4.4.6's periodic tick: requests status for every pending
    /// transaction, if any are outstanding.
    pub fn tick_status_poll(&self) -> Option<PendingRequest> {
        if self.pending.is_empty() {
            return None;
        }
        Some(PendingRequest::tx_statuses(self.pending.iter().copied().collect()))
    }

    pub fn handle_status_result(&mut self, results: Vec<(TxHash, ReceivedTxStatus)>) {
        for (tx_hash, received) in results {
            self.apply_status(tx_hash, received);
        }
    }

    fn apply_status(&mut self, tx_hash: TxHash, received: ReceivedTxStatus) {
        let Some(prior) = self.transactions.get(&tx_hash).map(|tx| tx.status.clone()) else {
            return;
        };
        if prior.is_terminal_error() {
            return; // rule 1
        }

        let mut in_chain = false;
        let mut in_error = false;
        let new_status = match received {
            ReceivedTxStatus::Unknown => prior.clone(), // rule 2
            ReceivedTxStatus::Queued | ReceivedTxStatus::Pending => TxStatus::Submitted, // rule 3
            ReceivedTxStatus::Included {
                block_hash,
                block_number,
                tx_index,
                gas_used,
            } => {
                let within_chain = self.chain.is_on_chain(&block_hash)
                    && self.chain.tail().is_some_and(|t| block_number >= t.number)
                    && self.chain.head().is_some_and(|h| block_number <= h.number);
                if within_chain {
                    in_chain = true;
                    TxStatus::Included {
                        block_hash,
                        block_number,
                        tx_index,
                        gas_used,
                    }
                } else {
                    TxStatus::Submitted // rule 4
                }
            }
            ReceivedTxStatus::Errored { reason } => {
                in_error = true;
                TxStatus::Errored { reason } // rule 5
            }
        };

        if in_chain || in_error {
            self.pending.remove(&tx_hash);
        } else if !self.pending.contains(&tx_hash) {
            self.pending.add(tx_hash);
        }

        if new_status != prior {
            if let Some(tx) = self.transactions.get_mut(&tx_hash) {
                tx.status = new_status;
            }
            self.callbacks.on_transaction(&self.transactions[&tx_hash]);
        }
    }

    /// §4.4.7: submits a new transaction.
    pub fn submit_tx(&mut self, mut transaction: Transaction) -> (TxHash, PendingRequest) {
        transaction.status = TxStatus::Submitted;
        let tx_hash = transaction.hash();
        self.transactions.insert(tx_hash, transaction.clone());
        self.pending.add(tx_hash);
        self.callbacks.on_transaction(&transaction);
        (tx_hash, PendingRequest::submit(transaction, tx_hash))
    }

    /// Continuation of §4.4.7 after the `SubmitTx` provision resolves.
    pub fn handle_submit_result(&mut self, tx_hash: TxHash, result: Result<(), ProvisionError>) {
        if let Err(err) = result {
            if matches!(err, ProvisionError::UnknownError | ProvisionError::NetworkUnreachable) {
                self.apply_status(tx_hash, ReceivedTxStatus::Errored { reason: err.to_string() });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::NullHeaderStore;
    use ethereum_types::{Bloom, Signature, H256, U256};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCallbacks {
        announces: Mutex<Vec<(BlockHash, BlockNumber)>>,
        transactions: Mutex<Vec<Transaction>>,
        logs: Mutex<Vec<Log>>,
    }

    impl ChainCallbacks for RecordingCallbacks {
        fn on_transaction(&self, transaction: &Transaction) {
            self.transactions.lock().unwrap().push(transaction.clone());
        }
        fn on_log(&self, log: &Log) {
            self.logs.lock().unwrap().push(log.clone());
        }
        fn on_announce(&self, head_hash: BlockHash, head_number: BlockNumber) {
            self.announces.lock().unwrap().push((head_hash, head_number));
        }
        fn on_provide(&self, _provision_id: u64, _result: Result<(), ProvisionError>) {}
    }

    fn test_header(number: BlockNumber, parent_hash: BlockHash, nonce: u64) -> BlockHeader {
        BlockHeader::new(
            parent_hash,
            H256::zero(),
            ethereum_types::Address::zero(),
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

    fn new_engine() -> ChainEngine<RecordingCallbacks, NullHeaderStore> {
        let watched = Address::repeat_byte(0x11);
        let mut engine = ChainEngine::new(watched, RecordingCallbacks::default(), NullHeaderStore);
        let genesis = test_header(0, H256::zero(), 0);
        engine.bootstrap(genesis);
        engine
    }

    /// S1: linear chain extension — no reorg, no orphans.
    #[test]
    fn s1_linear_chain_extension() {
        let mut engine = new_engine();
        let genesis_hash = engine.head().unwrap().hash();

        let h1 = test_header(1, genesis_hash, 1);
        let h1_hash = h1.hash();
        engine.handle_block_header(h1);

        let h2 = test_header(2, h1_hash, 2);
        let h2_hash = h2.hash();
        engine.handle_block_header(h2);

        assert_eq!(engine.head().unwrap().hash(), h2_hash);
        assert_eq!(engine.tail().unwrap().hash(), genesis_hash);
        assert_eq!(engine.orphan_count(), 0);
    }

    /// S2: single-block reorg orphans the stale branch and returns any
    /// transaction included in it to PENDING.
    #[test]
    fn s2_single_block_reorg_orphans_stale_branch() {
        let mut engine = new_engine();
        let genesis_hash = engine.head().unwrap().hash();

        let a1 = test_header(1, genesis_hash, 1);
        let a1_hash = a1.hash();
        engine.handle_block_header(a1);

        let a2 = test_header(2, a1_hash, 2);
        let a2_hash = a2.hash();
        engine.handle_block_header(a2);
        assert_eq!(engine.head().unwrap().hash(), a2_hash);

        // A transaction the engine believes is included in A2.
        let tx = Transaction {
            from: Address::repeat_byte(0x11),
            to: Some(Address::repeat_byte(0x22)),
            value: U256::from(1u64),
            gas: 21_000,
            gas_price: U256::from(1u64),
            nonce: 0,
            data: bytes::Bytes::new(),
            signature: Signature::zero(),
            status: TxStatus::Included {
                block_hash: a2_hash,
                block_number: 2,
                tx_index: 0,
                gas_used: 21_000,
            },
        };
        let tx_hash = tx.hash();
        engine.transactions.insert(tx_hash, tx);

        let b2 = test_header(2, a1_hash, 99);
        let b2_hash = b2.hash();
        engine.handle_block_header(b2);

        let b3 = test_header(3, b2_hash, 100);
        let b3_hash = b3.hash();
        engine.handle_block_header(b3);

        assert_eq!(engine.head().unwrap().hash(), b3_hash);
        assert_eq!(engine.orphan_count(), 1);
        assert_eq!(
            engine.transaction(&tx_hash).unwrap().status,
            TxStatus::Pending
        );
        assert!(engine.pending.contains(&tx_hash));
    }

    /// S3: an orphan older than `head.number - ORPHAN_AGE_OFFSET` is purged
    /// once a header extends the chain past the threshold.
    #[test]
    fn s3_orphan_purge_on_chain_extension() {
        let mut engine = new_engine();
        let genesis_hash = engine.head().unwrap().hash();

        let stale_orphan = test_header(85, H256::repeat_byte(0x5), 1);
        let stale_hash = stale_orphan.hash();
        engine.chain.insert_header(stale_orphan);
        engine.chain.mark_orphan(stale_hash);

        let mut parent = genesis_hash;
        for n in 1..=96u64 {
            let h = test_header(n, parent, n);
            parent = h.hash();
            engine.handle_block_header(h);
        }

        assert_eq!(engine.head().unwrap().number, 96);
        assert!(!engine.chain.has_header(&stale_hash));
    }

    /// S4: a header whose parent is unknown (far ahead of the chain) is
    /// parked as an orphan and triggers a sync batch.
    #[test]
    fn s4_distant_orphan_triggers_sync() {
        let mut engine = new_engine();

        let far = test_header(500, H256::repeat_byte(0x9), 1);
        let requests = engine.handle_block_header(far);

        assert_eq!(engine.orphan_count(), 1);
        assert_eq!(requests.len(), 1);
        match &requests[0].provision {
            Provision::GetHeaders { from, count, .. } => {
                assert_eq!(*from, 1);
                assert_eq!(*count, 100);
            }
            other => panic!("expected GetHeaders, got {other:?}"),
        }
    }

    /// S5: pending -> included -> orphaned -> pending, with a periodic
    /// re-poll once the transaction returns to PENDING.
    #[test]
    fn s5_pending_included_orphaned_pending_cycle() {
        let mut engine = new_engine();
        let genesis_hash = engine.head().unwrap().hash();

        let tx = Transaction {
            from: Address::repeat_byte(0x11),
            to: Some(Address::repeat_byte(0x22)),
            value: U256::from(1u64),
            gas: 21_000,
            gas_price: U256::from(1u64),
            nonce: 0,
            data: bytes::Bytes::new(),
            signature: Signature::zero(),
            status: TxStatus::Created,
        };
        let (tx_hash, _submit_request) = engine.submit_tx(tx);
        assert_eq!(engine.transaction(&tx_hash).unwrap().status, TxStatus::Submitted);
        assert!(engine.pending.contains(&tx_hash));

        let a1 = test_header(1, genesis_hash, 1);
        let a1_hash = a1.hash();
        engine.handle_block_header(a1);

        let a2 = test_header(2, a1_hash, 2);
        let a2_hash = a2.hash();
        engine.handle_block_header(a2);

        engine.handle_status_result(vec![(
            tx_hash,
            ReceivedTxStatus::Included {
                block_hash: a2_hash,
                block_number: 2,
                tx_index: 0,
                gas_used: 21_000,
            },
        )]);
        assert!(matches!(
            engine.transaction(&tx_hash).unwrap().status,
            TxStatus::Included { .. }
        ));
        assert!(!engine.pending.contains(&tx_hash));

        // Reorg away A2 (see s2).
        let b2 = test_header(2, a1_hash, 99);
        let b2_hash = b2.hash();
        engine.handle_block_header(b2);
        let b3 = test_header(3, b2_hash, 100);
        engine.handle_block_header(b3);

        assert_eq!(engine.transaction(&tx_hash).unwrap().status, TxStatus::Pending);
        assert!(engine.pending.contains(&tx_hash));

        let poll = engine.tick_status_poll().expect("pending transactions exist");
        match poll.provision {
            Provision::GetTxStatuses { hashes } => assert_eq!(hashes, vec![tx_hash]),
            other => panic!("expected GetTxStatuses, got {other:?}"),
        }
    }

    /// Active-block pipeline: a body containing a watched-address
    /// transaction moves the transaction to INCLUDED and, when the
    /// header's bloom also matches, advances to a receipts fetch; a
    /// matching receipt log is emitted through the log callback.
    #[test]
    fn active_block_pipeline_emits_logs_for_watched_address() {
        let watched = Address::repeat_byte(0x11);
        let mut engine = ChainEngine::new(watched, RecordingCallbacks::default(), NullHeaderStore);
        let genesis = test_header(0, H256::zero(), 0);
        engine.bootstrap(genesis);
        let genesis_hash = engine.head().unwrap().hash();

        let mut bloom = Bloom::zero();
        bloom.accrue(ethereum_types::BloomInput::Raw(watched.as_bytes()));

        let tx = Transaction {
            from: watched,
            to: Some(Address::repeat_byte(0x22)),
            value: U256::from(5u64),
            gas: 21_000,
            gas_price: U256::from(1u64),
            nonce: 0,
            data: bytes::Bytes::new(),
            signature: Signature::zero(),
            status: TxStatus::Submitted,
        };
        let tx_hash = tx.hash();

        let body = BlockBody {
            transactions: vec![tx],
            ommers: Vec::new(),
        };

        let mut header = test_header(1, genesis_hash, 1);
        header.logs_bloom = bloom;
        header.transactions_root = BlockHash(keccak_hash(&body.transactions.encode_to_vec()));
        header.ommers_hash = BlockHash(keccak_hash(&body.ommers.encode_to_vec()));
        let header_hash = header.hash();

        engine.chain.insert_header(header.clone());
        engine.chain.extend_head(header_hash);
        engine
            .active_blocks
            .insert(header_hash, ActiveBlock::new(header));

        let requests = engine.handle_bodies_result(vec![(header_hash, body)]);
        assert!(matches!(
            engine.transaction(&tx_hash).unwrap().status,
            TxStatus::Included { .. }
        ));
        assert!(requests
            .iter()
            .any(|r| matches!(r.provision, Provision::GetReceipts { .. })));

        let raw_log = photon_common::log::RawLog {
            address: watched,
            topics: vec![H256::repeat_byte(0x7)],
            data: bytes::Bytes::new(),
        };
        let mut receipt_bloom = Bloom::zero();
        receipt_bloom.accrue(ethereum_types::BloomInput::Raw(watched.as_bytes()));
        let receipt = RawReceipt {
            succeeded: true,
            cumulative_gas_used: 21_000,
            bloom: receipt_bloom,
            logs: vec![raw_log],
        };
        engine.handle_receipts_result(vec![(header_hash, vec![receipt])]);

        assert_eq!(engine.logs().len(), 1);
        assert_eq!(engine.logs()[0].tx_hash, tx_hash);
    }
}
