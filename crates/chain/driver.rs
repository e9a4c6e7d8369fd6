//! Wires the synchronous BCS engine (§4.4) to a live peer connection
//! (§2, §5): translates the [`PendingRequest`]s an engine handler
//! returns into [`Provision`] submissions against a [`PeerNode`], and
//! routes the peer's [`PeerEventSink`] callbacks back into the matching
//! engine handler. Also owns the periodic transaction-status poll timer
//! (§4.4.6), the one thing the engine itself never schedules.
//!
//! The engine is synchronous and the peer's callbacks are plain,
//! non-async trait methods (the peer task cannot await them without
//! blocking its own frame loop), so every callback here does its work on
//! a spawned task rather than inline. The peer is attached after
//! construction rather than passed to `new`: a [`PeerNode`] is built with
//! its sink already in hand, and this driver *is* that sink, so it must
//! exist before the peer it submits provisions against does.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ethereum_types::{H256, U256};
use photon_common::header::BlockHeader;
use photon_common::transaction::{Transaction, TxHash};
use photon_net::messages::discovery::NeighborRecord;
use photon_net::messages::les::StatusMessage;
use photon_net::node_state::{TcpState, UdpState};
use photon_net::{PeerEventSink, PeerNode, ProvisionError, ProvisionResult};
use tokio::sync::Mutex;

use crate::callbacks::{ChainCallbacks, HeaderStore};
use crate::constants::STATUS_POLL_INTERVAL;
use crate::engine::{ChainEngine, PendingRequest, ProvisionPurpose};
use crate::error::ChainError;

pub struct ChainDriver<C, S> {
    engine: Arc<Mutex<ChainEngine<C, S>>>,
    peer: Arc<Mutex<Option<Arc<PeerNode>>>>,
    in_flight: Arc<Mutex<HashMap<u64, ProvisionPurpose>>>,
    status_poll_interval: Duration,
}

impl<C, S> ChainDriver<C, S>
where
    C: ChainCallbacks + 'static,
    S: HeaderStore + 'static,
{
    pub fn new(engine: ChainEngine<C, S>) -> Self {
        Self::with_status_poll_interval(engine, STATUS_POLL_INTERVAL)
    }

    /// Same as [`Self::new`] but with the status-poll tick (§4.4.6)
    /// overridden by a config-derived interval instead of the
    /// specification's default.
    pub fn with_status_poll_interval(engine: ChainEngine<C, S>, status_poll_interval: Duration) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            peer: Arc::new(Mutex::new(None)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            status_poll_interval,
        }
    }

    /// Attaches the peer this driver submits provisions against. Must be
    /// called once, after the peer was constructed with this driver
    /// (cloned behind `Arc<dyn PeerEventSink>`) as its sink.
    pub async fn attach_peer(&self, peer: Arc<PeerNode>) {
        *self.peer.lock().await = Some(peer);
    }

    /// Seeds the chain from a single known-good header, bypassing the
    /// peer entirely (startup, genesis/checkpoint primer).
    pub async fn bootstrap(&self, genesis: BlockHeader) {
        self.engine.lock().await.bootstrap(genesis);
    }

    /// Re-threads previously persisted headers, as produced by
    /// [`crate::replay::reconstruct`], before the peer is attached.
    pub async fn replay_headers(&self, headers: Vec<BlockHeader>) {
        self.engine.lock().await.replay_headers(headers);
    }

    /// §4.4.7: hands a new transaction to the engine and submits it.
    pub async fn submit_tx(&self, transaction: Transaction) -> Result<TxHash, ChainError> {
        let (tx_hash, request) = self.engine.lock().await.submit_tx(transaction);
        self.dispatch(vec![request]).await?;
        Ok(tx_hash)
    }

    pub fn engine_handle(&self) -> Arc<Mutex<ChainEngine<C, S>>> {
        self.engine.clone()
    }

    /// Runs the periodic pending-transaction status poll (§4.4.6) until
    /// cancelled. Meant to be spawned as its own task alongside the
    /// peer's frame loop.
    pub async fn run_status_poll(&self) -> ! {
        let mut ticker = tokio::time::interval(self.status_poll_interval);
        loop {
            ticker.tick().await;
            let request = self.engine.lock().await.tick_status_poll();
            if let Some(request) = request {
                if let Err(err) = self.dispatch(vec![request]).await {
                    tracing::warn!(%err, "status poll tick had nothing to submit against");
                }
            }
        }
    }

    /// Submits every request, recording what each is for so the eventual
    /// `on_provide` can be routed back to the handler that should see it.
    async fn dispatch(&self, requests: Vec<PendingRequest>) -> Result<(), ChainError> {
        let peer = self.peer.lock().await.clone().ok_or(ChainError::NoPeer)?;
        for request in requests {
            let provision_id = peer.submit(request.provision).await;
            self.in_flight.lock().await.insert(provision_id, request.purpose);
        }
        Ok(())
    }

    async fn handle_provide(&self, provision_id: u64, result: Result<ProvisionResult, ProvisionError>) {
        let Some(purpose) = self.in_flight.lock().await.remove(&provision_id) else {
            return;
        };

        let dispatch_result = match (purpose, result) {
            (ProvisionPurpose::Headers, Ok(ProvisionResult::Headers(headers))) => {
                let mut requests = Vec::new();
                {
                    let mut engine = self.engine.lock().await;
                    for header in headers {
                        requests.extend(engine.handle_block_header(header));
                    }
                }
                Some(self.dispatch(requests).await)
            }
            (ProvisionPurpose::Bodies { hashes }, Ok(ProvisionResult::Bodies(bodies))) => {
                let results = hashes.into_iter().zip(bodies).collect();
                let requests = self.engine.lock().await.handle_bodies_result(results);
                Some(self.dispatch(requests).await)
            }
            (ProvisionPurpose::Receipts { hashes }, Ok(ProvisionResult::Receipts(receipts))) => {
                let results = hashes.into_iter().zip(receipts).collect();
                self.engine.lock().await.handle_receipts_result(results);
                None
            }
            (ProvisionPurpose::TxStatuses { hashes }, Ok(ProvisionResult::TxStatuses(statuses))) => {
                let results = hashes.into_iter().zip(statuses).collect();
                self.engine.lock().await.handle_status_result(results);
                None
            }
            (ProvisionPurpose::SubmitTx { tx_hash }, Ok(ProvisionResult::Submitted)) => {
                self.engine.lock().await.handle_submit_result(tx_hash, Ok(()));
                None
            }
            (ProvisionPurpose::SubmitTx { tx_hash }, Err(err)) => {
                self.engine.lock().await.handle_submit_result(tx_hash, Err(err));
                None
            }
            (_, Err(_)) => {
                // Headers/bodies/receipts/status-poll failures are
                // transient: the next trigger (an announce, syncContinue,
                // the status poll tick) re-issues the request.
                None
            }
            (purpose, Ok(_)) => {
                tracing::warn!(provision_id, ?purpose, "provision result did not match its purpose");
                None
            }
        };
        if let Some(Err(err)) = dispatch_result {
            tracing::warn!(%err, provision_id, "could not submit follow-up requests");
        }
    }
}

impl<C, S> PeerEventSink for ChainDriver<C, S>
where
    C: ChainCallbacks + 'static,
    S: HeaderStore + 'static,
{
    fn on_tcp_state_change(&self, _node_id: H256, _state: &TcpState) {}
    fn on_udp_state_change(&self, _node_id: H256, _state: &UdpState) {}
    fn on_status(&self, _node_id: H256, _status: &StatusMessage) {}

    /// §4.4.1: an announce only triggers a single-header fetch.
    fn on_announce(&self, _node_id: H256, _head_hash: H256, head_number: u64, _head_td: U256, _reorg_depth: u64) {
        let engine = self.engine.clone();
        let peer = self.peer.clone();
        let in_flight = self.in_flight.clone();
        let status_poll_interval = self.status_poll_interval;
        tokio::spawn(async move {
            let driver = ChainDriver { engine, peer, in_flight, status_poll_interval };
            let request = driver.engine.lock().await.handle_announce(head_number);
            if let Err(err) = driver.dispatch(vec![request]).await {
                tracing::warn!(%err, "announce had nothing to submit against");
            }
        });
    }

    fn on_neighbor(&self, _record: &NeighborRecord) {}

    fn on_provide(&self, provision_id: u64, result: Result<ProvisionResult, ProvisionError>) {
        let engine = self.engine.clone();
        let peer = self.peer.clone();
        let in_flight = self.in_flight.clone();
        let status_poll_interval = self.status_poll_interval;
        tokio::spawn(async move {
            let driver = ChainDriver { engine, peer, in_flight, status_poll_interval };
            driver.handle_provide(provision_id, result).await;
        });
    }
}
