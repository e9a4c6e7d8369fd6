//! A connected remote peer: owns the TCP subprotocol route and (future)
//! the UDP discovery route, runs the handshake, frames messages, and
//! multiplexes outstanding provisions. Matches the teacher's
//! `RLPxConnection::connection_loop` shape — a single task driven by
//! `tokio::select!` over an inbox — generalized from one GETH-only `eth`
//! subprotocol to the two-dialect LES/PIP negotiation this tree needs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ethereum_types::{H512, U256};
use photon_common::header::{BlockHash, BlockNumber};
use photon_crypto::ecdsa;
use photon_crypto::keccak::node_id;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::auth;
use crate::callbacks::PeerEventSink;
use crate::discovery_route;
use crate::error::{DisconnectReason, PeerError, ProtocolErrorReason};
use crate::frame::FrameCoder;
use crate::messages::discovery::Endpoint;
use crate::messages::p2p::{
    Capability, DisconnectMessage, HelloMessage, PingMessage, PongMessage, SubprotocolClass,
    P2P_PROTOCOL_VERSION,
};
use crate::messages::les::StatusMessage;
use crate::messages::Message;
use crate::node_state::{TcpState, TcpSubphase, UdpState};
use crate::provision::{Provision, ProvisionResult};
use crate::provisioner::{Provisioner, DEFAULT_GETH_LIMIT, DEFAULT_PIP_LIMIT};

const HANDSHAKE_STEP_TIMEOUT: Duration = Duration::from_secs(1);

/// Static identity and session configuration a peer node is constructed
/// with — everything known before any socket is opened.
pub struct PeerConfig {
    pub static_secret_key: secp256k1::SecretKey,
    pub client_id: String,
    pub listen_port: u16,
    pub capabilities: Vec<Capability>,
    pub network_id: u64,
    pub genesis_hash: BlockHash,
}

/// One outbound item queued for the peer's write half.
enum Outbound {
    Message(Message),
}

/// A connected remote peer. `inner` guards everything the component
/// design says must be serialized under the peer's lock: the frame
/// coder, the provisioner list, and the request-id counter.
pub struct PeerNode {
    config: PeerConfig,
    remote_node_id: H512,
    sink: Arc<dyn PeerEventSink>,
    tcp_state: Mutex<TcpState>,
    udp_state: Mutex<UdpState>,
    request_id_counter: AtomicU64,
    inner: Mutex<PeerInner>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,
}

struct PeerInner {
    frame_coder: Option<FrameCoder>,
    provisioners: Vec<Provisioner>,
    subprotocol_class: Option<SubprotocolClass>,
    credit_specs: Vec<(u8, crate::messages::les::MessageSpec)>,
}

impl PeerNode {
    pub fn new(config: PeerConfig, remote_node_id: H512, sink: Arc<dyn PeerEventSink>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            config,
            remote_node_id,
            sink,
            tcp_state: Mutex::new(TcpState::Available),
            udp_state: Mutex::new(UdpState::Available),
            request_id_counter: AtomicU64::new(0),
            inner: Mutex::new(PeerInner {
                frame_coder: None,
                provisioners: Vec::new(),
                subprotocol_class: None,
                credit_specs: Vec::new(),
            }),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
        }
    }

    fn local_node_id(&self) -> H512 {
        ecdsa::decompress_pubkey(
            &self
                .config
                .static_secret_key
                .public_key(secp256k1::SECP256K1),
        )
    }

    async fn set_tcp_state(&self, state: TcpState) {
        *self.tcp_state.lock().await = state.clone();
        self.sink
            .on_tcp_state_change(node_id(&self.remote_node_id), &state);
    }

    async fn set_udp_state(&self, state: UdpState) {
        *self.udp_state.lock().await = state.clone();
        self.sink
            .on_udp_state_change(node_id(&self.remote_node_id), &state);
    }

    /// Runs the UDP discovery route (§4.2.1): Ping/Pong handshake, then an
    /// optimistic FindNeighbors whose reply is forwarded through the
    /// event sink. Independent of the TCP subprotocol route — either can
    /// run, fail, or be retried without touching the other's state.
    pub async fn run_udp_discovery(
        self: &Arc<Self>,
        socket: tokio::net::UdpSocket,
        local_endpoint: Endpoint,
        remote: std::net::SocketAddr,
    ) -> Result<(), PeerError> {
        let remote_node_id = node_id(&self.remote_node_id);
        let local_node_id = self.local_node_id();
        let sink = self.sink.clone();
        let secret_key = self.config.static_secret_key;

        let result = discovery_route::run(
            socket,
            local_endpoint,
            remote,
            remote_node_id,
            secret_key,
            local_node_id,
            sink,
        )
        .await;

        match &result {
            Ok(()) => self.set_udp_state(UdpState::Connected).await,
            Err(PeerError::Os(_)) => {
                self.set_udp_state(UdpState::ErrorOs("udp socket error".into()))
                    .await
            }
            Err(PeerError::Protocol(reason)) => {
                self.set_udp_state(UdpState::ErrorProtocol(*reason)).await
            }
            Err(_) => {}
        }
        result
    }

    /// Runs the full TCP handshake (auth/ack, Hello, optional PARITY
    /// pre-Status Ping, Status) per §4.2.1, then enters the frame
    /// multiplexing loop until the connection ends.
    pub async fn run_as_initiator(
        self: &Arc<Self>,
        mut stream: TcpStream,
        remote_static_pub: H512,
        head_hash: BlockHash,
        head_number: BlockNumber,
        head_td: U256,
    ) -> Result<(), PeerError> {
        self.set_tcp_state(TcpState::Connecting(TcpSubphase::Auth)).await;

        let (auth_state, auth_packet) =
            auth::initiate(self.config.static_secret_key, remote_static_pub)?;
        write_with_timeout(&mut stream, &auth_packet).await?;

        self.set_tcp_state(TcpState::Connecting(TcpSubphase::AuthAck)).await;
        let ack_packet = read_ack_packet(&mut stream).await?;
        let frame_coder = auth::complete_initiator(auth_state, &ack_packet)?;

        self.run_post_auth(stream, frame_coder, head_hash, head_number, head_td)
            .await
    }

    /// Mirror of [`Self::run_as_initiator`] for an inbound connection: the
    /// remote peer sent auth first, so this side replies with ack.
    pub async fn run_as_recipient(
        self: &Arc<Self>,
        mut stream: TcpStream,
        auth_packet: &[u8],
        head_hash: BlockHash,
        head_number: BlockNumber,
        head_td: U256,
    ) -> Result<(), PeerError> {
        self.set_tcp_state(TcpState::Connecting(TcpSubphase::AuthAck)).await;
        let (_remote_static_pub, ack_packet, frame_coder) =
            auth::respond(&self.config.static_secret_key, auth_packet)?;
        write_with_timeout(&mut stream, &ack_packet).await?;

        self.run_post_auth(stream, frame_coder, head_hash, head_number, head_td)
            .await
    }

    async fn run_post_auth(
        self: &Arc<Self>,
        stream: TcpStream,
        mut frame_coder: FrameCoder,
        head_hash: BlockHash,
        head_number: BlockNumber,
        head_td: U256,
    ) -> Result<(), PeerError> {
        let (mut read_half, mut write_half) = stream.into_split();

        self.set_tcp_state(TcpState::Connecting(TcpSubphase::Hello)).await;
        let hello = HelloMessage {
            protocol_version: P2P_PROTOCOL_VERSION,
            client_id: self.config.client_id.clone(),
            capabilities: self.config.capabilities.clone(),
            listen_port: self.config.listen_port,
            node_id: self.local_node_id(),
        };
        send_frame(&mut write_half, &mut frame_coder, Message::Hello(hello)).await?;

        let remote_hello = match recv_frame(&mut read_half, &mut frame_coder).await? {
            Message::Hello(hello) => hello,
            _ => {
                return Err(PeerError::Protocol(ProtocolErrorReason::TcpHelloMissed));
            }
        };

        let subprotocol_class = negotiate_capability(&self.config.capabilities, &remote_hello.capabilities)
            .ok_or(PeerError::Protocol(ProtocolErrorReason::CapabilitiesMismatch))?;
        {
            let mut inner = self.inner.lock().await;
            inner.subprotocol_class = Some(subprotocol_class);
            inner.frame_coder = Some(frame_coder);
        }

        self.set_tcp_state(TcpState::Connecting(TcpSubphase::Status)).await;

        if subprotocol_class == SubprotocolClass::Parity {
            // PARITY sends a bare P2P Ping before Status; this node must
            // answer with Pong before continuing the handshake.
            match self.recv_frame_locked(&mut read_half).await? {
                Message::Ping(_) => {
                    self.send_message_locked(&mut write_half, Message::Pong(PongMessage))
                        .await?;
                }
                other => {
                    warn!(?other, "expected PARITY pre-status ping, got something else");
                }
            }
        }

        let local_status = StatusMessage {
            network_id: self.config.network_id,
            genesis_hash: self.config.genesis_hash,
            head_hash,
            head_number,
            head_td,
            specs: Vec::new(),
        };
        self.send_message_locked(&mut write_half, Message::Status(local_status))
            .await?;

        let remote_status = match self.recv_frame_locked(&mut read_half).await? {
            Message::Status(status) => status,
            _ => return Err(PeerError::Protocol(ProtocolErrorReason::TcpStatusMissed)),
        };
        if remote_status.network_id != self.config.network_id {
            self.set_tcp_state(TcpState::ErrorProtocol(ProtocolErrorReason::NetworkMismatch))
                .await;
            return Err(PeerError::Protocol(ProtocolErrorReason::NetworkMismatch));
        }

        {
            let mut inner = self.inner.lock().await;
            inner.credit_specs = remote_status.specs.clone();
        }
        self.sink
            .on_status(node_id(&self.remote_node_id), &remote_status);

        self.set_tcp_state(TcpState::Connected).await;
        info!(peer = %node_id(&self.remote_node_id), "handshake complete");

        self.multiplex_loop(read_half, write_half).await
    }

    /// Reads one frame off the wire without holding the peer's lock across
    /// the (potentially long) socket wait; the lock is only taken for the
    /// synchronous decrypt step once the bytes are in hand, so a slow
    /// reader can never stall a concurrent writer.
    async fn recv_frame_locked(
        &self,
        read_half: &mut tokio::net::tcp::OwnedReadHalf,
    ) -> Result<Message, PeerError> {
        let mut header = [0u8; 16];
        read_half.read_exact(&mut header).await?;

        let frame_size = {
            let mut inner = self.inner.lock().await;
            let frame_coder = inner
                .frame_coder
                .as_mut()
                .expect("frame coder initialized before first post-hello read");
            frame_coder.decrypt_header(&header)?
        };

        let padded_size = frame_size.next_multiple_of(16);
        let mut body = vec![0u8; padded_size + 16];
        read_half.read_exact(&mut body).await?;

        let plaintext = {
            let mut inner = self.inner.lock().await;
            let frame_coder = inner
                .frame_coder
                .as_mut()
                .expect("frame coder initialized before first post-hello read");
            frame_coder.decrypt_frame(frame_size, &body)?
        };
        Ok(Message::decode(&plaintext)?)
    }

    /// Encrypts under the lock, then writes without holding it — the
    /// mirror of [`Self::recv_frame_locked`]'s split.
    async fn send_message_locked(
        &self,
        write_half: &mut tokio::net::tcp::OwnedWriteHalf,
        message: Message,
    ) -> Result<(), PeerError> {
        let mut plaintext = Vec::new();
        message.encode(&mut plaintext);

        let frame = {
            let mut inner = self.inner.lock().await;
            let frame_coder = inner
                .frame_coder
                .as_mut()
                .expect("frame coder initialized before first post-hello write");
            frame_coder.encrypt(&plaintext)?
        };
        write_half.write_all(&frame).await?;
        Ok(())
    }

    /// Queues a provision for this peer: allocates its request-ID block,
    /// builds its provisioner, and enqueues its outbound messages onto the
    /// write channel. Returns the id the eventual [`ProvisionResult`]
    /// will carry.
    pub async fn submit(&self, provision: Provision) -> u64 {
        let provision_id = self.request_id_counter.load(Ordering::SeqCst);
        let mut inner = self.inner.lock().await;

        let content_limit = self.content_limit(&inner, &provision);
        let messages_count = div_ceil_items(provision.item_count(), content_limit);
        let base_request_id = self
            .request_id_counter
            .fetch_add(messages_count.max(1) as u64, Ordering::SeqCst);

        let mut provisioner = Provisioner::new(provision_id, base_request_id, &provision, content_limit);
        while let Some(message) = provisioner.send_next() {
            let _ = self.outbound_tx.send(Outbound::Message(message));
        }
        inner.provisioners.push(provisioner);
        provision_id
    }

    fn content_limit(&self, inner: &PeerInner, provision: &Provision) -> u32 {
        match inner.subprotocol_class {
            Some(SubprotocolClass::Parity) => DEFAULT_PIP_LIMIT,
            Some(SubprotocolClass::Geth) => {
                let code = match provision {
                    Provision::GetHeaders { .. } => crate::messages::les::GetBlockHeaders::CODE,
                    Provision::GetBodies { .. } => crate::messages::les::GetBlockBodies::CODE,
                    Provision::GetReceipts { .. } => crate::messages::les::GetReceipts::CODE,
                    Provision::GetAccounts { .. } => crate::messages::les::GetReceipts::CODE,
                    Provision::GetTxStatuses { .. } => crate::messages::les::GetTxStatus::CODE,
                    Provision::SubmitTx { .. } => crate::messages::les::SendTxMessage::CODE,
                };
                inner
                    .credit_specs
                    .iter()
                    .find(|(id, _)| *id == code)
                    .map(|(_, spec)| spec.limit)
                    .unwrap_or(DEFAULT_GETH_LIMIT)
            }
            None => DEFAULT_GETH_LIMIT,
        }
    }

    /// Post-handshake frame loop: reads one message per readable tick,
    /// dispatches it, and writes at most one queued outbound message per
    /// writable tick, matching the per-tick duty cycle in §4.2.3.
    async fn multiplex_loop(
        self: &Arc<Self>,
        mut read_half: tokio::net::tcp::OwnedReadHalf,
        mut write_half: tokio::net::tcp::OwnedWriteHalf,
    ) -> Result<(), PeerError> {
        let mut outbound_rx = self
            .outbound_rx
            .lock()
            .await
            .take()
            .expect("multiplex loop runs once per peer");

        loop {
            tokio::select! {
                incoming = self.recv_frame_locked(&mut read_half) => {
                    match incoming {
                        Ok(message) => self.dispatch(&mut write_half, message).await?,
                        Err(err) => {
                            self.set_tcp_state(TcpState::ErrorOs(err.to_string())).await;
                            return Err(err);
                        }
                    }
                }
                Some(Outbound::Message(message)) = outbound_rx.recv() => {
                    self.send_message_locked(&mut write_half, message).await?;
                }
            }
        }
    }

    async fn dispatch(
        self: &Arc<Self>,
        write_half: &mut tokio::net::tcp::OwnedWriteHalf,
        message: Message,
    ) -> Result<(), PeerError> {
        match message {
            Message::Disconnect(DisconnectMessage { reason }) => {
                self.set_tcp_state(TcpState::ErrorDisconnect(reason)).await;
                Err(PeerError::Disconnect(reason))
            }
            Message::Ping(_) => {
                self.send_message_locked(write_half, Message::Pong(PongMessage))
                    .await
            }
            Message::Announce(announce) => {
                self.sink.on_announce(
                    node_id(&self.remote_node_id),
                    announce.head_hash,
                    announce.head_number,
                    announce.head_td,
                    announce.reorg_depth,
                );
                Ok(())
            }
            Message::UpdateCreditParameters(msg) => {
                {
                    let mut inner = self.inner.lock().await;
                    inner.credit_specs = msg.specs;
                }
                self.send_message_locked(
                    write_half,
                    Message::Acknowledge(crate::messages::les::AcknowledgeMessage),
                )
                .await
            }
            response @ (Message::BlockHeaders(_)
            | Message::BlockBodies(_)
            | Message::Receipts(_)
            | Message::TxStatus(_)) => {
                self.route_response(response).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn route_response(&self, message: Message) {
        let request_id = match &message {
            Message::BlockHeaders(resp) => resp.request_id,
            Message::BlockBodies(resp) => resp.request_id,
            Message::Receipts(resp) => resp.request_id,
            Message::TxStatus(resp) => resp.request_id,
            _ => return,
        };

        let mut inner = self.inner.lock().await;
        let Some(index) = inner
            .provisioners
            .iter()
            .position(|p| p.owns_request_id(request_id))
        else {
            debug!(request_id, "response matched no live provisioner");
            return;
        };

        if let Some(result) = inner.provisioners[index].handle_response(request_id, message) {
            let provision_id = inner.provisioners[index].provision_id;
            inner.provisioners.remove(index);
            drop(inner);
            self.sink.on_provide(provision_id, Ok(result));
        }
    }
}

fn div_ceil_items(items: usize, limit: u32) -> u32 {
    let limit = limit.max(1) as usize;
    items.div_ceil(limit).max(1) as u32
}

fn negotiate_capability(
    local: &[Capability],
    remote: &[Capability],
) -> Option<SubprotocolClass> {
    local
        .iter()
        .find(|cap| remote.contains(cap))
        .and_then(Capability::classification)
}

async fn write_with_timeout(stream: &mut TcpStream, data: &[u8]) -> Result<(), PeerError> {
    tokio::time::timeout(HANDSHAKE_STEP_TIMEOUT, stream.write_all(data))
        .await
        .map_err(|_| PeerError::Os(std::io::Error::from(std::io::ErrorKind::TimedOut)))??;
    Ok(())
}

/// Reads the fixed-format ack packet: the envelope has no explicit length
/// prefix, so this reads the well-known minimum and trusts the transport
/// to deliver exactly one ECIES envelope per `write_all` on the sender's
/// side (true for any single-writer auth exchange over a fresh socket).
async fn read_ack_packet(stream: &mut TcpStream) -> Result<Vec<u8>, PeerError> {
    let mut buf = vec![0u8; 4096];
    let n = tokio::time::timeout(HANDSHAKE_STEP_TIMEOUT, stream.read(&mut buf))
        .await
        .map_err(|_| PeerError::Os(std::io::Error::from(std::io::ErrorKind::TimedOut)))??;
    buf.truncate(n);
    Ok(buf)
}

async fn send_frame(
    write_half: &mut tokio::net::tcp::OwnedWriteHalf,
    frame_coder: &mut FrameCoder,
    message: Message,
) -> Result<(), PeerError> {
    let mut plaintext = Vec::new();
    message.encode(&mut plaintext);
    let frame = frame_coder.encrypt(&plaintext)?;
    write_half.write_all(&frame).await?;
    Ok(())
}

async fn recv_frame(
    read_half: &mut tokio::net::tcp::OwnedReadHalf,
    frame_coder: &mut FrameCoder,
) -> Result<Message, PeerError> {
    let mut header = [0u8; 16];
    read_half.read_exact(&mut header).await?;
    let frame_size = frame_coder.decrypt_header(&header)?;

    let padded_size = frame_size.next_multiple_of(16);
    let mut body = vec![0u8; padded_size + 16];
    read_half.read_exact(&mut body).await?;

    let plaintext = frame_coder.decrypt_frame(frame_size, &body)?;
    Ok(Message::decode(&plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_picks_common_les_capability() {
        let local = vec![Capability::les(2), Capability::pip(1)];
        let remote = vec![Capability::les(2)];
        assert_eq!(
            negotiate_capability(&local, &remote),
            Some(SubprotocolClass::Geth)
        );
    }

    #[test]
    fn negotiate_rejects_disjoint_capabilities() {
        let local = vec![Capability::les(2)];
        let remote = vec![Capability::pip(1)];
        assert_eq!(negotiate_capability(&local, &remote), None);
    }

    #[test]
    fn div_ceil_items_rounds_up() {
        assert_eq!(div_ceil_items(500, 192), 3);
        assert_eq!(div_ceil_items(0, 192), 1);
    }
}
