//! UDP discovery route: the node-discovery half of a peer node, run
//! independently of the TCP subprotocol route per the component design's
//! "two routes" ownership split. Performs the Ping/Pong handshake, then
//! optimistically asks for neighbors, and afterwards answers inbound
//! Pings and forwards Neighbors records through the peer's event sink.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ethereum_types::{H256, H512};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::callbacks::PeerEventSink;
use crate::error::{PeerError, ProtocolErrorReason};
use crate::messages::discovery::{
    DiscoveryMessage, Endpoint, FindNeighborsMessage, NeighborsMessage, PingMessage, PongMessage,
    MAX_DATAGRAM_SIZE,
};
use crate::node_state::{UdpState, UdpSubphase};

const UDP_STEP_TIMEOUT: Duration = Duration::from_secs(1);
const PING_EXPIRATION_WINDOW: Duration = Duration::from_secs(20);

fn expiration_after(window: Duration) -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        + window.as_secs()
}

/// Runs the UDP handshake in §4.2.1 against `remote`: Ping, await Pong,
/// then an optimistic FindNeighbors whose reply (or the courtesy Ping
/// that may precede it) is handled before returning. State transitions
/// and the eventual neighbor records are reported through `sink`.
pub async fn run(
    socket: UdpSocket,
    local: Endpoint,
    remote: SocketAddr,
    remote_node_id: H256,
    secret_key: secp256k1::SecretKey,
    local_node_id: H512,
    sink: Arc<dyn PeerEventSink>,
) -> Result<(), PeerError> {
    sink.on_udp_state_change(remote_node_id, &UdpState::Connecting(UdpSubphase::Open));

    let remote_endpoint = Endpoint {
        ip: remote.ip(),
        udp_port: remote.port(),
        tcp_port: remote.port(),
    };

    sink.on_udp_state_change(remote_node_id, &UdpState::Connecting(UdpSubphase::Ping));
    let ping = DiscoveryMessage::Ping(PingMessage {
        version: 4,
        from: local.clone(),
        to: remote_endpoint.clone(),
        expiration: expiration_after(PING_EXPIRATION_WINDOW),
    });
    let ping_datagram = ping.encode_signed(&secret_key);
    if ping_datagram.len() > MAX_DATAGRAM_SIZE {
        let err = PeerError::Protocol(ProtocolErrorReason::UdpExcessiveByteCount);
        sink.on_udp_state_change(remote_node_id, &UdpState::ErrorProtocol(ProtocolErrorReason::UdpExcessiveByteCount));
        return Err(err);
    }
    send_to(&socket, &ping_datagram, remote).await?;
    let ping_hash = H256(photon_crypto::keccak::keccak_hash(&ping_datagram[32..]));

    sink.on_udp_state_change(remote_node_id, &UdpState::Connecting(UdpSubphase::PingAck));
    let (pong, sender) = recv_one(&socket).await?;
    if sender != remote_node_id {
        return Err(PeerError::Protocol(ProtocolErrorReason::UdpPingPongMissed));
    }
    match pong {
        DiscoveryMessage::Pong(PongMessage { ping_hash: got, .. }) if got == ping_hash.0 => {}
        _ => return Err(PeerError::Protocol(ProtocolErrorReason::UdpPingPongMissed)),
    }

    sink.on_udp_state_change(remote_node_id, &UdpState::Connected);

    let find = DiscoveryMessage::FindNeighbors(FindNeighborsMessage {
        target: local_node_id,
        expiration: expiration_after(PING_EXPIRATION_WINDOW),
    });
    let find_datagram = find.encode_signed(&secret_key);
    if find_datagram.len() > MAX_DATAGRAM_SIZE {
        return Err(PeerError::Protocol(ProtocolErrorReason::UdpExcessiveByteCount));
    }
    send_to(&socket, &find_datagram, remote).await?;

    // Optimistic: the remote may answer with either a courtesy Ping
    // (respond with Pong and keep waiting) or the Neighbors list itself.
    loop {
        let (message, _sender) = recv_one(&socket).await?;
        match message {
            DiscoveryMessage::Ping(_) => {
                let pong = DiscoveryMessage::Pong(PongMessage {
                    to: remote_endpoint.clone(),
                    ping_hash: ping_hash.0,
                    expiration: expiration_after(PING_EXPIRATION_WINDOW),
                });
                let datagram = pong.encode_signed(&secret_key);
                send_to(&socket, &datagram, remote).await?;
            }
            DiscoveryMessage::Neighbors(NeighborsMessage { nodes, .. }) => {
                for record in &nodes {
                    sink.on_neighbor(record);
                }
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

async fn send_to(socket: &UdpSocket, data: &[u8], remote: SocketAddr) -> Result<(), PeerError> {
    timeout(UDP_STEP_TIMEOUT, socket.send_to(data, remote))
        .await
        .map_err(|_| PeerError::Os(std::io::Error::from(std::io::ErrorKind::TimedOut)))??;
    Ok(())
}

async fn recv_one(socket: &UdpSocket) -> Result<(DiscoveryMessage, H256), PeerError> {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE + 1];
    let n = timeout(UDP_STEP_TIMEOUT, socket.recv(&mut buf))
        .await
        .map_err(|_| PeerError::Os(std::io::Error::from(std::io::ErrorKind::TimedOut)))??;
    buf.truncate(n);
    if buf.len() > MAX_DATAGRAM_SIZE {
        return Err(PeerError::Protocol(ProtocolErrorReason::UdpExcessiveByteCount));
    }
    let (message, sender_pubkey) = DiscoveryMessage::decode_signed(&buf)
        .map_err(|_| PeerError::Protocol(ProtocolErrorReason::UdpPingPongMissed))?;
    Ok((message, photon_crypto::keccak::node_id(&sender_pubkey)))
}
