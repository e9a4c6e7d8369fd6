//! Process bootstrap helpers (§10.2): tracing setup with a reloadable
//! filter, matching `cmd/ethrex/initializers.rs::init_tracing`, plus the
//! TCP dial that gets a [`PeerNode`] onto the wire as the handshake
//! initiator.

use std::net::SocketAddr;
use std::sync::Arc;

use photon_net::{PeerConfig, PeerNode};
use tokio::net::TcpStream;
use tracing::metadata::Level;
use tracing::info;
use tracing_subscriber::{filter::Directive, fmt, layer::SubscriberExt, reload, EnvFilter, Registry};

pub fn init_tracing(log_level: Level) -> reload::Handle<EnvFilter, Registry> {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(log_level))
        .from_env_lossy();

    let (filter, filter_handle) = reload::Layer::new(log_filter);
    let fmt_layer = fmt::layer().with_filter(filter);
    let subscriber = Registry::default().with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
    filter_handle
}

/// Dials the remote peer's TCP endpoint and runs it as the RLPx
/// handshake initiator (§4.2.1) until the connection ends. Returns once
/// the peer's route settles into a terminal state.
pub async fn dial_peer(
    peer: Arc<PeerNode>,
    remote_addr: SocketAddr,
    remote_static_pub: ethereum_types::H512,
    head_hash: photon_common::header::BlockHash,
    head_number: photon_common::header::BlockNumber,
    head_td: ethereum_types::U256,
) -> Result<(), photon_net::PeerError> {
    info!(%remote_addr, "dialing remote peer");
    let stream = TcpStream::connect(remote_addr).await?;
    peer.run_as_initiator(stream, remote_static_pub, head_hash, head_number, head_td)
        .await
}

/// Builds this node's advertised capability set: both LES and PIP, so
/// negotiation (§4.2.1 step 6) can classify the remote peer as either
/// GETH or PARITY.
pub fn advertised_capabilities() -> Vec<photon_net::messages::p2p::Capability> {
    vec![
        photon_net::messages::p2p::Capability::les(2),
        photon_net::messages::p2p::Capability::pip(1),
    ]
}

pub fn client_id() -> String {
    format!("photon/{}", env!("CARGO_PKG_VERSION"))
}

pub fn peer_config(
    static_secret_key: secp256k1::SecretKey,
    listen_port: u16,
    network_id: u64,
    genesis_hash: photon_common::header::BlockHash,
) -> PeerConfig {
    PeerConfig {
        static_secret_key,
        client_id: client_id(),
        listen_port,
        capabilities: advertised_capabilities(),
        network_id,
        genesis_hash,
    }
}
