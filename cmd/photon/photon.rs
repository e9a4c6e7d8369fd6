use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use ethereum_types::U256;
use photon::cli::{Cli, Command};
use photon::initializers::{dial_peer, init_tracing, peer_config};
use photon::sink::{LoggingHeaderStore, StatusSeedingSink, TracingChainCallbacks};
use photon_chain::{ChainDriver, ChainEngine, EngineTunables};
use photon_config::Config;
use photon_net::PeerNode;
use photon_rlp::decode::RLPDecode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    let _filter_handle = init_tracing(cli.opts.log_level);

    let mut config = Config::from_file(&cli.opts.config)?;
    if let Some(watch) = cli.opts.watch {
        config.watched_address = watch;
    }
    if let Some(remote_peer) = cli.opts.remote_peer {
        config.remote_peer = photon_config::RemotePeer(remote_peer.parse::<photon_common::node::Node>()?);
    }

    let engine = ChainEngine::with_tunables(
        config.watched_address,
        TracingChainCallbacks,
        LoggingHeaderStore,
        EngineTunables {
            orphan_age_offset: config.engine.orphan_age_offset,
            save_count: config.engine.save_count,
            sync_batch: config.engine.sync_batch,
        },
    );
    let driver = Arc::new(ChainDriver::with_status_poll_interval(
        engine,
        config.engine.status_poll_interval(),
    ));

    let remote_node = config.remote_peer.0.clone();
    let remote_node_id = remote_node.node_id();
    let remote_static_pub = remote_node.public_key;
    let remote_tcp_addr = SocketAddr::new(remote_node.ip, remote_node.tcp_port);

    let sink = Arc::new(StatusSeedingSink::new(driver.clone()));
    let config_for_peer = peer_config(
        config.local_secret_key.0,
        config.local_tcp_port,
        config.network_id,
        config.genesis_hash,
    );
    let peer = Arc::new(PeerNode::new(config_for_peer, remote_node_id, sink));
    driver.attach_peer(peer.clone()).await;

    if let Some(Command::SubmitTx { raw_tx }) = cli.command {
        let bytes = hex::decode(raw_tx.trim_start_matches("0x"))?;
        let transaction = photon_common::transaction::Transaction::decode(&bytes)?;
        let tx_hash = driver.submit_tx(transaction).await?;
        info!(%tx_hash, "transaction submitted, tracking status");
    }

    let status_poll = {
        let driver = driver.clone();
        tokio::spawn(async move {
            driver.run_status_poll().await;
        })
    };

    // This node has no chain of its own yet on a fresh start: it
    // advertises the configured genesis as its head in the Status
    // handshake and lets the peer's own head seed the first header
    // fetch (`StatusSeedingSink::on_status`).
    let dial_result = dial_peer(
        peer.clone(),
        remote_tcp_addr,
        remote_static_pub,
        config.genesis_hash,
        0,
        U256::zero(),
    )
    .await;

    status_poll.abort();

    if let Err(err) = dial_result {
        error!(%err, "peer connection ended");
        return Err(err.into());
    }

    Ok(())
}
