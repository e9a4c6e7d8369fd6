//! The light client's configuration: the watched account, the remote
//! peer to connect to, local listen parameters, the genesis/network
//! identity used in the Status handshake, and the engine's tunable
//! constants (§10.4). Loaded from a TOML file, the same convention the
//! teacher's prover config uses, with every field overridable from the
//! CLI.

use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use ethereum_types::{Address, H256};
use photon_common::node::Node;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid remote peer enode url: {0}")]
    InvalidRemotePeer(#[from] photon_common::node::NodeError),
}

/// The remote peer this light client dials, as written in the config
/// file (an enode URL) before it's resolved into a [`Node`].
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct RemotePeer(pub Node);

impl TryFrom<String> for RemotePeer {
    type Error = photon_common::node::NodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(RemotePeer(value.parse()?))
    }
}

/// This node's static secp256k1 identity, as a hex-encoded private key in
/// the config file. Used to derive the node id advertised in discovery
/// and the RLPx handshake's ephemeral key exchange.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct LocalSecretKey(pub secp256k1::SecretKey);

impl TryFrom<String> for LocalSecretKey {
    type Error = secp256k1::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let bytes = hex::decode(value.trim_start_matches("0x")).map_err(|_| secp256k1::Error::InvalidSecretKey)?;
        Ok(LocalSecretKey(secp256k1::SecretKey::from_slice(&bytes)?))
    }
}

fn default_local_ip() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_local_udp_port() -> u16 {
    30303
}

fn default_local_tcp_port() -> u16 {
    30303
}

fn default_orphan_age_offset() -> u64 {
    10
}

fn default_save_count() -> u64 {
    300
}

fn default_sync_batch() -> u32 {
    100
}

fn default_status_poll_interval_secs() -> u64 {
    3
}

/// Top-level config: everything `cmd/photon` needs to dial a peer and
/// start tracking a single watched account.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The account this light client tracks transactions and logs for.
    pub watched_address: Address,

    /// The single remote peer to connect to (no peer discovery/selection
    /// in this core — see the "Multi-peer extension" design note).
    pub remote_peer: RemotePeer,

    #[serde(default = "default_local_ip")]
    pub local_ip: IpAddr,
    #[serde(default = "default_local_udp_port")]
    pub local_udp_port: u16,
    #[serde(default = "default_local_tcp_port")]
    pub local_tcp_port: u16,

    /// This node's static secp256k1 identity.
    pub local_secret_key: LocalSecretKey,

    /// Network identity asserted in the Status handshake; a mismatch is
    /// `ProtocolError(NetworkMismatch)`.
    pub network_id: u64,
    pub genesis_hash: H256,

    #[serde(default)]
    pub engine: EngineConfig,
}

/// The engine's tunable constants (§4.4), overridable per-deployment but
/// defaulting to the values the specification names.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_orphan_age_offset")]
    pub orphan_age_offset: u64,
    #[serde(default = "default_save_count")]
    pub save_count: u64,
    #[serde(default = "default_sync_batch")]
    pub sync_batch: u32,
    #[serde(default = "default_status_poll_interval_secs")]
    pub status_poll_interval_secs: u64,
}

impl EngineConfig {
    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_secs(self.status_poll_interval_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            orphan_age_offset: default_orphan_age_offset(),
            save_count: default_save_count(),
            sync_batch: default_sync_batch(),
            status_poll_interval_secs: default_status_poll_interval_secs(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        watched_address = "0x0000000000000000000000000000000000000001"
        remote_peer = "enode://561582eae6584a8cf2e56d1c522133c0222548f70432257d669e6aae23a4087b561582eae6584a8cf2e56d1c522133c0222548f70432257d669e6aae23a4087b@127.0.0.1:30303"
        local_secret_key = "0x0101010101010101010101010101010101010101010101010101010101010101"
        network_id = 1
        genesis_hash = "0x0000000000000000000000000000000000000000000000000000000000000000"
    "#;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config: Config = toml::from_str(SAMPLE).expect("valid config");
        assert_eq!(config.network_id, 1);
        assert_eq!(config.engine.orphan_age_offset, 10);
        assert_eq!(config.engine.save_count, 300);
        assert_eq!(config.engine.sync_batch, 100);
        assert_eq!(config.engine.status_poll_interval(), Duration::from_secs(3));
        assert_eq!(config.local_udp_port, 30303);
    }

    #[test]
    fn rejects_malformed_enode() {
        let bad = SAMPLE.replace("enode://", "http://");
        let result: Result<Config, _> = toml::from_str(&bad);
        assert!(result.is_err());
    }
}
