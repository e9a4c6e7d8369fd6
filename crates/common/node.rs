use ethereum_types::{H256, H512};
use photon_crypto::keccak::node_id as compute_node_id;
use photon_rlp::decode::RLPDecode;
use photon_rlp::encode::RLPEncode;
use photon_rlp::error::RLPDecodeError;
use photon_rlp::structs::{Decoder, Encoder};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("invalid enode url: {0}")]
    InvalidFormat(String),
    #[error("invalid public key")]
    InvalidPublicKey,
}

/// A remote peer's identity and reachability: discovery (UDP) and
/// subprotocol (TCP) share the same node id and ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub ip: IpAddr,
    pub udp_port: u16,
    pub tcp_port: u16,
    pub public_key: H512,
    node_id: OnceLock<H256>,
}

impl Node {
    pub fn new(ip: IpAddr, udp_port: u16, tcp_port: u16, public_key: H512) -> Self {
        Self {
            ip,
            udp_port,
            tcp_port,
            public_key,
            node_id: OnceLock::new(),
        }
    }

    /// Keccak256 of the public key — the identifier used as a map key
    /// everywhere a peer needs to be looked up.
    pub fn node_id(&self) -> H256 {
        *self.node_id.get_or_init(|| compute_node_id(&self.public_key))
    }

    pub fn enode_url(&self) -> String {
        format!(
            "enode://{}@{}:{}?discport={}",
            hex::encode(self.public_key.as_bytes()),
            self.ip,
            self.tcp_port,
            self.udp_port
        )
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.enode_url())
    }
}

impl FromStr for Node {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("enode://")
            .ok_or_else(|| NodeError::InvalidFormat(s.to_string()))?;
        let (pubkey_hex, host_part) = rest
            .split_once('@')
            .ok_or_else(|| NodeError::InvalidFormat(s.to_string()))?;

        let pubkey_bytes =
            hex::decode(pubkey_hex).map_err(|_| NodeError::InvalidFormat(s.to_string()))?;
        if pubkey_bytes.len() != 64 {
            return Err(NodeError::InvalidPublicKey);
        }
        let public_key = H512::from_slice(&pubkey_bytes);

        let (addr_part, discport_part) = host_part
            .split_once('?')
            .map_or((host_part, None), |(a, q)| (a, Some(q)));
        let (ip_str, tcp_port_str) = addr_part
            .rsplit_once(':')
            .ok_or_else(|| NodeError::InvalidFormat(s.to_string()))?;
        let ip: IpAddr = ip_str
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse()
            .map_err(|_| NodeError::InvalidFormat(s.to_string()))?;
        let tcp_port: u16 = tcp_port_str
            .parse()
            .map_err(|_| NodeError::InvalidFormat(s.to_string()))?;

        let udp_port = discport_part
            .and_then(|q| q.strip_prefix("discport="))
            .and_then(|v| v.parse().ok())
            .unwrap_or(tcp_port);

        Ok(Node::new(ip, udp_port, tcp_port, public_key))
    }
}

impl RLPEncode for Node {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.ip)
            .encode_field(&self.udp_port)
            .encode_field(&self.tcp_port)
            .encode_field(&self.public_key)
            .finish();
    }
}

impl RLPDecode for Node {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (ip, decoder) = decoder.decode_field("ip")?;
        let (udp_port, decoder) = decoder.decode_field("udp_port")?;
        let (tcp_port, decoder) = decoder.decode_field("tcp_port")?;
        let (public_key, decoder) = decoder.decode_field("public_key")?;
        let remaining = decoder.finish_unchecked();
        Ok((Node::new(ip, udp_port, tcp_port, public_key), remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_enode_url_with_discport() {
        let pubkey = H512::repeat_byte(0xab);
        let url = format!(
            "enode://{}@127.0.0.1:30303?discport=30304",
            hex::encode(pubkey.as_bytes())
        );
        let node = Node::from_str(&url).unwrap();
        assert_eq!(node.tcp_port, 30303);
        assert_eq!(node.udp_port, 30304);
        assert_eq!(node.public_key, pubkey);
    }

    #[test]
    fn enode_url_roundtrips() {
        let node = Node::new(
            "10.0.0.1".parse().unwrap(),
            30301,
            30301,
            H512::repeat_byte(0x11),
        );
        let url = node.enode_url();
        let parsed = Node::from_str(&url).unwrap();
        assert_eq!(parsed.node_id(), node.node_id());
    }

    #[test]
    fn rejects_non_enode_scheme() {
        assert!(Node::from_str("http://example.com").is_err());
    }
}
