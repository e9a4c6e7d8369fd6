//! Node discovery (UDP) wire messages: Ping, Pong, FindNeighbors, Neighbors.
//! Each datagram is a signed envelope — `hash || signature || packet-type ||
//! rlp(payload)` — so the envelope is handled once here and the four
//! payload shapes stay plain RLP structs, the same split discv4 uses
//! between its envelope codec and its per-message types.

use bytes::BufMut;
use ethereum_types::H512;
use photon_crypto::ecdsa;
use photon_crypto::keccak::keccak_hash;
use photon_rlp::decode::RLPDecode;
use photon_rlp::encode::RLPEncode;
use photon_rlp::error::RLPDecodeError;
use photon_rlp::structs::{Decoder, Encoder};
use secp256k1::ecdsa::RecoveryId;
use secp256k1::SecretKey;
use std::net::IpAddr;

pub const MAX_DATAGRAM_SIZE: usize = 1500;
const HASH_LEN: usize = 32;
const SIG_LEN: usize = 65;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub ip: IpAddr,
    pub udp_port: u16,
    pub tcp_port: u16,
}

impl RLPEncode for Endpoint {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.ip)
            .encode_field(&self.udp_port)
            .encode_field(&self.tcp_port)
            .finish();
    }
}

impl RLPDecode for Endpoint {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (ip, decoder) = decoder.decode_field("ip")?;
        let (udp_port, decoder) = decoder.decode_field("udp_port")?;
        let (tcp_port, decoder) = decoder.decode_field("tcp_port")?;
        let remaining = decoder.finish()?;
        Ok((
            Endpoint {
                ip,
                udp_port,
                tcp_port,
            },
            remaining,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct PingMessage {
    pub version: u8,
    pub from: Endpoint,
    pub to: Endpoint,
    pub expiration: u64,
}

impl PingMessage {
    pub const PACKET_TYPE: u8 = 0x01;

    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.version)
            .encode_field(&self.from)
            .encode_field(&self.to)
            .encode_field(&self.expiration)
            .finish();
    }

    fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (version, decoder) = decoder.decode_field("version")?;
        let (from, decoder) = decoder.decode_field("from")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (expiration, decoder) = decoder.decode_field("expiration")?;
        let _ = decoder.finish_unchecked();
        Ok(PingMessage {
            version,
            from,
            to,
            expiration,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PongMessage {
    pub to: Endpoint,
    pub ping_hash: [u8; HASH_LEN],
    pub expiration: u64,
}

impl PongMessage {
    pub const PACKET_TYPE: u8 = 0x02;

    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.to)
            .encode_bytes(&self.ping_hash)
            .encode_field(&self.expiration)
            .finish();
    }

    fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (ping_hash_bytes, decoder) = decoder.decode_field::<bytes::Bytes>("ping_hash")?;
        let (expiration, decoder) = decoder.decode_field("expiration")?;
        let _ = decoder.finish_unchecked();
        let ping_hash = ping_hash_bytes
            .as_ref()
            .try_into()
            .map_err(|_| RLPDecodeError::malformed_data())?;
        Ok(PongMessage {
            to,
            ping_hash,
            expiration,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FindNeighborsMessage {
    pub target: H512,
    pub expiration: u64,
}

impl FindNeighborsMessage {
    pub const PACKET_TYPE: u8 = 0x03;

    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.target)
            .encode_field(&self.expiration)
            .finish();
    }

    fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (target, decoder) = decoder.decode_field("target")?;
        let (expiration, decoder) = decoder.decode_field("expiration")?;
        let _ = decoder.finish_unchecked();
        Ok(FindNeighborsMessage { target, expiration })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRecord {
    pub endpoint: Endpoint,
    pub node_id: H512,
}

impl RLPEncode for NeighborRecord {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.endpoint.ip)
            .encode_field(&self.endpoint.udp_port)
            .encode_field(&self.endpoint.tcp_port)
            .encode_field(&self.node_id)
            .finish();
    }
}

impl RLPDecode for NeighborRecord {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (ip, decoder) = decoder.decode_field("ip")?;
        let (udp_port, decoder) = decoder.decode_field("udp_port")?;
        let (tcp_port, decoder) = decoder.decode_field("tcp_port")?;
        let (node_id, decoder) = decoder.decode_field("node_id")?;
        let remaining = decoder.finish()?;
        Ok((
            NeighborRecord {
                endpoint: Endpoint {
                    ip,
                    udp_port,
                    tcp_port,
                },
                node_id,
            },
            remaining,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct NeighborsMessage {
    pub nodes: Vec<NeighborRecord>,
    pub expiration: u64,
}

impl NeighborsMessage {
    pub const PACKET_TYPE: u8 = 0x04;

    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.nodes)
            .encode_field(&self.expiration)
            .finish();
    }

    fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (nodes, decoder) = decoder.decode_field("nodes")?;
        let (expiration, decoder) = decoder.decode_field("expiration")?;
        let _ = decoder.finish_unchecked();
        Ok(NeighborsMessage { nodes, expiration })
    }
}

#[derive(Debug, Clone)]
pub enum DiscoveryMessage {
    Ping(PingMessage),
    Pong(PongMessage),
    FindNeighbors(FindNeighborsMessage),
    Neighbors(NeighborsMessage),
}

impl DiscoveryMessage {
    fn packet_type(&self) -> u8 {
        match self {
            Self::Ping(_) => PingMessage::PACKET_TYPE,
            Self::Pong(_) => PongMessage::PACKET_TYPE,
            Self::FindNeighbors(_) => FindNeighborsMessage::PACKET_TYPE,
            Self::Neighbors(_) => NeighborsMessage::PACKET_TYPE,
        }
    }

    fn encode_payload(&self, buf: &mut dyn BufMut) {
        match self {
            Self::Ping(msg) => msg.encode(buf),
            Self::Pong(msg) => msg.encode(buf),
            Self::FindNeighbors(msg) => msg.encode(buf),
            Self::Neighbors(msg) => msg.encode(buf),
        }
    }

    /// Signs and frames this message into a complete datagram:
    /// `hash || sig || packet-type || rlp(payload)`, where `hash` covers
    /// everything from the signature onward. Errors if the result would
    /// exceed the discovery protocol's 1280-byte practical limit (checked
    /// against [`MAX_DATAGRAM_SIZE`] by the caller, not here).
    pub fn encode_signed(&self, secret_key: &SecretKey) -> Vec<u8> {
        let mut payload = Vec::new();
        self.encode_payload(&mut payload);

        let mut signed = vec![self.packet_type()];
        signed.extend_from_slice(&payload);

        let digest = keccak_hash(&signed);
        let (sig, recovery_id) = ecdsa::sign(secret_key, &digest);

        let mut body = Vec::with_capacity(SIG_LEN + signed.len());
        body.extend_from_slice(&sig);
        body.push(recovery_id_byte(recovery_id));
        body.extend_from_slice(&signed);

        let mut datagram = Vec::with_capacity(HASH_LEN + body.len());
        datagram.extend_from_slice(&keccak_hash(&body));
        datagram.extend_from_slice(&body);
        datagram
    }

    /// Validates the envelope hash and signature, recovers the sender's
    /// public key, and decodes the payload. Rejects datagrams over
    /// [`MAX_DATAGRAM_SIZE`] as a protocol violation before doing any
    /// cryptography.
    pub fn decode_signed(datagram: &[u8]) -> Result<(Self, H512), RLPDecodeError> {
        if datagram.len() > MAX_DATAGRAM_SIZE {
            return Err(RLPDecodeError::malformed_data());
        }
        if datagram.len() < HASH_LEN + SIG_LEN + 1 {
            return Err(RLPDecodeError::malformed_data());
        }
        let (claimed_hash, body) = datagram.split_at(HASH_LEN);
        if keccak_hash(body) != claimed_hash {
            return Err(RLPDecodeError::malformed_data());
        }

        let (sig_bytes, signed) = body.split_at(SIG_LEN);
        let sig: [u8; 64] = sig_bytes[..64]
            .try_into()
            .map_err(|_| RLPDecodeError::malformed_data())?;
        let recovery_id = RecoveryId::from_i32(sig_bytes[64] as i32)
            .map_err(|_| RLPDecodeError::malformed_data())?;
        let digest = keccak_hash(signed);
        let sender = ecdsa::recover(&sig, recovery_id, &digest)
            .map_err(|_| RLPDecodeError::malformed_data())?;

        let (packet_type, payload) = signed
            .split_first()
            .ok_or_else(RLPDecodeError::malformed_data)?;
        let message = match *packet_type {
            PingMessage::PACKET_TYPE => Self::Ping(PingMessage::decode(payload)?),
            PongMessage::PACKET_TYPE => Self::Pong(PongMessage::decode(payload)?),
            FindNeighborsMessage::PACKET_TYPE => {
                Self::FindNeighbors(FindNeighborsMessage::decode(payload)?)
            }
            NeighborsMessage::PACKET_TYPE => Self::Neighbors(NeighborsMessage::decode(payload)?),
            _ => return Err(RLPDecodeError::malformed_data()),
        };
        Ok((message, sender))
    }
}

fn recovery_id_byte(recovery_id: RecoveryId) -> u8 {
    recovery_id.to_i32() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn endpoint(port: u16) -> Endpoint {
        Endpoint {
            ip: "127.0.0.1".parse().unwrap(),
            udp_port: port,
            tcp_port: port,
        }
    }

    #[test]
    fn ping_signed_roundtrip() {
        let secret_key = SecretKey::new(&mut OsRng);
        let public_key = secret_key.public_key(secp256k1::SECP256K1);
        let expected_sender = H512::from_slice(&public_key.serialize_uncompressed()[1..]);

        let ping = DiscoveryMessage::Ping(PingMessage {
            version: 4,
            from: endpoint(30303),
            to: endpoint(30304),
            expiration: 1_800_000_000,
        });
        let datagram = ping.encode_signed(&secret_key);
        assert!(datagram.len() <= MAX_DATAGRAM_SIZE);

        let (decoded, sender) = DiscoveryMessage::decode_signed(&datagram).unwrap();
        assert_eq!(sender, expected_sender);
        match decoded {
            DiscoveryMessage::Ping(msg) => assert_eq!(msg.to.udp_port, 30304),
            other => panic!("expected Ping, got {other:?}"),
        }
    }

    #[test]
    fn oversized_datagram_is_rejected() {
        let oversized = vec![0u8; MAX_DATAGRAM_SIZE + 1];
        assert!(DiscoveryMessage::decode_signed(&oversized).is_err());
    }

    #[test]
    fn neighbors_roundtrip() {
        let secret_key = SecretKey::new(&mut OsRng);
        let neighbors = DiscoveryMessage::Neighbors(NeighborsMessage {
            nodes: vec![NeighborRecord {
                endpoint: endpoint(30303),
                node_id: H512::repeat_byte(0x7),
            }],
            expiration: 1_800_000_000,
        });
        let datagram = neighbors.encode_signed(&secret_key);
        let (decoded, _) = DiscoveryMessage::decode_signed(&datagram).unwrap();
        match decoded {
            DiscoveryMessage::Neighbors(msg) => assert_eq!(msg.nodes.len(), 1),
            other => panic!("expected Neighbors, got {other:?}"),
        }
    }
}
