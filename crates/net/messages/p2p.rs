//! The baseline P2P capability: handshake (Hello), keepalive (Ping/Pong)
//! and the Disconnect control message. Every RLPx connection speaks this
//! regardless of which subprotocol it negotiates, at message ids below
//! the subprotocol's offset.

use bytes::BufMut;
use ethereum_types::H512;
use photon_rlp::decode::RLPDecode;
use photon_rlp::encode::RLPEncode;
use photon_rlp::error::RLPDecodeError;
use photon_rlp::structs::{Decoder, Encoder};

use crate::error::DisconnectReason;

pub const P2P_PROTOCOL_VERSION: u64 = 5;

/// A capability as advertised in Hello: a name (`"les"`, `"pip"`) and a
/// version. Two peers negotiate by intersecting their advertised sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub name: String,
    pub version: u8,
}

impl Capability {
    pub fn les(version: u8) -> Self {
        Self {
            name: "les".into(),
            version,
        }
    }

    pub fn pip(version: u8) -> Self {
        Self {
            name: "pip".into(),
            version,
        }
    }

    /// Which wire dialect a peer speaks once this capability is chosen.
    pub fn classification(&self) -> Option<SubprotocolClass> {
        match self.name.as_str() {
            "les" => Some(SubprotocolClass::Geth),
            "pip" => Some(SubprotocolClass::Parity),
            _ => None,
        }
    }
}

/// The two subprotocol dialects a light client peer can speak, chosen by
/// capability negotiation during Hello. GETH's `les` and PARITY's `pip`
/// carry the same logical messages with slightly different framing
/// conventions (PARITY sends a P2P Ping before Status; credit parameters
/// default rather than being announced).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubprotocolClass {
    Geth,
    Parity,
}

impl RLPEncode for Capability {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.name)
            .encode_field(&self.version)
            .finish();
    }
}

impl RLPDecode for Capability {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (name, decoder) = decoder.decode_field("name")?;
        let (version, decoder) = decoder.decode_field("version")?;
        let remaining = decoder.finish()?;
        Ok((Capability { name, version }, remaining))
    }
}

#[derive(Debug, Clone)]
pub struct HelloMessage {
    pub protocol_version: u64,
    pub client_id: String,
    pub capabilities: Vec<Capability>,
    pub listen_port: u16,
    pub node_id: H512,
}

impl HelloMessage {
    pub const CODE: u8 = 0x00;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.protocol_version)
            .encode_field(&self.client_id)
            .encode_field(&self.capabilities)
            .encode_field(&self.listen_port)
            .encode_field(&self.node_id)
            .finish();
    }

    pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (protocol_version, decoder) = decoder.decode_field("protocolVersion")?;
        let (client_id, decoder) = decoder.decode_field("clientId")?;
        let (capabilities, decoder) = decoder.decode_field("capabilities")?;
        let (listen_port, decoder) = decoder.decode_field("listenPort")?;
        let (node_id, decoder) = decoder.decode_field("nodeId")?;
        let _ = decoder.finish_unchecked();
        Ok(HelloMessage {
            protocol_version,
            client_id,
            capabilities,
            listen_port,
            node_id,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DisconnectMessage {
    pub reason: DisconnectReason,
}

impl DisconnectMessage {
    pub const CODE: u8 = 0x01;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf).encode_field(&self.reason.code()).finish();
    }

    pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (code, decoder): (u8, _) = decoder.decode_field("reason")?;
        let _ = decoder.finish_unchecked();
        Ok(DisconnectMessage {
            reason: DisconnectReason::from_code(code),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PingMessage;

impl PingMessage {
    pub const CODE: u8 = 0x02;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf).finish();
    }

    pub fn decode(_data: &[u8]) -> Result<Self, RLPDecodeError> {
        Ok(PingMessage)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PongMessage;

impl PongMessage {
    pub const CODE: u8 = 0x03;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf).finish();
    }

    pub fn decode(_data: &[u8]) -> Result<Self, RLPDecodeError> {
        Ok(PongMessage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_roundtrip() {
        let hello = HelloMessage {
            protocol_version: P2P_PROTOCOL_VERSION,
            client_id: "photon/0.1.0".into(),
            capabilities: vec![Capability::les(2), Capability::pip(1)],
            listen_port: 30303,
            node_id: H512::repeat_byte(0xaa),
        };
        let mut buf = Vec::new();
        hello.encode(&mut buf);
        let decoded = HelloMessage::decode(&buf).unwrap();
        assert_eq!(decoded.client_id, hello.client_id);
        assert_eq!(decoded.capabilities, hello.capabilities);
        assert_eq!(decoded.node_id, hello.node_id);
    }

    #[test]
    fn capability_classifies_les_as_geth() {
        assert_eq!(
            Capability::les(2).classification(),
            Some(SubprotocolClass::Geth)
        );
        assert_eq!(
            Capability::pip(1).classification(),
            Some(SubprotocolClass::Parity)
        );
        assert_eq!(
            Capability {
                name: "eth".into(),
                version: 68
            }
            .classification(),
            None
        );
    }

    #[test]
    fn disconnect_roundtrip() {
        let msg = DisconnectMessage {
            reason: DisconnectReason::TooManyPeers,
        };
        let mut buf = Vec::new();
        msg.encode(&mut buf);
        let decoded = DisconnectMessage::decode(&buf).unwrap();
        assert_eq!(decoded.reason, msg.reason);
    }
}
