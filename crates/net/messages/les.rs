//! The light-client subprotocol (LES v2 / PIP v1), offset `0x10` above the
//! P2P control messages. GETH and PARITY encode these identically at the
//! RLP level; the differences the component design calls out (the PARITY
//! pre-Status Ping, PIP's default credit limit) are handled by the peer
//! node, not here.

use bytes::BufMut;
use ethereum_types::U256;
use photon_common::header::{BlockHash, BlockNumber};
use photon_common::receipt::{BlockBody, RawReceipt};
use photon_common::transaction::{ReceivedTxStatus, Transaction, TxHash};
use photon_common::BlockHeader;
use photon_rlp::decode::RLPDecode;
use photon_rlp::encode::RLPEncode;
use photon_rlp::error::RLPDecodeError;
use photon_rlp::structs::{Decoder, Encoder};

/// Per-message credit cost/limit advertised by a GETH `les` peer in its
/// Status reply, keyed by subtype. PARITY `pip` peers never send this and
/// fall back to a flat default (see [`crate::provisioner::DEFAULT_PIP_LIMIT`]).
#[derive(Debug, Clone, Copy)]
pub struct MessageSpec {
    pub base_cost: u64,
    pub req_cost: u64,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub network_id: u64,
    pub genesis_hash: BlockHash,
    pub head_hash: BlockHash,
    pub head_number: BlockNumber,
    pub head_td: U256,
    pub specs: Vec<(u8, MessageSpec)>,
}

impl StatusMessage {
    pub const CODE: u8 = 0x00;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        let specs: Vec<(u8, u64, u64, u32)> = self
            .specs
            .iter()
            .map(|(id, spec)| (*id, spec.base_cost, spec.req_cost, spec.limit))
            .collect();
        Encoder::new(buf)
            .encode_field(&self.network_id)
            .encode_field(&self.genesis_hash)
            .encode_field(&self.head_hash)
            .encode_field(&self.head_number)
            .encode_field(&self.head_td)
            .encode_field(&specs)
            .finish();
    }

    pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (network_id, decoder) = decoder.decode_field("network_id")?;
        let (genesis_hash, decoder) = decoder.decode_field("genesis_hash")?;
        let (head_hash, decoder) = decoder.decode_field("head_hash")?;
        let (head_number, decoder) = decoder.decode_field("head_number")?;
        let (head_td, decoder) = decoder.decode_field("head_td")?;
        let (raw_specs, decoder) = decoder.decode_optional_field::<Vec<(u8, u64, u64, u32)>>();
        let _ = decoder.finish_unchecked();
        let specs = raw_specs
            .unwrap_or_default()
            .into_iter()
            .map(|(id, base_cost, req_cost, limit)| {
                (
                    id,
                    MessageSpec {
                        base_cost,
                        req_cost,
                        limit,
                    },
                )
            })
            .collect();
        Ok(StatusMessage {
            network_id,
            genesis_hash,
            head_hash,
            head_number,
            head_td,
            specs,
        })
    }
}

/// A pushed head update, sent unsolicited whenever the peer's own head
/// advances. Triggers the BCS engine's single-header fetch in §4.4.1.
#[derive(Debug, Clone)]
pub struct AnnounceMessage {
    pub head_hash: BlockHash,
    pub head_number: BlockNumber,
    pub head_td: U256,
    pub reorg_depth: u64,
}

impl AnnounceMessage {
    pub const CODE: u8 = 0x01;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.head_hash)
            .encode_field(&self.head_number)
            .encode_field(&self.head_td)
            .encode_field(&self.reorg_depth)
            .finish();
    }

    pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (head_hash, decoder) = decoder.decode_field("head_hash")?;
        let (head_number, decoder) = decoder.decode_field("head_number")?;
        let (head_td, decoder) = decoder.decode_field("head_td")?;
        let (reorg_depth, decoder) = decoder.decode_field("reorg_depth")?;
        let _ = decoder.finish_unchecked();
        Ok(AnnounceMessage {
            head_hash,
            head_number,
            head_td,
            reorg_depth,
        })
    }
}

macro_rules! request_envelope {
    ($name:ident, $code:expr, { $($field:ident : $ty:ty),* $(,)? }) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            pub request_id: u64,
            $(pub $field: $ty,)*
        }

        impl $name {
            pub const CODE: u8 = $code;

            pub fn encode(&self, buf: &mut dyn BufMut) {
                Encoder::new(buf)
                    .encode_field(&self.request_id)
                    $(.encode_field(&self.$field))*
                    .finish();
            }

            pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
                let decoder = Decoder::new(data)?;
                let (request_id, decoder) = decoder.decode_field("request_id")?;
                $(let ($field, decoder) = decoder.decode_field(stringify!($field))?;)*
                let _ = decoder.finish_unchecked();
                Ok($name { request_id, $($field,)* })
            }
        }
    };
}

request_envelope!(GetBlockHeaders, 0x02, {
    from: BlockNumber,
    count: u32,
    skip: u32,
    reverse: bool,
});

#[derive(Debug, Clone)]
pub struct BlockHeadersResponse {
    pub request_id: u64,
    pub headers: Vec<BlockHeader>,
}

impl BlockHeadersResponse {
    pub const CODE: u8 = 0x03;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.request_id)
            .encode_field(&self.headers)
            .finish();
    }

    pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (request_id, decoder) = decoder.decode_field("request_id")?;
        let (headers, decoder) = decoder.decode_field("headers")?;
        let _ = decoder.finish_unchecked();
        Ok(BlockHeadersResponse {
            request_id,
            headers,
        })
    }
}

request_envelope!(GetBlockBodies, 0x04, {
    hashes: Vec<BlockHash>,
});

#[derive(Debug, Clone)]
pub struct BlockBodiesResponse {
    pub request_id: u64,
    pub bodies: Vec<BlockBody>,
}

impl BlockBodiesResponse {
    pub const CODE: u8 = 0x05;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.request_id)
            .encode_field(&self.bodies)
            .finish();
    }

    pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (request_id, decoder) = decoder.decode_field("request_id")?;
        let (bodies, decoder) = decoder.decode_field("bodies")?;
        let _ = decoder.finish_unchecked();
        Ok(BlockBodiesResponse { request_id, bodies })
    }
}

request_envelope!(GetReceipts, 0x06, {
    hashes: Vec<BlockHash>,
});

#[derive(Debug, Clone)]
pub struct ReceiptsResponse {
    pub request_id: u64,
    pub receipts: Vec<Vec<RawReceipt>>,
}

impl ReceiptsResponse {
    pub const CODE: u8 = 0x07;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.request_id)
            .encode_field(&self.receipts)
            .finish();
    }

    pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (request_id, decoder) = decoder.decode_field("request_id")?;
        let (receipts, decoder) = decoder.decode_field("receipts")?;
        let _ = decoder.finish_unchecked();
        Ok(ReceiptsResponse {
            request_id,
            receipts,
        })
    }
}

request_envelope!(GetTxStatus, 0x08, {
    hashes: Vec<TxHash>,
});

#[derive(Debug, Clone)]
pub struct TxStatusResponse {
    pub request_id: u64,
    pub statuses: Vec<ReceivedTxStatus>,
}

impl TxStatusResponse {
    pub const CODE: u8 = 0x09;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.request_id)
            .encode_field(&self.statuses)
            .finish();
    }

    pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (request_id, decoder) = decoder.decode_field("request_id")?;
        let (statuses, decoder) = decoder.decode_field("statuses")?;
        let _ = decoder.finish_unchecked();
        Ok(TxStatusResponse {
            request_id,
            statuses,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SendTxMessage {
    pub request_id: u64,
    pub transactions: Vec<Transaction>,
}

impl SendTxMessage {
    pub const CODE: u8 = 0x0a;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.request_id)
            .encode_field(&self.transactions)
            .finish();
    }

    pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (request_id, decoder) = decoder.decode_field("request_id")?;
        let (transactions, decoder) = decoder.decode_field("transactions")?;
        let _ = decoder.finish_unchecked();
        Ok(SendTxMessage {
            request_id,
            transactions,
        })
    }
}

/// PIP-only: the peer may renegotiate its credit table mid-session. The
/// component design requires an Acknowledge reply.
#[derive(Debug, Clone)]
pub struct UpdateCreditParametersMessage {
    pub specs: Vec<(u8, MessageSpec)>,
}

impl UpdateCreditParametersMessage {
    pub const CODE: u8 = 0x0b;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        let specs: Vec<(u8, u64, u64, u32)> = self
            .specs
            .iter()
            .map(|(id, spec)| (*id, spec.base_cost, spec.req_cost, spec.limit))
            .collect();
        Encoder::new(buf).encode_field(&specs).finish();
    }

    pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (raw_specs, decoder) = decoder.decode_field::<Vec<(u8, u64, u64, u32)>>("specs")?;
        let _ = decoder.finish_unchecked();
        let specs = raw_specs
            .into_iter()
            .map(|(id, base_cost, req_cost, limit)| {
                (
                    id,
                    MessageSpec {
                        base_cost,
                        req_cost,
                        limit,
                    },
                )
            })
            .collect();
        Ok(UpdateCreditParametersMessage { specs })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AcknowledgeMessage;

impl AcknowledgeMessage {
    pub const CODE: u8 = 0x0c;

    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf).finish();
    }

    pub fn decode(_data: &[u8]) -> Result<Self, RLPDecodeError> {
        Ok(AcknowledgeMessage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::H256;

    #[test]
    fn status_roundtrip_with_specs() {
        let status = StatusMessage {
            network_id: 1,
            genesis_hash: H256::repeat_byte(1),
            head_hash: H256::repeat_byte(2),
            head_number: 100,
            head_td: U256::from(1_000_000u64),
            specs: vec![(
                GetBlockHeaders::CODE,
                MessageSpec {
                    base_cost: 0,
                    req_cost: 150,
                    limit: 192,
                },
            )],
        };
        let mut buf = Vec::new();
        status.encode(&mut buf);
        let decoded = StatusMessage::decode(&buf).unwrap();
        assert_eq!(decoded.network_id, 1);
        assert_eq!(decoded.specs.len(), 1);
        assert_eq!(decoded.specs[0].1.limit, 192);
    }

    #[test]
    fn status_roundtrip_without_specs_pip_default() {
        let status = StatusMessage {
            network_id: 1,
            genesis_hash: H256::zero(),
            head_hash: H256::zero(),
            head_number: 0,
            head_td: U256::zero(),
            specs: Vec::new(),
        };
        let mut buf = Vec::new();
        status.encode(&mut buf);
        let decoded = StatusMessage::decode(&buf).unwrap();
        assert!(decoded.specs.is_empty());
    }

    #[test]
    fn get_block_headers_roundtrip() {
        let req = GetBlockHeaders {
            request_id: 7,
            from: 42,
            count: 10,
            skip: 0,
            reverse: false,
        };
        let mut buf = Vec::new();
        req.encode(&mut buf);
        let decoded = GetBlockHeaders::decode(&buf).unwrap();
        assert_eq!(decoded.request_id, 7);
        assert_eq!(decoded.from, 42);
        assert_eq!(decoded.count, 10);
    }

    #[test]
    fn get_tx_status_roundtrip() {
        let req = GetTxStatus {
            request_id: 3,
            hashes: vec![TxHash::repeat_byte(9)],
        };
        let mut buf = Vec::new();
        req.encode(&mut buf);
        let decoded = GetTxStatus::decode(&buf).unwrap();
        assert_eq!(decoded.hashes, req.hashes);
    }
}
