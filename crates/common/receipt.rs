use crate::log::RawLog;
use bytes::Bytes;
use ethereum_types::Bloom;
use photon_rlp::decode::RLPDecode;
use photon_rlp::encode::RLPEncode;
use photon_rlp::error::RLPDecodeError;
use photon_rlp::structs::{Decoder, Encoder};

/// A transaction receipt as carried on the wire by a GetReceipts response.
/// Logs arrive without block/tx coordinates — the active-block pipeline
/// assigns those once a receipt is matched to the transaction that
/// produced it (see `RawLog::into_log`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReceipt {
    pub succeeded: bool,
    pub cumulative_gas_used: u64,
    pub bloom: Bloom,
    pub logs: Vec<RawLog>,
}

impl RawReceipt {
    pub fn bloom_matches(&self, address: &ethereum_types::Address) -> bool {
        self.bloom
            .contains_input(ethereum_types::BloomInput::Raw(address.as_bytes()))
    }
}

impl RLPEncode for RawReceipt {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.succeeded)
            .encode_field(&self.cumulative_gas_used)
            .encode_field(&self.bloom)
            .encode_field(&self.logs)
            .finish();
    }
}

impl RLPDecode for RawReceipt {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (succeeded, decoder) = decoder.decode_field("succeeded")?;
        let (cumulative_gas_used, decoder) = decoder.decode_field("cumulative_gas_used")?;
        let (bloom, decoder) = decoder.decode_field("bloom")?;
        let (logs, decoder) = decoder.decode_field("logs")?;
        let remaining = decoder.finish()?;
        Ok((
            RawReceipt {
                succeeded,
                cumulative_gas_used,
                bloom,
                logs,
            },
            remaining,
        ))
    }
}

/// A received block's transaction list and uncle (ommer) headers — the
/// payload of a GetBodies response, matched to its [`crate::BlockHeader`]
/// by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBody {
    pub transactions: Vec<crate::transaction::Transaction>,
    pub ommers: Vec<crate::header::BlockHeader>,
}

impl BlockBody {
    pub fn empty() -> Self {
        Self {
            transactions: Vec::new(),
            ommers: Vec::new(),
        }
    }
}

impl RLPEncode for BlockBody {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.transactions)
            .encode_field(&self.ommers)
            .finish();
    }
}

impl RLPDecode for BlockBody {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (transactions, decoder) = decoder.decode_field("transactions")?;
        let (ommers, decoder) = decoder.decode_field("ommers")?;
        let remaining = decoder.finish()?;
        Ok((
            BlockBody {
                transactions,
                ommers,
            },
            remaining,
        ))
    }
}

/// Placeholder used where a field is encoded but not yet populated in
/// this tree (e.g. `extra_data`'s sibling fields on other chains).
pub type Opaque = Bytes;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::RawLog;
    use ethereum_types::{Address, H256};

    #[test]
    fn raw_receipt_roundtrip() {
        let receipt = RawReceipt {
            succeeded: true,
            cumulative_gas_used: 21_000,
            bloom: Bloom::zero(),
            logs: vec![RawLog {
                address: Address::repeat_byte(1),
                topics: vec![H256::repeat_byte(2)],
                data: Bytes::new(),
            }],
        };
        let mut buf = Vec::new();
        receipt.encode(&mut buf);
        let (decoded, rest) = RawReceipt::decode_unfinished(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, receipt);
    }

    #[test]
    fn empty_block_body_roundtrip() {
        let body = BlockBody::empty();
        let mut buf = Vec::new();
        body.encode(&mut buf);
        let (decoded, rest) = BlockBody::decode_unfinished(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, body);
    }
}
