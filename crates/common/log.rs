use crate::header::BlockHash;
use crate::transaction::TxHash;
use bytes::Bytes;
use ethereum_types::{Address, H256};
use photon_rlp::decode::RLPDecode;
use photon_rlp::encode::RLPEncode;
use photon_rlp::error::RLPDecodeError;
use photon_rlp::structs::{Decoder, Encoder};

/// An event log. Only exists by virtue of inclusion in a receipt of an
/// included transaction, which is why it carries the block/tx coordinates
/// that locate it rather than standing alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
    pub block_hash: BlockHash,
    pub tx_hash: TxHash,
    pub log_index: u64,
}

impl Log {
    pub fn matches_address(&self, address: &Address) -> bool {
        &self.address == address
    }
}

/// The receipt-embedded form of a log, as carried on the wire inside a
/// GetReceipts response — no block/tx coordinates yet, those are assigned
/// by the BCS engine once the receipt is matched to its active block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

impl RawLog {
    pub fn into_log(self, block_hash: BlockHash, tx_hash: TxHash, log_index: u64) -> Log {
        Log {
            address: self.address,
            topics: self.topics,
            data: self.data,
            block_hash,
            tx_hash,
            log_index,
        }
    }
}

impl RLPEncode for RawLog {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.topics)
            .encode_field(&self.data)
            .finish();
    }
}

impl RLPDecode for RawLog {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (topics, decoder) = decoder.decode_field("topics")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let remaining = decoder.finish()?;
        Ok((
            RawLog {
                address,
                topics,
                data,
            },
            remaining,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_log_roundtrip() {
        let log = RawLog {
            address: Address::repeat_byte(0x5),
            topics: vec![H256::repeat_byte(0x1), H256::repeat_byte(0x2)],
            data: Bytes::from_static(b"payload"),
        };
        let mut buf = Vec::new();
        log.encode(&mut buf);
        let (decoded, rest) = RawLog::decode_unfinished(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, log);
    }

    #[test]
    fn into_log_assigns_coordinates() {
        let raw = RawLog {
            address: Address::repeat_byte(0x5),
            topics: vec![],
            data: Bytes::new(),
        };
        let log = raw.into_log(BlockHash::repeat_byte(0x9), TxHash::repeat_byte(0x7), 2);
        assert_eq!(log.log_index, 2);
        assert!(log.matches_address(&Address::repeat_byte(0x5)));
    }
}
