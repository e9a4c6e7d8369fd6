use bytes::Bytes;
use ethereum_types::{Address, Bloom, H256, U256};
use photon_crypto::keccak::keccak_hash;
use photon_rlp::decode::RLPDecode;
use photon_rlp::encode::RLPEncode;
use photon_rlp::error::RLPDecodeError;
use photon_rlp::structs::{Decoder, Encoder};
use std::sync::OnceLock;

pub type BlockHash = H256;
pub type BlockNumber = u64;

/// A block header. Identified by its hash, immutable once received.
///
/// Invariant: if a header's parent is known and not an orphan, its number
/// is exactly the parent's number plus one — enforced by the absorption
/// policy in `photon-chain`, not by this type.
#[derive(Debug, Clone)]
pub struct BlockHeader {
    pub parent_hash: BlockHash,
    pub ommers_hash: H256,
    pub coinbase: Address,
    pub state_root: H256,
    pub transactions_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: BlockNumber,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub nonce: u64,
    hash: OnceLock<BlockHash>,
}

impl PartialEq for BlockHeader {
    fn eq(&self, other: &Self) -> bool {
        self.parent_hash == other.parent_hash
            && self.ommers_hash == other.ommers_hash
            && self.coinbase == other.coinbase
            && self.state_root == other.state_root
            && self.transactions_root == other.transactions_root
            && self.receipts_root == other.receipts_root
            && self.logs_bloom == other.logs_bloom
            && self.difficulty == other.difficulty
            && self.number == other.number
            && self.gas_limit == other.gas_limit
            && self.gas_used == other.gas_used
            && self.timestamp == other.timestamp
            && self.extra_data == other.extra_data
            && self.nonce == other.nonce
    }
}
impl Eq for BlockHeader {}

impl BlockHeader {
    /// Builds a header from its fields. The hash cache starts empty and is
    /// filled lazily by [`BlockHeader::hash`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        parent_hash: BlockHash,
        ommers_hash: H256,
        coinbase: Address,
        state_root: H256,
        transactions_root: H256,
        receipts_root: H256,
        logs_bloom: Bloom,
        difficulty: U256,
        number: BlockNumber,
        gas_limit: u64,
        gas_used: u64,
        timestamp: u64,
        extra_data: Bytes,
        nonce: u64,
    ) -> Self {
        BlockHeader {
            parent_hash,
            ommers_hash,
            coinbase,
            state_root,
            transactions_root,
            receipts_root,
            logs_bloom,
            difficulty,
            number,
            gas_limit,
            gas_used,
            timestamp,
            extra_data,
            nonce,
            hash: OnceLock::new(),
        }
    }

    /// Keccak256 of the RLP encoding. Computed once and cached: headers are
    /// immutable once received, and their hash is looked up frequently
    /// while walking the chain.
    pub fn hash(&self) -> BlockHash {
        *self.hash.get_or_init(|| {
            let mut buf = Vec::new();
            self.encode(&mut buf);
            H256(keccak_hash(&buf))
        })
    }

    /// Whether this header's bloom filter could contain logs for `address`.
    /// A negative match is conclusive; a positive match still requires
    /// fetching the block's receipts to confirm.
    pub fn bloom_matches(&self, address: &Address) -> bool {
        self.logs_bloom.contains_input(ethereum_types::BloomInput::Raw(address.as_bytes()))
    }
}

impl RLPEncode for BlockHeader {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.parent_hash)
            .encode_field(&self.ommers_hash)
            .encode_field(&self.coinbase)
            .encode_field(&self.state_root)
            .encode_field(&self.transactions_root)
            .encode_field(&self.receipts_root)
            .encode_field(&self.logs_bloom)
            .encode_field(&self.difficulty)
            .encode_field(&self.number)
            .encode_field(&self.gas_limit)
            .encode_field(&self.gas_used)
            .encode_field(&self.timestamp)
            .encode_field(&self.extra_data)
            .encode_field(&self.nonce)
            .finish();
    }
}

impl RLPDecode for BlockHeader {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (parent_hash, decoder) = decoder.decode_field("parent_hash")?;
        let (ommers_hash, decoder) = decoder.decode_field("ommers_hash")?;
        let (coinbase, decoder) = decoder.decode_field("coinbase")?;
        let (state_root, decoder) = decoder.decode_field("state_root")?;
        let (transactions_root, decoder) = decoder.decode_field("transactions_root")?;
        let (receipts_root, decoder) = decoder.decode_field("receipts_root")?;
        let (logs_bloom, decoder) = decoder.decode_field("logs_bloom")?;
        let (difficulty, decoder) = decoder.decode_field("difficulty")?;
        let (number, decoder) = decoder.decode_field("number")?;
        let (gas_limit, decoder) = decoder.decode_field("gas_limit")?;
        let (gas_used, decoder) = decoder.decode_field("gas_used")?;
        let (timestamp, decoder) = decoder.decode_field("timestamp")?;
        let (extra_data, decoder) = decoder.decode_field("extra_data")?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let remaining = decoder.finish()?;

        let header = BlockHeader {
            parent_hash,
            ommers_hash,
            coinbase,
            state_root,
            transactions_root,
            receipts_root,
            logs_bloom,
            difficulty,
            number,
            gas_limit,
            gas_used,
            timestamp,
            extra_data,
            nonce,
            hash: OnceLock::new(),
        };
        Ok((header, remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(number: BlockNumber, parent_hash: BlockHash) -> BlockHeader {
        BlockHeader {
            parent_hash,
            ommers_hash: H256::zero(),
            coinbase: Address::zero(),
            state_root: H256::zero(),
            transactions_root: H256::zero(),
            receipts_root: H256::zero(),
            logs_bloom: Bloom::zero(),
            difficulty: U256::one(),
            number,
            gas_limit: 30_000_000,
            gas_used: 0,
            timestamp: 1_700_000_000 + number,
            extra_data: Bytes::new(),
            nonce: 0,
            hash: OnceLock::new(),
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let header = sample_header(1, H256::repeat_byte(0xaa));
        let mut buf = Vec::new();
        header.encode(&mut buf);

        let (decoded, rest) = BlockHeader::decode_unfinished(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, header);
    }

    #[test]
    fn hash_is_stable_across_calls() {
        let header = sample_header(5, H256::repeat_byte(0x11));
        assert_eq!(header.hash(), header.hash());
    }

    #[test]
    fn child_number_invariant_is_caller_enforced() {
        let parent = sample_header(10, H256::zero());
        let child = sample_header(11, parent.hash());
        assert_eq!(child.number, parent.number + 1);
        assert_eq!(child.parent_hash, parent.hash());
    }
}
