use crate::header::{BlockHash, BlockNumber};
use bytes::Bytes;
use ethereum_types::{Address, Signature, H256, U256};
use photon_crypto::keccak::keccak_hash;
use photon_rlp::decode::RLPDecode;
use photon_rlp::encode::RLPEncode;
use photon_rlp::error::RLPDecodeError;
use photon_rlp::structs::{Decoder, Encoder};

pub type TxHash = H256;

/// A transaction as tracked by the light client. Fields mirror a legacy
/// (pre-EIP-1559) signed transaction, since the chain being tracked is
/// account-based with proof-of-work-style semantics rather than a
/// fee-market upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub gas: u64,
    pub gas_price: U256,
    pub nonce: u64,
    pub data: Bytes,
    pub signature: Signature,
    pub status: TxStatus,
}

impl Transaction {
    /// Keccak256 over the signed fields (nonce, gasPrice, gas, to, value,
    /// data, v, r, s) — the transaction's content-addressed identity.
    pub fn hash(&self) -> TxHash {
        let mut buf = Vec::new();
        self.encode_signed_fields(&mut buf);
        H256(keccak_hash(&buf))
    }

    fn encode_signed_fields(&self, buf: &mut dyn bytes::BufMut) {
        // `to` follows the standard convention: an empty byte string means
        // contract creation, a 20-byte string an address. A trailing
        // optional field wouldn't work here since three more fields follow.
        let to_bytes: &[u8] = self.to.as_ref().map_or(&[], |addr| addr.as_bytes());
        Encoder::new(buf)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas)
            .encode_bytes(to_bytes)
            .encode_field(&self.value)
            .encode_field(&self.data)
            .encode_field(&self.signature)
            .finish();
    }
}

impl RLPEncode for Transaction {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        self.encode_signed_fields(buf);
    }
}

impl RLPDecode for Transaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (gas_price, decoder) = decoder.decode_field("gas_price")?;
        let (gas, decoder) = decoder.decode_field("gas")?;
        let (to_bytes, decoder) = decoder.decode_field::<Bytes>("to")?;
        let to = if to_bytes.is_empty() {
            None
        } else if to_bytes.len() == 20 {
            Some(Address::from_slice(&to_bytes))
        } else {
            return Err(RLPDecodeError::malformed_data());
        };
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let (signature, decoder) = decoder.decode_field("signature")?;
        let remaining = decoder.finish()?;

        // Wire transactions carry no sender field: the signer is recovered
        // from the signature once verification is in scope. Until then the
        // light client only round-trips what a peer actually sends.
        let tx = Transaction {
            from: Address::zero(),
            to,
            value,
            gas,
            gas_price,
            nonce,
            data,
            signature,
            status: TxStatus::Submitted,
        };
        Ok((tx, remaining))
    }
}

/// The stored, terminal-aware status of a tracked transaction.
///
/// `Unknown` deliberately has no variant here: it is a status the peer can
/// send over the wire, but the state machine in `photon-chain` remaps it
/// to the transaction's prior status before it is ever stored (see
/// [`ReceivedTxStatus`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Created,
    Signed,
    Submitted,
    Queued,
    Pending,
    Included {
        block_hash: BlockHash,
        block_number: BlockNumber,
        tx_index: u64,
        gas_used: u64,
    },
    Errored {
        reason: String,
    },
}

impl TxStatus {
    pub fn is_terminal_error(&self) -> bool {
        matches!(self, TxStatus::Errored { .. })
    }
}

/// A transaction status as received from a peer's GetTxStatuses response,
/// before the BCS engine's state-machine normalization in section 4.4.6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedTxStatus {
    Unknown,
    Queued,
    Pending,
    Included {
        block_hash: BlockHash,
        block_number: BlockNumber,
        tx_index: u64,
        gas_used: u64,
    },
    Errored {
        reason: String,
    },
}

const RECEIVED_UNKNOWN: u8 = 0;
const RECEIVED_QUEUED: u8 = 1;
const RECEIVED_PENDING: u8 = 2;
const RECEIVED_INCLUDED: u8 = 3;
const RECEIVED_ERRORED: u8 = 4;

impl RLPEncode for ReceivedTxStatus {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        match self {
            ReceivedTxStatus::Unknown => {
                Encoder::new(buf).encode_field(&RECEIVED_UNKNOWN).finish();
            }
            ReceivedTxStatus::Queued => {
                Encoder::new(buf).encode_field(&RECEIVED_QUEUED).finish();
            }
            ReceivedTxStatus::Pending => {
                Encoder::new(buf).encode_field(&RECEIVED_PENDING).finish();
            }
            ReceivedTxStatus::Included {
                block_hash,
                block_number,
                tx_index,
                gas_used,
            } => {
                Encoder::new(buf)
                    .encode_field(&RECEIVED_INCLUDED)
                    .encode_field(block_hash)
                    .encode_field(block_number)
                    .encode_field(tx_index)
                    .encode_field(gas_used)
                    .finish();
            }
            ReceivedTxStatus::Errored { reason } => {
                Encoder::new(buf)
                    .encode_field(&RECEIVED_ERRORED)
                    .encode_field(reason)
                    .finish();
            }
        }
    }
}

impl RLPDecode for ReceivedTxStatus {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (kind, decoder): (u8, _) = decoder.decode_field("kind")?;
        match kind {
            RECEIVED_UNKNOWN => Ok((ReceivedTxStatus::Unknown, decoder.finish()?)),
            RECEIVED_QUEUED => Ok((ReceivedTxStatus::Queued, decoder.finish()?)),
            RECEIVED_PENDING => Ok((ReceivedTxStatus::Pending, decoder.finish()?)),
            RECEIVED_INCLUDED => {
                let (block_hash, decoder) = decoder.decode_field("block_hash")?;
                let (block_number, decoder) = decoder.decode_field("block_number")?;
                let (tx_index, decoder) = decoder.decode_field("tx_index")?;
                let (gas_used, decoder) = decoder.decode_field("gas_used")?;
                let remaining = decoder.finish()?;
                Ok((
                    ReceivedTxStatus::Included {
                        block_hash,
                        block_number,
                        tx_index,
                        gas_used,
                    },
                    remaining,
                ))
            }
            RECEIVED_ERRORED => {
                let (reason, decoder) = decoder.decode_field("reason")?;
                let remaining = decoder.finish()?;
                Ok((ReceivedTxStatus::Errored { reason }, remaining))
            }
            _ => Err(RLPDecodeError::malformed_data()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_hash_is_stable() {
        let tx = Transaction {
            from: Address::repeat_byte(1),
            to: Some(Address::repeat_byte(2)),
            value: U256::from(100u64),
            gas: 21_000,
            gas_price: U256::from(1_000_000_000u64),
            nonce: 7,
            data: Bytes::new(),
            signature: Signature::zero(),
            status: TxStatus::Submitted,
        };
        assert_eq!(tx.hash(), tx.hash());
    }

    #[test]
    fn received_status_roundtrip_included() {
        let status = ReceivedTxStatus::Included {
            block_hash: H256::repeat_byte(0x9),
            block_number: 42,
            tx_index: 3,
            gas_used: 21_000,
        };
        let mut buf = Vec::new();
        status.encode(&mut buf);
        let (decoded, rest) = ReceivedTxStatus::decode_unfinished(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, status);
    }

    #[test]
    fn received_status_roundtrip_unknown() {
        let mut buf = Vec::new();
        ReceivedTxStatus::Unknown.encode(&mut buf);
        let (decoded, _) = ReceivedTxStatus::decode_unfinished(&buf).unwrap();
        assert_eq!(decoded, ReceivedTxStatus::Unknown);
    }
}
