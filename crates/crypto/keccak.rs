use ethereum_types::{H256, H512};
use sha3::{Digest, Keccak256};

/// Keccak256 of an arbitrary byte slice.
pub fn keccak_hash(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Node identifier: Keccak256 of a 64-byte uncompressed public key (no `0x04` prefix).
pub fn node_id(public_key: &H512) -> H256 {
    H256(keccak_hash(public_key.as_bytes()))
}
