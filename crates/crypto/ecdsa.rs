//! secp256k1 signing and recovery, plus the public-key encoding conventions
//! the wire protocol uses (64-byte uncompressed, no leading `0x04` tag).

use crate::error::CryptoError;
use ethereum_types::H512;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{EncodedPoint, PublicKey};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, SecretKey, SECP256K1};

/// Signs a 32-byte message digest, returning a 64-byte compact signature
/// and its recovery id.
pub fn sign(secret_key: &SecretKey, digest: &[u8; 32]) -> ([u8; 64], RecoveryId) {
    let message = Message::from_digest(*digest);
    let (recovery_id, signature) = SECP256K1
        .sign_ecdsa_recoverable(&message, secret_key)
        .serialize_compact();
    (signature, recovery_id)
}

/// Recovers the 64-byte uncompressed public key (no tag byte) that produced
/// a given compact signature over a 32-byte digest.
pub fn recover(
    sig: &[u8; 64],
    recovery_id: RecoveryId,
    digest: &[u8; 32],
) -> Result<H512, CryptoError> {
    let recoverable = RecoverableSignature::from_compact(sig, recovery_id)
        .map_err(|_| CryptoError::InvalidSignature)?;
    let message = Message::from_digest(*digest);
    let public_key = SECP256K1
        .recover_ecdsa(&message, &recoverable)
        .map_err(|_| CryptoError::RecoveryFailed)?;

    Ok(H512::from_slice(&public_key.serialize_uncompressed()[1..]))
}

/// Decompresses a `k256` public key to the wire's 64-byte convention.
pub fn decompress_pubkey(pk: &PublicKey) -> H512 {
    let encoded = pk.to_encoded_point(false);
    let bytes = encoded.as_bytes();
    debug_assert_eq!(bytes[0], 4);
    H512::from_slice(&bytes[1..])
}

/// Inverse of [`decompress_pubkey`]: parses a 64-byte uncompressed public
/// key back into a `k256::PublicKey`.
pub fn compress_pubkey(pk: H512) -> Result<PublicKey, CryptoError> {
    let point = EncodedPoint::from_untagged_bytes(&pk.0.into());
    PublicKey::from_encoded_point(&point)
        .into_option()
        .ok_or(CryptoError::InvalidPublicKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn sign_and_recover_roundtrip() {
        let secret_key = SecretKey::new(&mut OsRng);
        let public_key = secret_key.public_key(SECP256K1);
        let digest = [42u8; 32];

        let (sig, recid) = sign(&secret_key, &digest);
        let recovered = recover(&sig, recid, &digest).unwrap();

        let expected = H512::from_slice(&public_key.serialize_uncompressed()[1..]);
        assert_eq!(recovered, expected);
    }

    #[test]
    fn compress_decompress_pubkey_roundtrip() {
        use rand::rngs::OsRng as K256OsRng;

        let sk = k256::SecretKey::random(&mut K256OsRng);
        let pk = sk.public_key();
        let id = decompress_pubkey(&pk);
        let pk2 = compress_pubkey(id).unwrap();
        assert_eq!(pk, pk2);
    }
}
