//! Key derivation and key-exchange helpers used by the handshake and by
//! frame MAC computation. Grounded on the same primitives the wire protocol
//! has always used: SHA-256, HMAC-SHA256, ANSI-X9.63-style concat KDF, and
//! secp256k1 ECDH.

use k256::ecdh::diffie_hellman;
use k256::sha2::{Digest, Sha256};
use k256::{PublicKey, SecretKey};

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// HMAC-SHA256 over one or more input slices followed by a trailing
/// length/size field, as used to authenticate auth-ack messages.
pub fn sha256_hmac(key: &[u8], inputs: &[&[u8]], size_data: &[u8]) -> [u8; 32] {
    use hmac::Mac;

    let mut hasher =
        hmac::Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    for input in inputs {
        hasher.update(input);
    }
    hasher.update(size_data);
    hasher.finalize().into_bytes().into()
}

/// Elliptic-curve Diffie-Hellman over secp256k1, returning the 32-byte x
/// coordinate of the shared point.
pub fn ecdh_xchng(secret_key: &SecretKey, public_key: &PublicKey) -> [u8; 32] {
    diffie_hellman(secret_key.to_nonzero_scalar(), public_key.as_affine())
        .raw_secret_bytes()[..32]
        .try_into()
        .expect("raw_secret_bytes is always 32 bytes")
}

/// Concat KDF (NIST SP 800-56A, single-round SHA-256) used to derive the
/// AES and MAC keys from the ECDH shared secret during the handshake.
pub fn kdf(secret: &[u8], output: &mut [u8]) {
    concat_kdf::derive_key_into::<Sha256>(secret, &[], output)
        .expect("output buffer length is always within the KDF's supported range");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn ecdh_xchng_is_symmetric() {
        let a_sk = SecretKey::random(&mut OsRng);
        let b_sk = SecretKey::random(&mut OsRng);

        let a_sk_b_pk = ecdh_xchng(&a_sk, &b_sk.public_key());
        let b_sk_a_pk = ecdh_xchng(&b_sk, &a_sk.public_key());

        assert_eq!(a_sk_b_pk, b_sk_a_pk);
    }

    #[test]
    fn kdf_output_length_matches_buffer() {
        let secret = [7u8; 32];
        let mut out = [0u8; 32];
        kdf(&secret, &mut out);
        assert_ne!(out, [0u8; 32]);
    }
}
