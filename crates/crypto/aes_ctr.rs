//! AES-256-CTR, used for both the handshake's ECIES payload encryption and
//! the per-frame stream ciphers established after the handshake completes.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};

pub type Aes256Ctr64BE = ctr::Ctr64BE<Aes256>;

/// Encrypts `data` in place with a fresh AES-256-CTR stream keyed by
/// `key`/`iv`. Since CTR mode is its own inverse, the same function
/// decrypts.
pub fn apply_keystream(key: &[u8; 32], iv: &[u8; 16], data: &mut [u8]) {
    let mut cipher = Aes256Ctr64BE::new(key.into(), iv.into());
    cipher.apply_keystream(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_recovers_plaintext() {
        let key = [9u8; 32];
        let iv = [3u8; 16];
        let plaintext = b"the quick brown fox".to_vec();

        let mut buf = plaintext.clone();
        apply_keystream(&key, &iv, &mut buf);
        assert_ne!(buf, plaintext);

        apply_keystream(&key, &iv, &mut buf);
        assert_eq!(buf, plaintext);
    }
}
