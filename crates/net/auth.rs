//! ECIES handshake: the auth/ack exchange that precedes frame encryption
//! on every RLPx TCP connection. Initiator and recipient run mirrored
//! steps (see [`initiate`]/[`complete_initiator`] vs [`respond`]) and end
//! up with the same [`FrameCoder`] keying material, derived the way every
//! ÐΞVp2p client does: ephemeral ECDH, then a concat KDF over the shared
//! secret salted with both nonces.

use crate::error::{PeerError, ProtocolErrorReason};
use crate::frame::FrameCoder;
use bytes::BufMut;
use ethereum_types::H512;
use photon_crypto::aes_ctr::Aes256Ctr64BE;
use photon_crypto::ecdsa;
use photon_crypto::kdf::{ecdh_xchng, kdf, sha256_hmac};
use photon_crypto::keccak::keccak_hash;
use photon_rlp::error::RLPDecodeError;
use photon_rlp::structs::{Decoder, Encoder};
use rand::rngs::OsRng;
use rand::RngCore;
use sha3::{Digest, Keccak256};

const AUTH_VERSION: u8 = 4;

#[derive(Debug, Clone)]
pub struct AuthMessage {
    pub signature: [u8; 65],
    pub initiator_pubkey: H512,
    pub initiator_nonce: [u8; 32],
    pub version: u8,
}

impl AuthMessage {
    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_bytes(&self.signature)
            .encode_field(&self.initiator_pubkey)
            .encode_bytes(&self.initiator_nonce)
            .encode_field(&self.version)
            .finish();
    }

    pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (signature_bytes, decoder) = decoder.decode_field::<bytes::Bytes>("signature")?;
        let (initiator_pubkey, decoder) = decoder.decode_field("initiator_pubkey")?;
        let (nonce_bytes, decoder) = decoder.decode_field::<bytes::Bytes>("initiator_nonce")?;
        let (version, decoder) = decoder.decode_field("version")?;
        let _ = decoder.finish_unchecked();

        let signature = signature_bytes
            .as_ref()
            .try_into()
            .map_err(|_| RLPDecodeError::malformed_data())?;
        let initiator_nonce = nonce_bytes
            .as_ref()
            .try_into()
            .map_err(|_| RLPDecodeError::malformed_data())?;
        Ok(AuthMessage {
            signature,
            initiator_pubkey,
            initiator_nonce,
            version,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AckMessage {
    pub recipient_ephemeral_pubkey: H512,
    pub recipient_nonce: [u8; 32],
    pub version: u8,
}

impl AckMessage {
    pub fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.recipient_ephemeral_pubkey)
            .encode_bytes(&self.recipient_nonce)
            .encode_field(&self.version)
            .finish();
    }

    pub fn decode(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let decoder = Decoder::new(data)?;
        let (recipient_ephemeral_pubkey, decoder) = decoder.decode_field("recipient_ephemeral_pubkey")?;
        let (nonce_bytes, decoder) = decoder.decode_field::<bytes::Bytes>("recipient_nonce")?;
        let (version, decoder) = decoder.decode_field("version")?;
        let _ = decoder.finish_unchecked();

        let recipient_nonce = nonce_bytes
            .as_ref()
            .try_into()
            .map_err(|_| RLPDecodeError::malformed_data())?;
        Ok(AckMessage {
            recipient_ephemeral_pubkey,
            recipient_nonce,
            version,
        })
    }
}

/// State an initiator keeps between sending auth and receiving ack.
pub struct AuthInitiatorState {
    static_secret_key: secp256k1::SecretKey,
    remote_public_key: H512,
    ephemeral_secret_key: secp256k1::SecretKey,
    initiator_nonce: [u8; 32],
    auth_packet: Vec<u8>,
}

/// Builds and ECIES-encrypts the auth message an initiator sends first.
/// Returns the packet to write to the socket plus the state needed to
/// process the recipient's ack.
pub fn initiate(
    static_secret_key: secp256k1::SecretKey,
    remote_public_key: H512,
) -> Result<(AuthInitiatorState, Vec<u8>), PeerError> {
    let mut initiator_nonce = [0u8; 32];
    OsRng.fill_bytes(&mut initiator_nonce);

    let ephemeral_secret_key = secp256k1::SecretKey::new(&mut OsRng);

    let static_shared_secret = static_ecdh(&static_secret_key, &remote_public_key)?;
    let to_sign = xor32(&static_shared_secret, &initiator_nonce);
    let (signature, recovery_id) = ecdsa::sign(&ephemeral_secret_key, &to_sign);
    let mut signature_with_recovery = [0u8; 65];
    signature_with_recovery[..64].copy_from_slice(&signature);
    signature_with_recovery[64] = recovery_id.to_i32() as u8;

    let initiator_pubkey =
        ecdsa::decompress_pubkey(&static_secret_key.public_key(secp256k1::SECP256K1));

    let auth = AuthMessage {
        signature: signature_with_recovery,
        initiator_pubkey,
        initiator_nonce,
        version: AUTH_VERSION,
    };
    let mut body = Vec::new();
    auth.encode(&mut body);

    let auth_packet = ecies_encrypt(&remote_public_key, &body)?;

    let state = AuthInitiatorState {
        static_secret_key,
        remote_public_key,
        ephemeral_secret_key,
        initiator_nonce,
        auth_packet: auth_packet.clone(),
    };
    Ok((state, auth_packet))
}

/// Decrypts the recipient's ack packet and derives the shared [`FrameCoder`].
pub fn complete_initiator(
    state: AuthInitiatorState,
    ack_packet: &[u8],
) -> Result<FrameCoder, PeerError> {
    let body = ecies_decrypt(&state.static_secret_key, ack_packet)?;
    let ack = AckMessage::decode(&body)?;

    let ephemeral_shared_secret = ecdh_with_wire_pubkey(
        &state.ephemeral_secret_key,
        &ack.recipient_ephemeral_pubkey,
    )?;

    Ok(derive_frame_coder(
        &ephemeral_shared_secret,
        &ack.recipient_nonce,
        &state.initiator_nonce,
        &state.auth_packet,
        ack_packet,
        true,
    ))
}

/// Decrypts an inbound auth packet, builds and ECIES-encrypts this node's
/// ack, and derives the shared [`FrameCoder`]. Returns the remote node's
/// static public key (needed to record who connected) alongside the ack
/// packet to send and the coder.
pub fn respond(
    static_secret_key: &secp256k1::SecretKey,
    auth_packet: &[u8],
) -> Result<(H512, Vec<u8>, FrameCoder), PeerError> {
    let body = ecies_decrypt(static_secret_key, auth_packet)?;
    let auth = AuthMessage::decode(&body)?;

    let mut recipient_nonce = [0u8; 32];
    OsRng.fill_bytes(&mut recipient_nonce);
    let ephemeral_secret_key = secp256k1::SecretKey::new(&mut OsRng);
    let recipient_ephemeral_pubkey =
        ecdsa::decompress_pubkey(&ephemeral_secret_key.public_key(secp256k1::SECP256K1));

    let ack = AckMessage {
        recipient_ephemeral_pubkey,
        recipient_nonce,
        version: AUTH_VERSION,
    };
    let mut ack_body = Vec::new();
    ack.encode(&mut ack_body);
    let ack_packet = ecies_encrypt(&auth.initiator_pubkey, &ack_body)?;

    let static_shared_secret = static_ecdh(static_secret_key, &auth.initiator_pubkey)?;
    let to_verify = xor32(&static_shared_secret, &auth.initiator_nonce);
    let recovery_id = secp256k1::ecdsa::RecoveryId::from_i32(auth.signature[64] as i32)
        .map_err(|_| PeerError::Protocol(ProtocolErrorReason::TcpAuthentication))?;
    let sig: [u8; 64] = auth.signature[..64]
        .try_into()
        .map_err(|_| PeerError::Protocol(ProtocolErrorReason::TcpAuthentication))?;
    let remote_ephemeral_pubkey = ecdsa::recover(&sig, recovery_id, &to_verify)
        .map_err(|_| PeerError::Protocol(ProtocolErrorReason::TcpAuthentication))?;

    let ephemeral_shared_secret =
        ecdh_with_wire_pubkey(&ephemeral_secret_key, &remote_ephemeral_pubkey)?;

    let coder = derive_frame_coder(
        &ephemeral_shared_secret,
        &recipient_nonce,
        &auth.initiator_nonce,
        auth_packet,
        &ack_packet,
        false,
    );

    Ok((auth.initiator_pubkey, ack_packet, coder))
}

/// Derives the MAC key, both AES-256-CTR stream ciphers, and the seeded
/// running Keccak256 MAC states from the ephemeral shared secret and the
/// two nonces exchanged during auth/ack, following the RLPx handshake's
/// established key schedule.
fn derive_frame_coder(
    ephemeral_shared_secret: &[u8; 32],
    recipient_nonce: &[u8; 32],
    initiator_nonce: &[u8; 32],
    auth_packet: &[u8],
    ack_packet: &[u8],
    is_initiator: bool,
) -> FrameCoder {
    let nonce_hash = keccak_hash(&[recipient_nonce.as_slice(), initiator_nonce.as_slice()].concat());
    let shared_secret = keccak_hash(&[ephemeral_shared_secret.as_slice(), &nonce_hash].concat());
    let aes_secret = keccak_hash(&[ephemeral_shared_secret.as_slice(), &shared_secret].concat());
    let mac_secret = keccak_hash(&[ephemeral_shared_secret.as_slice(), &aes_secret].concat());

    let iv = [0u8; 16];
    let egress_aes = new_aes256_ctr(&aes_secret, &iv);
    let ingress_aes = new_aes256_ctr(&aes_secret, &iv);

    let (egress_mac, ingress_mac) = if is_initiator {
        (
            seed_mac(&mac_secret, recipient_nonce, auth_packet),
            seed_mac(&mac_secret, initiator_nonce, ack_packet),
        )
    } else {
        (
            seed_mac(&mac_secret, initiator_nonce, ack_packet),
            seed_mac(&mac_secret, recipient_nonce, auth_packet),
        )
    };

    FrameCoder::new(mac_secret, egress_aes, ingress_aes, egress_mac, ingress_mac)
}

fn new_aes256_ctr(key: &[u8; 32], iv: &[u8; 16]) -> Aes256Ctr64BE {
    use aes::cipher::KeyIvInit;
    Aes256Ctr64BE::new(key.into(), iv.into())
}

/// Seeds one direction's running MAC: `keccak(mac_secret ^ nonce) || packet`,
/// matching the scheme every RLPx implementation uses to bind the MAC
/// state to both the handshake nonces and the exact bytes exchanged.
fn seed_mac(mac_secret: &[u8; 32], nonce: &[u8; 32], packet: &[u8]) -> Keccak256 {
    let seed = xor32(mac_secret, nonce);
    let mut mac = Keccak256::new();
    mac.update(seed);
    mac.update(packet);
    mac
}

fn xor32(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = a[i] ^ b[i];
    }
    out
}

fn static_ecdh(
    secret_key: &secp256k1::SecretKey,
    remote_public_key: &H512,
) -> Result<[u8; 32], PeerError> {
    let k256_secret = k256::SecretKey::from_slice(&secret_key.secret_bytes())
        .map_err(|_| PeerError::Protocol(ProtocolErrorReason::TcpAuthentication))?;
    let remote = ecdsa::compress_pubkey(*remote_public_key)
        .map_err(|_| PeerError::Protocol(ProtocolErrorReason::TcpAuthentication))?;
    Ok(ecdh_xchng(&k256_secret, &remote))
}

fn ecdh_with_wire_pubkey(
    secret_key: &secp256k1::SecretKey,
    remote_public_key: &H512,
) -> Result<[u8; 32], PeerError> {
    static_ecdh(secret_key, remote_public_key)
}

/// ECIES-encrypts `plaintext` for `recipient_public_key`: generates a fresh
/// ephemeral key, derives AES/MAC keys via the concat KDF over the ECDH
/// shared secret, and returns `ephemeral-pubkey || iv || ciphertext || tag`.
fn ecies_encrypt(recipient_public_key: &H512, plaintext: &[u8]) -> Result<Vec<u8>, PeerError> {
    let ephemeral_secret_key = secp256k1::SecretKey::new(&mut OsRng);
    let ephemeral_pubkey =
        ecdsa::decompress_pubkey(&ephemeral_secret_key.public_key(secp256k1::SECP256K1));

    let shared_secret = static_ecdh(&ephemeral_secret_key, recipient_public_key)?;

    let mut derived = [0u8; 32];
    kdf(&shared_secret, &mut derived);
    let aes_key: [u8; 16] = derived[..16]
        .try_into()
        .map_err(|_| PeerError::Protocol(ProtocolErrorReason::TcpAuthentication))?;
    let mac_key = sha256_hmac(&derived[16..], &[], &[]);

    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut iv);

    let mut ciphertext = plaintext.to_vec();
    aes128_keystream(&aes_key, &iv, &mut ciphertext);

    let tag = sha256_hmac(&mac_key, &[&iv, &ciphertext], &[]);

    let mut out = Vec::with_capacity(65 + 16 + ciphertext.len() + 32);
    out.push(0x04);
    out.extend_from_slice(ephemeral_pubkey.as_bytes());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&tag);
    Ok(out)
}

fn ecies_decrypt(secret_key: &secp256k1::SecretKey, data: &[u8]) -> Result<Vec<u8>, PeerError> {
    if data.len() < 1 + 64 + 16 + 32 {
        return Err(PeerError::Protocol(ProtocolErrorReason::TcpAuthentication));
    }
    let (tag_byte, rest) = data.split_at(1);
    if tag_byte[0] != 0x04 {
        return Err(PeerError::Protocol(ProtocolErrorReason::TcpAuthentication));
    }
    let (ephemeral_pubkey_bytes, rest) = rest.split_at(64);
    let (iv, rest) = rest.split_at(16);
    let (ciphertext, mac_tag) = rest.split_at(rest.len() - 32);

    let ephemeral_pubkey = H512::from_slice(ephemeral_pubkey_bytes);
    let shared_secret = static_ecdh(secret_key, &ephemeral_pubkey)?;

    let mut derived = [0u8; 32];
    kdf(&shared_secret, &mut derived);
    let aes_key: [u8; 16] = derived[..16]
        .try_into()
        .map_err(|_| PeerError::Protocol(ProtocolErrorReason::TcpAuthentication))?;
    let mac_key = sha256_hmac(&derived[16..], &[], &[]);

    let expected_tag = sha256_hmac(&mac_key, &[iv, ciphertext], &[]);
    if expected_tag != mac_tag {
        return Err(PeerError::Protocol(ProtocolErrorReason::TcpAuthentication));
    }

    let mut plaintext = ciphertext.to_vec();
    let iv_arr: [u8; 16] = iv.try_into().unwrap();
    aes128_keystream(&aes_key, &iv_arr, &mut plaintext);
    Ok(plaintext)
}

fn aes128_keystream(key: &[u8; 16], iv: &[u8; 16], data: &mut [u8]) {
    use aes::cipher::{KeyIvInit, StreamCipher};
    let mut cipher = ctr::Ctr64BE::<aes::Aes128>::new(key.into(), iv.into());
    cipher.apply_keystream(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_derives_matching_frame_coders() {
        let initiator_static = secp256k1::SecretKey::new(&mut OsRng);
        let recipient_static = secp256k1::SecretKey::new(&mut OsRng);
        let recipient_public =
            ecdsa::decompress_pubkey(&recipient_static.public_key(secp256k1::SECP256K1));

        let (initiator_state, auth_packet) =
            initiate(initiator_static, recipient_public).unwrap();

        let (_remote_pubkey, ack_packet, mut recipient_coder) =
            respond(&recipient_static, &auth_packet).unwrap();

        let mut initiator_coder = complete_initiator(initiator_state, &ack_packet).unwrap();

        let plaintext = b"\x00hello from initiator".to_vec();
        let frame = initiator_coder.encrypt(&plaintext).unwrap();

        let mut header_buf = [0u8; 16];
        header_buf.copy_from_slice(&frame[..16]);
        let frame_size = recipient_coder.decrypt_header(&header_buf).unwrap();
        let decrypted = recipient_coder
            .decrypt_frame(frame_size, &frame[32..])
            .unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn ecies_roundtrip() {
        let secret_key = secp256k1::SecretKey::new(&mut OsRng);
        let public_key = ecdsa::decompress_pubkey(&secret_key.public_key(secp256k1::SECP256K1));

        let plaintext = b"auth body placeholder".to_vec();
        let packet = ecies_encrypt(&public_key, &plaintext).unwrap();
        let decrypted = ecies_decrypt(&secret_key, &packet).unwrap();
        assert_eq!(decrypted, plaintext);
    }
}
