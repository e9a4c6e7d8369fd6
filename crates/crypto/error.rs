/// Errors from cryptographic operations. Opaque on purpose: callers outside
/// this crate should not need to match on a specific backend library's error
/// type.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid recovery id")]
    InvalidRecoveryId,
    #[error("recovery failed")]
    RecoveryFailed,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("key derivation failed")]
    KeyDerivationFailed,
}
