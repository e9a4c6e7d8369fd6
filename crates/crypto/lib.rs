//! Cryptographic primitives used by the wire protocol: Keccak256 hashing,
//! secp256k1 signing/recovery and ECDH, the RLPx key derivation function,
//! and AES-256-CTR stream encryption for frame bodies.
//!
//! This crate only covers what the peer-to-peer transport needs. It does
//! not implement any EVM precompile (BN254, BLS12-381, KZG, modexp, ...) —
//! there is no EVM in this tree.

pub mod aes_ctr;
pub mod ecdsa;
pub mod error;
pub mod kdf;
pub mod keccak;

pub use error::CryptoError;
