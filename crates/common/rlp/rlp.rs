//! # photon-rlp
//!
//! Recursive Length Prefix (RLP) encoding and decoding for the photon light client.
//!
//! RLP is the wire serialization format used throughout the peer protocol: frame
//! payloads, block headers, transactions and discovery packets are all RLP lists
//! under the hood.
//!
//! ## Quick Start
//!
//! ```rust
//! use photon_rlp::encode::RLPEncode;
//! use photon_rlp::decode::RLPDecode;
//!
//! let value: u64 = 42;
//! let encoded = value.encode_to_vec();
//! let decoded = u64::decode(&encoded).unwrap();
//! assert_eq!(value, decoded);
//! ```
//!
//! ## Builder structs
//!
//! For struct types, use the field-by-field builders:
//!
//! - [`structs::Encoder`]
//! - [`structs::Decoder`]

pub mod constants;
pub mod decode;
pub mod encode;
pub mod error;
pub mod structs;
