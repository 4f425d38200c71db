//! # fugue-crypto
//!
//! Keccak-256 hashing for the Fugue VM.
//!
//! The interpreter consumes this as an opaque collaborator: an
//! arbitrary-length byte slice in, one 256-bit digest out.

#![warn(missing_docs)]
#![warn(clippy::all)]

use fugue_primitives::U256;
use sha3::{Digest, Keccak256};

/// Compute the Keccak-256 hash of the input data
pub fn keccak256(data: &[u8]) -> U256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let digest: [u8; 32] = hasher.finalize().into();
    U256::from_be_bytes(digest)
}
