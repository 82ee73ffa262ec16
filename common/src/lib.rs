//! Shared allow-list utilities for the offline generator and the mint client
//!
//! The leaf and pair hashing here mirrors the collection contract's on-chain
//! verifier, so a root built by `whitelist build` is the root the contract
//! checks `whitelistMint`/`freeMint` proofs against.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod address;
pub mod allowlist;
pub mod merkle;

pub use address::{normalize_addresses, Address, AddressError};
pub use allowlist::{AllowList, AllowListEntry};
pub use merkle::{hash_leaf, hash_pair, verify_proof, MerkleError, MerkleTree};

use alloc::string::String;
use core::fmt;

/// Convert hex string to 32-byte array.
/// Accepts an optional `0x` prefix and either letter case.
pub fn hex_to_bytes32(hex_str: &str) -> Result<[u8; 32], HexError> {
    let hex_clean = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    if hex_clean.len() != 64 {
        return Err(HexError::InvalidLength(hex_clean.len()));
    }

    let mut bytes = [0u8; 32];
    hex::decode_to_slice(hex_clean, &mut bytes).map_err(|_| HexError::InvalidCharacter)?;
    Ok(bytes)
}

/// Lower-case `0x`-prefixed rendering used in JSON files and RPC payloads.
pub fn bytes32_to_hex(bytes: &[u8; 32]) -> String {
    let mut out = String::with_capacity(66);
    out.push_str("0x");
    out.push_str(&hex::encode(bytes));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexError {
    InvalidLength(usize),
    InvalidCharacter,
}

impl fmt::Display for HexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HexError::InvalidLength(len) => {
                write!(f, "expected 64 hex characters, got {len}")
            }
            HexError::InvalidCharacter => write!(f, "invalid hex character"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HexError {}
