use std::path::PathBuf;

use alloy_primitives::B256;
use alloy_sol_types::{Panic, Revert, SolError};
use thiserror::Error;

use crate::rpc::{RpcError, USER_REJECTED};

pub const MINT_FALLBACK_MESSAGE: &str = "Minting failed";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("Failed to decode {call} output: {reason}")]
    Decode { call: &'static str, reason: String },

    #[error("Unknown sale state {0}")]
    UnknownSaleState(u8),

    #[error("Transaction {0} reverted")]
    Reverted(B256),

    #[error("Timed out waiting for transaction {0}")]
    ReceiptTimeout(B256),

    #[error("Please install MetaMask or another Web3 wallet")]
    NoWallet,

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Wrong network: expected chain {expected}, wallet is on {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    /// A pre-flight check refused the mint before anything was sent.
    #[error("{0}")]
    Ineligible(String),

    #[error("{0}")]
    Submission(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Short text suitable for a status line.
    pub fn user_message(&self) -> String {
        match self {
            Error::Rpc(rpc) if rpc.code() == Some(USER_REJECTED) => {
                "Transaction rejected in wallet".to_string()
            }
            Error::Rpc(rpc) => rpc
                .revert_data()
                .and_then(|data| decode_revert(&data))
                .or_else(|| match rpc {
                    RpcError::Rpc { message, .. } if message.trim().is_empty() => None,
                    RpcError::Rpc { message, .. } => Some(message.trim().to_string()),
                    other => Some(other.to_string()),
                })
                .unwrap_or_else(|| MINT_FALLBACK_MESSAGE.to_string()),
            Error::WrongNetwork { expected, .. } => {
                format!("Please switch your wallet to chain {expected} before minting")
            }
            other => {
                let message = other.to_string();
                if message.trim().is_empty() {
                    MINT_FALLBACK_MESSAGE.to_string()
                } else {
                    message
                }
            }
        }
    }
}

/// Decode `Error(string)` and `Panic(uint256)` revert payloads.
pub fn decode_revert(data: &[u8]) -> Option<String> {
    if let Ok(revert) = Revert::abi_decode(data, true) {
        return Some(revert.reason);
    }
    if let Ok(panic) = Panic::abi_decode(data, true) {
        return Some(format!("Panic code {:#x}", panic.code));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use serde_json::json;

    fn revert_payload(reason: &str) -> Vec<u8> {
        Revert {
            reason: reason.to_string(),
        }
        .abi_encode()
    }

    #[test]
    fn decodes_error_string() {
        let data = revert_payload("Sale not active");
        assert_eq!(&data[..4], &[0x08, 0xc3, 0x79, 0xa0]);
        assert_eq!(decode_revert(&data).as_deref(), Some("Sale not active"));
    }

    #[test]
    fn decodes_panic_code() {
        let data = Panic {
            code: U256::from(0x11u64),
        }
        .abi_encode();
        assert_eq!(&data[..4], &[0x4e, 0x48, 0x7b, 0x71]);
        assert_eq!(decode_revert(&data).as_deref(), Some("Panic code 0x11"));
    }

    #[test]
    fn unknown_payload_is_not_decoded() {
        assert!(decode_revert(&[0xde, 0xad, 0xbe, 0xef]).is_none());
        assert!(decode_revert(&[]).is_none());
    }

    #[test]
    fn wallet_rejection_is_named() {
        let err = Error::Rpc(RpcError::Rpc {
            code: USER_REJECTED,
            message: "User denied transaction signature".into(),
            data: None,
        });
        assert_eq!(err.user_message(), "Transaction rejected in wallet");
    }

    #[test]
    fn revert_reason_wins_over_message() {
        let data = alloy_primitives::hex::encode_prefixed(revert_payload("Exceeds wallet limit"));
        let err = Error::Rpc(RpcError::Rpc {
            code: 3,
            message: "execution reverted".into(),
            data: Some(json!(data)),
        });
        assert_eq!(err.user_message(), "Exceeds wallet limit");
    }

    #[test]
    fn raw_message_is_used_without_revert_data() {
        let err = Error::Rpc(RpcError::Rpc {
            code: -32000,
            message: "insufficient funds for gas * price + value".into(),
            data: None,
        });
        assert_eq!(
            err.user_message(),
            "insufficient funds for gas * price + value"
        );
    }

    #[test]
    fn empty_messages_fall_back() {
        assert_eq!(Error::Ineligible(String::new()).user_message(), MINT_FALLBACK_MESSAGE);
        let silent = Error::Rpc(RpcError::Rpc {
            code: -32603,
            message: " ".into(),
            data: None,
        });
        assert_eq!(silent.user_message(), MINT_FALLBACK_MESSAGE);
        assert!(Error::WrongNetwork {
            expected: 11124,
            actual: 1
        }
        .user_message()
        .contains("11124"));
    }
}
