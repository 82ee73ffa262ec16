//! Client side of the allow-list mint: contract reads and mints, wallet
//! session handling and the wallet-submission API.

pub mod abi;
pub mod config;
pub mod contract;
pub mod error;
pub mod mint_flow;
pub mod rpc;
pub mod submissions;
pub mod units;
pub mod wallet;

pub use abi::SaleState;
pub use config::{ChainConfig, MintList, MintingConfig};
pub use contract::{CollectionSnapshot, MintContract, ReceiptPolling, WalletMintStats};
pub use error::{Error, Result};
pub use mint_flow::{MintFlow, MintKind, MintQuantity, MintStatus};
pub use rpc::{EthApi, HttpProvider, Provider, RpcError};
pub use submissions::SubmissionClient;
pub use wallet::{NetworkParams, SessionAction, Subscription, WalletEvent, WalletSession};
