use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use allowlist_common::{hex_to_bytes32, Address};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_CHAIN_ID: u64 = 11124;
pub const DEFAULT_CHAIN_NAME: &str = "Abstract Testnet";
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_MINTING_CONFIG: &str = "config/mintingConfig.json";

/// Target chain and service endpoints for the mint client.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    pub explorer_url: Option<String>,
    /// Overrides `contract.address` from the minting config when set.
    pub contract_address: Option<Address>,
    pub api_base_url: String,
    pub minting_config: PathBuf,
}

impl ChainConfig {
    pub fn from_env() -> Result<Self> {
        let chain_id = env::var("CHAIN_ID")
            .ok()
            .and_then(|id| id.parse().ok())
            .unwrap_or(DEFAULT_CHAIN_ID);

        let contract_address = match env::var("CONTRACT_ADDRESS") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                Address::parse_strict(&raw)
                    .map_err(|e| Error::Config(format!("CONTRACT_ADDRESS {raw:?}: {e}")))?,
            ),
            _ => None,
        };

        Ok(Self {
            chain_id,
            chain_name: env::var("CHAIN_NAME").unwrap_or_else(|_| DEFAULT_CHAIN_NAME.to_string()),
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            explorer_url: env::var("EXPLORER_URL").ok().filter(|url| !url.is_empty()),
            contract_address,
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            minting_config: env::var("MINTING_CONFIG")
                .unwrap_or_else(|_| DEFAULT_MINTING_CONFIG.to_string())
                .into(),
        })
    }

    /// Explorer link for a transaction, when an explorer is configured.
    pub fn transaction_url(&self, tx_hash: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            chain_name: DEFAULT_CHAIN_NAME.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            explorer_url: None,
            contract_address: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            minting_config: DEFAULT_MINTING_CONFIG.into(),
        }
    }
}

/// Which list in `mintingConfig.json` an entry comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintList {
    Whitelist,
    FreeMint,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintingConfig {
    #[serde(default)]
    pub contract: ContractSection,
    #[serde(default)]
    pub lists: MintLists,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSection {
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintLists {
    #[serde(default)]
    pub whitelist: Vec<ListEntry>,
    #[serde(default, rename = "freeMint")]
    pub free_mint: Vec<ListEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub address: String,
    #[serde(default, rename = "merkleProof")]
    pub merkle_proof: Vec<String>,
}

impl ListEntry {
    pub fn proof(&self) -> Result<Vec<[u8; 32]>> {
        self.merkle_proof
            .iter()
            .map(|node| {
                hex_to_bytes32(node).map_err(|e| {
                    Error::Config(format!("bad proof node for {}: {e}", self.address))
                })
            })
            .collect()
    }
}

impl MintingConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&raw)?;
        tracing::debug!("Loaded minting config from {}", path.display());
        Ok(config)
    }

    /// Missing file means "no lists", not an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Minting config {} not found, lists are empty", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn contract_address(&self) -> Result<Option<Address>> {
        match self.contract.address.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => Address::parse_strict(raw)
                .map(Some)
                .map_err(|e| Error::Config(format!("contract.address {raw:?}: {e}"))),
        }
    }

    /// Case-insensitive lookup of `account` in one of the lists.
    pub fn entry(&self, list: MintList, account: &Address) -> Option<&ListEntry> {
        let entries = match list {
            MintList::Whitelist => &self.lists.whitelist,
            MintList::FreeMint => &self.lists.free_mint,
        };
        let wanted = account.to_lower_hex();
        entries
            .iter()
            .find(|entry| entry.address.trim().eq_ignore_ascii_case(&wanted))
    }

    /// The entry's decoded proof, or `None` when absent or empty.
    pub fn proof_for(&self, list: MintList, account: &Address) -> Result<Option<Vec<[u8; 32]>>> {
        match self.entry(list, account) {
            Some(entry) if !entry.merkle_proof.is_empty() => entry.proof().map(Some),
            _ => Ok(None),
        }
    }
}
