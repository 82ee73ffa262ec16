use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use allowlist_common::{bytes32_to_hex, hex_to_bytes32, Address, AllowList};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// `whitelist.json`: root plus lower-case address -> proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistFile {
    pub merkle_root: String,
    pub whitelist: BTreeMap<String, Vec<String>>,
}

impl WhitelistFile {
    pub fn from_allow_list(list: &AllowList) -> Self {
        let whitelist = list
            .entries()
            .into_iter()
            .map(|entry| {
                let proof = entry.proof.iter().map(bytes32_to_hex).collect();
                (entry.address.to_lower_hex(), proof)
            })
            .collect();

        Self {
            merkle_root: bytes32_to_hex(&list.root()),
            whitelist,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid whitelist file {}", path.display()))
    }

    pub fn root(&self) -> Result<[u8; 32]> {
        hex_to_bytes32(&self.merkle_root)
            .map_err(|e| anyhow::anyhow!("Invalid merkleRoot {:?}: {e}", self.merkle_root))
    }

    pub fn proof_for(&self, address: &Address) -> Result<Option<Vec<[u8; 32]>>> {
        let Some(nodes) = self.whitelist.get(&address.to_lower_hex()) else {
            return Ok(None);
        };
        nodes
            .iter()
            .map(|node| {
                hex_to_bytes32(node).map_err(|e| anyhow::anyhow!("Invalid proof node {node:?}: {e}"))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

/// Write to `<path>.tmp`, flush, then rename over `path`.
pub fn write_file_atomic(path: &Path, contents: &str) -> Result<()> {
    let temp_path = temp_path_for(path);
    let mut file = File::create(&temp_path).context("Failed to create temp file")?;
    file.write_all(contents.as_bytes())
        .context("Failed to write to temp file")?;
    file.flush().context("Failed to flush temp file")?;
    fs::rename(&temp_path, path).context("Failed to move temp file to output")?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Replace one list of a minting config with `list`'s entries, keeping
/// every other key of the file as it was. Creates the file if missing.
pub fn merge_into_minting_config(
    path: &Path,
    list_key: &str,
    list: &AllowList,
    contract: Option<&Address>,
) -> Result<()> {
    let mut config = if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str::<Value>(&raw)
            .with_context(|| format!("Invalid minting config {}", path.display()))?
    } else {
        Value::Object(Map::new())
    };

    let Some(root) = config.as_object_mut() else {
        bail!("Minting config {} is not a JSON object", path.display());
    };

    let entries: Vec<Value> = list
        .entries()
        .into_iter()
        .map(|entry| {
            json!({
                "address": entry.address.to_lower_hex(),
                "merkleProof": entry.proof.iter().map(bytes32_to_hex).collect::<Vec<_>>(),
            })
        })
        .collect();

    let lists = root
        .entry("lists")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(lists) = lists.as_object_mut() else {
        bail!("`lists` in {} is not a JSON object", path.display());
    };
    lists.insert(list_key.to_string(), Value::Array(entries));

    if let Some(contract) = contract {
        let section = root
            .entry("contract")
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(section) = section.as_object_mut() else {
            bail!("`contract` in {} is not a JSON object", path.display());
        };
        section.insert("address".to_string(), json!(contract.to_lower_hex()));
    }

    let rendered = serde_json::to_string_pretty(&config).context("Failed to serialize minting config")?;
    write_file_atomic(path, &rendered)
}
