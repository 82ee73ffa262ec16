use std::fs;
use std::path::Path;

use allowlist_common::Address;
use anyhow::{bail, Context, Result};

/// Parses either a JSON array of address strings or one address per line.
///
/// Blank lines and lines starting with `#` are skipped. Every address is
/// 40 hex digits with an optional `0x`; the first bad one aborts the parse.
pub fn parse_address_list(text: &str) -> Result<Vec<Address>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let raw: Vec<String> =
            serde_json::from_str(trimmed).context("Invalid JSON address list")?;
        return raw
            .iter()
            .enumerate()
            .map(|(i, value)| {
                Address::parse_lenient(value)
                    .with_context(|| format!("Invalid address at index {i}: {value:?}"))
            })
            .collect();
    }

    let mut addresses = Vec::new();
    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let address = Address::parse_lenient(line)
            .with_context(|| format!("Invalid address on line {}: {line:?}", line_num + 1))?;
        addresses.push(address);
    }
    Ok(addresses)
}

pub fn read_address_file(path: &Path) -> Result<Vec<Address>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let addresses = parse_address_list(&text)?;
    if addresses.is_empty() {
        bail!("No addresses found in {}", path.display());
    }
    Ok(addresses)
}
