use allowlist_common::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Body of `POST /api/wallet-submissions`. The landing page also sends
/// `source` and its own `submittedAt`; both are ignored.
#[derive(Deserialize, Debug, Default)]
pub struct SubmitWalletRequest {
    #[serde(default)]
    pub address: Option<serde_json::Value>,
}

impl SubmitWalletRequest {
    /// Returns the normalized address, or `InvalidAddress` for anything
    /// that is not a `0x`-prefixed 40 hex digit string.
    pub fn validate(&self) -> Result<Address, Error> {
        match &self.address {
            Some(serde_json::Value::String(raw)) => {
                Address::parse_strict(raw).map_err(|_| Error::InvalidAddress)
            }
            _ => Err(Error::InvalidAddress),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WalletSubmission {
    pub address: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubmitWalletResponse {
    pub ok: bool,
    pub address: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SubmissionsResponse {
    pub submissions: Vec<WalletSubmission>,
}
