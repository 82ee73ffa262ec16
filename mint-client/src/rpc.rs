//! JSON-RPC transport to a node or wallet bridge.
//!
//! Everything above this module talks to the chain through [`Provider`],
//! so tests can swap the HTTP transport for a scripted one.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use allowlist_common::Address;
use alloy_primitives::{hex, Bytes, B256, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// EIP-1193: the user rejected the request in their wallet.
pub const USER_REJECTED: i64 = 4001;
/// EIP-3085: the wallet does not know the requested chain.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Connection failed: {0}")]
    Connection(String),
}

impl RpcError {
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Raw revert payload attached to an `eth_call`/`eth_estimateGas` failure.
    ///
    /// Nodes disagree on the shape: some put the hex string directly in
    /// `data`, others nest it one level down as `data.data`.
    pub fn revert_data(&self) -> Option<Bytes> {
        let RpcError::Rpc {
            data: Some(data), ..
        } = self
        else {
            return None;
        };

        let raw = match data {
            Value::String(s) => s.as_str(),
            Value::Object(map) => map.get("data")?.as_str()?,
            _ => return None,
        };
        Bytes::from_str(raw).ok()
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// A single `request(method, params)` entry point, the EIP-1193 shape.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// JSON-RPC over HTTP.
pub struct HttpProvider {
    client: Client,
    url: String,
    request_id: AtomicU64,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id(),
        };
        tracing::trace!("-> {} {}", request.method, request.params);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RpcError::Connection(format!("Cannot connect to {}", self.url))
                } else {
                    RpcError::Http(e)
                }
            })?;

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| RpcError::Parse(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }

        Ok(body.result.unwrap_or(Value::Null))
    }
}

/// Fields of an `eth_call` / `eth_estimateGas` / `eth_sendTransaction` object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    pub value: Option<U256>,
    pub gas: Option<U256>,
}

impl TransactionRequest {
    pub fn to_json(&self) -> Value {
        let mut tx = json!({
            "to": self.to.to_lower_hex(),
            "data": hex::encode_prefixed(&self.data),
        });
        if let Some(from) = &self.from {
            tx["from"] = json!(from.to_lower_hex());
        }
        if let Some(value) = self.value {
            tx["value"] = json!(quantity_hex(value));
        }
        if let Some(gas) = self.gas {
            tx["gas"] = json!(quantity_hex(gas));
        }
        tx
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
    pub success: bool,
}

impl TransactionReceipt {
    fn from_json(value: &Value) -> Result<Self, RpcError> {
        let transaction_hash = parse_hash(&value["transactionHash"])?;
        let block_number = match &value["blockNumber"] {
            Value::Null => None,
            other => Some(parse_u64(other)?),
        };
        let gas_used = match &value["gasUsed"] {
            Value::Null => None,
            other => Some(parse_quantity(other)?),
        };
        // Pre-Byzantium receipts carry no status; treat them as success.
        let success = match &value["status"] {
            Value::Null => true,
            other => parse_quantity(other)? != U256::ZERO,
        };

        Ok(Self {
            transaction_hash,
            block_number,
            gas_used,
            success,
        })
    }
}

pub fn quantity_hex(value: U256) -> String {
    format!("{value:#x}")
}

pub fn parse_quantity(value: &Value) -> Result<U256, RpcError> {
    let raw = value
        .as_str()
        .ok_or_else(|| RpcError::Parse(format!("expected hex quantity, got {value}")))?;
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Parse(format!("invalid quantity {raw}: {e}")))
}

pub fn parse_u64(value: &Value) -> Result<u64, RpcError> {
    let quantity = parse_quantity(value)?;
    u64::try_from(quantity).map_err(|_| RpcError::Parse(format!("quantity {quantity} overflows u64")))
}

fn parse_hash(value: &Value) -> Result<B256, RpcError> {
    let raw = value
        .as_str()
        .ok_or_else(|| RpcError::Parse(format!("expected 32-byte hash, got {value}")))?;
    B256::from_str(raw).map_err(|e| RpcError::Parse(format!("invalid hash {raw}: {e}")))
}

fn parse_accounts(value: &Value) -> Result<Vec<Address>, RpcError> {
    let list = value
        .as_array()
        .ok_or_else(|| RpcError::Parse(format!("expected account list, got {value}")))?;
    list.iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| Address::parse_strict(s).ok())
                .ok_or_else(|| RpcError::Parse(format!("invalid account {item}")))
        })
        .collect()
}

/// Typed wrappers over the handful of `eth_*` / `wallet_*` methods in use.
#[async_trait]
pub trait EthApi: Provider {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        let value = self.request("eth_chainId", json!([])).await?;
        parse_u64(&value)
    }

    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        let value = self.request("eth_accounts", json!([])).await?;
        parse_accounts(&value)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, RpcError> {
        let value = self.request("eth_requestAccounts", json!([])).await?;
        parse_accounts(&value)
    }

    async fn balance(&self, account: &Address) -> Result<U256, RpcError> {
        let value = self
            .request("eth_getBalance", json!([account.to_lower_hex(), "latest"]))
            .await?;
        parse_quantity(&value)
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, RpcError> {
        let value = self.request("eth_call", json!([tx.to_json(), "latest"])).await?;
        let raw = value
            .as_str()
            .ok_or_else(|| RpcError::Parse(format!("expected call output, got {value}")))?;
        Bytes::from_str(raw).map_err(|e| RpcError::Parse(format!("invalid call output: {e}")))
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256, RpcError> {
        let value = self.request("eth_estimateGas", json!([tx.to_json()])).await?;
        parse_quantity(&value)
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, RpcError> {
        let value = self.request("eth_sendTransaction", json!([tx.to_json()])).await?;
        parse_hash(&value)
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>, RpcError> {
        let value = self
            .request("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        TransactionReceipt::from_json(&value).map(Some)
    }
}

impl<P: Provider + ?Sized> EthApi for P {}
