#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use allowlist_common::Address;
use alloy_primitives::{hex, U256};
use alloy_sol_types::{Revert, SolCall, SolError};
use async_trait::async_trait;
use mint_client::abi::IAllowListCollection as C;
use mint_client::{MintContract, Provider, RpcError};
use serde_json::{json, Value};

pub const ALICE: &str = "0xabcdef0123456789abcdef0123456789abcdef01";
pub const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
pub const TX_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
pub const CHAIN_ID: u64 = 11124;

pub fn alice() -> Address {
    Address::parse_strict(ALICE).unwrap()
}

pub fn contract_address() -> Address {
    Address::parse_strict(CONTRACT).unwrap()
}

/// Scripted chain state behind the mock provider.
#[derive(Debug, Clone)]
pub struct Chain {
    pub chain_id: u64,
    pub accounts: Vec<String>,
    pub sale_state: u8,
    pub public_price: U256,
    pub whitelist_price: U256,
    pub total_supply: U256,
    pub max_supply: U256,
    pub free_mint_remaining: U256,
    pub free_mint_allowance: U256,
    pub tokens: Vec<U256>,
    pub gas_estimate: U256,
    /// `Error(string)` reason returned by `eth_estimateGas`.
    pub revert_reason: Option<String>,
    /// Receipt polls answered with `null` before the receipt shows up.
    pub pending_polls: usize,
    pub receipt_status: &'static str,
    pub fail_total_supply: bool,
    /// Chains the wallet knows; switching to anything else yields 4902.
    pub known_chains: Vec<u64>,
    pub reject_switch: bool,
}

impl Default for Chain {
    fn default() -> Self {
        Self {
            chain_id: CHAIN_ID,
            accounts: vec![ALICE.to_string()],
            sale_state: 2,
            public_price: U256::from(50_000_000_000_000_000u64),
            whitelist_price: U256::from(30_000_000_000_000_000u64),
            total_supply: U256::from(25u64),
            max_supply: U256::from(100u64),
            free_mint_remaining: U256::from(10u64),
            free_mint_allowance: U256::from(2u64),
            tokens: vec![U256::from(3u64), U256::from(7u64)],
            gas_estimate: U256::from(100_000u64),
            revert_reason: None,
            pending_polls: 0,
            receipt_status: "0x1",
            fail_total_supply: false,
            known_chains: vec![1, CHAIN_ID],
            reject_switch: false,
        }
    }
}

fn word(value: U256) -> Value {
    json!(hex::encode_prefixed(C::totalSupplyCall::abi_encode_returns(&(value,))))
}

impl Chain {
    fn answer_call(&self, data: &[u8]) -> Result<Value, RpcError> {
        let selector: [u8; 4] = data[..4].try_into().unwrap();

        if selector == C::totalSupplyCall::SELECTOR {
            if self.fail_total_supply {
                return Err(RpcError::Rpc {
                    code: -32000,
                    message: "header not found".into(),
                    data: None,
                });
            }
            return Ok(word(self.total_supply));
        }
        if selector == C::remainingSupplyCall::SELECTOR {
            return Ok(word(self.max_supply - self.total_supply));
        }
        if selector == C::MAX_SUPPLYCall::SELECTOR {
            return Ok(word(self.max_supply));
        }
        if selector == C::publicPriceCall::SELECTOR {
            return Ok(word(self.public_price));
        }
        if selector == C::whitelistPriceCall::SELECTOR {
            return Ok(word(self.whitelist_price));
        }
        if selector == C::freeMintRemainingCall::SELECTOR {
            return Ok(word(self.free_mint_remaining));
        }
        if selector == C::saleStateCall::SELECTOR {
            let out = C::saleStateCall::abi_encode_returns(&(self.sale_state,));
            return Ok(json!(hex::encode_prefixed(out)));
        }
        if selector == C::getWalletMintStatsCall::SELECTOR {
            let out = C::getWalletMintStatsCall::abi_encode_returns(&(
                U256::from(1u64),
                U256::ZERO,
                U256::ZERO,
                self.free_mint_allowance,
                true,
            ));
            return Ok(json!(hex::encode_prefixed(out)));
        }
        if selector == C::walletOfOwnerCall::SELECTOR {
            let out = C::walletOfOwnerCall::abi_encode_returns(&(self.tokens.clone(),));
            return Ok(json!(hex::encode_prefixed(out)));
        }
        panic!("unexpected eth_call selector {}", hex::encode(selector));
    }

    fn respond(&mut self, method: &str, params: &Value) -> Result<Value, RpcError> {
        match method {
            "eth_chainId" => Ok(json!(format!("{:#x}", self.chain_id))),
            "eth_accounts" | "eth_requestAccounts" => Ok(json!(self.accounts)),
            "eth_getBalance" => Ok(json!("0xde0b6b3a7640000")),
            "eth_call" => {
                let data = hex::decode(params[0]["data"].as_str().unwrap()).unwrap();
                self.answer_call(&data)
            }
            "eth_estimateGas" => match &self.revert_reason {
                Some(reason) => Err(RpcError::Rpc {
                    code: 3,
                    message: "execution reverted".into(),
                    data: Some(json!(hex::encode_prefixed(
                        Revert {
                            reason: reason.clone()
                        }
                        .abi_encode()
                    ))),
                }),
                None => Ok(json!(format!("{:#x}", self.gas_estimate))),
            },
            "eth_sendTransaction" => Ok(json!(TX_HASH)),
            "eth_getTransactionReceipt" => {
                if self.pending_polls > 0 {
                    self.pending_polls -= 1;
                    return Ok(Value::Null);
                }
                Ok(json!({
                    "transactionHash": TX_HASH,
                    "blockNumber": "0x2a",
                    "gasUsed": "0x186a0",
                    "status": self.receipt_status,
                }))
            }
            "wallet_switchEthereumChain" => {
                if self.reject_switch {
                    return Err(RpcError::Rpc {
                        code: 4001,
                        message: "User rejected the request.".into(),
                        data: None,
                    });
                }
                let wanted = u64::from_str_radix(
                    params[0]["chainId"].as_str().unwrap().trim_start_matches("0x"),
                    16,
                )
                .unwrap();
                if !self.known_chains.contains(&wanted) {
                    return Err(RpcError::Rpc {
                        code: 4902,
                        message: "Unrecognized chain ID".into(),
                        data: None,
                    });
                }
                self.chain_id = wanted;
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let added = u64::from_str_radix(
                    params[0]["chainId"].as_str().unwrap().trim_start_matches("0x"),
                    16,
                )
                .unwrap();
                self.known_chains.push(added);
                Ok(Value::Null)
            }
            other => panic!("unexpected RPC method {other}"),
        }
    }
}

/// Provider backed by a [`Chain`], recording every request.
pub struct MockProvider {
    pub chain: Mutex<Chain>,
    log: Mutex<Vec<(String, Value)>>,
}

impl MockProvider {
    pub fn new(chain: Chain) -> Arc<Self> {
        Arc::new(Self {
            chain: Mutex::new(chain),
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn update(&self, f: impl FnOnce(&mut Chain)) {
        f(&mut self.chain.lock().unwrap());
    }

    pub fn methods(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn requests(&self, method: &str) -> Vec<Value> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.log
            .lock()
            .unwrap()
            .push((method.to_string(), params.clone()));
        self.chain.lock().unwrap().respond(method, &params)
    }
}

pub fn contract_for(provider: &Arc<MockProvider>) -> MintContract {
    MintContract::new(provider.clone() as Arc<dyn Provider>, contract_address())
}
