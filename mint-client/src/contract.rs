//! Typed access to the collection contract: reads, snapshots and mint calls.

use std::sync::Arc;
use std::time::Duration;

use allowlist_common::Address;
use alloy_primitives::{Address as EvmAddress, B256, U256};
use alloy_sol_types::SolCall;

use crate::abi::{IAllowListCollection as Collection, SaleState};
use crate::error::{Error, Result};
use crate::mint_flow::MintQuantity;
use crate::rpc::{EthApi, Provider, TransactionReceipt, TransactionRequest};

/// Percentage applied to every gas estimate before sending.
pub const GAS_MARGIN_PERCENT: u64 = 110;

pub fn gas_limit(estimate: U256) -> U256 {
    estimate.saturating_mul(U256::from(GAS_MARGIN_PERCENT)) / U256::from(100u64)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletMintStats {
    pub whitelist_minted: U256,
    pub public_minted: U256,
    pub free_minted: U256,
    pub free_mint_allowance: U256,
    pub holds_partner_token: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub account: Address,
    pub stats: WalletMintStats,
    pub tokens: Vec<U256>,
}

/// Everything the mint screen shows, read in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSnapshot {
    pub sale_state: SaleState,
    pub public_price: U256,
    pub whitelist_price: U256,
    pub total_supply: U256,
    pub remaining_supply: U256,
    pub max_supply: U256,
    pub free_mint_remaining: U256,
    pub wallet: Option<WalletSnapshot>,
}

impl CollectionSnapshot {
    /// Unit price of the phase that is currently open.
    pub fn active_price(&self) -> U256 {
        match self.sale_state {
            SaleState::Whitelist => self.whitelist_price,
            _ => self.public_price,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReceiptPolling {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReceiptPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 150,
        }
    }
}

fn evm(address: &Address) -> EvmAddress {
    EvmAddress::from(address.into_bytes())
}

fn proof_words(proof: &[[u8; 32]]) -> Vec<B256> {
    proof.iter().map(|node| B256::from(*node)).collect()
}

#[derive(Clone)]
pub struct MintContract {
    provider: Arc<dyn Provider>,
    address: Address,
}

impl MintContract {
    pub fn new(provider: Arc<dyn Provider>, address: Address) -> Self {
        Self { provider, address }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    async fn read<C: SolCall>(&self, call: C) -> Result<C::Return> {
        let tx = TransactionRequest {
            to: self.address,
            data: call.abi_encode().into(),
            ..Default::default()
        };
        let output = self.provider.call(&tx).await?;
        C::abi_decode_returns(&output, true).map_err(|e| Error::Decode {
            call: C::SIGNATURE,
            reason: e.to_string(),
        })
    }

    pub async fn total_supply(&self) -> Result<U256> {
        Ok(self.read(Collection::totalSupplyCall {}).await?._0)
    }

    pub async fn remaining_supply(&self) -> Result<U256> {
        Ok(self.read(Collection::remainingSupplyCall {}).await?._0)
    }

    pub async fn max_supply(&self) -> Result<U256> {
        Ok(self.read(Collection::MAX_SUPPLYCall {}).await?._0)
    }

    pub async fn public_price(&self) -> Result<U256> {
        Ok(self.read(Collection::publicPriceCall {}).await?._0)
    }

    pub async fn whitelist_price(&self) -> Result<U256> {
        Ok(self.read(Collection::whitelistPriceCall {}).await?._0)
    }

    pub async fn sale_state(&self) -> Result<SaleState> {
        SaleState::try_from(self.read(Collection::saleStateCall {}).await?._0)
    }

    pub async fn free_mint_remaining(&self) -> Result<U256> {
        Ok(self.read(Collection::freeMintRemainingCall {}).await?._0)
    }

    pub async fn wallet_mint_stats(&self, account: &Address) -> Result<WalletMintStats> {
        let stats = self
            .read(Collection::getWalletMintStatsCall {
                account: evm(account),
            })
            .await?;
        Ok(WalletMintStats {
            whitelist_minted: stats.whitelistMinted,
            public_minted: stats.publicMinted,
            free_minted: stats.freeMinted,
            free_mint_allowance: stats.freeMintAllowance,
            holds_partner_token: stats.holdsPartnerToken,
        })
    }

    pub async fn wallet_tokens(&self, account: &Address) -> Result<Vec<U256>> {
        Ok(self
            .read(Collection::walletOfOwnerCall {
                owner: evm(account),
            })
            .await?
            ._0)
    }

    /// Issues every read concurrently; any failure fails the whole snapshot.
    pub async fn snapshot(&self, account: Option<&Address>) -> Result<CollectionSnapshot> {
        let wallet = async {
            let Some(account) = account else {
                return Ok::<_, Error>(None);
            };
            let (stats, tokens) =
                tokio::try_join!(self.wallet_mint_stats(account), self.wallet_tokens(account))?;
            Ok(Some(WalletSnapshot {
                account: *account,
                stats,
                tokens,
            }))
        };

        let (
            total_supply,
            remaining_supply,
            max_supply,
            public_price,
            whitelist_price,
            sale_state,
            free_mint_remaining,
            wallet,
        ) = tokio::try_join!(
            self.total_supply(),
            self.remaining_supply(),
            self.max_supply(),
            self.public_price(),
            self.whitelist_price(),
            self.sale_state(),
            self.free_mint_remaining(),
            wallet,
        )?;

        Ok(CollectionSnapshot {
            sale_state,
            public_price,
            whitelist_price,
            total_supply,
            remaining_supply,
            max_supply,
            free_mint_remaining,
            wallet,
        })
    }

    pub async fn public_mint(&self, from: &Address, quantity: MintQuantity) -> Result<B256> {
        let price = self.public_price().await?;
        let call = Collection::publicMintCall {
            quantity: quantity.as_u256(),
        };
        self.send(from, call, Some(price.saturating_mul(quantity.as_u256())))
            .await
    }

    pub async fn whitelist_mint(
        &self,
        from: &Address,
        quantity: MintQuantity,
        proof: &[[u8; 32]],
    ) -> Result<B256> {
        let price = self.whitelist_price().await?;
        let call = Collection::whitelistMintCall {
            quantity: quantity.as_u256(),
            merkleProof: proof_words(proof),
        };
        self.send(from, call, Some(price.saturating_mul(quantity.as_u256())))
            .await
    }

    pub async fn free_mint(
        &self,
        from: &Address,
        quantity: MintQuantity,
        proof: &[[u8; 32]],
    ) -> Result<B256> {
        let call = Collection::freeMintCall {
            quantity: quantity.as_u256(),
            merkleProof: proof_words(proof),
        };
        self.send(from, call, None).await
    }

    /// Estimate, pad by [`GAS_MARGIN_PERCENT`], then submit.
    async fn send<C: SolCall>(&self, from: &Address, call: C, value: Option<U256>) -> Result<B256> {
        let mut tx = TransactionRequest {
            from: Some(*from),
            to: self.address,
            data: call.abi_encode().into(),
            value,
            gas: None,
        };

        let estimate = self.provider.estimate_gas(&tx).await?;
        tx.gas = Some(gas_limit(estimate));
        tracing::debug!("{} gas estimate {} -> limit {:?}", C::SIGNATURE, estimate, tx.gas);

        let hash = self.provider.send_transaction(&tx).await?;
        tracing::info!("Submitted {} from {}: {}", C::SIGNATURE, from, hash);
        Ok(hash)
    }

    /// Poll until the transaction is mined. A status-0 receipt is a revert.
    pub async fn wait_for_receipt(
        &self,
        hash: B256,
        polling: ReceiptPolling,
    ) -> Result<TransactionReceipt> {
        for _ in 0..polling.max_attempts {
            if let Some(receipt) = self.provider.transaction_receipt(hash).await? {
                if !receipt.success {
                    tracing::warn!("Transaction {} reverted", hash);
                    return Err(Error::Reverted(hash));
                }
                tracing::info!("Transaction {} confirmed in block {:?}", hash, receipt.block_number);
                return Ok(receipt);
            }
            tokio::time::sleep(polling.interval).await;
        }
        Err(Error::ReceiptTimeout(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_limit_adds_ten_percent() {
        assert_eq!(gas_limit(U256::from(100_000u64)), U256::from(110_000u64));
        assert_eq!(gas_limit(U256::from(21_001u64)), U256::from(23_101u64));
        assert_eq!(gas_limit(U256::ZERO), U256::ZERO);
    }

    #[test]
    fn active_price_follows_sale_phase() {
        let mut snapshot = CollectionSnapshot {
            sale_state: SaleState::Whitelist,
            public_price: U256::from(2u64),
            whitelist_price: U256::from(1u64),
            total_supply: U256::ZERO,
            remaining_supply: U256::ZERO,
            max_supply: U256::ZERO,
            free_mint_remaining: U256::ZERO,
            wallet: None,
        };
        assert_eq!(snapshot.active_price(), U256::from(1u64));
        snapshot.sale_state = SaleState::Public;
        assert_eq!(snapshot.active_price(), U256::from(2u64));
        snapshot.sale_state = SaleState::Closed;
        assert_eq!(snapshot.active_price(), U256::from(2u64));
    }
}
