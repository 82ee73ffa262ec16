//! Mint state machine.
//!
//! `Idle -> Preparing -> Submitted -> Confirmed | Errored`, published on a
//! watch channel. Terminal states fall back to `Idle` after
//! [`STATUS_RESET_DELAY`] unless a newer mint has moved the state on.
//! Only one mint runs per flow; a second call while one is in flight is
//! refused before any check or transaction.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use allowlist_common::Address;
use alloy_primitives::{B256, U256};
use tokio::sync::watch;

use crate::abi::SaleState;
use crate::config::{MintList, MintingConfig};
use crate::contract::{CollectionSnapshot, MintContract, ReceiptPolling};
use crate::error::{Error, Result};
use crate::wallet::WalletSession;

pub const MIN_MINT_QUANTITY: u32 = 1;
pub const MAX_MINT_QUANTITY: u32 = 10;
pub const STATUS_RESET_DELAY: Duration = Duration::from_secs(5);
pub const MINT_IN_PROGRESS_MESSAGE: &str = "A mint is already in progress.";

/// Per-transaction quantity, always within `[1, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MintQuantity(u32);

impl MintQuantity {
    pub fn new(value: i64) -> Self {
        Self(value.clamp(MIN_MINT_QUANTITY as i64, MAX_MINT_QUANTITY as i64) as u32)
    }

    /// Numeric text is floored then clamped; anything else becomes 1.
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(value) if !value.is_nan() => Self(
                value
                    .floor()
                    .clamp(MIN_MINT_QUANTITY as f64, MAX_MINT_QUANTITY as f64) as u32,
            ),
            _ => Self::default(),
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn as_u256(self) -> U256 {
        U256::from(self.0)
    }

    /// Lower to `allowance` when it is smaller; never below 1.
    pub fn limit_to(self, allowance: U256) -> Self {
        if allowance < self.as_u256() {
            let allowance = u32::try_from(allowance).unwrap_or(MIN_MINT_QUANTITY);
            Self(allowance.max(MIN_MINT_QUANTITY))
        } else {
            self
        }
    }
}

impl Default for MintQuantity {
    fn default() -> Self {
        Self(MIN_MINT_QUANTITY)
    }
}

impl fmt::Display for MintQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MintKind {
    Public,
    Whitelist,
    Free,
}

impl fmt::Display for MintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MintKind::Public => "public",
            MintKind::Whitelist => "whitelist",
            MintKind::Free => "free",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MintStatus {
    #[default]
    Idle,
    Preparing(MintKind),
    Submitted { tx_hash: B256 },
    Confirmed { tx_hash: B256 },
    Errored { message: String },
}

impl MintStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MintStatus::Confirmed { .. } | MintStatus::Errored { .. })
    }

    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            MintStatus::Submitted { tx_hash } | MintStatus::Confirmed { tx_hash } => Some(*tx_hash),
            _ => None,
        }
    }
}

impl fmt::Display for MintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintStatus::Idle => Ok(()),
            MintStatus::Preparing(MintKind::Public) => f.write_str("Preparing mint transaction..."),
            MintStatus::Preparing(MintKind::Whitelist) => f.write_str("Preparing whitelist mint..."),
            MintStatus::Preparing(MintKind::Free) => f.write_str("Submitting free mint..."),
            MintStatus::Submitted { .. } => {
                f.write_str("Transaction submitted. Waiting for confirmation...")
            }
            MintStatus::Confirmed { .. } => f.write_str("Mint confirmed."),
            MintStatus::Errored { message } => write!(f, "Error: {message}"),
        }
    }
}

struct Published {
    status: MintStatus,
    generation: u64,
}

/// Drives one mint at a time and publishes its progress.
pub struct MintFlow {
    contract: MintContract,
    lists: MintingConfig,
    state: Arc<watch::Sender<Published>>,
    reset_delay: Duration,
    polling: ReceiptPolling,
    busy: AtomicBool,
    latest: Mutex<Option<CollectionSnapshot>>,
}

/// Clears the busy flag when the mint that set it finishes.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MintFlow {
    pub fn new(contract: MintContract, lists: MintingConfig) -> Self {
        let (state, _) = watch::channel(Published {
            status: MintStatus::Idle,
            generation: 0,
        });
        Self {
            contract,
            lists,
            state: Arc::new(state),
            reset_delay: STATUS_RESET_DELAY,
            polling: ReceiptPolling::default(),
            busy: AtomicBool::new(false),
            latest: Mutex::new(None),
        }
    }

    pub fn with_reset_delay(mut self, delay: Duration) -> Self {
        self.reset_delay = delay;
        self
    }

    pub fn with_receipt_polling(mut self, polling: ReceiptPolling) -> Self {
        self.polling = polling;
        self
    }

    pub fn contract(&self) -> &MintContract {
        &self.contract
    }

    pub fn status(&self) -> MintStatus {
        self.state.borrow().status.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Last collection state read by [`MintFlow::refresh`].
    pub fn snapshot(&self) -> Option<CollectionSnapshot> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-read the collection (and `account`'s stats) and keep the result.
    pub async fn refresh(&self, account: Option<&Address>) -> Result<CollectionSnapshot> {
        let snapshot = self.contract.snapshot(account).await?;
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Watch status transitions.
    pub fn subscribe(&self) -> StatusReceiver {
        StatusReceiver(self.state.subscribe())
    }

    fn transition(&self, status: MintStatus) -> u64 {
        tracing::debug!("Mint status -> {:?}", status);
        let mut generation = 0;
        self.state.send_modify(|published| {
            published.generation += 1;
            published.status = status;
            generation = published.generation;
        });
        generation
    }

    fn clear_later(&self, generation: u64) {
        let state = Arc::clone(&self.state);
        let delay = self.reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            state.send_if_modified(|published| {
                if published.generation != generation {
                    return false;
                }
                published.generation += 1;
                published.status = MintStatus::Idle;
                true
            });
        });
    }

    /// Pre-flight checks. Returns the quantity to actually send and the proof.
    async fn prepare(
        &self,
        session: &WalletSession,
        kind: MintKind,
        quantity: MintQuantity,
    ) -> Result<(Address, MintQuantity, Vec<[u8; 32]>)> {
        let account = session.account().ok_or(Error::NotConnected)?;
        session.ensure_network()?;

        match kind {
            MintKind::Public => {
                if self.contract.sale_state().await? != SaleState::Public {
                    return Err(Error::Ineligible(
                        "Public mint is not active right now.".to_string(),
                    ));
                }
                Ok((account, quantity, Vec::new()))
            }
            MintKind::Whitelist => {
                if self.contract.sale_state().await? != SaleState::Whitelist {
                    return Err(Error::Ineligible(
                        "Whitelist mint is not active right now.".to_string(),
                    ));
                }
                let proof = self
                    .lists
                    .proof_for(MintList::Whitelist, &account)?
                    .ok_or_else(|| {
                        Error::Ineligible(
                            "Merkle proof missing. Update config/mintingConfig.json for this wallet."
                                .to_string(),
                        )
                    })?;
                Ok((account, quantity, proof))
            }
            MintKind::Free => {
                let proof = self
                    .lists
                    .proof_for(MintList::FreeMint, &account)?
                    .ok_or_else(|| {
                        Error::Ineligible(
                            "Free mint proof missing. Update config/mintingConfig.json for this wallet."
                                .to_string(),
                        )
                    })?;
                let stats = self.contract.wallet_mint_stats(&account).await?;
                if stats.free_mint_allowance.is_zero() {
                    return Err(Error::Ineligible(
                        "You have no free mint allowance left.".to_string(),
                    ));
                }
                Ok((account, quantity.limit_to(stats.free_mint_allowance), proof))
            }
        }
    }

    /// Run a mint end to end. Guard failures leave the status untouched.
    /// A confirmed mint is followed by a [`MintFlow::refresh`].
    pub async fn mint(
        &self,
        session: &WalletSession,
        kind: MintKind,
        quantity: MintQuantity,
    ) -> Result<B256> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            return Err(Error::Ineligible(MINT_IN_PROGRESS_MESSAGE.to_string()));
        };
        let (account, quantity, proof) = self.prepare(session, kind, quantity).await?;

        self.transition(MintStatus::Preparing(kind));
        tracing::info!("Starting {} mint of {} for {}", kind, quantity, account);

        let result = async {
            let tx_hash = match kind {
                MintKind::Public => self.contract.public_mint(&account, quantity).await?,
                MintKind::Whitelist => {
                    self.contract
                        .whitelist_mint(&account, quantity, &proof)
                        .await?
                }
                MintKind::Free => self.contract.free_mint(&account, quantity, &proof).await?,
            };
            self.transition(MintStatus::Submitted { tx_hash });
            self.contract.wait_for_receipt(tx_hash, self.polling).await?;
            Ok::<_, Error>(tx_hash)
        }
        .await;

        let generation = match &result {
            Ok(tx_hash) => self.transition(MintStatus::Confirmed { tx_hash: *tx_hash }),
            Err(err) => {
                tracing::error!("Minting error: {}", err);
                self.transition(MintStatus::Errored {
                    message: err.user_message(),
                })
            }
        };
        self.clear_later(generation);

        if result.is_ok() {
            if let Err(err) = self.refresh(Some(&account)).await {
                tracing::warn!("Failed to reload contract data after mint: {}", err);
            }
        }
        result
    }
}

/// Receiving end of [`MintFlow::subscribe`].
pub struct StatusReceiver(watch::Receiver<Published>);

impl StatusReceiver {
    pub fn current(&self) -> MintStatus {
        self.0.borrow().status.clone()
    }

    /// Wait for the next transition. `None` once the flow is dropped.
    pub async fn changed(&mut self) -> Option<MintStatus> {
        self.0.changed().await.ok()?;
        Some(self.0.borrow_and_update().status.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_clamps_to_bounds() {
        assert_eq!(MintQuantity::new(0).get(), 1);
        assert_eq!(MintQuantity::new(-5).get(), 1);
        assert_eq!(MintQuantity::new(7).get(), 7);
        assert_eq!(MintQuantity::new(11).get(), 10);
        assert_eq!(MintQuantity::new(i64::MAX).get(), 10);
    }

    #[test]
    fn quantity_parsing_floors_and_defaults() {
        assert_eq!(MintQuantity::parse("3").get(), 3);
        assert_eq!(MintQuantity::parse(" 4.9 ").get(), 4);
        assert_eq!(MintQuantity::parse("0.5").get(), 1);
        assert_eq!(MintQuantity::parse("25").get(), 10);
        assert_eq!(MintQuantity::parse("abc").get(), 1);
        assert_eq!(MintQuantity::parse("").get(), 1);
        assert_eq!(MintQuantity::parse("NaN").get(), 1);
    }

    #[test]
    fn quantity_respects_free_allowance() {
        let five = MintQuantity::new(5);
        assert_eq!(five.limit_to(U256::from(2u64)).get(), 2);
        assert_eq!(five.limit_to(U256::from(9u64)).get(), 5);
        assert_eq!(five.limit_to(U256::ZERO).get(), 1);
    }

    #[test]
    fn status_text() {
        assert_eq!(MintStatus::Idle.to_string(), "");
        assert_eq!(
            MintStatus::Errored {
                message: "Sale not active".into()
            }
            .to_string(),
            "Error: Sale not active"
        );
        assert!(MintStatus::Confirmed {
            tx_hash: B256::ZERO
        }
        .is_terminal());
        assert!(!MintStatus::Preparing(MintKind::Free).is_terminal());
    }
}
