//! Wallet session state and provider events.
//!
//! A [`WalletSession`] is the one place that knows which account is
//! connected and which chain the wallet is on. It is passed explicitly to
//! whatever needs it. Account and chain changes arrive as [`WalletEvent`]s
//! through [`Subscription`] handles, which detach themselves when dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use allowlist_common::Address;
use alloy_primitives::U256;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ChainConfig;
use crate::error::{Error, Result};
use crate::rpc::{EthApi, Provider, RpcError, UNRECOGNIZED_CHAIN, USER_REJECTED};

/// Parameters for `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkParams {
    pub chain_id: u64,
    pub chain_name: String,
    pub currency_name: String,
    pub currency_symbol: String,
    pub decimals: u8,
    pub rpc_urls: Vec<String>,
    pub explorer_urls: Vec<String>,
}

impl NetworkParams {
    pub fn from_config(config: &ChainConfig) -> Self {
        Self {
            chain_id: config.chain_id,
            chain_name: config.chain_name.clone(),
            currency_name: "ETH".to_string(),
            currency_symbol: "ETH".to_string(),
            decimals: 18,
            rpc_urls: vec![config.rpc_url.clone()],
            explorer_urls: config.explorer_url.iter().cloned().collect(),
        }
    }

    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "chainId": self.chain_id_hex(),
            "chainName": self.chain_name,
            "nativeCurrency": {
                "name": self.currency_name,
                "symbol": self.currency_symbol,
                "decimals": self.decimals,
            },
            "rpcUrls": self.rpc_urls,
            "blockExplorerUrls": self.explorer_urls,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

/// What a consumer must do after [`WalletSession::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Unchanged,
    AccountChanged(Address),
    Disconnected,
    /// The chain moved under us; rebuild the session and anything derived
    /// from its provider instead of reusing it.
    Reload,
}

#[derive(Default)]
struct EventHub {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, mpsc::UnboundedSender<WalletEvent>>>,
}

impl EventHub {
    fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, events) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sender);
        Subscription {
            id,
            hub: Arc::downgrade(self),
            events,
        }
    }

    fn emit(&self, event: WalletEvent) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!("Wallet event {:?} -> {} listener(s)", event, listeners.len());
        listeners.retain(|_, sender| sender.send(event.clone()).is_ok());
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Live registration for wallet events. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    hub: Weak<EventHub>,
    events: mpsc::UnboundedReceiver<WalletEvent>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<WalletEvent> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<WalletEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}

/// Background poller feeding the session's event hub. Stops on drop.
pub struct Watcher(JoinHandle<()>);

impl Drop for Watcher {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Wallets sometimes wrap the real code as `data.originalError.code`.
fn wallet_error_code(err: &RpcError) -> Option<i64> {
    match err {
        RpcError::Rpc {
            data: Some(data), ..
        } => data
            .pointer("/originalError/code")
            .and_then(Value::as_i64)
            .or(err.code()),
        other => other.code(),
    }
}

pub struct WalletSession {
    provider: Option<Arc<dyn Provider>>,
    network: NetworkParams,
    account: Option<Address>,
    chain_id: Option<u64>,
    hub: Arc<EventHub>,
}

impl WalletSession {
    /// `provider: None` models "no wallet installed": the session simply
    /// stays unconnected.
    pub fn new(provider: Option<Arc<dyn Provider>>, network: NetworkParams) -> Self {
        Self {
            provider,
            network,
            account: None,
            chain_id: None,
            hub: Arc::new(EventHub::default()),
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn Provider>> {
        self.provider.as_ref()
    }

    pub fn network(&self) -> &NetworkParams {
        &self.network
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    pub fn is_correct_network(&self) -> bool {
        self.chain_id == Some(self.network.chain_id)
    }

    pub fn ensure_network(&self) -> Result<()> {
        match self.chain_id {
            Some(actual) if actual == self.network.chain_id => Ok(()),
            Some(actual) => Err(Error::WrongNetwork {
                expected: self.network.chain_id,
                actual,
            }),
            None => Err(Error::NotConnected),
        }
    }

    fn require_provider(&self) -> Result<Arc<dyn Provider>> {
        self.provider.clone().ok_or(Error::NoWallet)
    }

    /// Pick up an already-authorized account without prompting.
    pub async fn restore(&mut self) -> Result<bool> {
        let Some(provider) = self.provider.clone() else {
            return Ok(false);
        };
        let accounts = provider.accounts().await?;
        let Some(account) = accounts.first().copied() else {
            return Ok(false);
        };
        self.account = Some(account);
        self.chain_id = Some(provider.chain_id().await?);
        tracing::debug!("Restored wallet session for {} on chain {:?}", account, self.chain_id);
        Ok(true)
    }

    /// Request accounts, then move the wallet to the expected chain.
    pub async fn connect(&mut self) -> Result<Address> {
        let provider = self.require_provider()?;

        let accounts = provider.request_accounts().await?;
        let account = accounts.first().copied().ok_or(Error::NotConnected)?;
        let chain_id = provider.chain_id().await?;
        self.account = Some(account);
        self.chain_id = Some(chain_id);
        tracing::info!("Connected {} on chain {}", account, chain_id);

        if chain_id != self.network.chain_id {
            self.switch_network().await?;
        }
        Ok(account)
    }

    /// `wallet_switchEthereumChain`, adding the chain first if the wallet
    /// does not know it.
    pub async fn switch_network(&mut self) -> Result<()> {
        let provider = self.require_provider()?;
        let switch = json!([{ "chainId": self.network.chain_id_hex() }]);

        match provider.request("wallet_switchEthereumChain", switch.clone()).await {
            Ok(_) => {}
            Err(err) if wallet_error_code(&err) == Some(UNRECOGNIZED_CHAIN) => {
                tracing::info!("Adding {} to wallet", self.network.chain_name);
                provider
                    .request("wallet_addEthereumChain", json!([self.network.to_json()]))
                    .await?;
                provider.request("wallet_switchEthereumChain", switch).await?;
            }
            Err(err) if wallet_error_code(&err) == Some(USER_REJECTED) => {
                tracing::warn!("User rejected the network switch request");
                return Err(err.into());
            }
            Err(err) => {
                tracing::error!("Error switching to {}: {}", self.network.chain_name, err);
                return Err(err.into());
            }
        }

        self.chain_id = Some(provider.chain_id().await?);
        if let Some(account) = provider.accounts().await?.first() {
            self.account = Some(*account);
        }
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.account = None;
        self.chain_id = None;
    }

    pub async fn balance(&self) -> Result<U256> {
        let provider = self.require_provider()?;
        let account = self.account.ok_or(Error::NotConnected)?;
        Ok(provider.balance(&account).await?)
    }

    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.hub.listener_count()
    }

    /// Deliver an event to every subscriber.
    pub fn emit(&self, event: WalletEvent) {
        self.hub.emit(event);
    }

    /// Fold an event into the session.
    pub fn apply(&mut self, event: &WalletEvent) -> SessionAction {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    self.disconnect();
                    SessionAction::Disconnected
                }
                Some(account) if self.account == Some(*account) => SessionAction::Unchanged,
                Some(account) => {
                    self.account = Some(*account);
                    SessionAction::AccountChanged(*account)
                }
            },
            WalletEvent::ChainChanged(chain_id) => {
                self.chain_id = Some(*chain_id);
                SessionAction::Reload
            }
        }
    }

    /// Poll `eth_chainId`/`eth_accounts` and emit an event on every change.
    /// `None` when there is no provider to watch.
    pub fn spawn_watcher(&self, interval: Duration) -> Option<Watcher> {
        let provider = self.provider.clone()?;
        let hub = Arc::downgrade(&self.hub);
        let mut last_chain = self.chain_id;
        let mut last_accounts: Vec<Address> = self.account.into_iter().collect();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(hub) = hub.upgrade() else {
                    break;
                };

                match provider.chain_id().await {
                    Ok(chain_id) if last_chain != Some(chain_id) => {
                        if last_chain.is_some() {
                            hub.emit(WalletEvent::ChainChanged(chain_id));
                        }
                        last_chain = Some(chain_id);
                    }
                    Ok(_) => {}
                    Err(err) => tracing::debug!("Wallet watcher: eth_chainId failed: {}", err),
                }

                match provider.accounts().await {
                    Ok(accounts) if accounts != last_accounts => {
                        hub.emit(WalletEvent::AccountsChanged(accounts.clone()));
                        last_accounts = accounts;
                    }
                    Ok(_) => {}
                    Err(err) => tracing::debug!("Wallet watcher: eth_accounts failed: {}", err),
                }
            }
        });

        Some(Watcher(handle))
    }
}
