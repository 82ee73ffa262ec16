mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use mint_client::{
    ChainConfig, Error, NetworkParams, Provider, SessionAction, WalletEvent, WalletSession,
};

fn session_for(provider: &Arc<MockProvider>, config: &ChainConfig) -> WalletSession {
    WalletSession::new(
        Some(provider.clone() as Arc<dyn Provider>),
        NetworkParams::from_config(config),
    )
}

#[tokio::test]
async fn connect_on_expected_chain_does_not_switch() {
    let provider = MockProvider::new(Chain::default());
    let mut session = session_for(&provider, &ChainConfig::default());

    let account = session.connect().await.unwrap();

    assert_eq!(account, alice());
    assert!(session.is_connected());
    assert!(session.is_correct_network());
    assert!(provider.requests("wallet_switchEthereumChain").is_empty());
}

#[tokio::test]
async fn connect_switches_to_known_chain() {
    let provider = MockProvider::new(Chain {
        chain_id: 1,
        ..Chain::default()
    });
    let mut session = session_for(&provider, &ChainConfig::default());

    session.connect().await.unwrap();

    assert_eq!(session.chain_id(), Some(CHAIN_ID));
    assert_eq!(provider.requests("wallet_switchEthereumChain").len(), 1);
    assert!(provider.requests("wallet_addEthereumChain").is_empty());
}

#[tokio::test]
async fn unknown_chain_is_added_then_switched() {
    let provider = MockProvider::new(Chain {
        chain_id: 1,
        known_chains: vec![1],
        ..Chain::default()
    });
    let config = ChainConfig {
        explorer_url: Some("https://explorer.testnet.example".into()),
        ..ChainConfig::default()
    };
    let mut session = session_for(&provider, &config);

    session.connect().await.unwrap();

    assert!(session.is_correct_network());
    assert_eq!(provider.requests("wallet_switchEthereumChain").len(), 2);
    let added = &provider.requests("wallet_addEthereumChain")[0][0];
    assert_eq!(added["chainId"], "0x2b74");
    assert_eq!(added["blockExplorerUrls"][0], "https://explorer.testnet.example");
}

#[tokio::test]
async fn rejected_switch_is_reported() {
    let provider = MockProvider::new(Chain {
        chain_id: 1,
        reject_switch: true,
        ..Chain::default()
    });
    let mut session = session_for(&provider, &ChainConfig::default());

    let err = session.connect().await.unwrap_err();

    assert_eq!(err.user_message(), "Transaction rejected in wallet");
    assert!(session.is_connected());
    assert!(!session.is_correct_network());
}

#[tokio::test]
async fn missing_wallet_is_not_a_connection() {
    let mut session = WalletSession::new(None, NetworkParams::from_config(&ChainConfig::default()));

    assert!(!session.restore().await.unwrap());
    assert!(matches!(session.connect().await, Err(Error::NoWallet)));
    assert!(!session.is_connected());
}

#[tokio::test]
async fn restore_picks_up_authorized_account() {
    let provider = MockProvider::new(Chain::default());
    let mut session = session_for(&provider, &ChainConfig::default());

    assert!(session.restore().await.unwrap());
    assert_eq!(session.account(), Some(alice()));
    assert!(provider.requests("eth_requestAccounts").is_empty());

    provider.update(|chain| chain.accounts.clear());
    let mut fresh = session_for(&provider, &ChainConfig::default());
    assert!(!fresh.restore().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn watcher_reports_chain_and_account_changes() {
    let provider = MockProvider::new(Chain::default());
    let mut session = session_for(&provider, &ChainConfig::default());
    session.connect().await.unwrap();

    let mut events = session.subscribe();
    let _watcher = session.spawn_watcher(Duration::from_secs(1)).unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(events.try_recv().is_none());

    provider.update(|chain| chain.chain_id = 1);
    let event = events.recv().await.unwrap();
    assert_eq!(event, WalletEvent::ChainChanged(1));
    assert_eq!(session.apply(&event), SessionAction::Reload);

    let bob = "0x2222222222222222222222222222222222222222";
    provider.update(|chain| chain.accounts = vec![bob.to_string()]);
    let event = events.recv().await.unwrap();
    match session.apply(&event) {
        SessionAction::AccountChanged(account) => assert_eq!(account.to_string(), bob),
        other => panic!("unexpected action {other:?}"),
    }

    provider.update(|chain| chain.accounts.clear());
    let event = events.recv().await.unwrap();
    assert_eq!(session.apply(&event), SessionAction::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn dropped_watcher_stops_polling() {
    let provider = MockProvider::new(Chain::default());
    let mut session = session_for(&provider, &ChainConfig::default());
    session.restore().await.unwrap();

    let watcher = session.spawn_watcher(Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    drop(watcher);
    tokio::task::yield_now().await;

    let polls = provider.requests("eth_chainId").len();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(provider.requests("eth_chainId").len(), polls);
}
