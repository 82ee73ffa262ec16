use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::EnvFilter;

use allowlist_common::Address;
use mint_client::units::{format_ether, progress_percent, total_cost};
use mint_client::{
    ChainConfig, HttpProvider, MintContract, MintFlow, MintKind, MintQuantity, MintStatus,
    MintingConfig, NetworkParams, Provider, SessionAction, SubmissionClient, WalletSession,
};

#[derive(Parser, Debug)]
#[command(name = "mint")]
#[command(about = "Allow-list collection mint client", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show sale phase, prices, supply and (optionally) one wallet's stats
    Status {
        /// Wallet to inspect; defaults to the provider's first account
        #[arg(long)]
        account: Option<String>,
    },
    /// Submit a mint transaction from the provider's account
    Mint {
        #[arg(value_enum)]
        kind: KindArg,
        /// Tokens to mint, clamped to 1..=10
        #[arg(short, long, default_value = "1")]
        quantity: String,
    },
    /// Register a wallet address with the submission API
    Submit { address: String },
    /// List wallet addresses registered with the submission API
    Submissions,
    /// Follow account and chain changes reported by the provider
    Watch {
        /// Poll interval in seconds
        #[arg(long, default_value_t = 4)]
        interval: u64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Public,
    Whitelist,
    Free,
}

impl From<KindArg> for MintKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Public => MintKind::Public,
            KindArg::Whitelist => MintKind::Whitelist,
            KindArg::Free => MintKind::Free,
        }
    }
}

struct ClientEnv {
    config: ChainConfig,
    lists: MintingConfig,
    provider: Arc<dyn Provider>,
}

impl ClientEnv {
    fn load() -> Result<Self> {
        let config = ChainConfig::from_env()?;
        let lists = MintingConfig::load_or_default(&config.minting_config)?;
        let provider: Arc<dyn Provider> =
            Arc::new(HttpProvider::new(config.rpc_url.clone()).context("Failed to build RPC client")?);
        Ok(Self {
            config,
            lists,
            provider,
        })
    }

    fn contract(&self) -> Result<MintContract> {
        let address = match self.config.contract_address {
            Some(address) => address,
            None => self.lists.contract_address()?.context(
                "No contract address configured; set CONTRACT_ADDRESS or contract.address in the minting config",
            )?,
        };
        Ok(MintContract::new(Arc::clone(&self.provider), address))
    }

    fn session(&self) -> WalletSession {
        WalletSession::new(
            Some(Arc::clone(&self.provider)),
            NetworkParams::from_config(&self.config),
        )
    }
}

async fn status(ctx: &ClientEnv, account: Option<String>) -> Result<()> {
    let contract = ctx.contract()?;
    let account = match account {
        Some(raw) => Some(Address::parse_strict(&raw).context("Invalid --account address")?),
        None => {
            let mut session = ctx.session();
            if let Err(err) = session.restore().await {
                tracing::debug!("No wallet session to restore: {}", err);
            }
            session.account()
        }
    };

    let snapshot = contract
        .snapshot(account.as_ref())
        .await
        .context("Failed to load contract data")?;

    println!("Contract:        {}", contract.address());
    println!("Sale phase:      {}", snapshot.sale_state);
    println!(
        "Minted:          {} of {} ({:.1}%)",
        snapshot.total_supply,
        snapshot.max_supply,
        progress_percent(snapshot.total_supply, snapshot.max_supply)
    );
    println!("Remaining:       {}", snapshot.remaining_supply);
    println!("Public price:    {} ETH", format_ether(snapshot.public_price));
    println!("Whitelist price: {} ETH", format_ether(snapshot.whitelist_price));
    println!("Free mints left: {}", snapshot.free_mint_remaining);

    if let Some(wallet) = snapshot.wallet {
        let stats = &wallet.stats;
        println!();
        println!("Wallet {}", wallet.account.short());
        println!("  whitelist minted:    {}", stats.whitelist_minted);
        println!("  public minted:       {}", stats.public_minted);
        println!("  free minted:         {}", stats.free_minted);
        println!("  free mint allowance: {}", stats.free_mint_allowance);
        println!("  partner holder:      {}", stats.holds_partner_token);
        let tokens: Vec<String> = wallet.tokens.iter().map(|t| t.to_string()).collect();
        println!("  tokens:              [{}]", tokens.join(", "));
    }
    Ok(())
}

async fn mint(ctx: ClientEnv, kind: MintKind, quantity: MintQuantity) -> Result<()> {
    let contract = ctx.contract()?;
    let mut session = ctx.session();
    let account = session
        .connect()
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to connect wallet")?;

    let price = match kind {
        MintKind::Public => Some(contract.public_price().await?),
        MintKind::Whitelist => Some(contract.whitelist_price().await?),
        MintKind::Free => None,
    };
    match price {
        Some(price) => println!(
            "Minting {} ({}) for {}, total {} ETH",
            quantity,
            kind,
            account.short(),
            total_cost(price, quantity.get())
        ),
        None => println!("Minting {} ({}) for {}", quantity, kind, account.short()),
    }

    let flow = MintFlow::new(contract, ctx.lists.clone());
    let mut updates = flow.subscribe();
    let explorer = ctx.config.clone();
    let printer = tokio::spawn(async move {
        while let Some(status) = updates.changed().await {
            match &status {
                MintStatus::Idle => break,
                MintStatus::Submitted { tx_hash } => {
                    println!("{status}");
                    if let Some(url) = explorer.transaction_url(&tx_hash.to_string()) {
                        println!("  {url}");
                    }
                }
                _ => println!("{status}"),
            }
            if status.is_terminal() {
                break;
            }
        }
    });

    let result = flow.mint(&session, kind, quantity).await;
    if flow.status() == MintStatus::Idle {
        // Refused before anything was sent; no transition will arrive.
        printer.abort();
    } else {
        let _ = printer.await;
    }

    match result {
        Ok(tx_hash) => {
            println!("Transaction: {tx_hash}");
            if let Some(snapshot) = flow.snapshot() {
                println!(
                    "Minted so far:   {} / {}",
                    snapshot.total_supply, snapshot.max_supply
                );
                if let Some(wallet) = snapshot.wallet {
                    println!("Tokens owned:    {}", wallet.tokens.len());
                }
            }
            Ok(())
        }
        Err(err) => bail!("{}", err.user_message()),
    }
}

async fn watch(ctx: &ClientEnv, interval: Duration) -> Result<()> {
    let mut session = ctx.session();
    session.restore().await.context("Failed to query wallet")?;
    println!(
        "Watching {} (chain {:?})",
        session.account().map(|a| a.to_string()).unwrap_or_else(|| "no account".into()),
        session.chain_id()
    );

    let mut events = session.subscribe();
    let mut _watcher = session.spawn_watcher(interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                match session.apply(&event) {
                    SessionAction::Unchanged => {}
                    SessionAction::AccountChanged(account) => println!("Account changed: {account}"),
                    SessionAction::Disconnected => println!("Wallet disconnected"),
                    SessionAction::Reload => {
                        println!("Chain changed, rebuilding session");
                        session = ctx.session();
                        session.restore().await.context("Failed to query wallet")?;
                        if !session.is_correct_network() {
                            println!(
                                "Wallet is on chain {:?}, expected {}",
                                session.chain_id(),
                                session.network().chain_id
                            );
                        }
                        events = session.subscribe();
                        _watcher = session.spawn_watcher(interval);
                    }
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Status { account } => status(&ClientEnv::load()?, account).await?,
        Commands::Mint { kind, quantity } => {
            mint(ClientEnv::load()?, kind.into(), MintQuantity::parse(&quantity)).await?
        }
        Commands::Submit { address } => {
            let config = ChainConfig::from_env()?;
            let client = SubmissionClient::new(&config.api_base_url)?;
            let receipt = client.submit(&address).await?;
            println!("Wallet submitted successfully: {} at {}", receipt.address, receipt.submitted_at);
        }
        Commands::Submissions => {
            let config = ChainConfig::from_env()?;
            let client = SubmissionClient::new(&config.api_base_url)?;
            for submission in client.list().await? {
                println!("{}  {}", submission.submitted_at.to_rfc3339(), submission.address);
            }
        }
        Commands::Watch { interval } => {
            watch(&ClientEnv::load()?, Duration::from_secs(interval.max(1))).await?
        }
    }

    Ok(())
}
