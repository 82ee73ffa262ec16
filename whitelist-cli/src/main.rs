use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::EnvFilter;

use allowlist_common::{bytes32_to_hex, hash_leaf, hex_to_bytes32, verify_proof, Address, AllowList};
use whitelist_cli::{merge_into_minting_config, read_address_file, write_file_atomic, WhitelistFile};

#[derive(Parser, Debug)]
#[command(name = "whitelist")]
#[command(about = "Build and check Merkle allow-lists", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the tree and write whitelist.json
    Build {
        /// Addresses, one per line or a JSON array
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for root and proofs
        #[arg(short, long, default_value = "whitelist.json")]
        output: PathBuf,

        /// Also write the entries into this minting config
        #[arg(long)]
        minting_config: Option<PathBuf>,

        /// Which minting config list to replace
        #[arg(long, value_enum, default_value_t = ListArg::Whitelist)]
        list: ListArg,

        /// Contract address to record in the minting config
        #[arg(long)]
        contract: Option<String>,
    },
    /// Print the proof for one address
    Proof {
        #[arg(short, long, default_value = "whitelist.json")]
        whitelist: PathBuf,

        #[arg(short, long)]
        address: String,
    },
    /// Check a proof against a root; exits non-zero when it does not verify
    Verify {
        #[arg(long)]
        root: String,

        #[arg(long)]
        address: String,

        /// Proof nodes in order, leaf to root
        #[arg(long, num_args = 0..)]
        proof: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ListArg {
    Whitelist,
    #[value(name = "freeMint", alias = "free-mint")]
    FreeMint,
}

impl ListArg {
    fn key(self) -> &'static str {
        match self {
            ListArg::Whitelist => "whitelist",
            ListArg::FreeMint => "freeMint",
        }
    }
}

fn parse_address(raw: &str) -> Result<Address> {
    Address::parse_strict(raw).with_context(|| format!("Invalid address {raw:?}"))
}

fn build(
    input: PathBuf,
    output: PathBuf,
    minting_config: Option<PathBuf>,
    list: ListArg,
    contract: Option<String>,
) -> Result<()> {
    let contract = contract.as_deref().map(parse_address).transpose()?;

    println!("Reading addresses from {:?}...", input);
    let addresses = read_address_file(&input)?;
    let total = addresses.len();

    let allow_list = AllowList::build(addresses).context("Failed to build Merkle tree")?;
    if allow_list.len() != total {
        tracing::warn!("Dropped {} duplicate address(es)", total - allow_list.len());
    }
    println!("Total addresses: {}", allow_list.len());
    println!("Merkle root: {}", bytes32_to_hex(&allow_list.root()));

    let file = WhitelistFile::from_allow_list(&allow_list);
    let rendered = serde_json::to_string_pretty(&file).context("Failed to serialize whitelist")?;
    write_file_atomic(&output, &rendered)?;
    println!("Whitelist saved to {:?}", output);

    if let Some(path) = minting_config {
        merge_into_minting_config(&path, list.key(), &allow_list, contract.as_ref())?;
        println!("Updated lists.{} in {:?}", list.key(), path);
    }
    Ok(())
}

fn proof(whitelist: PathBuf, address: String) -> Result<()> {
    let address = parse_address(&address)?;
    let file = WhitelistFile::load(&whitelist)?;
    let Some(proof) = file.proof_for(&address)? else {
        bail!("{} is not in {:?}", address, whitelist);
    };

    println!("Merkle root: {}", file.merkle_root);
    let nodes: Vec<String> = proof.iter().map(bytes32_to_hex).collect();
    println!("{}", serde_json::to_string_pretty(&nodes)?);
    Ok(())
}

fn verify(root: String, address: String, proof: Vec<String>) -> Result<()> {
    let root = hex_to_bytes32(&root).map_err(|e| anyhow::anyhow!("Invalid root {root:?}: {e}"))?;
    let address = parse_address(&address)?;
    let proof = proof
        .iter()
        .map(|node| hex_to_bytes32(node).map_err(|e| anyhow::anyhow!("Invalid proof node {node:?}: {e}")))
        .collect::<Result<Vec<_>>>()?;

    if !verify_proof(hash_leaf(&address), &proof, root) {
        bail!("Proof does not verify for {}", address);
    }
    println!("Proof verifies for {}", address);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            minting_config,
            list,
            contract,
        } => build(input, output, minting_config, list, contract)?,
        Commands::Proof { whitelist, address } => proof(whitelist, address)?,
        Commands::Verify {
            root,
            address,
            proof,
        } => verify(root, address, proof)?,
    }

    Ok(())
}
