use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use legacy_migration::config::{chain_id_to_hex, MigrationConfig};
use legacy_migration::migration::offledger::{
    encode_off_ledger_request, RequestTarget, CONTRACT_ENTRY_POINT, CONTRACT_HNAME,
};

#[derive(Parser)]
#[command(name = "offledger_request", about = "Legacy migration off-ledger request helper")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Encode signed bundle trytes into an off-ledger request
    #[command(about, long_about = None)]
    Encode {
        /// JSON file holding an array of transaction trytes
        #[arg(long, value_name = "PATH")]
        bundle: PathBuf,
        /// Target chain id, bech32 or hex; defaults to the configured chain
        #[arg(long, value_name = "ID")]
        chain_id: Option<String>,
        #[arg(long, default_value = CONTRACT_HNAME)]
        hname: String,
        #[arg(long, default_value = CONTRACT_ENTRY_POINT)]
        entry_point: String,
    },
    /// Print the hex alias id of a bech32 chain id
    #[command(name = "chain-id", about, long_about = None)]
    ChainId {
        /// Bech32 chain id; defaults to the configured chain
        chain_id: Option<String>,
    },
}

fn resolve_chain_hex(chain_id: Option<String>) -> Result<String> {
    let chain_id = chain_id.unwrap_or_else(|| MigrationConfig::from_env(false).chain_id);
    if let Some(hex) = chain_id.strip_prefix("0x") {
        return Ok(hex.to_string());
    }
    chain_id_to_hex(&chain_id).with_context(|| format!("decode chain id {chain_id}"))
}

fn main() -> Result<()> {
    legacy_migration::logging::init();
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Encode {
            bundle,
            chain_id,
            hname,
            entry_point,
        } => {
            let raw = fs::read_to_string(&bundle)
                .with_context(|| format!("read bundle file {}", bundle.display()))?;
            let trytes: Vec<String> =
                serde_json::from_str(&raw).context("bundle file must be a JSON array of trytes")?;
            let target = RequestTarget {
                chain_id_hex: resolve_chain_hex(chain_id)?,
                contract_hname: hname,
                entry_point,
            };
            let request = encode_off_ledger_request(&trytes, &target)?;
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        Cmd::ChainId { chain_id } => {
            println!("{}", resolve_chain_hex(chain_id)?);
        }
    }
    Ok(())
}
