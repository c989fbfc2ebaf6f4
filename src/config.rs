use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::migration::chunker::{ChunkingPolicy, HARDWARE_MAX_INPUTS, SOFTWARE_MAX_INPUTS};
use crate::migration::offledger::{RequestTarget, CONTRACT_ENTRY_POINT, CONTRACT_HNAME};
use crate::migration::{MigrationError, MINING_TIMEOUT_SECONDS};

pub const MIGRATOR_BASE_URL: &str = "https://migrator-api.iota-alphanet.iotaledger.net";
pub const MIGRATOR_CHAIN_ID: &str =
    "atoi1ppvjyr3nz8mwd6h7pahtgf4emcd3z9kpgys6hn2w5mnahmxu4t2gwvgxd92";
pub const MIGRATION_NODES: [&str; 2] = ["https://nodes.iota.org", "https://nodes.iota.cafe"];
pub const PERMANODE: &str = "https://chronicle.iota.org/api";
pub const MINIMUM_WEIGHT_MAGNITUDE: u32 = 14;
pub const MINIMUM_MIGRATABLE_AMOUNT: u64 = 1_000_000;
pub const CHRYSALIS_VARIABLES_ENDPOINT: &str =
    "https://raw.githubusercontent.com/iotaledger/firefly/main/packages/shared/lib/chrysalis.json";
pub const CHRYSALIS_VARIABLES_TIMEOUT: Duration = Duration::from_millis(5_000);
pub const CHRYSALIS_POLL_INTERVAL: Duration = Duration::from_millis(60_000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const RECEIPT_WAIT_SECONDS: u32 = 5;

/// Which signer holds the legacy keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SetupKind {
    Software,
    Ledger,
}

impl SetupKind {
    pub fn max_inputs_per_bundle(self) -> usize {
        match self {
            SetupKind::Software => SOFTWARE_MAX_INPUTS,
            SetupKind::Ledger => HARDWARE_MAX_INPUTS,
        }
    }
}

/// Endpoints and policy knobs for one migration session.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationConfig {
    pub base_url: String,
    /// Bech32 id of the chain hosting the migrator contract.
    pub chain_id: String,
    pub contract_hname: String,
    pub contract_entry_point: String,
    pub legacy_nodes: Vec<String>,
    pub permanode: String,
    pub minimum_weight_magnitude: u32,
    pub mining_timeout: Duration,
    pub request_timeout: Duration,
    pub receipt_wait_seconds: u32,
    pub setup: SetupKind,
    pub minimum_migration_balance: u64,
    pub minimum_migratable_amount: u64,
    pub snapshot_endpoint: String,
    pub snapshot_timeout: Duration,
    pub snapshot_poll_interval: Duration,
}

impl MigrationConfig {
    pub fn production() -> Self {
        Self {
            base_url: MIGRATOR_BASE_URL.to_string(),
            chain_id: MIGRATOR_CHAIN_ID.to_string(),
            contract_hname: CONTRACT_HNAME.to_string(),
            contract_entry_point: CONTRACT_ENTRY_POINT.to_string(),
            legacy_nodes: MIGRATION_NODES.iter().map(|node| node.to_string()).collect(),
            permanode: PERMANODE.to_string(),
            minimum_weight_magnitude: MINIMUM_WEIGHT_MAGNITUDE,
            mining_timeout: Duration::from_secs(MINING_TIMEOUT_SECONDS),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            receipt_wait_seconds: RECEIPT_WAIT_SECONDS,
            setup: SetupKind::Software,
            minimum_migration_balance: 0,
            minimum_migratable_amount: MINIMUM_MIGRATABLE_AMOUNT,
            snapshot_endpoint: CHRYSALIS_VARIABLES_ENDPOINT.to_string(),
            snapshot_timeout: CHRYSALIS_VARIABLES_TIMEOUT,
            snapshot_poll_interval: CHRYSALIS_POLL_INTERVAL,
        }
    }

    /// Developer builds currently target the same migrator deployment.
    pub fn develop() -> Self {
        Self::production()
    }

    /// Preset chosen by `developer`, then `LEGACY_MIGRATION_*` overrides.
    pub fn from_env(developer: bool) -> Self {
        let preset = if developer {
            Self::develop()
        } else {
            Self::production()
        };
        preset.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; unparsable or zero numbers keep the
    /// preset value.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str| text(key).and_then(|v| v.parse::<u64>().ok()).filter(|v| *v > 0);

        if let Some(url) = text("LEGACY_MIGRATION_BASE_URL") {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(chain) = text("LEGACY_MIGRATION_CHAIN_ID") {
            self.chain_id = chain;
        }
        if let Some(nodes) = text("LEGACY_MIGRATION_NODES") {
            let nodes: Vec<String> = nodes
                .split(',')
                .map(str::trim)
                .filter(|node| !node.is_empty())
                .map(str::to_string)
                .collect();
            if !nodes.is_empty() {
                self.legacy_nodes = nodes;
            }
        }
        if let Some(mwm) = number("LEGACY_MIGRATION_MWM").and_then(|v| u32::try_from(v).ok()) {
            self.minimum_weight_magnitude = mwm;
        }
        if let Some(secs) = number("LEGACY_MIGRATION_MINING_TIMEOUT_SECS") {
            self.mining_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = number("LEGACY_MIGRATION_REQUEST_TIMEOUT_MS") {
            self.request_timeout = Duration::from_millis(ms);
        }
        if let Some(balance) = text("LEGACY_MIGRATION_MIN_BALANCE").and_then(|v| v.parse().ok()) {
            self.minimum_migration_balance = balance;
        }
        match text("LEGACY_MIGRATION_SETUP").as_deref() {
            Some("ledger") => self.setup = SetupKind::Ledger,
            Some("software") => self.setup = SetupKind::Software,
            Some(other) => tracing::warn!(
                target: "legacy_migration",
                event = "config_invalid_setup",
                value = other,
                "ignoring unknown setup kind"
            ),
            None => {}
        }
        self
    }

    pub fn chunking_policy(&self) -> ChunkingPolicy {
        ChunkingPolicy {
            max_inputs_per_bundle: self.setup.max_inputs_per_bundle(),
            minimum_migration_balance: self.minimum_migration_balance,
        }
    }

    pub fn chain_id_hex(&self) -> Result<String, MigrationError> {
        chain_id_to_hex(&self.chain_id)
    }

    pub fn request_target(&self) -> Result<RequestTarget, MigrationError> {
        Ok(RequestTarget {
            chain_id_hex: self.chain_id_hex()?,
            contract_hname: self.contract_hname.clone(),
            entry_point: self.contract_entry_point.clone(),
        })
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::production()
    }
}

/// Hex of the chain's alias id: the bech32 payload without its leading
/// address-kind byte.
pub fn chain_id_to_hex(chain_id: &str) -> Result<String, MigrationError> {
    let (_, data) = bech32::decode(chain_id)
        .map_err(|err| MigrationError::Encoding(format!("chain id: {err}")))?;
    match data.split_first() {
        Some((_, id)) if !id.is_empty() => Ok(hex::encode(id)),
        _ => Err(MigrationError::Encoding("chain id carries no payload".into())),
    }
}
