use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::MigrationError;
use crate::ternary::is_trytes;

pub const SEED_LENGTH: usize = 81;

/// One legacy address discovered during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Input {
    pub address: String,
    #[ts(type = "number")]
    pub balance: u64,
    pub spent: bool,
    pub index: u32,
    pub security_level: u8,
    #[serde(default)]
    pub spent_bundle_hashes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct MigrationData {
    pub last_checked_address_index: u32,
    #[ts(type = "number")]
    pub balance: u64,
    pub inputs: Vec<Input>,
    pub spent_addresses: bool,
}

impl MigrationData {
    /// Folds a follow-up scan into this one.
    pub fn merge(&mut self, next: MigrationData) {
        self.balance = self.balance.saturating_add(next.balance);
        self.inputs.extend(next.inputs);
        self.last_checked_address_index = next.last_checked_address_index;
        self.spent_addresses |= next.spent_addresses;
    }
}

/// A group of inputs migrated together in one legacy bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Bundle {
    pub index: u32,
    pub inputs: Vec<Input>,
    pub selected: bool,
    pub should_mine: bool,
    pub selected_to_mine: bool,
    pub mining_runs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub bundle_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub crackability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub trytes: Option<Vec<String>>,
    pub migrated: bool,
    pub confirmed: bool,
}

impl Bundle {
    pub(crate) fn for_spent_input(input: Input) -> Self {
        let should_mine = !input.spent_bundle_hashes.is_empty();
        Self {
            index: 0,
            inputs: vec![input],
            selected: true,
            should_mine,
            selected_to_mine: true,
            mining_runs: 0,
            bundle_hash: None,
            crackability: None,
            trytes: None,
            migrated: false,
            confirmed: false,
        }
    }

    pub(crate) fn for_unspent_inputs(inputs: Vec<Input>) -> Self {
        Self {
            index: 0,
            inputs,
            selected: true,
            should_mine: false,
            selected_to_mine: false,
            mining_runs: 0,
            bundle_hash: None,
            crackability: None,
            trytes: None,
            migrated: false,
            confirmed: false,
        }
    }

    pub fn total_balance(&self) -> u64 {
        self.inputs.iter().map(|input| input.balance).sum()
    }

    pub fn contains_address(&self, address: &str) -> bool {
        self.inputs.iter().any(|input| input.address == address)
    }

    pub fn status(&self) -> BundleStatus {
        if self.confirmed {
            BundleStatus::Confirmed
        } else if self.migrated {
            BundleStatus::Submitted
        } else if self.trytes.is_some() {
            BundleStatus::Signed
        } else if self.mining_runs > 0 {
            BundleStatus::Mining
        } else {
            BundleStatus::Pending
        }
    }
}

/// Lifecycle position of a bundle, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum BundleStatus {
    Pending,
    Mining,
    Signed,
    Submitted,
    Confirmed,
}

/// Legacy seed held for the lifetime of a migration session.
///
/// The inner string is wiped on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LegacySeed(String);

impl LegacySeed {
    pub fn new(seed: impl Into<String>) -> Result<Self, MigrationError> {
        let seed = Self(seed.into());
        if seed.0.len() != SEED_LENGTH || !is_trytes(&seed.0) {
            return Err(MigrationError::protocol(format!(
                "legacy seed must be {SEED_LENGTH} trytes"
            )));
        }
        Ok(seed)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LegacySeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LegacySeed(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MigrationAddress {
    pub bech32: String,
    /// Ternary encoding including the 9-tryte checksum.
    pub trytes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct MigratedTransaction {
    pub address: String,
    #[ts(type = "number")]
    pub balance: u64,
    pub tail_transaction_hash: String,
    pub timestamp: String,
    pub account: u32,
}

/// Signed bundle trytes together with their bundle hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationBundle {
    pub trytes: Vec<String>,
    pub bundle_hash: String,
}

/// Root aggregate of a migration session.
#[derive(Debug, Clone, Default)]
pub struct MigrationState {
    pub did_complete: bool,
    pub data: MigrationData,
    pub seed: Option<LegacySeed>,
    pub bundles: Vec<Bundle>,
}

impl MigrationState {
    pub fn bundle(&self, index: u32) -> Option<&Bundle> {
        self.bundles.iter().find(|bundle| bundle.index == index)
    }

    pub fn bundle_mut(&mut self, index: u32) -> Option<&mut Bundle> {
        self.bundles.iter_mut().find(|bundle| bundle.index == index)
    }
}
