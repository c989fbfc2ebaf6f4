//! Seams to the collaborators the migration engine drives but does not own:
//! address derivation, balance lookups, proof-of-work, signing, the legacy
//! network, the migrator gateway and the wallet.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::MigrationError;
use super::types::{LegacySeed, MigrationAddress};

/// Derives legacy addresses (without checksum) from a seed.
pub trait AddressDeriver: Send + Sync {
    fn derive_address(
        &self,
        seed: &LegacySeed,
        index: u32,
        security_level: u8,
    ) -> Result<String, MigrationError>;
}

/// Reads the balance the migrator contract is willing to migrate for an address.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// `address_hex` is the `0x`-prefixed hex of the address's ASCII bytes.
    async fn migratable_balance(&self, address_hex: &str) -> Result<u64, MigrationError>;
}

/// Address source backed by a hardware device.
#[async_trait]
pub trait LedgerAddressSource: Send + Sync {
    async fn address_at(&self, index: u32) -> Result<String, MigrationError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MiningRequest {
    /// Unsigned bundle trytes, last transaction first.
    pub unsigned_bundle: Vec<String>,
    pub spent_bundle_hashes: Vec<String>,
    pub security_level: u8,
    pub timeout: Duration,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningResult {
    pub bundle: Vec<String>,
    pub crackability: f64,
}

/// Searches for an obsolete tag that lowers the crackability of a bundle
/// whose inputs already signed other bundles.
#[async_trait]
pub trait MiningBackend: Send + Sync {
    async fn mine_bundle(&self, request: MiningRequest) -> Result<MiningResult, MigrationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub address: String,
    pub value: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInput {
    pub address: String,
    pub key_index: u32,
    pub security: u8,
    pub balance: u64,
    /// Obsolete tags of a mined bundle, ordered by transaction value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Seed based signing of a transfer.
#[async_trait]
pub trait TransferPreparer: Send + Sync {
    async fn prepare_transfers(
        &self,
        seed: &LegacySeed,
        transfers: &[Transfer],
        inputs: &[TransferInput],
    ) -> Result<Vec<String>, MigrationError>;
}

/// Hardware device signing. `now_millis` pins the issuance timestamp so a
/// mined bundle keeps its hash.
#[async_trait]
pub trait LedgerTransferPreparer: Send + Sync {
    async fn prepare_transfers(
        &self,
        transfers: &[Transfer],
        inputs: &[TransferInput],
        now_millis: Option<i64>,
    ) -> Result<Vec<String>, MigrationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMigrationBundleResponse {
    pub address: String,
    pub value: u64,
    pub tail_transaction_hash: String,
}

/// Broadcast to legacy nodes.
#[async_trait]
pub trait LegacyNetwork: Send + Sync {
    async fn send_migration_bundle(
        &self,
        nodes: &[String],
        bundle_hash: &str,
        minimum_weight_magnitude: u32,
    ) -> Result<SendMigrationBundleResponse, MigrationError>;

    async fn send_ledger_migration_bundle(
        &self,
        nodes: &[String],
        trytes: &[String],
        minimum_weight_magnitude: u32,
    ) -> Result<SendMigrationBundleResponse, MigrationError>;

    /// Returns `address` with its 9-tryte checksum appended.
    async fn address_with_checksum(&self, address: &str) -> Result<String, MigrationError>;
}

/// Receipt of an off-ledger request once the chain processed it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestReceipt {
    #[serde(rename = "errorMessage", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Migrator gateway on the new ledger.
#[async_trait]
pub trait OffLedgerGateway: Send + Sync {
    async fn submit_off_ledger_request(&self, request_hex: &str) -> Result<(), MigrationError>;

    async fn wait_for_receipt(&self, request_id: &str) -> Result<RequestReceipt, MigrationError>;
}

/// Wallet side of the new ledger.
#[async_trait]
pub trait WalletApi: Send + Sync {
    async fn migration_address(&self, account_index: u32)
        -> Result<MigrationAddress, MigrationError>;
}
