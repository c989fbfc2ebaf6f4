use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::codec::{self, UnsignedInput, ADDRESS_TRYTES_LENGTH, CHECKSUM_LENGTH};
use super::error::MigrationError;
use super::log::{ExportedLog, MigrationLogPatch};
use super::miner;
use super::offledger;
use super::ports::{
    AddressDeriver, BalanceOracle, LedgerAddressSource, LedgerTransferPreparer, LegacyNetwork,
    MiningBackend, MiningRequest, OffLedgerGateway, RequestReceipt, SendMigrationBundleResponse,
    Transfer, TransferInput, TransferPreparer, WalletApi,
};
use super::projections::{self, MigrationSummary};
use super::scanner::{self, ADDRESS_SECURITY_LEVEL, FIXED_ADDRESSES_GENERATED};
use super::store::MigrationStore;
use super::types::{
    Bundle, LegacySeed, MigratedTransaction, MigrationAddress, MigrationBundle, MigrationData,
};
use crate::config::MigrationConfig;
use crate::ternary::is_trytes;

/// Tag carried by hardware-signed migration transfers.
const LEDGER_TRANSFER_TAG: &str = "UUUUUUUUUUUUUUUUUUUUUUUUUUU";
/// Every migration address on the legacy ledger starts with this prefix.
const MIGRATION_ADDRESS_PREFIX: &str = "TRANSFER";
const CONFIRMED_EVENT: &str = "TransactionConfirmed";

/// External services the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub deriver: Arc<dyn AddressDeriver>,
    pub oracle: Arc<dyn BalanceOracle>,
    pub ledger_addresses: Arc<dyn LedgerAddressSource>,
    pub miner: Arc<dyn MiningBackend>,
    pub preparer: Arc<dyn TransferPreparer>,
    pub ledger_preparer: Arc<dyn LedgerTransferPreparer>,
    pub legacy: Arc<dyn LegacyNetwork>,
    pub gateway: Arc<dyn OffLedgerGateway>,
    pub wallet: Arc<dyn WalletApi>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningOutcome {
    pub improved: bool,
    pub timed_out: bool,
    pub mining_runs: u32,
    pub crackability: Option<f64>,
}

/// Wallet progress event as delivered by the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ProgressEvent {
    pub fn transaction_confirmed(bundle_hash: &str) -> Self {
        Self {
            kind: CONFIRMED_EVENT.to_string(),
            data: serde_json::json!({ "bundleHash": bundle_hash }),
        }
    }

    fn confirmed_bundle_hash(&self) -> Option<&str> {
        if self.kind != CONFIRMED_EVENT {
            return None;
        }
        self.data.get("bundleHash").and_then(serde_json::Value::as_str)
    }
}

/// Drives one migration session from scan to confirmation.
pub struct MigrationOrchestrator {
    config: MigrationConfig,
    ports: Collaborators,
    store: MigrationStore,
    listening: AtomicBool,
}

impl MigrationOrchestrator {
    pub fn new(config: MigrationConfig, ports: Collaborators) -> Self {
        Self {
            config,
            ports,
            store: MigrationStore::new(),
            listening: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn store(&self) -> &MigrationStore {
        &self.store
    }

    pub fn summary(&self) -> MigrationSummary {
        let minimum = self.config.minimum_migration_balance;
        self.store
            .read(|state| MigrationSummary::from_state(state, minimum))
    }

    // --- discovery ---

    /// Scans the next window of seed addresses. A zero `initial_index`
    /// starts a fresh session, anything else extends the current one.
    pub async fn get_migration_data(
        &self,
        seed: LegacySeed,
        initial_index: u32,
    ) -> Result<MigrationData, MigrationError> {
        let data = scanner::scan_seed(
            self.ports.deriver.as_ref(),
            self.ports.oracle.as_ref(),
            &seed,
            initial_index,
            FIXED_ADDRESSES_GENERATED,
            ADDRESS_SECURITY_LEVEL,
        )
        .await?;
        self.store_scan(Some(seed), data, initial_index);
        self.prepare_bundles();
        Ok(self.store.read(|state| state.data.clone()))
    }

    /// Hardware variant of [`Self::get_migration_data`]: scans device
    /// batches until the address gap is reached.
    pub async fn get_ledger_migration_data(
        &self,
        initial_index: u32,
    ) -> Result<MigrationData, MigrationError> {
        let data = scanner::scan_ledger_until_gap(
            self.ports.ledger_addresses.as_ref(),
            self.ports.oracle.as_ref(),
            initial_index,
        )
        .await?;
        self.store_scan(None, data, initial_index);
        self.prepare_bundles();
        Ok(self.store.read(|state| state.data.clone()))
    }

    fn store_scan(&self, seed: Option<LegacySeed>, data: MigrationData, initial_index: u32) {
        self.store.update(|state| {
            if initial_index == 0 {
                state.data = data;
                state.seed = seed;
            } else {
                state.data.merge(data);
                if state.seed.is_none() {
                    state.seed = seed;
                }
            }
        });
    }

    /// Rebuilds every bundle from the current scan data. Per-bundle progress
    /// (mining results, migrated and confirmed flags) is not carried over.
    pub fn prepare_bundles(&self) {
        let policy = self.config.chunking_policy();
        let (count, stranded) = self.store.update(|state| {
            state.bundles = super::chunker::prepare_bundles(&state.data, &policy);
            (
                state.bundles.len(),
                projections::stranded_balance(
                    &state.data,
                    &state.bundles,
                    policy.minimum_migration_balance,
                ),
            )
        });
        tracing::info!(
            target: "legacy_migration",
            event = "bundles_prepared",
            bundles = count,
            "prepared migration bundles"
        );
        if let Some(report) = stranded {
            tracing::warn!(
                target: "legacy_migration",
                event = "balance_not_migratable",
                error = %report,
                "part of the scanned balance is not in any bundle"
            );
        }
    }

    pub fn find_migration_bundle(&self, index: u32) -> Result<Bundle, MigrationError> {
        self.store
            .read(|state| state.bundle(index).cloned())
            .ok_or(MigrationError::MissingBundle(index))
    }

    // --- addresses ---

    /// Asks the wallet for the deposit address: account 0 for software
    /// profiles, the next migration account for hardware ones.
    pub async fn generate_migration_address(
        &self,
        ledger: bool,
        ledger_migration_count: u32,
    ) -> Result<MigrationAddress, MigrationError> {
        let account = if ledger { ledger_migration_count } else { 0 };
        let address = self.ports.wallet.migration_address(account).await?;
        self.store.set_migration_address(address.clone());
        Ok(address)
    }

    /// Last 9 trytes of the checksummed form of `address`.
    pub async fn address_checksum(
        &self,
        address: &str,
        legacy: bool,
    ) -> Result<String, MigrationError> {
        let with_checksum = if legacy || address.len() == ADDRESS_TRYTES_LENGTH {
            self.ports.legacy.address_with_checksum(address).await?
        } else {
            address.to_string()
        };
        if !is_trytes(&with_checksum) {
            return Err(MigrationError::protocol("checksummed address is not trytes"));
        }
        let start = with_checksum
            .len()
            .checked_sub(CHECKSUM_LENGTH)
            .ok_or_else(|| MigrationError::protocol("address is shorter than its checksum"))?;
        Ok(with_checksum[start..].to_string())
    }

    fn migration_address(&self) -> Result<MigrationAddress, MigrationError> {
        self.store
            .migration_address()
            .ok_or_else(|| MigrationError::protocol("migration address has not been generated"))
    }

    // --- signing ---

    /// Transfer moving every input of `bundle` to `address`, raised to the
    /// minimum migratable amount by crediting the smallest input.
    fn plan_transfer(
        &self,
        bundle: &Bundle,
        address: String,
        tag: Option<String>,
    ) -> (Transfer, Vec<TransferInput>) {
        let mut inputs: Vec<TransferInput> = bundle
            .inputs
            .iter()
            .map(|input| TransferInput {
                address: input.address.clone(),
                key_index: input.index,
                security: input.security_level,
                balance: input.balance,
                tags: Vec::new(),
            })
            .collect();
        let total = bundle.total_balance();
        let mut value = total;

        let minimum = self.config.minimum_migratable_amount;
        if total < minimum {
            let top_up = minimum - total;
            if let Some(smallest) = inputs.iter_mut().min_by_key(|input| input.balance) {
                smallest.balance += top_up;
                value += top_up;
            }
            tracing::debug!(
                target: "legacy_migration",
                event = "transfer_topped_up",
                bundle = bundle.index,
                top_up,
                "raised transfer to the minimum migratable amount"
            );
        }

        (Transfer { address, value, tag }, inputs)
    }

    /// Signs a bundle with the session seed. The signed hash replaces any
    /// assigned one; a crackability recorded for a different hash is dropped.
    pub async fn create_migration_bundle(
        &self,
        bundle_index: u32,
    ) -> Result<MigrationBundle, MigrationError> {
        let bundle = self.find_migration_bundle(bundle_index)?;
        let seed = self
            .store
            .read(|state| state.seed.clone())
            .ok_or_else(|| MigrationError::protocol("no legacy seed in the migration session"))?;
        let address = self.migration_address()?;
        let (transfer, inputs) =
            self.plan_transfer(&bundle, codec::remove_checksum(&address.trytes).to_string(), None);

        let trytes = self
            .ports
            .preparer
            .prepare_transfers(&seed, &[transfer], &inputs)
            .await?;
        let bundle_hash = codec::bundle_hash(&trytes)?;
        self.store.update(|state| {
            if let Some(bundle) = state.bundle_mut(bundle_index) {
                // a score only describes the hash it was mined for
                if bundle.bundle_hash.as_deref() != Some(bundle_hash.as_str()) {
                    bundle.crackability = None;
                }
                bundle.trytes = Some(trytes.clone());
                bundle.bundle_hash = Some(bundle_hash.clone());
            }
        });
        Ok(MigrationBundle {
            trytes,
            bundle_hash,
        })
    }

    /// Signs a bundle on the hardware device.
    pub async fn create_ledger_migration_bundle(
        &self,
        bundle_index: u32,
    ) -> Result<MigrationBundle, MigrationError> {
        let bundle = self.find_migration_bundle(bundle_index)?;
        let address = self.migration_address()?;
        let (transfer, inputs) = self.plan_transfer(
            &bundle,
            address.trytes.clone(),
            Some(LEDGER_TRANSFER_TAG.to_string()),
        );

        let trytes = self
            .ports
            .ledger_preparer
            .prepare_transfers(&[transfer], &inputs, None)
            .await?;
        let bundle_hash = codec::bundle_hash(&trytes)?;
        self.update_ledger_bundle_state(bundle_index, trytes.clone(), false, None)?;
        Ok(MigrationBundle {
            trytes,
            bundle_hash,
        })
    }

    // --- mining ---

    /// Runs one mining attempt for a spent-address bundle and keeps the
    /// result only if it lowers the stored crackability. A timed out attempt
    /// still counts as a run and leaves the best result in place.
    pub async fn mine_ledger_bundle(
        &self,
        bundle_index: u32,
        offset: u64,
    ) -> Result<MiningOutcome, MigrationError> {
        let bundle = self.find_migration_bundle(bundle_index)?;
        let address = self.migration_address()?;
        let inputs: Vec<UnsignedInput> = bundle
            .inputs
            .iter()
            .map(|input| UnsignedInput {
                address: input.address.clone(),
                balance: input.balance,
                security_level: input.security_level,
            })
            .collect();
        let timestamp = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        let mut unsigned = codec::create_unsigned_bundle(
            codec::remove_checksum(&address.trytes),
            &inputs,
            bundle.total_balance(),
            timestamp,
        )?;
        unsigned.reverse();

        let request = MiningRequest {
            unsigned_bundle: unsigned,
            spent_bundle_hashes: bundle
                .inputs
                .iter()
                .flat_map(|input| input.spent_bundle_hashes.iter().cloned())
                .collect(),
            security_level: ADDRESS_SECURITY_LEVEL,
            timeout: self.config.mining_timeout,
            offset,
        };

        match miner::run_mining(self.ports.miner.as_ref(), request).await {
            Ok(result) => {
                let crackability = result.crackability;
                let improved = self.update_ledger_bundle_state(
                    bundle_index,
                    result.bundle,
                    true,
                    Some(crackability),
                )?;
                let stored = self.find_migration_bundle(bundle_index)?;
                tracing::info!(
                    target: "legacy_migration",
                    event = "bundle_mined",
                    bundle = bundle_index,
                    crackability,
                    improved,
                    runs = stored.mining_runs,
                    "mining run finished"
                );
                Ok(MiningOutcome {
                    improved,
                    timed_out: false,
                    mining_runs: stored.mining_runs,
                    crackability: stored.crackability,
                })
            }
            Err(err @ MigrationError::MiningTimeout(_)) => {
                let stored = self
                    .store
                    .update(|state| {
                        state.bundle_mut(bundle_index).map(|bundle| {
                            bundle.mining_runs += 1;
                            bundle.clone()
                        })
                    })
                    .ok_or(MigrationError::MissingBundle(bundle_index))?;
                tracing::warn!(
                    target: "legacy_migration",
                    event = "mining_timed_out",
                    bundle = bundle_index,
                    error = %err,
                    "keeping best known mining result"
                );
                Ok(MiningOutcome {
                    improved: false,
                    timed_out: true,
                    mining_runs: stored.mining_runs,
                    crackability: stored.crackability,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Signs a mined bundle on the hardware device, reusing its obsolete tags
    /// and timestamp so the bundle hash does not change.
    pub async fn create_mined_ledger_migration_bundle(
        &self,
        bundle_index: u32,
    ) -> Result<MigrationBundle, MigrationError> {
        let bundle = self.find_migration_bundle(bundle_index)?;
        let trytes = bundle
            .trytes
            .as_ref()
            .ok_or_else(|| MigrationError::protocol("bundle has not been mined"))?;
        let transactions = codec::decode_bundle(trytes)?;
        let output = transactions
            .iter()
            .find(|tx| tx.address.starts_with(MIGRATION_ADDRESS_PREFIX))
            .ok_or_else(|| MigrationError::protocol("mined bundle has no transfer transaction"))?;
        let transfer = Transfer {
            address: output.address.clone(),
            value: u64::try_from(output.value)
                .map_err(|_| MigrationError::protocol("transfer value is negative"))?,
            tag: Some(output.obsolete_tag.clone()),
        };

        let inputs: Vec<TransferInput> = bundle
            .inputs
            .iter()
            .map(|input| {
                let mut own: Vec<_> = transactions
                    .iter()
                    .filter(|tx| tx.address == input.address)
                    .collect();
                own.sort_by_key(|tx| tx.value);
                TransferInput {
                    address: input.address.clone(),
                    key_index: input.index,
                    security: input.security_level,
                    balance: input.balance,
                    tags: own.into_iter().map(|tx| tx.obsolete_tag.clone()).collect(),
                }
            })
            .collect();
        let now_millis = transactions.first().map(|tx| tx.timestamp * 1000);

        let signed = self
            .ports
            .ledger_preparer
            .prepare_transfers(&[transfer], &inputs, now_millis)
            .await?;
        let bundle_hash = codec::bundle_hash(&signed)?;
        self.update_ledger_bundle_state(bundle_index, signed.clone(), false, None)?;
        Ok(MigrationBundle {
            trytes: signed,
            bundle_hash,
        })
    }

    /// Stores trytes produced for a hardware bundle. Returns whether the
    /// stored result changed.
    pub fn update_ledger_bundle_state(
        &self,
        bundle_index: u32,
        trytes: Vec<String>,
        did_mine: bool,
        crackability: Option<f64>,
    ) -> Result<bool, MigrationError> {
        let bundle_hash = codec::bundle_hash(&trytes)?;
        self.store.update(|state| {
            let bundle = state
                .bundle_mut(bundle_index)
                .ok_or(MigrationError::MissingBundle(bundle_index))?;
            Ok(miner::apply_ledger_result(
                bundle,
                trytes,
                bundle_hash,
                crackability,
                did_mine,
            ))
        })
    }

    /// Records a bundle hash mined for the software bundle made of exactly
    /// the inputs in `input_indexes`.
    pub fn assign_bundle_hash(
        &self,
        input_indexes: &[u32],
        bundle_hash: &str,
        crackability: Option<f64>,
        did_mine: bool,
    ) -> Result<bool, MigrationError> {
        self.store.update(|state| {
            let bundle = state
                .bundles
                .iter_mut()
                .find(|bundle| {
                    !bundle.inputs.is_empty()
                        && bundle
                            .inputs
                            .iter()
                            .all(|input| input_indexes.contains(&input.index))
                })
                .ok_or_else(|| {
                    MigrationError::protocol("no bundle matches the mined input indexes")
                })?;
            Ok(miner::apply_assigned_hash(
                bundle,
                bundle_hash.to_string(),
                crackability,
                did_mine,
            ))
        })
    }

    pub fn toggle_mining_selection(&self, address: &str) -> bool {
        self.store.update(|state| {
            match state
                .bundles
                .iter_mut()
                .find(|bundle| bundle.contains_address(address))
            {
                Some(bundle) => {
                    bundle.selected_to_mine = !bundle.selected_to_mine;
                    true
                }
                None => false,
            }
        })
    }

    pub fn select_all_addresses_for_mining(&self) {
        self.store.update(|state| {
            for bundle in state.bundles.iter_mut().filter(|bundle| bundle.should_mine) {
                bundle.selected_to_mine = true;
            }
        });
    }

    // --- submission ---

    /// Broadcasts a seed-signed bundle to the legacy nodes.
    pub async fn send_migration_bundle(
        &self,
        bundle_hash: &str,
        minimum_weight_magnitude: Option<u32>,
    ) -> Result<SendMigrationBundleResponse, MigrationError> {
        let mwm = minimum_weight_magnitude.unwrap_or(self.config.minimum_weight_magnitude);
        let response = self
            .ports
            .legacy
            .send_migration_bundle(&self.config.legacy_nodes, bundle_hash, mwm)
            .await?;
        self.mark_migrated(bundle_hash, &response);
        Ok(response)
    }

    /// Broadcasts device-signed trytes and records them in the migration log.
    pub async fn send_ledger_migration_bundle(
        &self,
        bundle_hash: &str,
        trytes: Vec<String>,
    ) -> Result<SendMigrationBundleResponse, MigrationError> {
        let response = self
            .ports
            .legacy
            .send_ledger_migration_bundle(
                &self.config.legacy_nodes,
                &trytes,
                self.config.minimum_weight_magnitude,
            )
            .await?;
        self.prepare_migration_log(bundle_hash, trytes, response.value)?;
        self.mark_migrated(bundle_hash, &response);
        Ok(response)
    }

    fn mark_migrated(&self, bundle_hash: &str, response: &SendMigrationBundleResponse) {
        let matched = self.store.update(|state| {
            let mut matched = 0;
            for bundle in state
                .bundles
                .iter_mut()
                .filter(|bundle| bundle.bundle_hash.as_deref() == Some(bundle_hash))
            {
                bundle.migrated = true;
                matched += 1;
            }
            matched
        });
        if matched == 0 {
            tracing::warn!(
                target: "legacy_migration",
                event = "broadcast_unknown_bundle",
                bundle_hash,
                "broadcast bundle does not match any migration bundle"
            );
        }
        self.store.record_migrated_transaction(MigratedTransaction {
            address: response.address.clone(),
            balance: response.value,
            tail_transaction_hash: response.tail_transaction_hash.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            account: 0,
        });
        tracing::info!(
            target: "legacy_migration",
            event = "bundle_broadcast",
            bundle_hash,
            value = response.value,
            "migration bundle broadcast"
        );
    }

    /// Submits signed trytes to the migrator contract and waits for the
    /// receipt. A clean receipt marks the bundle migrated and confirmed.
    pub async fn send_off_ledger_migration_request(
        &self,
        trytes: Vec<String>,
        bundle_index: u32,
    ) -> Result<RequestReceipt, MigrationError> {
        let bundle = self.find_migration_bundle(bundle_index)?;
        let target = self.config.request_target()?;
        let request = offledger::encode_off_ledger_request(&trytes, &target)?;

        self.ports
            .gateway
            .submit_off_ledger_request(&request.request)
            .await?;
        let receipt = self
            .ports
            .gateway
            .wait_for_receipt(&request.request_id)
            .await?;
        if let Some(message) = receipt
            .error_message
            .clone()
            .filter(|message| !message.is_empty())
        {
            tracing::warn!(
                target: "legacy_migration",
                event = "offledger_request_failed",
                request_id = %request.request_id,
                error = %message,
                "migrator rejected the request"
            );
            return Err(MigrationError::RequestRejected {
                status: None,
                message,
            });
        }

        let bundle_hash = codec::bundle_hash(&trytes)?;
        self.prepare_migration_log(&bundle_hash, trytes, bundle.total_balance())?;
        self.store.update(|state| {
            if let Some(bundle) = state.bundle_mut(bundle_index) {
                bundle.migrated = true;
                bundle.confirmed = true;
            }
        });
        tracing::info!(
            target: "legacy_migration",
            event = "offledger_request_confirmed",
            bundle = bundle_index,
            request_id = %request.request_id,
            "migration request processed"
        );
        Ok(receipt)
    }

    // --- confirmation ---

    /// Applies one progress event; returns whether a bundle was confirmed.
    pub fn apply_progress_event(&self, event: &ProgressEvent) -> bool {
        let Some(hash) = event.confirmed_bundle_hash() else {
            return false;
        };
        self.store.update(|state| {
            let mut confirmed = false;
            for bundle in state
                .bundles
                .iter_mut()
                .filter(|bundle| bundle.bundle_hash.as_deref() == Some(hash))
            {
                bundle.confirmed = true;
                confirmed = true;
            }
            confirmed
        })
    }

    /// Starts the confirmation listener. Only the first call spawns a task;
    /// later calls return `None`.
    pub fn initialise_migration_listeners(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<ProgressEvent>,
    ) -> Option<JoinHandle<()>> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return None;
        }
        let orchestrator = Arc::clone(self);
        Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if orchestrator.apply_progress_event(&event) {
                    tracing::info!(
                        target: "legacy_migration",
                        event = "bundle_confirmed",
                        bundle_hash = event.confirmed_bundle_hash().unwrap_or_default(),
                        "migration bundle confirmed"
                    );
                }
            }
            orchestrator.listening.store(false, Ordering::SeqCst);
        }))
    }

    /// Marks the session complete once every selected bundle is migrated.
    pub fn complete_migration(&self) -> bool {
        self.store.update(|state| {
            let done = projections::has_migrated_all_selected_bundles(&state.bundles);
            if done {
                state.did_complete = true;
            }
            done
        })
    }

    pub fn reset_migration_state(&self) {
        self.store.reset();
        tracing::info!(
            target: "legacy_migration",
            event = "migration_reset",
            "migration session cleared"
        );
    }

    // --- audit log ---

    pub fn prepare_migration_log(
        &self,
        bundle_hash: &str,
        trytes: Vec<String>,
        balance: u64,
    ) -> Result<usize, MigrationError> {
        let address = self.store.migration_address();
        self.store
            .update_log(|log| log.append(bundle_hash, trytes, balance, address.as_ref()))
    }

    pub fn update_migration_log(&self, index: usize, patch: MigrationLogPatch) -> bool {
        self.store.update_log(|log| log.update(index, patch))
    }

    pub async fn export_migration_log(
        &self,
        dir: &Path,
        profile_id: &str,
    ) -> Result<ExportedLog, MigrationError> {
        let log = self.store.read_log(Clone::clone);
        log.export(dir, profile_id).await
    }
}
