#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use legacy_migration::migration::codec::{self, UnsignedInput};
use legacy_migration::migration::ports::{
    AddressDeriver, BalanceOracle, LedgerAddressSource, LedgerTransferPreparer, LegacyNetwork,
    MiningBackend, MiningRequest, MiningResult, OffLedgerGateway, RequestReceipt,
    SendMigrationBundleResponse, Transfer, TransferInput, TransferPreparer, WalletApi,
};
use legacy_migration::migration::{
    Collaborators, Input, LegacySeed, MigrationAddress, MigrationError, MigrationOrchestrator,
};
use legacy_migration::MigrationConfig;

pub const SIGNING_TIMESTAMP: u64 = 1_700_000_000;

/// 81-tryte address unique to `index`.
pub fn address(index: u32) -> String {
    let digits: String = index
        .to_string()
        .bytes()
        .map(|digit| (b'A' + (digit - b'0')) as char)
        .collect();
    format!("{:9<81}", format!("ADDR{digits}Z"))
}

pub fn migration_address() -> MigrationAddress {
    MigrationAddress {
        bech32: "iota1qrhacyfwlcnzkvzteumekfkrrwks98mpdm37cj4xx3drvmjvnep6xqgyzyx".into(),
        trytes: format!("{:9<81}CHECKSUMA", "TRANSFERMIGRATIONTARGET"),
    }
}

pub fn seed() -> LegacySeed {
    LegacySeed::new("SEED".repeat(20) + "S").unwrap()
}

pub fn input(index: u32, balance: u64) -> Input {
    Input {
        address: address(index),
        balance,
        spent: false,
        index,
        security_level: 2,
        spent_bundle_hashes: Vec::new(),
    }
}

pub fn spent_input(index: u32, balance: u64, hashes: &[&str]) -> Input {
    Input {
        spent: true,
        spent_bundle_hashes: hashes.iter().map(|h| h.to_string()).collect(),
        ..input(index, balance)
    }
}

fn sign(transfer: &Transfer, inputs: &[TransferInput]) -> Result<Vec<String>, MigrationError> {
    let unsigned: Vec<UnsignedInput> = inputs
        .iter()
        .map(|input| UnsignedInput {
            address: input.address.clone(),
            balance: input.balance,
            security_level: input.security,
        })
        .collect();
    codec::create_unsigned_bundle(
        codec::remove_checksum(&transfer.address),
        &unsigned,
        transfer.value,
        SIGNING_TIMESTAMP,
    )
}

pub struct FakeDeriver;

impl AddressDeriver for FakeDeriver {
    fn derive_address(
        &self,
        _seed: &LegacySeed,
        index: u32,
        _security_level: u8,
    ) -> Result<String, MigrationError> {
        Ok(address(index))
    }
}

#[derive(Default)]
pub struct FakeOracle {
    balances: Mutex<HashMap<String, u64>>,
    failing: Mutex<HashSet<String>>,
    pub lookups: Mutex<Vec<String>>,
}

impl FakeOracle {
    pub fn with_balances(balances: &[(u32, u64)]) -> Self {
        let oracle = Self::default();
        for (index, balance) in balances {
            oracle.set_balance(*index, *balance);
        }
        oracle
    }

    pub fn set_balance(&self, index: u32, balance: u64) {
        self.balances
            .lock()
            .unwrap()
            .insert(address(index), balance);
    }

    pub fn fail_for(&self, index: u32) {
        self.failing.lock().unwrap().insert(address(index));
    }
}

#[async_trait]
impl BalanceOracle for FakeOracle {
    async fn migratable_balance(&self, address_hex: &str) -> Result<u64, MigrationError> {
        let raw = hex::decode(address_hex.trim_start_matches("0x")).unwrap();
        let address = String::from_utf8(raw).unwrap();
        self.lookups.lock().unwrap().push(address.clone());
        if self.failing.lock().unwrap().contains(&address) {
            return Err(MigrationError::Network {
                operation: "fetch migratable balance",
                message: "connection reset".into(),
            });
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or(0))
    }
}

pub struct FakeLedgerSource;

#[async_trait]
impl LedgerAddressSource for FakeLedgerSource {
    async fn address_at(&self, index: u32) -> Result<String, MigrationError> {
        Ok(address(index))
    }
}

#[derive(Default)]
pub struct FakeMiner {
    crackabilities: Mutex<VecDeque<f64>>,
    pub requests: Mutex<Vec<MiningRequest>>,
}

impl FakeMiner {
    pub fn queue(&self, values: &[f64]) {
        self.crackabilities.lock().unwrap().extend(values);
    }
}

#[async_trait]
impl MiningBackend for FakeMiner {
    async fn mine_bundle(&self, request: MiningRequest) -> Result<MiningResult, MigrationError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.crackabilities.lock().unwrap().pop_front() {
            Some(crackability) => Ok(MiningResult {
                bundle: request.unsigned_bundle,
                crackability,
            }),
            None => Err(MigrationError::MiningTimeout(request.timeout)),
        }
    }
}

#[derive(Default)]
pub struct FakePreparer {
    pub transfers: Mutex<Vec<(Transfer, Vec<TransferInput>)>>,
}

#[async_trait]
impl TransferPreparer for FakePreparer {
    async fn prepare_transfers(
        &self,
        _seed: &LegacySeed,
        transfers: &[Transfer],
        inputs: &[TransferInput],
    ) -> Result<Vec<String>, MigrationError> {
        self.transfers
            .lock()
            .unwrap()
            .push((transfers[0].clone(), inputs.to_vec()));
        sign(&transfers[0], inputs)
    }
}

#[derive(Default)]
pub struct FakeLedgerPreparer {
    pub calls: Mutex<Vec<(Transfer, Vec<TransferInput>, Option<i64>)>>,
}

#[async_trait]
impl LedgerTransferPreparer for FakeLedgerPreparer {
    async fn prepare_transfers(
        &self,
        transfers: &[Transfer],
        inputs: &[TransferInput],
        now_millis: Option<i64>,
    ) -> Result<Vec<String>, MigrationError> {
        self.calls
            .lock()
            .unwrap()
            .push((transfers[0].clone(), inputs.to_vec(), now_millis));
        sign(&transfers[0], inputs)
    }
}

#[derive(Default)]
pub struct FakeLegacy {
    pub broadcasts: Mutex<Vec<String>>,
    pub ledger_broadcasts: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl LegacyNetwork for FakeLegacy {
    async fn send_migration_bundle(
        &self,
        _nodes: &[String],
        bundle_hash: &str,
        _minimum_weight_magnitude: u32,
    ) -> Result<SendMigrationBundleResponse, MigrationError> {
        self.broadcasts.lock().unwrap().push(bundle_hash.to_string());
        Ok(SendMigrationBundleResponse {
            address: migration_address().bech32,
            value: 2_500_000,
            tail_transaction_hash: "TAIL".repeat(20) + "T",
        })
    }

    async fn send_ledger_migration_bundle(
        &self,
        _nodes: &[String],
        trytes: &[String],
        _minimum_weight_magnitude: u32,
    ) -> Result<SendMigrationBundleResponse, MigrationError> {
        self.ledger_broadcasts.lock().unwrap().push(trytes.to_vec());
        Ok(SendMigrationBundleResponse {
            address: migration_address().bech32,
            value: 3_000_000,
            tail_transaction_hash: "TAIL".repeat(20) + "T",
        })
    }

    async fn address_with_checksum(&self, address: &str) -> Result<String, MigrationError> {
        Ok(format!("{address}ABCDEFGHI"))
    }
}

#[derive(Default)]
pub struct FakeGateway {
    pub submitted: Mutex<Vec<String>>,
    pub waited: Mutex<Vec<String>>,
    pub receipt_error: Mutex<Option<String>>,
}

#[async_trait]
impl OffLedgerGateway for FakeGateway {
    async fn submit_off_ledger_request(&self, request_hex: &str) -> Result<(), MigrationError> {
        self.submitted.lock().unwrap().push(request_hex.to_string());
        Ok(())
    }

    async fn wait_for_receipt(&self, request_id: &str) -> Result<RequestReceipt, MigrationError> {
        self.waited.lock().unwrap().push(request_id.to_string());
        Ok(RequestReceipt {
            error_message: self.receipt_error.lock().unwrap().clone(),
            ..RequestReceipt::default()
        })
    }
}

#[derive(Default)]
pub struct FakeWallet {
    pub accounts: Mutex<Vec<u32>>,
}

#[async_trait]
impl WalletApi for FakeWallet {
    async fn migration_address(
        &self,
        account_index: u32,
    ) -> Result<MigrationAddress, MigrationError> {
        self.accounts.lock().unwrap().push(account_index);
        Ok(migration_address())
    }
}

pub struct Harness {
    pub orchestrator: Arc<MigrationOrchestrator>,
    pub oracle: Arc<FakeOracle>,
    pub miner: Arc<FakeMiner>,
    pub preparer: Arc<FakePreparer>,
    pub ledger_preparer: Arc<FakeLedgerPreparer>,
    pub legacy: Arc<FakeLegacy>,
    pub gateway: Arc<FakeGateway>,
    pub wallet: Arc<FakeWallet>,
}

pub fn harness(config: MigrationConfig, oracle: FakeOracle) -> Harness {
    let oracle = Arc::new(oracle);
    let miner = Arc::new(FakeMiner::default());
    let preparer = Arc::new(FakePreparer::default());
    let ledger_preparer = Arc::new(FakeLedgerPreparer::default());
    let legacy = Arc::new(FakeLegacy::default());
    let gateway = Arc::new(FakeGateway::default());
    let wallet = Arc::new(FakeWallet::default());
    let ports = Collaborators {
        deriver: Arc::new(FakeDeriver),
        oracle: oracle.clone(),
        ledger_addresses: Arc::new(FakeLedgerSource),
        miner: miner.clone(),
        preparer: preparer.clone(),
        ledger_preparer: ledger_preparer.clone(),
        legacy: legacy.clone(),
        gateway: gateway.clone(),
        wallet: wallet.clone(),
    };
    Harness {
        orchestrator: Arc::new(MigrationOrchestrator::new(config, ports)),
        oracle,
        miner,
        preparer,
        ledger_preparer,
        legacy,
        gateway,
        wallet,
    }
}
