//! Balance discovery over legacy addresses.

use super::error::MigrationError;
use super::ports::{AddressDeriver, BalanceOracle, LedgerAddressSource};
use super::types::{Input, LegacySeed, MigrationData};

pub const FIXED_ADDRESSES_GENERATED: u32 = 10;
pub const HARDWARE_ADDRESS_GAP: u32 = 3;
pub const ADDRESS_SECURITY_LEVEL: u8 = 2;

/// `0x`-prefixed hex of the address's ASCII bytes, as the oracle expects it.
pub fn address_to_hex(address: &str) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// Looks up each address's migratable balance. A failing lookup is logged and
/// counted as zero so one bad address never aborts the scan.
pub async fn fetch_inputs(
    oracle: &dyn BalanceOracle,
    addresses: Vec<(u32, String)>,
    security_level: u8,
) -> Vec<Input> {
    let mut inputs = Vec::with_capacity(addresses.len());
    for (index, address) in addresses {
        let balance = match oracle.migratable_balance(&address_to_hex(&address)).await {
            Ok(balance) => balance,
            Err(err) => {
                tracing::warn!(
                    target: "legacy_migration",
                    event = "balance_lookup_failed",
                    address_index = index,
                    error = %err,
                    "treating address balance as zero"
                );
                0
            }
        };
        inputs.push(Input {
            address,
            balance,
            spent: false,
            index,
            security_level,
            spent_bundle_hashes: Vec::new(),
        });
    }
    inputs
}

fn collect(inputs: Vec<Input>, last_checked_address_index: u32) -> MigrationData {
    let inputs: Vec<Input> = inputs.into_iter().filter(|input| input.balance > 0).collect();
    MigrationData {
        last_checked_address_index,
        balance: inputs.iter().map(|input| input.balance).sum(),
        spent_addresses: inputs.iter().any(|input| input.spent),
        inputs,
    }
}

/// Scans `count` seed-derived addresses starting at `start`.
pub async fn scan_seed(
    deriver: &dyn AddressDeriver,
    oracle: &dyn BalanceOracle,
    seed: &LegacySeed,
    start: u32,
    count: u32,
    security_level: u8,
) -> Result<MigrationData, MigrationError> {
    let mut addresses = Vec::with_capacity(count as usize);
    for index in start..start.saturating_add(count) {
        addresses.push((index, deriver.derive_address(seed, index, security_level)?));
    }
    let inputs = fetch_inputs(oracle, addresses, security_level).await;
    let data = collect(inputs, start.saturating_add(count));
    tracing::info!(
        target: "legacy_migration",
        event = "seed_scan_complete",
        start,
        count,
        funded = data.inputs.len(),
        "scanned seed addresses"
    );
    Ok(data)
}

/// Scans one batch of [`HARDWARE_ADDRESS_GAP`] device addresses starting at
/// `start`.
pub async fn scan_ledger_batch(
    source: &dyn LedgerAddressSource,
    oracle: &dyn BalanceOracle,
    start: u32,
) -> Result<MigrationData, MigrationError> {
    let mut addresses = Vec::with_capacity(HARDWARE_ADDRESS_GAP as usize);
    for index in start..start.saturating_add(HARDWARE_ADDRESS_GAP) {
        addresses.push((index, source.address_at(index).await?));
    }
    let inputs = fetch_inputs(oracle, addresses, ADDRESS_SECURITY_LEVEL).await;
    Ok(collect(inputs, start.saturating_add(HARDWARE_ADDRESS_GAP)))
}

/// Scans contiguous device batches until one comes back without balance or
/// spent addresses.
pub async fn scan_ledger_until_gap(
    source: &dyn LedgerAddressSource,
    oracle: &dyn BalanceOracle,
    start: u32,
) -> Result<MigrationData, MigrationError> {
    let mut data = MigrationData {
        last_checked_address_index: start,
        ..MigrationData::default()
    };
    loop {
        let batch = scan_ledger_batch(source, oracle, data.last_checked_address_index).await?;
        let idle = batch.balance == 0 && !batch.spent_addresses;
        data.merge(batch);
        if idle {
            break;
        }
    }
    tracing::info!(
        target: "legacy_migration",
        event = "ledger_scan_complete",
        last_checked = data.last_checked_address_index,
        funded = data.inputs.len(),
        "ledger gap reached"
    );
    Ok(data)
}
