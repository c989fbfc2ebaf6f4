//! Read-only views over the migration state. Nothing here stores anything;
//! every value is recomputed from the bundles and scan data it is given.

use serde::Serialize;

use super::error::MigrationError;
use super::types::{Bundle, Input, MigrationData, MigrationState};

/// First input of a bundle awaiting mining, with the bundle's mining state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpentAddress {
    #[serde(flatten)]
    pub input: Input,
    pub selected_to_mine: bool,
    pub bundle_hash: Option<String>,
    pub crackability: Option<f64>,
}

pub fn spent_addresses_from_bundles(bundles: &[Bundle]) -> Vec<SpentAddress> {
    bundles
        .iter()
        .filter(|bundle| !bundle.migrated && bundle.should_mine)
        .filter_map(|bundle| {
            bundle.inputs.first().map(|input| SpentAddress {
                input: input.clone(),
                selected_to_mine: bundle.selected_to_mine,
                bundle_hash: bundle.bundle_hash.clone(),
                crackability: bundle.crackability,
            })
        })
        .collect()
}

pub fn has_single_bundle(bundles: &[Bundle]) -> bool {
    bundles.len() == 1 && bundles[0].selected
}

pub fn has_bundles_with_spent_addresses(bundles: &[Bundle]) -> bool {
    bundles
        .iter()
        .any(|bundle| bundle.should_mine && bundle.selected)
}

pub fn selected_bundles_to_mine(bundles: &[Bundle]) -> Vec<&Bundle> {
    bundles
        .iter()
        .filter(|bundle| bundle.selected_to_mine && bundle.should_mine)
        .collect()
}

pub fn unmigrated_bundles(bundles: &[Bundle]) -> Vec<&Bundle> {
    bundles
        .iter()
        .filter(|bundle| bundle.selected && !bundle.migrated)
        .collect()
}

pub fn bundles_with_unspent_addresses(bundles: &[Bundle]) -> Vec<&Bundle> {
    bundles
        .iter()
        .filter(|bundle| bundle.selected && !bundle.should_mine)
        .collect()
}

pub fn confirmed_bundles(bundles: &[Bundle]) -> Vec<&Bundle> {
    bundles
        .iter()
        .filter(|bundle| bundle.selected && bundle.confirmed)
        .collect()
}

pub fn has_migrated_all_bundles(bundles: &[Bundle]) -> bool {
    !bundles.is_empty() && bundles.iter().all(|bundle| bundle.selected && bundle.migrated)
}

pub fn has_migrated_any_bundle(bundles: &[Bundle]) -> bool {
    bundles.iter().any(|bundle| bundle.selected && bundle.migrated)
}

fn selected(bundles: &[Bundle]) -> impl Iterator<Item = &Bundle> {
    bundles.iter().filter(|bundle| bundle.selected)
}

pub fn has_migrated_all_selected_bundles(bundles: &[Bundle]) -> bool {
    selected(bundles).next().is_some() && selected(bundles).all(|bundle| bundle.migrated)
}

pub fn has_migrated_and_confirmed_all_selected_bundles(bundles: &[Bundle]) -> bool {
    selected(bundles).next().is_some()
        && selected(bundles).all(|bundle| bundle.migrated && bundle.confirmed)
}

pub fn has_migrated_and_confirmed_some_selected_bundles(bundles: &[Bundle]) -> bool {
    selected(bundles).any(|bundle| bundle.migrated && bundle.confirmed)
}

pub fn total_migrated_balance(bundles: &[Bundle]) -> u64 {
    bundles
        .iter()
        .filter(|bundle| bundle.migrated)
        .map(Bundle::total_balance)
        .sum()
}

pub fn has_low_balance_on_all_spent_addresses(bundles: &[Bundle], minimum: u64) -> bool {
    let mut mined = bundles.iter().filter(|bundle| bundle.should_mine).peekable();
    mined.peek().is_some()
        && mined.all(|bundle| bundle.inputs.iter().all(|input| input.balance < minimum))
}

/// Looks only at inputs that made it into a bundle.
pub fn has_any_spent_address_with_no_bundle_hashes(bundles: &[Bundle]) -> bool {
    bundles
        .iter()
        .flat_map(|bundle| bundle.inputs.iter())
        .any(|input| input.spent && input.spent_bundle_hashes.is_empty())
}

pub fn spent_addresses_with_no_bundle_hashes(data: &MigrationData, minimum: u64) -> Vec<&Input> {
    data.inputs
        .iter()
        .filter(|input| {
            input.spent && input.balance >= minimum && input.spent_bundle_hashes.is_empty()
        })
        .collect()
}

/// Scanned inputs no bundle picked up.
pub fn unselected_inputs<'a>(data: &'a MigrationData, bundles: &[Bundle]) -> Vec<&'a Input> {
    data.inputs
        .iter()
        .filter(|input| !bundles.iter().any(|bundle| bundle.contains_address(&input.address)))
        .collect()
}

/// Balance left behind by the chunker, reported as a value rather than raised.
pub fn stranded_balance(
    data: &MigrationData,
    bundles: &[Bundle],
    minimum: u64,
) -> Option<MigrationError> {
    let available: u64 = unselected_inputs(data, bundles)
        .iter()
        .map(|input| input.balance)
        .sum();
    (available > 0).then_some(MigrationError::InsufficientBalance { available, minimum })
}

/// Snapshot of every flag the UI polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    pub bundle_count: usize,
    pub has_single_bundle: bool,
    pub has_bundles_with_spent_addresses: bool,
    pub has_low_balance_on_all_spent_addresses: bool,
    pub has_any_spent_address_with_no_bundle_hashes: bool,
    pub has_migrated_all_bundles: bool,
    pub has_migrated_any_bundle: bool,
    pub has_migrated_all_selected_bundles: bool,
    pub has_migrated_and_confirmed_all_selected_bundles: bool,
    pub has_migrated_and_confirmed_some_selected_bundles: bool,
    pub total_migrated_balance: u64,
    pub unselected_balance: u64,
}

impl MigrationSummary {
    pub fn from_state(state: &MigrationState, minimum: u64) -> Self {
        let bundles = &state.bundles;
        Self {
            bundle_count: bundles.len(),
            has_single_bundle: has_single_bundle(bundles),
            has_bundles_with_spent_addresses: has_bundles_with_spent_addresses(bundles),
            has_low_balance_on_all_spent_addresses: has_low_balance_on_all_spent_addresses(
                bundles, minimum,
            ),
            has_any_spent_address_with_no_bundle_hashes:
                has_any_spent_address_with_no_bundle_hashes(bundles),
            has_migrated_all_bundles: has_migrated_all_bundles(bundles),
            has_migrated_any_bundle: has_migrated_any_bundle(bundles),
            has_migrated_all_selected_bundles: has_migrated_all_selected_bundles(bundles),
            has_migrated_and_confirmed_all_selected_bundles:
                has_migrated_and_confirmed_all_selected_bundles(bundles),
            has_migrated_and_confirmed_some_selected_bundles:
                has_migrated_and_confirmed_some_selected_bundles(bundles),
            total_migrated_balance: total_migrated_balance(bundles),
            unselected_balance: unselected_inputs(&state.data, bundles)
                .iter()
                .map(|input| input.balance)
                .sum(),
        }
    }
}
