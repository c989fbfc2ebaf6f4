//! Grouping of scanned inputs into migration bundles.

use super::types::{Bundle, Input, MigrationData};

pub const SOFTWARE_MAX_INPUTS: usize = 10;
pub const HARDWARE_MAX_INPUTS: usize = 3;
pub const DEFAULT_MINIMUM_MIGRATION_BALANCE: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingPolicy {
    pub max_inputs_per_bundle: usize,
    pub minimum_migration_balance: u64,
}

impl ChunkingPolicy {
    pub const fn software() -> Self {
        Self {
            max_inputs_per_bundle: SOFTWARE_MAX_INPUTS,
            minimum_migration_balance: DEFAULT_MINIMUM_MIGRATION_BALANCE,
        }
    }

    pub const fn ledger() -> Self {
        Self {
            max_inputs_per_bundle: HARDWARE_MAX_INPUTS,
            minimum_migration_balance: DEFAULT_MINIMUM_MIGRATION_BALANCE,
        }
    }

    pub const fn with_minimum_balance(mut self, minimum: u64) -> Self {
        self.minimum_migration_balance = minimum;
        self
    }

    fn cap(&self) -> usize {
        self.max_inputs_per_bundle.max(1)
    }
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        Self::software()
    }
}

/// Splits unspent inputs into bundles of at most `max_inputs_per_bundle`.
///
/// Inputs holding at least the minimum are chunked in scan order. The rest
/// are sorted by balance, descending, and either grouped in windows that
/// reach the minimum together or topped into existing chunks with room.
/// Inputs that find no room are left out; callers see them as unselected.
pub fn select_inputs_for_unspent_addresses(
    inputs: &[Input],
    policy: &ChunkingPolicy,
) -> Vec<Vec<Input>> {
    let minimum = policy.minimum_migration_balance;
    let cap = policy.cap();

    let total: u64 = inputs.iter().map(|input| input.balance).sum();
    if total < minimum {
        return Vec::new();
    }

    let (enough, mut low): (Vec<Input>, Vec<Input>) = inputs
        .iter()
        .cloned()
        .partition(|input| input.balance >= minimum);

    let mut chunks: Vec<Vec<Input>> = enough.chunks(cap).map(<[Input]>::to_vec).collect();

    low.sort_by(|a, b| b.balance.cmp(&a.balance));
    let low_total: u64 = low.iter().map(|input| input.balance).sum();

    if low_total < minimum {
        fill(&mut chunks, &low, cap);
    } else {
        for window in low.chunks(cap) {
            let window_total: u64 = window.iter().map(|input| input.balance).sum();
            if window_total >= minimum {
                chunks.push(window.to_vec());
            } else {
                fill(&mut chunks, window, cap);
            }
        }
    }

    let placed: usize = chunks.iter().map(Vec::len).sum();
    if placed < inputs.len() {
        tracing::warn!(
            target: "legacy_migration",
            event = "inputs_left_out",
            left_out = inputs.len() - placed,
            "some low balance inputs did not fit into any bundle"
        );
    }
    chunks
}

fn fill(chunks: &mut [Vec<Input>], inputs: &[Input], cap: usize) {
    for input in inputs {
        match chunks.iter_mut().find(|chunk| chunk.len() < cap) {
            Some(chunk) => chunk.push(input.clone()),
            None => break,
        }
    }
}

/// Rebuilds the bundle list from scan data.
///
/// Spent inputs at or above the minimum get a bundle each, mined when the
/// address already signed something. Unspent inputs are chunked. Indexes
/// run sequentially across both groups.
pub fn prepare_bundles(data: &MigrationData, policy: &ChunkingPolicy) -> Vec<Bundle> {
    let (spent, unspent): (Vec<Input>, Vec<Input>) =
        data.inputs.iter().cloned().partition(|input| input.spent);

    let spent_bundles = spent
        .into_iter()
        .filter(|input| input.balance >= policy.minimum_migration_balance)
        .map(Bundle::for_spent_input);
    let unspent_bundles = select_inputs_for_unspent_addresses(&unspent, policy)
        .into_iter()
        .map(Bundle::for_unspent_inputs);

    spent_bundles
        .chain(unspent_bundles)
        .enumerate()
        .map(|(index, mut bundle)| {
            bundle.index = index as u32;
            bundle
        })
        .collect()
}
