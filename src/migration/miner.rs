use std::time::Duration;

use super::error::MigrationError;
use super::ports::{MiningBackend, MiningRequest, MiningResult};
use super::types::Bundle;

pub const MINING_TIMEOUT_SECONDS: u64 = 600;
/// Slack on top of the backend's own deadline before the call is abandoned.
const MINING_GRACE: Duration = Duration::from_secs(5);

/// Runs one mining attempt, bounded by the request timeout.
pub async fn run_mining(
    backend: &dyn MiningBackend,
    request: MiningRequest,
) -> Result<MiningResult, MigrationError> {
    let deadline = request.timeout + MINING_GRACE;
    match tokio::time::timeout(deadline, backend.mine_bundle(request)).await {
        Ok(result) => result,
        Err(_) => Err(MigrationError::MiningTimeout(deadline)),
    }
}

/// A scored candidate beats an unscored slot; otherwise only a strictly lower
/// crackability counts.
fn is_improvement(current: Option<f64>, candidate: Option<f64>) -> bool {
    match (current, candidate) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(best), Some(next)) => next < best,
    }
}

/// Folds a ledger mining or signing result into `bundle`.
///
/// Before the first mining run the result is taken as is. Afterwards a scored
/// result replaces an unscored one, and a scored one only gives way to a
/// strictly lower crackability. Returns whether
/// the stored result changed.
pub fn apply_ledger_result(
    bundle: &mut Bundle,
    trytes: Vec<String>,
    bundle_hash: String,
    crackability: Option<f64>,
    did_mine: bool,
) -> bool {
    let replace = bundle.mining_runs == 0
        || is_improvement(bundle.crackability, crackability);
    if replace {
        bundle.trytes = Some(trytes);
        bundle.bundle_hash = Some(bundle_hash);
        bundle.crackability = crackability;
    }
    if did_mine {
        bundle.mining_runs += 1;
    }
    replace
}

/// Folds a bundle hash found for a software bundle into `bundle`. An empty
/// or unscored slot accepts any scored hash, a scored one only a strictly
/// lower crackability.
pub fn apply_assigned_hash(
    bundle: &mut Bundle,
    bundle_hash: String,
    crackability: Option<f64>,
    did_mine: bool,
) -> bool {
    let replace = bundle.bundle_hash.is_none()
        || is_improvement(bundle.crackability, crackability);
    if replace {
        bundle.bundle_hash = Some(bundle_hash);
        bundle.crackability = crackability;
    }
    if did_mine {
        bundle.mining_runs += 1;
    }
    replace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::types::Input;

    fn bundle() -> Bundle {
        Bundle::for_spent_input(Input {
            address: "A".repeat(81),
            balance: 2_000_000,
            spent: true,
            index: 0,
            security_level: 2,
            spent_bundle_hashes: vec!["H".repeat(81)],
        })
    }

    #[test]
    fn ledger_results_keep_the_lowest_crackability() {
        let mut bundle = bundle();
        for (run, crack) in [0.9, 0.95, 0.5].into_iter().enumerate() {
            apply_ledger_result(
                &mut bundle,
                vec![format!("T{run}")],
                format!("H{run}"),
                Some(crack),
                true,
            );
        }
        assert_eq!(bundle.crackability, Some(0.5));
        assert_eq!(bundle.bundle_hash.as_deref(), Some("H2"));
        assert_eq!(bundle.trytes, Some(vec!["T2".to_string()]));
        assert_eq!(bundle.mining_runs, 3);
    }

    #[test]
    fn signing_after_mining_keeps_the_mined_trytes() {
        let mut bundle = bundle();
        apply_ledger_result(&mut bundle, vec!["mined".into()], "H".into(), Some(0.2), true);
        let changed = apply_ledger_result(&mut bundle, vec!["signed".into()], "H".into(), None, false);
        assert!(!changed);
        assert_eq!(bundle.trytes, Some(vec!["mined".to_string()]));
        assert_eq!(bundle.mining_runs, 1);
    }

    #[test]
    fn assigned_hashes_only_improve() {
        let mut bundle = bundle();
        assert!(apply_assigned_hash(&mut bundle, "A".into(), Some(0.4), true));
        assert!(!apply_assigned_hash(&mut bundle, "B".into(), Some(0.6), true));
        assert!(!apply_assigned_hash(&mut bundle, "C".into(), Some(0.4), true));
        assert!(apply_assigned_hash(&mut bundle, "D".into(), Some(0.1), false));
        assert_eq!(bundle.bundle_hash.as_deref(), Some("D"));
        assert_eq!(bundle.mining_runs, 3);
    }

    #[test]
    fn timed_out_first_run_still_accepts_later_results() {
        let mut bundle = bundle();
        bundle.mining_runs = 1;
        assert!(apply_ledger_result(&mut bundle, vec!["T".into()], "H".into(), Some(0.7), true));
        assert!(!apply_ledger_result(&mut bundle, vec!["U".into()], "I".into(), Some(0.9), true));
        assert_eq!(bundle.crackability, Some(0.7));
        assert_eq!(bundle.bundle_hash.as_deref(), Some("H"));
        assert_eq!(bundle.mining_runs, 3);
    }

    #[test]
    fn unscored_signature_gives_way_to_a_mined_result() {
        let mut bundle = bundle();
        apply_ledger_result(&mut bundle, vec!["signed".into()], "S".into(), None, false);
        bundle.mining_runs = 1;
        assert!(apply_ledger_result(&mut bundle, vec!["mined".into()], "M".into(), Some(0.4), true));
        assert_eq!(bundle.trytes, Some(vec!["mined".to_string()]));
    }
}
