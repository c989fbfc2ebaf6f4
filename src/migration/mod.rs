//! Migration of legacy ternary ledger funds onto the new ledger.
//!
//! Scan results flow from [`scanner`] into bundles built by [`chunker`],
//! optionally refined by [`miner`], serialised by [`codec`] and handed to the
//! network either directly or as an [`offledger`] request. The
//! [`MigrationOrchestrator`] owns the session state and drives all of it.

pub mod chunker;
pub mod codec;
mod error;
pub mod log;
pub mod miner;
pub mod offledger;
mod orchestrator;
pub mod ports;
pub mod projections;
pub mod scanner;
mod store;
mod types;

pub use chunker::ChunkingPolicy;
pub use error::MigrationError;
pub use log::{ExportedLog, MigrationLog, MigrationLogEntry, MigrationLogPatch};
pub use miner::MINING_TIMEOUT_SECONDS;
pub use orchestrator::{Collaborators, MigrationOrchestrator, MiningOutcome, ProgressEvent};
pub use projections::MigrationSummary;
pub use scanner::{ADDRESS_SECURITY_LEVEL, FIXED_ADDRESSES_GENERATED, HARDWARE_ADDRESS_GAP};
pub use store::MigrationStore;
pub use types::{
    Bundle, BundleStatus, Input, LegacySeed, MigratedTransaction, MigrationAddress,
    MigrationBundle, MigrationData, MigrationState,
};
