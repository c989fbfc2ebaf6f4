//! Engine that moves funds from legacy ternary ledger addresses onto the new
//! ledger: balance discovery, bundle planning, mining, signing hand-off and
//! submission tracking.

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod migration;
pub mod snapshot;
pub mod ternary;

pub use client::MigratorClient;
pub use config::{MigrationConfig, SetupKind};
pub use error::{AppError, AppResult};
pub use migration::{
    Bundle, Collaborators, Input, LegacySeed, MigrationData, MigrationError,
    MigrationOrchestrator, MigrationState, MigrationSummary,
};
