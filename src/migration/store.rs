use std::sync::{Arc, Mutex, MutexGuard};

use zeroize::Zeroize;

use super::log::MigrationLog;
use super::types::{MigratedTransaction, MigrationAddress, MigrationState};

#[derive(Debug, Default)]
struct StoreInner {
    state: MigrationState,
    log: MigrationLog,
    migration_address: Option<MigrationAddress>,
    migrated_transactions: Vec<MigratedTransaction>,
}

/// Shared owner of a migration session.
///
/// Every access goes through a short closure; the lock is never held across
/// an await point.
#[derive(Debug, Clone, Default)]
pub struct MigrationStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MigrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn read<R>(&self, f: impl FnOnce(&MigrationState) -> R) -> R {
        f(&self.lock().state)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut MigrationState) -> R) -> R {
        f(&mut self.lock().state)
    }

    pub fn snapshot(&self) -> MigrationState {
        self.lock().state.clone()
    }

    pub fn read_log<R>(&self, f: impl FnOnce(&MigrationLog) -> R) -> R {
        f(&self.lock().log)
    }

    pub fn update_log<R>(&self, f: impl FnOnce(&mut MigrationLog) -> R) -> R {
        f(&mut self.lock().log)
    }

    pub fn migration_address(&self) -> Option<MigrationAddress> {
        self.lock().migration_address.clone()
    }

    pub fn set_migration_address(&self, address: MigrationAddress) {
        self.lock().migration_address = Some(address);
    }

    pub fn migrated_transactions(&self) -> Vec<MigratedTransaction> {
        self.lock().migrated_transactions.clone()
    }

    pub fn record_migrated_transaction(&self, transaction: MigratedTransaction) {
        self.lock().migrated_transactions.push(transaction);
    }

    /// Clears the session. The seed is wiped before it is released; the
    /// migrated transaction history belongs to the profile and survives.
    pub fn reset(&self) {
        let mut inner = self.lock();
        if let Some(seed) = inner.state.seed.as_mut() {
            seed.zeroize();
        }
        inner.state = MigrationState::default();
        inner.log.clear();
        inner.migration_address = None;
    }
}
