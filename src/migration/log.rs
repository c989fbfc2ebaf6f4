use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use ts_rs::TS;

use super::error::MigrationError;
use super::types::MigrationAddress;

pub const LOG_FILE_NAME: &str = "migration.log";

/// One audit record per bundle handed to the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct MigrationLogEntry {
    pub bundle_hash: String,
    pub timestamp: String,
    pub trytes: Vec<String>,
    /// Pretty-printed JSON of the receiving [`MigrationAddress`].
    pub deposit_address: String,
    #[ts(type = "number")]
    pub balance: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub spent_bundle_hashes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub spent_addresses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub mine: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub crackability: Option<f64>,
}

/// Fields a caller may patch on an existing entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationLogPatch {
    pub spent_bundle_hashes: Option<Vec<String>>,
    pub spent_addresses: Option<Vec<String>>,
    pub mine: Option<bool>,
    pub crackability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedLog {
    pub path: PathBuf,
    pub sha256: String,
}

/// Append-only audit trail of a migration session.
#[derive(Debug, Clone, Default)]
pub struct MigrationLog {
    entries: Vec<MigrationLogEntry>,
}

impl MigrationLog {
    pub fn entries(&self) -> &[MigrationLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn append(
        &mut self,
        bundle_hash: &str,
        trytes: Vec<String>,
        balance: u64,
        deposit_address: Option<&MigrationAddress>,
    ) -> Result<usize, MigrationError> {
        let deposit_address = match deposit_address {
            Some(address) => serde_json::to_string_pretty(address)?,
            None => String::new(),
        };
        self.entries.push(MigrationLogEntry {
            bundle_hash: bundle_hash.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            trytes,
            deposit_address,
            balance,
            spent_bundle_hashes: None,
            spent_addresses: None,
            mine: None,
            crackability: None,
        });
        Ok(self.entries.len() - 1)
    }

    /// Patches entry `index`; returns `false` when there is no such entry.
    pub fn update(&mut self, index: usize, patch: MigrationLogPatch) -> bool {
        let Some(entry) = self.entries.get_mut(index) else {
            return false;
        };
        if let Some(hashes) = patch.spent_bundle_hashes {
            entry.spent_bundle_hashes = Some(hashes);
        }
        if let Some(addresses) = patch.spent_addresses {
            entry.spent_addresses = Some(addresses);
        }
        if let Some(mine) = patch.mine {
            entry.mine = Some(mine);
        }
        if let Some(crackability) = patch.crackability {
            entry.crackability = Some(crackability);
        }
        true
    }

    /// Writes the log to `{dir}/{profile_id}-migration.log` via a temp file
    /// and rename, returning the path and the SHA-256 of the written bytes.
    pub async fn export(
        &self,
        dir: &Path,
        profile_id: &str,
    ) -> Result<ExportedLog, MigrationError> {
        let bytes = serde_json::to_vec_pretty(&self.entries)?;
        let path = dir.join(export_file_name(profile_id));
        let tmp = path.with_extension("log.tmp");

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| MigrationError::Io {
                operation: "create migration log directory",
                source,
            })?;
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|source| MigrationError::Io {
                operation: "create migration log",
                source,
            })?;
        file.write_all(&bytes)
            .await
            .map_err(|source| MigrationError::Io {
                operation: "write migration log",
                source,
            })?;
        file.sync_all().await.map_err(|source| MigrationError::Io {
            operation: "sync migration log",
            source,
        })?;
        drop(file);
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| MigrationError::Io {
                operation: "finalize migration log",
                source,
            })?;

        let sha256 = hex::encode(Sha256::digest(&bytes));
        tracing::info!(
            target: "legacy_migration",
            event = "migration_log_exported",
            path = %path.display(),
            entries = self.entries.len(),
            sha256 = %sha256,
            "exported migration log"
        );
        Ok(ExportedLog { path, sha256 })
    }
}

pub fn export_file_name(profile_id: &str) -> String {
    format!("{profile_id}-{LOG_FILE_NAME}")
}
