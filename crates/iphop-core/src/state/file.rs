// # File Store
//
// File-based implementation of Store with crash recovery.
//
// ## Purpose
//
// Keeps providers, domains and update history across daemon restarts
// without an external database.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "tables": {
//     "providers": { "1": { "id": 1, "name": "home", "type": "duckdns", ... } },
//     "domains": { "1": { "id": 1, "provider_id": 1, "domain_name": "home.duckdns.org", ... } },
//     "history": [ { "id": 1, "domain_id": 1, "ip_address": "1.2.3.4", ... } ],
//     "last_provider_id": 1,
//     "last_domain_id": 1,
//     "last_history_id": 1
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::Tables;
use crate::Error;
use crate::model::{
    Domain, DomainId, IpHistory, NewDomain, NewHistory, NewProvider, Provider, ProviderId,
    StatusUpdate,
};
use crate::traits::Store;

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

/// File-based store with crash recovery
///
/// Every mutation is written through to disk before the call returns. The
/// write lock is held across the write, so the file never lags behind a
/// later mutation.
///
/// # Example
///
/// ```rust,no_run
/// use iphop_core::state::FileStore;
/// use iphop_core::traits::Store;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStore::new("/var/lib/iphop/state.json").await?;
///     println!("{} domains", store.list_domains().await?.len());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: RwLock<FileState>,
}

#[derive(Debug)]
struct FileState {
    tables: Tables,
    /// Set when an in-memory mutation has not reached the disk yet
    dirty: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    tables: Tables,
}

impl FileStore {
    /// Create or load a file store
    ///
    /// This will:
    /// 1. Try to load existing state file
    /// 2. If corruption detected, try to load from backup
    /// 3. If both fail, start with empty state
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let tables = Self::load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: RwLock::new(FileState {
                tables,
                dirty: false,
            }),
        })
    }

    /// Load state from file with automatic recovery
    ///
    /// Only a JSON parse failure counts as corruption; an unreadable file is
    /// reported to the caller.
    async fn load_state_with_recovery(path: &Path) -> Result<Tables, Error> {
        match Self::load_state(path).await {
            Ok(tables) => Ok(tables),
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "State file {} appears corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty state.");
                    return Ok(Tables::default());
                }

                match Self::load_state(&backup_path).await {
                    Ok(tables) => {
                        tracing::info!("Recovered state from backup {}", backup_path.display());
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore state file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(tables)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with empty state.",
                            backup_err
                        );
                        Ok(Tables::default())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load_state(path: &Path) -> Result<Tables, Error> {
        if !path.exists() {
            tracing::debug!("State file does not exist: {}", path.display());
            return Ok(Tables::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!("Failed to read state file {}: {}", path.display(), e))
        })?;

        let state_file: StateFileFormat = serde_json::from_str(&content)?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.tables)
    }

    /// Write tables to disk atomically
    async fn persist(&self, tables: &Tables) -> Result<(), Error> {
        let state_file = StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            tables: tables.clone(),
        };
        let json = serde_json::to_string_pretty(&state_file)?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.sync_all().await.map_err(|e| {
                Error::store(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("Failed to create backup: {}", e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    /// Apply `f` and write the result through to disk
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut guard = self.state.write().await;
        let out = f(&mut guard.tables)?;
        guard.dirty = true;
        self.persist(&guard.tables).await?;
        guard.dirty = false;
        Ok(out)
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get_provider(&self, id: ProviderId) -> Result<Option<Provider>, Error> {
        Ok(self.state.read().await.tables.provider(id))
    }

    async fn list_providers(&self) -> Result<Vec<Provider>, Error> {
        Ok(self.state.read().await.tables.providers())
    }

    async fn insert_provider(&self, provider: NewProvider) -> Result<Provider, Error> {
        self.mutate(|t| t.insert_provider(provider)).await
    }

    async fn set_provider_enabled(&self, id: ProviderId, enabled: bool) -> Result<(), Error> {
        self.mutate(|t| t.set_provider_enabled(id, enabled)).await
    }

    async fn delete_provider(&self, id: ProviderId) -> Result<bool, Error> {
        self.mutate(|t| Ok(t.delete_provider(id))).await
    }

    async fn get_domain(&self, id: DomainId) -> Result<Option<Domain>, Error> {
        Ok(self.state.read().await.tables.domain(id))
    }

    async fn list_domains(&self) -> Result<Vec<Domain>, Error> {
        Ok(self.state.read().await.tables.domains())
    }

    async fn list_scheduled_domains(&self) -> Result<Vec<Domain>, Error> {
        Ok(self.state.read().await.tables.scheduled_domains())
    }

    async fn insert_domain(&self, domain: NewDomain) -> Result<Domain, Error> {
        self.mutate(|t| t.insert_domain(domain)).await
    }

    async fn set_cron_schedule(&self, id: DomainId, cron: Option<String>) -> Result<(), Error> {
        self.mutate(|t| t.set_cron_schedule(id, cron)).await
    }

    async fn delete_domain(&self, id: DomainId) -> Result<bool, Error> {
        self.mutate(|t| Ok(t.delete_domain(id))).await
    }

    async fn commit_attempt(
        &self,
        history: NewHistory,
        status: Option<StatusUpdate>,
    ) -> Result<IpHistory, Error> {
        self.mutate(|t| t.commit_attempt(history, status)).await
    }

    async fn list_history(
        &self,
        domain_id: DomainId,
        limit: Option<usize>,
    ) -> Result<Vec<IpHistory>, Error> {
        Ok(self.state.read().await.tables.history(domain_id, limit))
    }

    async fn count_history(&self, domain_id: DomainId) -> Result<usize, Error> {
        Ok(self.state.read().await.tables.count_history(domain_id))
    }

    async fn delete_history_beyond(&self, domain_id: DomainId, keep: usize) -> Result<usize, Error> {
        self.mutate(|t| Ok(t.delete_history_beyond(domain_id, keep)))
            .await
    }

    async fn flush(&self) -> Result<(), Error> {
        let mut guard = self.state.write().await;
        if guard.dirty {
            self.persist(&guard.tables).await?;
            guard.dirty = false;
        }
        Ok(())
    }
}
