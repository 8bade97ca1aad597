//! JSON-file backed settings store.
//!
//! The whole table is rewritten on each change: write to a sibling temp file,
//! then rename over the original so a crash never leaves a torn file.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::settings::{Setting, SettingKey, SettingsStore, StoreError, StoreResult};

/// Settings persisted to a single JSON object on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Keyed by on-disk name so rows written by newer versions are preserved.
    rows: DashMap<String, String>,
    write_lock: Mutex<()>,
    closed: AtomicBool,
}

impl FileStore {
    /// Open the store at `path`, loading existing rows if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let rows = DashMap::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let map: BTreeMap<String, String> = serde_json::from_slice(&bytes)?;
                for (k, v) in map {
                    rows.insert(k, v);
                }
                tracing::info!(path = %path.display(), rows = rows.len(), "Loaded settings file");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tracing::info!(path = %path.display(), "Settings file not found, starting empty");
            }
            Err(e) => return Err(StoreError::Io(e)),
        }

        Ok(Self {
            path,
            rows,
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        self.rows
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    async fn persist(&self) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(&self.snapshot())?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FileStore {
    async fn find(&self, key: SettingKey) -> StoreResult<Option<Setting>> {
        self.ensure_open()?;
        Ok(self
            .rows
            .get(key.as_str())
            .map(|value| Setting::new(key, value.value().clone())))
    }

    async fn upsert(&self, key: SettingKey, value: &str) -> StoreResult<Setting> {
        let _guard = self.write_lock.lock().await;
        self.ensure_open()?;

        let unchanged = self
            .rows
            .get(key.as_str())
            .is_some_and(|current| current.value() == value);
        if !unchanged {
            let previous = self.rows.insert(key.as_str().to_string(), value.to_string());
            if let Err(e) = self.persist().await {
                // Keep memory consistent with what is on disk.
                match previous {
                    Some(prev) => self.rows.insert(key.as_str().to_string(), prev),
                    None => self.rows.remove(key.as_str()).map(|(_, v)| v),
                };
                return Err(e);
            }
            tracing::debug!(key = %key, "Setting persisted");
        }

        Ok(Setting::new(key, value))
    }

    async fn close(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.persist().await?;
        tracing::info!(path = %self.path.display(), "Settings store closed");
        Ok(())
    }
}
