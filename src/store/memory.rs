//! In-process settings store.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::settings::{Setting, SettingKey, SettingsStore, StoreError, StoreResult};

/// Settings held in a concurrent map. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: DashMap<SettingKey, String>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn find(&self, key: SettingKey) -> StoreResult<Option<Setting>> {
        self.ensure_open()?;
        Ok(self
            .rows
            .get(&key)
            .map(|value| Setting::new(key, value.value().clone())))
    }

    async fn upsert(&self, key: SettingKey, value: &str) -> StoreResult<Setting> {
        self.ensure_open()?;
        self.rows.insert(key, value.to_string());
        Ok(Setting::new(key, value))
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
