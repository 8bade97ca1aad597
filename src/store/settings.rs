//! Setting types and the store contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Enumerated namespace of workspace setting keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettingKey {
    /// `"true"` when self-service sign-up is closed.
    DisallowSignUp,
    /// Signing secret for session state.
    SecretSessionName,
}

impl SettingKey {
    /// Stable on-disk name of the key.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::DisallowSignUp => "disallow-signup",
            SettingKey::SecretSessionName => "secret-session-name",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disallow-signup" => Ok(SettingKey::DisallowSignUp),
            "secret-session-name" => Ok(SettingKey::SecretSessionName),
            other => Err(StoreError::UnknownKey(other.to_string())),
        }
    }
}

/// A single workspace setting row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: SettingKey,
    pub value: String,
}

impl Setting {
    pub fn new(key: SettingKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Settings store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt settings file: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("unknown setting key: {0}")]
    UnknownKey(String),

    #[error("settings store is closed")]
    Closed,
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Typed access to the workspace settings table.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Look up a setting. A missing key is `Ok(None)`.
    async fn find(&self, key: SettingKey) -> StoreResult<Option<Setting>>;

    /// Insert or replace the value for `key`, returning the stored row.
    async fn upsert(&self, key: SettingKey, value: &str) -> StoreResult<Setting>;

    /// Release the underlying handle. Later calls fail with `StoreError::Closed`.
    async fn close(&self) -> StoreResult<()>;
}
