//! Session signing secret provisioning.
//!
//! # Responsibilities
//! - Hand out the secret both API surfaces sign sessions with
//! - Create it exactly once per workspace in production
//! - Keep it stable across restarts
//!
//! # Design Decisions
//! - Non-production modes use a fixed, guessable placeholder and never touch
//!   the store; local sessions then survive restarts without any persistence
//! - An existing non-empty value is never replaced
//! - Store failures are returned to the caller; startup treats them as fatal

use std::fmt;
use std::sync::Arc;

use crate::config::Mode;
use crate::observability::metrics;
use crate::store::{SettingKey, SettingsStore, StoreResult};

/// Placeholder secret used outside production. Never use it to guard real data.
pub const DEV_SECRET: &str = "slash";

/// Signing secret shared by the REST and RPC surfaces.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Arc<str>);

impl Secret {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    /// The raw secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Return the signing secret for `mode`, creating and persisting one if needed.
pub async fn provision_secret(mode: Mode, store: &dyn SettingsStore) -> StoreResult<Secret> {
    if !mode.is_prod() {
        tracing::warn!(mode = %mode, "Using fixed development secret");
        return Ok(Secret::new(DEV_SECRET));
    }

    if let Some(existing) = store.find(SettingKey::SecretSessionName).await? {
        if !existing.value.is_empty() {
            tracing::debug!("Reusing persisted session secret");
            return Ok(Secret::new(existing.value));
        }
    }

    let generated = uuid::Uuid::new_v4().to_string();
    let stored = store
        .upsert(SettingKey::SecretSessionName, &generated)
        .await?;
    metrics::record_secret_generated();
    tracing::info!("Generated new session secret");

    Ok(Secret::new(stored.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};

    #[tokio::test]
    async fn prod_provisioning_is_idempotent() {
        let store = MemoryStore::new();

        let first = provision_secret(Mode::Prod, &store).await.unwrap();
        let second = provision_secret(Mode::Prod, &store).await.unwrap();

        assert!(!first.expose().is_empty());
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn prod_reuses_existing_value() {
        let store = MemoryStore::new();
        store
            .upsert(SettingKey::SecretSessionName, "kept")
            .await
            .unwrap();

        let secret = provision_secret(Mode::Prod, &store).await.unwrap();
        assert_eq!(secret.expose(), "kept");
    }

    #[tokio::test]
    async fn prod_replaces_empty_value() {
        let store = MemoryStore::new();
        store.upsert(SettingKey::SecretSessionName, "").await.unwrap();

        let secret = provision_secret(Mode::Prod, &store).await.unwrap();
        assert!(!secret.expose().is_empty());

        let row = store.find(SettingKey::SecretSessionName).await.unwrap().unwrap();
        assert_eq!(row.value, secret.expose());
    }

    #[tokio::test]
    async fn prod_ignores_unrelated_settings() {
        let store = MemoryStore::new();
        store.upsert(SettingKey::DisallowSignUp, "true").await.unwrap();

        let secret = provision_secret(Mode::Prod, &store).await.unwrap();
        assert_ne!(secret.expose(), "true");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn dev_never_touches_store() {
        let store = MemoryStore::new();
        store.close().await.unwrap();

        for mode in [Mode::Dev, Mode::Demo] {
            let secret = provision_secret(mode, &store).await.unwrap();
            assert_eq!(secret.expose(), DEV_SECRET);
        }
    }

    #[tokio::test]
    async fn prod_store_failure_propagates() {
        let store = MemoryStore::new();
        store.close().await.unwrap();

        let err = provision_secret(Mode::Prod, &store).await.unwrap_err();
        assert!(matches!(err, StoreError::Closed));
    }

    #[test]
    fn debug_redacts_value() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
    }
}
