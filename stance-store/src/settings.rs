//! Local persisted key-value buckets
//!
//! The extension-local storage primitive: named buckets read and written as
//! whole JSON objects. The staleness tracker lives on top of this; unrelated
//! preference storage can share it.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use stance_core::SettingsError;

/// Get-whole-bucket / set-whole-bucket storage.
///
/// No merge logic: `set_raw` replaces the named bucket's entire object,
/// last writer wins.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a bucket's object, `None` if the bucket has never been written.
    async fn get_raw(&self, bucket: &str) -> Result<Option<serde_json::Value>, SettingsError>;

    /// Replace a bucket's object.
    async fn set_raw(&self, bucket: &str, value: serde_json::Value) -> Result<(), SettingsError>;
}

/// Read a bucket into a typed value.
pub async fn get_bucket<T: DeserializeOwned>(
    store: &dyn SettingsStore,
    bucket: &str,
) -> Result<Option<T>, SettingsError> {
    match store.get_raw(bucket).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| SettingsError::Serialization {
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Replace a bucket with a typed value.
pub async fn set_bucket<T: Serialize>(
    store: &dyn SettingsStore,
    bucket: &str,
    value: &T,
) -> Result<(), SettingsError> {
    let raw = serde_json::to_value(value).map_err(|e| SettingsError::Serialization {
        reason: e.to_string(),
    })?;
    store.set_raw(bucket, raw).await
}

/// In-memory settings store for tests, with failure injection.
#[derive(Debug, Default)]
pub struct MemorySettings {
    buckets: RwLock<HashMap<String, serde_json::Value>>,
    broken: AtomicBool,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read and write fail, to exercise the fail-open paths.
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::Relaxed);
    }

    fn check(&self) -> Result<(), SettingsError> {
        if self.broken.load(Ordering::Relaxed) {
            return Err(SettingsError::Storage {
                reason: "settings storage unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get_raw(&self, bucket: &str) -> Result<Option<serde_json::Value>, SettingsError> {
        self.check()?;
        Ok(self.buckets.read().await.get(bucket).cloned())
    }

    async fn set_raw(&self, bucket: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        self.check()?;
        self.buckets.write().await.insert(bucket.to_string(), value);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        color_scheme: String,
    }

    #[tokio::test]
    async fn test_bucket_roundtrip() {
        let store = MemorySettings::new();
        let prefs = Prefs {
            color_scheme: "dark".to_string(),
        };

        set_bucket(&store, "prefs", &prefs).await.expect("set");
        let back: Option<Prefs> = get_bucket(&store, "prefs").await.expect("get");
        assert_eq!(back, Some(prefs));
    }

    #[tokio::test]
    async fn test_missing_bucket_is_none() {
        let store = MemorySettings::new();
        let got: Option<Prefs> = get_bucket(&store, "never-written").await.expect("get");
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_set_replaces_whole_bucket() {
        let store = MemorySettings::new();
        set_bucket(&store, "b", &serde_json::json!({"a": 1, "b": 2}))
            .await
            .expect("set");
        set_bucket(&store, "b", &serde_json::json!({"c": 3}))
            .await
            .expect("set");

        let raw = store.get_raw("b").await.expect("get").expect("present");
        assert_eq!(raw, serde_json::json!({"c": 3}));
    }

    #[tokio::test]
    async fn test_broken_store_errors() {
        let store = MemorySettings::new();
        store.set_broken(true);
        assert!(store.get_raw("x").await.is_err());
        assert!(store.set_raw("x", serde_json::Value::Null).await.is_err());
    }
}
