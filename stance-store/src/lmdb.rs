//! LMDB-backed settings store
//!
//! Uses the heed crate (Rust bindings for LMDB) for the persistent local
//! bucket store. Buckets are rows in a single unnamed database: bucket name
//! as key, JSON bytes as value. The store persists across popup open/close
//! cycles and is lazily initialized on first access, with no teardown.

use std::path::Path;

use async_trait::async_trait;
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use stance_core::SettingsError;

use crate::settings::SettingsStore;

/// Default LMDB map size: plenty for timestamp maps and preferences.
const DEFAULT_MAP_SIZE_MB: usize = 16;

fn storage_err(e: impl std::fmt::Display) -> SettingsError {
    SettingsError::Storage {
        reason: e.to_string(),
    }
}

/// Persistent [`SettingsStore`] over LMDB.
pub struct LmdbSettings {
    env: Env,
    db: Database<Str, Bytes>,
}

impl LmdbSettings {
    /// Open (or create) the settings database in the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        Self::open_with_size(path, DEFAULT_MAP_SIZE_MB)
    }

    /// Open with an explicit map size in megabytes.
    pub fn open_with_size<P: AsRef<Path>>(
        path: P,
        map_size_mb: usize,
    ) -> Result<Self, SettingsError> {
        std::fs::create_dir_all(&path).map_err(storage_err)?;

        // SAFETY: per heed's contract, the environment directory must not be
        // opened for writing by another process while this Env is live. The
        // settings directory is private to the embedding application.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(storage_err)?;

        let mut wtxn = env.write_txn().map_err(storage_err)?;
        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(storage_err)?;
        wtxn.commit().map_err(storage_err)?;

        Ok(Self { env, db })
    }
}

#[async_trait]
impl SettingsStore for LmdbSettings {
    async fn get_raw(&self, bucket: &str) -> Result<Option<serde_json::Value>, SettingsError> {
        let rtxn = self.env.read_txn().map_err(storage_err)?;
        match self.db.get(&rtxn, bucket).map_err(storage_err)? {
            Some(bytes) => {
                let value =
                    serde_json::from_slice(bytes).map_err(|e| SettingsError::Serialization {
                        reason: e.to_string(),
                    })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, bucket: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        let bytes = serde_json::to_vec(&value).map_err(|e| SettingsError::Serialization {
            reason: e.to_string(),
        })?;
        let mut wtxn = self.env.write_txn().map_err(storage_err)?;
        self.db.put(&mut wtxn, bucket, &bytes).map_err(storage_err)?;
        wtxn.commit().map_err(storage_err)
    }
}

impl std::fmt::Debug for LmdbSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbSettings").finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{get_bucket, set_bucket};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_open_and_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LmdbSettings::open(dir.path()).expect("open");

        let mut map = HashMap::new();
        map.insert("a".to_string(), "2020-01-01T00:00:00Z".to_string());
        set_bucket(&store, "cache", &map).await.expect("set");

        let back: Option<HashMap<String, String>> =
            get_bucket(&store, "cache").await.expect("get");
        assert_eq!(back, Some(map));
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = LmdbSettings::open(dir.path()).expect("open");
            set_bucket(&store, "prefs", &serde_json::json!({"theme": "dark"}))
                .await
                .expect("set");
        }

        let store = LmdbSettings::open(dir.path()).expect("reopen");
        let raw = store.get_raw("prefs").await.expect("get").expect("present");
        assert_eq!(raw, serde_json::json!({"theme": "dark"}));
    }

    #[tokio::test]
    async fn test_missing_bucket_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LmdbSettings::open(dir.path()).expect("open");
        assert!(store.get_raw("nothing").await.expect("get").is_none());
    }
}
