//! Cache staleness tracker
//!
//! The backing store's on-device cache has no invalidation signal that
//! survives the popup's short-lived sessions, so a pure device cache would
//! show stale counts indefinitely. This tracker records when each key was
//! last fetched from the server and answers whether a cached read is still
//! inside the freshness window.
//!
//! Failure semantics are fail-open: any problem reading the persisted map
//! is treated as "stale", forcing a correctness-preserving server fetch.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use stance_core::Timestamp;

use crate::settings::{get_bucket, set_bucket, SettingsStore};

/// Bucket holding the per-key last-fetch map.
pub const CACHE_BUCKET: &str = "cache";

/// Default freshness window. Earlier revisions of the system used five
/// minutes; the current window is 30 seconds.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Configuration for the staleness tracker.
#[derive(Debug, Clone)]
pub struct StalenessConfig {
    /// Freshness window: cached data older than this forces a server fetch.
    pub ttl: Duration,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

impl StalenessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Persisted shape of the cache bucket: key → last successful server fetch,
/// ISO-8601.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    pub last_fetch: HashMap<String, Timestamp>,
}

/// Decides, per opaque key, whether cached data is fresh enough to skip a
/// server fetch, and records successful fetches.
pub struct StalenessTracker {
    settings: Arc<dyn SettingsStore>,
    config: StalenessConfig,
}

impl StalenessTracker {
    pub fn new(settings: Arc<dyn SettingsStore>, config: StalenessConfig) -> Self {
        Self { settings, config }
    }

    pub fn config(&self) -> &StalenessConfig {
        &self.config
    }

    /// True when `key` has never been fetched, its last fetch is older than
    /// the TTL, or the persisted map cannot be read. Never errors.
    pub async fn is_stale(&self, key: &str) -> bool {
        let settings: CacheSettings =
            match get_bucket(self.settings.as_ref(), CACHE_BUCKET).await {
                Ok(Some(settings)) => settings,
                // No settings yet, or unreadable: force a fetch.
                Ok(None) | Err(_) => return true,
            };

        let Some(last_fetch) = settings.last_fetch.get(key) else {
            return true;
        };

        // A timestamp in the future (clock skew) clamps to zero elapsed and
        // reads as fresh.
        let elapsed = Utc::now()
            .signed_duration_since(*last_fetch)
            .to_std()
            .unwrap_or(Duration::ZERO);

        elapsed > self.config.ttl
    }

    /// Record a successful server fetch for `key` at the current time.
    ///
    /// Reads the whole map, updates the one entry, writes the whole map
    /// back: last writer wins, and a concurrent record for a different key
    /// can be lost (worst case, one extra server fetch later). Persistence
    /// failures are logged and swallowed; they never fail the read that
    /// triggered them.
    pub async fn record_fetch(&self, key: &str) {
        let mut settings: CacheSettings =
            match get_bucket(self.settings.as_ref(), CACHE_BUCKET).await {
                Ok(Some(settings)) => settings,
                Ok(None) => CacheSettings::default(),
                Err(e) => {
                    tracing::warn!(key, error = %e, "cache settings unreadable, starting fresh");
                    CacheSettings::default()
                }
            };

        settings.last_fetch.insert(key.to_string(), Utc::now());

        if let Err(e) = set_bucket(self.settings.as_ref(), CACHE_BUCKET, &settings).await {
            tracing::warn!(key, error = %e, "failed to persist last-fetch timestamp");
        }
    }
}

impl std::fmt::Debug for StalenessTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StalenessTracker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================
