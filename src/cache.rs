//! Response cache keyed by engine and normalized query.
//!
//! Two tiers: an in-memory [`moka`] cache that lives for the run, and an
//! optional directory of JSON entries so later runs can reuse responses.
//! Entries older than the TTL count as misses in both tiers. Disk failures
//! are logged and the cache is bypassed; they never fail a run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::CacheSettings;
use crate::engine::EngineId;
use crate::error::CacheError;
use crate::SearchResult;

/// Maximum number of result sets kept in memory.
const MAX_MEMORY_ENTRIES: u64 = 10_000;

/// Longest accepted entry lifetime (ten years).
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Lowercases and trims a query so trivially different spellings share
/// an entry.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Derives the cache key for `query` sent to `engine`.
///
/// The key is the hex SHA-256 of the engine name and the normalized query,
/// so it is safe to use as a file name.
pub fn cache_key(engine: EngineId, query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(engine.name().as_bytes());
    hasher.update([0u8]);
    hasher.update(normalize_query(query).as_bytes());
    hex::encode(hasher.finalize())
}

/// A persisted cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_key: String,
    /// Normalized query, kept for inspection.
    pub query: String,
    pub results: Vec<SearchResult>,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.stored_at) < ttl,
            Err(_) => true,
        }
    }
}

/// Two-tier response cache.
#[derive(Clone)]
pub struct ResponseCache {
    memory: Cache<String, Vec<SearchResult>>,
    dir: Option<PathBuf>,
    ttl: Duration,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.memory.entry_count())
            .field("dir", &self.dir)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ResponseCache {
    /// Creates a cache that only lives in memory.
    ///
    /// `ttl` is capped at [`MAX_TTL`].
    pub fn in_memory(ttl: Duration) -> Self {
        let ttl = ttl.min(MAX_TTL);
        Self {
            memory: Cache::builder()
                .max_capacity(MAX_MEMORY_ENTRIES)
                .time_to_live(ttl)
                .build(),
            dir: None,
            ttl,
        }
    }

    /// Creates a cache that also persists entries under `dir`.
    pub fn persistent(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::in_memory(ttl)
        }
    }

    /// Creates a cache from run settings.
    pub fn from_settings(settings: &CacheSettings) -> Self {
        if settings.persist {
            Self::persistent(settings.dir.clone(), settings.ttl)
        } else {
            Self::in_memory(settings.ttl)
        }
    }

    /// Returns the persistence directory, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Looks up a fresh entry.
    pub async fn get(&self, key: &str) -> Option<Vec<SearchResult>> {
        if let Some(results) = self.memory.get(key).await {
            debug!(key, "Cache hit (memory)");
            return Some(results);
        }

        let dir = self.dir.as_ref()?;
        match self.read_entry(dir, key).await {
            Ok(Some(entry)) => {
                debug!(key, query = %entry.query, "Cache hit (disk)");
                self.memory.insert(key.to_string(), entry.results.clone()).await;
                Some(entry.results)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key, "Ignoring unreadable cache entry: {}", e);
                None
            }
        }
    }

    /// Stores results for `key`.
    ///
    /// `query` is recorded in the persisted entry for inspection only.
    pub async fn put(&self, key: &str, query: &str, results: &[SearchResult]) {
        self.memory.insert(key.to_string(), results.to_vec()).await;

        if let Some(dir) = &self.dir {
            let entry = CacheEntry {
                cache_key: key.to_string(),
                query: normalize_query(query),
                results: results.to_vec(),
                stored_at: Utc::now(),
            };
            if let Err(e) = write_entry(dir, key, &entry).await {
                warn!(key, "Failed to persist cache entry: {}", e);
            }
        }
    }

    async fn read_entry(&self, dir: &Path, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let path = entry_path(dir, key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: CacheEntry = serde_json::from_slice(&bytes)?;
        if entry.cache_key != key {
            debug!(key, "Cache entry key mismatch");
            return Ok(None);
        }
        if !entry.is_fresh(self.ttl, Utc::now()) {
            debug!(key, "Cache entry expired");
            return Ok(None);
        }
        Ok(Some(entry))
    }
}

fn entry_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.json", key))
}

async fn write_entry(dir: &Path, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
    tokio::fs::create_dir_all(dir).await?;
    let json = serde_json::to_vec(entry)?;
    let path = entry_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> Vec<SearchResult> {
        vec![
            SearchResult::new("q", "Admin", "https://example.com/admin", "login"),
            SearchResult::new("q", "Panel", "https://example.com/panel", "N/A"),
        ]
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Inurl:Admin  "), "inurl:admin");
    }

    #[test]
    fn test_cache_key_is_stable_and_normalized() {
        let a = cache_key(EngineId::Google, "inurl:admin");
        let b = cache_key(EngineId::Google, "  INURL:admin ");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_key_differs_by_engine() {
        assert_ne!(
            cache_key(EngineId::Google, "inurl:admin"),
            cache_key(EngineId::Bing, "inurl:admin")
        );
    }

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let cache = ResponseCache::in_memory(Duration::from_secs(60));
        let key = cache_key(EngineId::Google, "q");
        assert!(cache.get(&key).await.is_none());

        cache.put(&key, "q", &results()).await;
        let cached = cache.get(&key).await.unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].url(), "https://example.com/admin");
        assert!(cache.dir().is_none());
    }

    #[tokio::test]
    async fn test_persistent_entry_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let key = cache_key(EngineId::DuckDuckGo, "filetype:pdf");

        let first = ResponseCache::persistent(dir.path(), Duration::from_secs(3600));
        first.put(&key, "filetype:pdf", &results()).await;
        assert!(dir.path().join(format!("{}.json", key)).exists());

        let second = ResponseCache::persistent(dir.path(), Duration::from_secs(3600));
        let cached = second.get(&key).await.unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[1].title(), "Panel");
    }

    #[tokio::test]
    async fn test_expired_disk_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let key = cache_key(EngineId::Google, "old");
        let entry = CacheEntry {
            cache_key: key.clone(),
            query: "old".into(),
            results: results(),
            stored_at: Utc::now() - chrono::Duration::hours(25),
        };
        write_entry(dir.path(), &key, &entry).await.unwrap();

        let cache = ResponseCache::persistent(dir.path(), Duration::from_secs(24 * 3600));
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_bypassed() {
        let dir = tempfile::tempdir().unwrap();
        let key = cache_key(EngineId::Google, "broken");
        std::fs::write(dir.path().join(format!("{}.json", key)), "{not json").unwrap();

        let cache = ResponseCache::persistent(dir.path(), Duration::from_secs(60));
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_unwritable_dir_does_not_fail() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        // A regular file where the cache directory should be.
        let cache = ResponseCache::persistent(&blocker, Duration::from_secs(60));
        let key = cache_key(EngineId::Google, "q");
        cache.put(&key, "q", &results()).await;
        assert_eq!(cache.get(&key).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_capped() {
        let settings = CacheSettings {
            ttl: Duration::from_secs(10_000_000 * 3600),
            ..Default::default()
        };
        let cache = ResponseCache::from_settings(&settings);
        assert_eq!(cache.ttl, MAX_TTL);

        let key = cache_key(EngineId::Google, "q");
        cache.put(&key, "q", &results()).await;
        assert!(cache.get(&key).await.is_some());
    }

    #[test]
    fn test_from_settings() {
        let settings = CacheSettings::default();
        assert!(ResponseCache::from_settings(&settings).dir().is_none());

        let settings = CacheSettings {
            persist: true,
            ..Default::default()
        };
        assert_eq!(
            ResponseCache::from_settings(&settings).dir(),
            Some(Path::new(".cache"))
        );
    }
}
