// In-memory TTL cache for successful upstream responses.
// Entries are keyed by a content hash of the request URL and query
// parameters; expiry is lazy, with no background sweep.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A cached upstream response with its absolute expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Upstream HTTP status (always 200 for stored entries).
    pub status: u16,
    /// Decoded response body.
    pub body: Value,
    /// Response headers, lowercased names.
    pub headers: HashMap<String, String>,
    /// Instant after which the entry no longer serves.
    pub expires_at: DateTime<Utc>,
}

/// Process-wide store for successful upstream responses.
///
/// Entries are never mutated after insert; writing an identical key is
/// last-writer-wins. Growth over process lifetime is unbounded.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live entry. Expired entries are treated as absent.
    pub fn lookup(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(key)?;
        if entry.expires_at <= Utc::now() {
            return None;
        }
        Some(entry.clone())
    }

    /// Record a response. Only 200s are stored, and only when caching
    /// is enabled (`ttl > 0`), so error and rate-limit responses
    /// always trigger a live fetch next time.
    pub fn store(
        &self,
        key: &str,
        status: u16,
        body: &Value,
        headers: &HashMap<String, String>,
        ttl_secs: i64,
    ) {
        if status != 200 || ttl_secs <= 0 {
            return;
        }
        let entry = CacheEntry {
            status,
            body: body.clone(),
            headers: headers.clone(),
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), entry);
    }
}

/// Deterministic cache key: SHA-256 over the URL and the query
/// parameters serialized with keys sorted, so parameter insertion
/// order does not matter.
pub fn cache_key(url: &str, params: &[(&str, String)]) -> String {
    let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"|");
    hasher.update(pairs.join("&").as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
