//! Persistent web cache backed by SQLite

use crate::cache::{hash_key, CacheResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const WEBCACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS responses (
    cache_key TEXT NOT NULL PRIMARY KEY,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    body TEXT NOT NULL,
    fetched_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_responses_expires ON responses(expires_at);
"#;

/// A stored HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// URL → response store where entries older than their TTL are absent
pub struct WebCache {
    conn: Connection,
}

impl WebCache {
    /// Opens or creates the cache database, creating parent directories
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch(WEBCACHE_SCHEMA)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(WEBCACHE_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Cache key for a request: the full URL and the sorted header set
    pub fn cache_key(url: &str, headers: &BTreeMap<String, String>) -> String {
        let mut parts = Vec::with_capacity(1 + headers.len());
        parts.push(url.to_string());
        for (name, value) in headers {
            parts.push(format!("{}: {}", name.to_ascii_lowercase(), value));
        }
        hash_key(&parts)
    }

    pub fn get(&self, key: &str) -> CacheResult<Option<CachedResponse>> {
        self.get_at(key, Utc::now())
    }

    /// Looks up `key` as of `now`
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> CacheResult<Option<CachedResponse>> {
        let entry = self
            .conn
            .query_row(
                "SELECT url, status, body FROM responses WHERE cache_key = ?1 AND expires_at > ?2",
                params![key, now.timestamp_millis()],
                |row| {
                    Ok(CachedResponse {
                        url: row.get(0)?,
                        status: row.get(1)?,
                        body: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    pub fn put(&self, key: &str, response: &CachedResponse, ttl: Duration) -> CacheResult<()> {
        self.put_at(key, response, ttl, Utc::now())
    }

    /// Stores `response` as fetched at `now`, replacing any previous entry
    pub fn put_at(
        &self,
        key: &str,
        response: &CachedResponse,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> CacheResult<()> {
        let fetched_at = now.timestamp_millis();
        let expires_at = fetched_at.saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64);
        self.conn.execute(
            "INSERT OR REPLACE INTO responses (cache_key, url, status, body, fetched_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key,
                response.url,
                response.status,
                response.body,
                fetched_at,
                expires_at
            ],
        )?;
        Ok(())
    }

    /// Deletes expired entries, returning how many were removed
    pub fn purge_expired(&self) -> CacheResult<usize> {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> CacheResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM responses WHERE expires_at <= ?1",
            params![now.timestamp_millis()],
        )?;
        Ok(removed)
    }

    /// Deletes every entry, returning how many were removed
    pub fn clear(&self) -> CacheResult<usize> {
        Ok(self.conn.execute("DELETE FROM responses", [])?)
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> CacheResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}
