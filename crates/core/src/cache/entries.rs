//! Cache entry CRUD operations.
//!
//! An entry is one stored request/response pair: request identity, the
//! response snapshot (status, headers, body), and the generation it was
//! inserted into. Puts are whole-row upserts; an entry is overwritten
//! whenever a fresher successful response is observed for the same identity
//! and is never partially updated.

use super::connection::CacheDb;
use super::hash::request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A cached request/response pair.
///
/// Only GET requests are ever stored; callers enforce that before `put`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Request identity key (method + canonical URL, hashed).
    pub request_key: String,
    /// Generation this entry was inserted into.
    pub generation: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    /// Response headers as a JSON object, if any were captured.
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CacheEntry {
    /// Build an entry from a response snapshot, computing the identity key.
    pub fn new(generation: &str, method: &str, url: &str, status: u16, headers_json: Option<String>, body: Vec<u8>) -> Self {
        Self {
            request_key: request_key(method, url),
            generation: generation.to_string(),
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            status,
            headers_json,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl CacheDb {
    /// Insert or overwrite a cache entry.
    ///
    /// Uses UPSERT semantics keyed on (generation, request_key): the last
    /// successful write for a key wins, whole row at a time.
    pub async fn put_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                        generation, request_key, method, url, status,
                        headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(generation, request_key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &entry.generation,
                        &entry.request_key,
                        &entry.method,
                        &entry.url,
                        entry.status,
                        &entry.headers_json,
                        &entry.body,
                        &entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by request identity within a generation.
    ///
    /// Returns None on a cache miss.
    pub async fn get_entry(&self, generation: &str, request_key: &str) -> Result<Option<CacheEntry>, Error> {
        let generation = generation.to_string();
        let request_key = request_key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let result = conn.query_row(
                    "SELECT generation, request_key, method, url, status,
                            headers_json, body, stored_at
                     FROM entries WHERE generation = ?1 AND request_key = ?2",
                    params![generation, request_key],
                    |row| {
                        Ok(CacheEntry {
                            generation: row.get(0)?,
                            request_key: row.get(1)?,
                            method: row.get(2)?,
                            url: row.get(3)?,
                            status: row.get(4)?,
                            headers_json: row.get(5)?,
                            body: row.get(6)?,
                            stored_at: row.get(7)?,
                        })
                    },
                );

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete all entries of a generation, keeping the generation row.
    ///
    /// The generation identity survives so version queries keep answering
    /// after a cache clear. Returns the number of deleted entries.
    pub async fn clear_generation(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE generation = ?1", params![generation])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored in a generation.
    pub async fn count_entries(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
