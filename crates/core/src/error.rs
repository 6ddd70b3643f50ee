//! Unified error types for offcache.
//!
//! The taxonomy mirrors the recovery policy: network failures are recovered
//! by falling back to cache where a fallback path exists, storage failures
//! are always soft on the serving path, an incomplete precache aborts the
//! whole install, and protocol errors are swallowed by the control surface.

use tokio_rusqlite::rusqlite;

/// Unified error type for the offcache crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network request failed (connection refused, timeout, DNS, ...).
    #[error("network failure: {0}")]
    Network(String),

    /// Cache read/write failed (I/O error, quota, corrupt database).
    #[error("storage failure: {0}")]
    Storage(tokio_rusqlite::Error),

    /// One or more manifest entries failed during install; the whole
    /// generation is abandoned.
    #[error("precache incomplete: {url}: {reason}")]
    PrecacheIncomplete { url: String, reason: String },

    /// Malformed control message. Swallowed by the control surface.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No cache entry found for the given request identity.
    #[error("cache miss: {0}")]
    CacheMiss(String),

    /// No generation has been activated yet.
    #[error("no current cache generation")]
    NoCurrentGeneration,

    /// Invalid or unresolvable URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Migration failed to apply.
    #[error("migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Whether this error is recoverable by a cache fallback.
    ///
    /// Only network failures have fallback paths; everything else either
    /// aborts its operation or is already a terminal answer.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Storage(tokio_rusqlite::Error::Close(c)),
            _ => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Storage(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(tokio_rusqlite::Error::Error(err))
    }
}
