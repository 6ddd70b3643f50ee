//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite store, applying required pragmas
//! for performance and concurrency (WAL mode), and running migrations.
//! Foreign keys are ON so deleting a generation cascades to its entries.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

/// Cache store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations on a
/// background thread. Cloning is cheap and all clones share the connection,
/// which serializes individual statements; per-key get/put is therefore
/// atomic from the caller's perspective.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open a store at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Storage(e.into()))?;
        Self::configure(conn).await
    }

    /// Open an in-memory store for testing.
    ///
    /// Same pragma configuration and schema as file-based stores, but
    /// nothing survives the handle being dropped.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Storage(e.into()))?;
        Self::configure(conn).await
    }

    async fn configure(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA foreign_keys=ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Storage)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}
