//! Generation lifecycle operations.
//!
//! A generation is one versioned snapshot of the cache, identified by an
//! opaque version string. At most one generation is `current` at a time;
//! activation promotes the new generation and deletes every other one in a
//! single transaction, so the store never holds two live generations once
//! activation completes.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Lifecycle state of a stored generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    /// Being populated by a precache run; not yet serving.
    Installing,
    /// Fully populated, waiting for activation.
    Waiting,
    /// The one live generation serving requests.
    Current,
}

impl GenerationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationState::Installing => "installing",
            GenerationState::Waiting => "waiting",
            GenerationState::Current => "current",
        }
    }

    fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "installing" => Ok(GenerationState::Installing),
            "waiting" => Ok(GenerationState::Waiting),
            "current" => Ok(GenerationState::Current),
            other => Err(Error::Protocol(format!("unknown generation state: {other}"))),
        }
    }
}

/// A stored generation row.
#[derive(Debug, Clone)]
pub struct Generation {
    pub name: String,
    pub state: GenerationState,
    pub created_at: String,
}

impl CacheDb {
    /// Create a fresh generation in the `installing` state.
    ///
    /// Replaces any leftover row of the same name from an earlier aborted
    /// install; the replace cascades to stale entries, so a retried install
    /// always starts from an empty generation.
    pub async fn create_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                conn.execute(
                    "INSERT INTO generations (name, state, created_at) VALUES (?1, 'installing', ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List all stored generations, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<Generation>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Generation>, Error> {
                let mut stmt =
                    conn.prepare("SELECT name, state, created_at FROM generations ORDER BY created_at ASC")?;
                let rows = stmt.query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?;

                let mut generations = Vec::new();
                for row in rows {
                    let (name, state, created_at) = row?;
                    generations.push(Generation { name, state: GenerationState::parse(&state)?, created_at });
                }
                Ok(generations)
            })
            .await
            .map_err(Error::from)
    }

    /// Name of the generation currently serving requests, if any.
    pub async fn current_generation(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(|conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT name FROM generations WHERE state = 'current'",
                    [],
                    |row| row.get::<_, String>(0),
                );
                match result {
                    Ok(name) => Ok(Some(name)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Mark a fully populated generation as waiting for activation.
    pub async fn mark_waiting(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE generations SET state = 'waiting' WHERE name = ?1",
                    params![name],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and all of its entries.
    pub async fn delete_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Promote a generation to `current` and delete every other generation.
    ///
    /// Runs in one transaction: after it commits, the promoted generation is
    /// the only one left in the store. Entries of deleted generations go
    /// with them via the foreign-key cascade.
    pub async fn promote_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM generations WHERE name != ?1", params![name])?;
                let updated = tx.execute(
                    "UPDATE generations SET state = 'current' WHERE name = ?1",
                    params![name],
                )?;
                if updated == 0 {
                    return Err(Error::NoCurrentGeneration);
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
