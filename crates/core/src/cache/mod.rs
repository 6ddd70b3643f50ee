//! SQLite-backed versioned cache store.
//!
//! This module provides the persistent request/response store using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Versioned generations with a single `current` generation after activation
//! - Request-identity keys (method + canonical URL, SHA-256)
//! - Whole-row upsert puts (last write for a key wins)
//! - Cascading generation deletion during activation
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
pub use generations::{Generation, GenerationState};
