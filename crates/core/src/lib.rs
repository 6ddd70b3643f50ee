//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Versioned cache store with SQLite backend
//! - Request identity and URL canonicalization
//! - Precache manifest and dynamic caching rules
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod request;
pub mod url;

pub use cache::{CacheDb, CacheEntry, Generation, GenerationState};
pub use config::AppConfig;
pub use error::Error;
pub use manifest::{DynamicRule, PrecacheManifest};
pub use request::{Request, RequestMode};
