//! Network side of offcache.
//!
//! This crate provides the HTTP fetch pipeline and the `Network` trait seam
//! the worker resolves requests through, so strategies and lifecycle can be
//! driven by a stub network in tests.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, FetchResponse, Network};
