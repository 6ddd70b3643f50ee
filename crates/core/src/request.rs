//! Intercepted request model.

use crate::cache::hash::request_key;
use url::Url;

/// What the request is loading.
///
/// Navigation requests load a full document and are the only requests
/// eligible for the fallback-document path when nothing else resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    Subresource,
}

/// An outbound resource request intercepted from the hosting application.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method, normalized to uppercase.
    pub method: String,
    /// Canonical request URL.
    pub url: Url,
    pub mode: RequestMode,
}

impl Request {
    pub fn new(method: &str, url: Url, mode: RequestMode) -> Self {
        Self { method: method.to_ascii_uppercase(), url, mode }
    }

    /// A GET subresource request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url, RequestMode::Subresource)
    }

    /// A GET navigation (full document) request.
    pub fn navigate(url: Url) -> Self {
        Self::new("GET", url, RequestMode::Navigate)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Request identity key used to address the cache.
    pub fn key(&self) -> String {
        request_key(&self.method, self.url.as_str())
    }
}
