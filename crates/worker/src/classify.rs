//! Request classification.
//!
//! A pure function mapping an intercepted request to a route, evaluated in
//! this precedence:
//!
//! 1. Non-GET requests pass straight through to the network, unmodified
//! 2. Non-http(s) schemes are left unintercepted
//! 3. Requests to an always-network origin bypass the cache entirely
//! 4. Exact precache-manifest matches are served cache-first
//! 5. Dynamic-rule matches are served cache-first
//! 6. Everything else is intercepted network-first

use std::collections::HashSet;

use offcache_core::manifest::first_match;
use offcache_core::{AppConfig, DynamicRule, Error, PrecacheManifest, Request};
use url::Url;

/// How an intercepted request is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted: forwarded to the network, never cached.
    Bypass,
    /// Cache-eligible: serve from cache, revalidate in the background.
    CacheFirst,
    /// Intercepted but not cache-eligible: network wins, cache is the
    /// fallback resource.
    NetworkFirst,
}

/// Static classification inputs, precomputed from configuration.
#[derive(Debug, Clone)]
pub struct Policy {
    origin: Url,
    manifest_urls: HashSet<String>,
    rules: Vec<DynamicRule>,
    bypass_hosts: Vec<String>,
}

impl Policy {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config
            .origin_url()
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let manifest = PrecacheManifest::new(config.precache_manifest.clone());
        let manifest_urls = manifest
            .resolve(&origin)
            .map_err(|e| Error::InvalidUrl(e.to_string()))?
            .into_iter()
            .map(|url| url.to_string())
            .collect();

        let rules = config
            .dynamic_suffixes
            .iter()
            .map(|suffix| DynamicRule::new(suffix))
            .collect();

        // Bypass entries may be bare hosts or full URLs; keep only the host.
        let bypass_hosts = config
            .bypass_origins
            .iter()
            .filter_map(|entry| {
                if entry.contains("://") {
                    Url::parse(entry).ok().and_then(|u| u.host_str().map(str::to_lowercase))
                } else {
                    Some(entry.to_lowercase())
                }
            })
            .collect();

        Ok(Self { origin, manifest_urls, rules, bypass_hosts })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    fn is_bypass_host(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.bypass_hosts.iter().any(|b| b == host))
            .unwrap_or(false)
    }
}

/// Classify a request against the policy.
pub fn classify(request: &Request, policy: &Policy) -> Route {
    if !request.is_get() {
        return Route::Bypass;
    }

    match request.url.scheme() {
        "http" | "https" => {}
        _ => return Route::Bypass,
    }

    if policy.is_bypass_host(&request.url) {
        return Route::Bypass;
    }

    if policy.manifest_urls.contains(request.url.as_str()) {
        return Route::CacheFirst;
    }

    if first_match(&policy.rules, request.url.path()).is_some() {
        return Route::CacheFirst;
    }

    Route::NetworkFirst
}
