//! Precache manifest and dynamic caching rules.
//!
//! The manifest is a static ordered list of resource identifiers supplied at
//! config time; every entry must be present in a generation before install
//! succeeds. Dynamic rules extend cache eligibility to uncached requests
//! matched by path suffix, evaluated in order with first match winning.

use crate::url::{UrlError, resolve};
use serde::{Deserialize, Serialize};
use url::Url;

/// Ordered list of resources precached during install.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrecacheManifest {
    entries: Vec<String>,
}

impl PrecacheManifest {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every entry against the app origin, preserving order.
    ///
    /// Entries may be bare paths or absolute cross-origin URLs. A single
    /// unresolvable entry fails the whole resolution, matching the
    /// all-or-nothing install contract.
    pub fn resolve(&self, origin: &Url) -> Result<Vec<Url>, UrlError> {
        self.entries.iter().map(|entry| resolve(origin, entry)).collect()
    }
}

/// A declarative rule making matching requests cache-eligible once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicRule {
    /// Path suffix to match, e.g. ".woff2" or "/api/words".
    pub suffix: String,
}

impl DynamicRule {
    pub fn new(suffix: &str) -> Self {
        Self { suffix: suffix.to_string() }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.ends_with(&self.suffix)
    }
}

/// Evaluate rules in order; first match wins.
pub fn first_match<'a>(rules: &'a [DynamicRule], path: &str) -> Option<&'a DynamicRule> {
    rules.iter().find(|rule| rule.matches(path))
}
