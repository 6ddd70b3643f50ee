//! Request-identity key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request identity.
///
/// Identity is the normalized method plus the canonical URL; two requests
/// with the same key address the same cache entry within a generation.
pub fn request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let key1 = request_key("GET", "https://example.com/app.js");
        let key2 = request_key("GET", "https://example.com/app.js");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_method_case_insensitive() {
        let lower = request_key("get", "https://example.com/");
        let upper = request_key("GET", "https://example.com/");
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_key_different_url() {
        let a = request_key("GET", "https://example.com/a");
        let b = request_key("GET", "https://example.com/b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_format() {
        let key = request_key("GET", "https://example.com/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
