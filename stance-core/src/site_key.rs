//! URL-derived site keys
//!
//! A page URL becomes a stable, opaque document key via URL-safe base64.
//! The key doubles as the staleness-tracker cache key for every per-site
//! query shape, so it must be deterministic and free of path separators.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, URL-derived site identifier.
///
/// Encoded with the URL-safe base64 alphabet (no padding), so keys never
/// contain `/` or `+` and are safe to embed in document paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteKey(String);

impl SiteKey {
    /// Derive the key for a page URL.
    ///
    /// Leading/trailing whitespace is trimmed before encoding; the URL is
    /// otherwise used as-is, so `http://a` and `http://a/` are distinct
    /// sites, exactly as the backing store keys them.
    pub fn from_url(url: &str) -> Self {
        Self(URL_SAFE_NO_PAD.encode(url.trim()))
    }

    /// Wrap an already-encoded key (e.g. one read back from a document).
    pub fn from_encoded(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Recover the original URL, if the key decodes to valid UTF-8.
    pub fn decode_url(&self) -> Option<String> {
        let bytes = URL_SAFE_NO_PAD.decode(&self.0).ok()?;
        String::from_utf8(bytes).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_is_deterministic() {
        let a = SiteKey::from_url("https://example.com/article?id=42");
        let b = SiteKey::from_url("https://example.com/article?id=42");
        assert_eq!(a, b);
    }

    #[test]
    fn test_trailing_whitespace_is_trimmed() {
        let a = SiteKey::from_url("https://example.com");
        let b = SiteKey::from_url("  https://example.com \n");
        assert_eq!(a, b);
    }

    #[test]
    fn test_trailing_slash_is_a_distinct_site() {
        let a = SiteKey::from_url("https://example.com");
        let b = SiteKey::from_url("https://example.com/");
        assert_ne!(a, b);
    }

    #[test]
    fn test_decode_url_roundtrip() {
        let url = "https://news.example.org/2023/01/some-story";
        let key = SiteKey::from_url(url);
        assert_eq!(key.decode_url().as_deref(), Some(url));
    }

    #[test]
    fn test_key_has_no_path_separators() {
        // Long URLs used to leave raw '/' in the key when only the first
        // occurrence was sanitized; the URL-safe alphabet rules that out.
        let url = "https://example.com/a/very/deep/path/with/many/segments?q=1&r=2";
        let key = SiteKey::from_url(url);
        assert!(!key.as_str().contains('/'));
        assert!(!key.as_str().contains('+'));
        assert!(!key.as_str().contains('='));
    }
}
