//! Identity types for Stance entities
//!
//! Identifiers are backend-assigned strings. Composite keys (`FeelingKey`,
//! `ReportKey`) can only be built from their parts, so a vote or report is
//! addressable at exactly one document per (user, target) pair - the
//! overwrite-upsert that enforces "at most one" lives behind these types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ============================================================================
// POINT IDENTIFIERS
// ============================================================================

/// Identifier of a signed-in user, assigned by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a comment document.
///
/// Generated ids are UUIDv7-derived, so they sort by creation time the same
/// way the backing store's auto-ids do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(String);

impl CommentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh, timestamp-sortable comment id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// COMPOSITE KEYS
// ============================================================================

/// Document key of a user's vote on a site: `user id + site key`.
///
/// There is no other way to construct one, so a (user, site) pair always
/// addresses the same document and a later vote overwrites the earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeelingKey(String);

impl FeelingKey {
    pub fn new(user: &UserId, site: &crate::site_key::SiteKey) -> Self {
        Self(format!("{}{}", user.as_str(), site.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeelingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Document key of a user's report against a comment: `user id + comment id`.
///
/// At most one live report per reporter per comment, by the same overwrite
/// semantics as [`FeelingKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportKey(String);

impl ReportKey {
    pub fn new(reporter: &UserId, comment: &CommentId) -> Self {
        Self(format!("{}{}", reporter.as_str(), comment.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportKey {
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
    use crate::site_key::SiteKey;

    #[test]
    fn test_generated_comment_ids_are_sortable() {
        let id1 = CommentId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = CommentId::generate();
        assert!(id1 < id2);
    }

    #[test]
    fn test_feeling_key_is_deterministic() {
        let user = UserId::new("UIrqHna0XUNqLLnUpMSm");
        let site = SiteKey::from_url("https://example.com/page");

        let k1 = FeelingKey::new(&user, &site);
        let k2 = FeelingKey::new(&user, &site);
        assert_eq!(k1, k2);
        assert_eq!(
            k1.as_str(),
            format!("{}{}", user.as_str(), site.as_str())
        );
    }

    #[test]
    fn test_report_key_differs_per_reporter() {
        let comment = CommentId::generate();
        let k1 = ReportKey::new(&UserId::new("alice"), &comment);
        let k2 = ReportKey::new(&UserId::new("bob"), &comment);
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_user_id_serializes_transparently() {
        let user = UserId::new("abc123");
        let json = serde_json::to_string(&user).expect("serialize");
        assert_eq!(json, "\"abc123\"");
    }
}
