//! Domain entities for the Stance page-feedback system
//!
//! These structs mirror the documents held by the backing store. Ownership
//! of the data is the service, not any in-process structure; everything here
//! is a plain serde-serializable snapshot.

use serde::{Deserialize, Serialize};

use crate::identity::{CommentId, Timestamp, UserId};
use crate::site_key::SiteKey;

// ============================================================================
// ENUMS
// ============================================================================

/// Entity discriminator, used in error messages and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Site,
    Feeling,
    Comment,
    Report,
    User,
}

/// Reason attached to a comment report, matching the report dialog options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportReason {
    /// Unwanted commercial content or spam
    Commercial,
    /// Pornography or sexually explicit material
    Sexual,
    /// Child abuse
    Abuse,
    /// Hate speech or graphic violence
    Hate,
    /// Promotes terrorism
    Terrorism,
    /// Harassment or bullying
    Harassment,
    /// Suicide or self injury
    Suicide,
    /// Misinformation
    Misinformation,
}

impl ReportReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commercial => "commercial",
            Self::Sexual => "sexual",
            Self::Abuse => "abuse",
            Self::Hate => "hate",
            Self::Terrorism => "terrorism",
            Self::Harassment => "harassment",
            Self::Suicide => "suicide",
            Self::Misinformation => "misinformation",
        }
    }
}

/// Sort field for comment listings. Both sorts are descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentSort {
    /// Newest first.
    #[default]
    CreatedAt,
    /// Reverse-alphabetical by comment text.
    Text,
}

impl CommentSort {
    /// Field name as stored in query payloads.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Text => "text",
        }
    }
}

// ============================================================================
// ENTITY STRUCTS
// ============================================================================

/// Aggregate record of a URL's total likes/dislikes.
///
/// Created lazily on the first vote for a URL; mutated only by the counter
/// triggers; never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Original page URL.
    pub url: String,
    pub likes: i64,
    pub dislikes: i64,
}

/// One user's single like/dislike vote on a site.
///
/// Lives at `FeelingKey = user + site`; a later vote from the same user
/// replaces the prior one, so no history is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteFeeling {
    pub site: SiteKey,
    pub url: String,
    pub user: UserId,
    /// true = like, false = dislike.
    pub like: bool,
}

/// A short comment attached to a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    /// Filtered text, at most [`crate::MAX_COMMENT_LEN`] characters.
    pub text: String,
    pub user: UserId,
    pub site: SiteKey,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
    /// Soft-delete flag; listings must filter `hidden == false`.
    pub hidden: bool,
}

/// A user's flag against a specific comment for moderation review.
///
/// Lives at `ReportKey = reporter + comment`; consumed and deleted by the
/// moderation sweep once the comment is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentReport {
    pub reason: ReportReason,
    pub comment: CommentId,
    pub reported_by: UserId,
}

/// Profile document of a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: UserId,
    pub display_name: String,
    pub email: String,
    pub photo_url: String,
    pub created_at: Timestamp,
    /// Server time of the user's most recent authenticated write. Touched on
    /// every write; consumed externally as a coarse rate-limit signal.
    pub last_write: Option<Timestamp>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_report_reason_serializes_lowercase() {
        let json = serde_json::to_string(&ReportReason::Harassment).expect("serialize");
        assert_eq!(json, "\"harassment\"");
        assert_eq!(ReportReason::Harassment.as_str(), "harassment");
    }

    #[test]
    fn test_comment_sort_default_is_created_at() {
        assert_eq!(CommentSort::default(), CommentSort::CreatedAt);
        assert_eq!(CommentSort::CreatedAt.field_name(), "created_at");
        assert_eq!(CommentSort::Text.field_name(), "text");
    }

    #[test]
    fn test_comment_roundtrips_through_json() {
        let comment = Comment {
            id: CommentId::generate(),
            text: "solid article".to_string(),
            user: UserId::new("u-1"),
            site: SiteKey::from_url("https://example.com"),
            created_at: Utc::now(),
            updated_at: None,
            hidden: false,
        };
        let json = serde_json::to_string(&comment).expect("serialize");
        let back: Comment = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(comment, back);
    }
}
