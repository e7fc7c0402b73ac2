//! Stance Test Utilities
//!
//! Centralized test infrastructure for the Stance workspace:
//! - Proptest generators for urls, identifiers, and entities
//! - Fixtures that seed a MemoryBackend with users and comment feeds

// Re-export core types for convenience
pub use stance_core::{
    Comment, CommentId, CommentReport, CommentSort, FeelingKey, ReportKey, ReportReason, Site,
    SiteFeeling, SiteKey, UserId, UserProfile,
};
pub use stance_store::{MemoryBackend, MemorySettings};

use chrono::Utc;
use proptest::prelude::*;
use stance_store::{DocumentBackend, NewComment};
use std::sync::Arc;

// ============================================================================
// GENERATORS
// ============================================================================

/// Strategy for plausible page URLs.
pub fn url_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{3,12}", "(com|org|net|dev)", "[a-z0-9/-]{0,24}")
        .prop_map(|(host, tld, path)| format!("https://{host}.{tld}/{path}"))
}

/// Strategy for site keys derived from generated URLs.
pub fn site_key_strategy() -> impl Strategy<Value = SiteKey> {
    url_strategy().prop_map(|url| SiteKey::from_url(&url))
}

/// Strategy for auth-provider user ids.
pub fn user_id_strategy() -> impl Strategy<Value = UserId> {
    "[A-Za-z0-9]{20,28}".prop_map(UserId::new)
}

/// Strategy for comment text that passes the content filter.
pub fn comment_text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?]{1,140}".prop_filter("must not be blank", |s| !s.trim().is_empty())
}

/// Strategy for a vote.
pub fn feeling_strategy() -> impl Strategy<Value = SiteFeeling> {
    (url_strategy(), user_id_strategy(), any::<bool>()).prop_map(|(url, user, like)| SiteFeeling {
        site: SiteKey::from_url(&url),
        url,
        user,
        like,
    })
}

// ============================================================================
// FIXTURES
// ============================================================================

/// The user every fixture seeds into the backend.
pub fn fixture_user() -> UserProfile {
    UserProfile {
        uid: UserId::new("fixture-user"),
        display_name: "Fixture User".to_string(),
        email: "fixture@example.com".to_string(),
        photo_url: String::new(),
        created_at: Utc::now(),
        last_write: None,
    }
}

/// A backend seeded with the fixture user.
pub async fn seeded_backend() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .user_put(fixture_user())
        .await
        .expect("seed fixture user");
    backend
}

/// A backend seeded with the fixture user and `count` comments on `site`,
/// posted in order. Returns the stored comments, oldest first.
pub async fn backend_with_comments(site: &SiteKey, count: usize) -> (Arc<MemoryBackend>, Vec<Comment>) {
    let backend = seeded_backend().await;
    let user = fixture_user().uid;

    let mut comments = Vec::with_capacity(count);
    for i in 0..count {
        let comment = backend
            .comment_insert(NewComment {
                text: format!("fixture comment {i}"),
                user: user.clone(),
                site: site.clone(),
            })
            .await
            .expect("seed comment");
        comments.push(comment);
    }

    (backend, comments)
}
