//! Document backend trait and query types
//!
//! The backing store exposes two distinguishable read paths: the on-device
//! document cache (best-effort, may fail or miss) and the authoritative
//! server. Every point read takes a [`ReadSource`] so the data-access layer
//! can drive the read-through protocol explicitly.
//!
//! Upserts address documents by deterministic composite keys and return the
//! previous document, which is what the counter triggers consume to swap a
//! prior vote's effect.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use stance_core::{
    BackendResult, Comment, CommentId, CommentReport, CommentSort, FeelingKey, ReportKey, Site,
    SiteFeeling, SiteKey, Timestamp, UserId, UserProfile,
};

/// Default page size for comment listings.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Where a read is served from.
///
/// `DeviceCache` is the store-provided on-device cache: it has no active
/// invalidation signal across short-lived popup sessions, which is exactly
/// why the staleness tracker exists. `Server` is an authoritative round
/// trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadSource {
    DeviceCache,
    Server,
}

/// Payload for creating a comment. The backend assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub text: String,
    pub user: UserId,
    pub site: SiteKey,
}

/// Pagination cursor: the sort-key snapshot of the last item of a page.
///
/// The backing store resumes strictly after this position under the active
/// sort; the comment id is the tiebreak for equal sort values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentCursor {
    pub created_at: Timestamp,
    pub text: String,
    pub id: CommentId,
}

impl From<&Comment> for CommentCursor {
    fn from(comment: &Comment) -> Self {
        Self {
            created_at: comment.created_at,
            text: comment.text.clone(),
            id: comment.id.clone(),
        }
    }
}

/// Comment listing query: site equality + `hidden == false`, descending
/// sort, optional start-after cursor, page limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentQuery {
    pub site: SiteKey,
    pub sort: CommentSort,
    pub cursor: Option<CommentCursor>,
    pub limit: usize,
}

impl CommentQuery {
    /// Query for the first page of a site's comments, newest first.
    pub fn new(site: SiteKey) -> Self {
        Self {
            site,
            sort: CommentSort::default(),
            cursor: None,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_sort(mut self, sort: CommentSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_cursor(mut self, cursor: Option<CommentCursor>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Operation counters, exposed so tests can assert how many round trips the
/// read-through protocol actually performed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Authoritative server reads (point reads and queries).
    pub server_reads: u64,
    /// Device-cache reads attempted.
    pub device_reads: u64,
    /// Write operations accepted.
    pub writes: u64,
}

/// The backing document database.
///
/// All operations are async and non-blocking; none of them time out or get
/// cancelled by this layer. "Not found" is `Ok(None)`, never an error.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    // === Site operations ===

    /// Read a site aggregate.
    async fn site_get(&self, key: &SiteKey, source: ReadSource) -> BackendResult<Option<Site>>;

    /// Create or replace a site aggregate. Trigger/moderation use only.
    async fn site_put(&self, key: &SiteKey, site: Site) -> BackendResult<()>;

    /// Adjust a site's counters by the given deltas, clamping at zero.
    /// Both deltas are applied in one update.
    async fn site_adjust_counts(
        &self,
        key: &SiteKey,
        likes_delta: i64,
        dislikes_delta: i64,
    ) -> BackendResult<()>;

    // === SiteFeeling operations ===

    /// Read one user's vote on one site.
    async fn feeling_get(
        &self,
        key: &FeelingKey,
        source: ReadSource,
    ) -> BackendResult<Option<SiteFeeling>>;

    /// Create or overwrite a vote at its composite key, returning the prior
    /// vote if one existed.
    async fn feeling_upsert(&self, feeling: SiteFeeling) -> BackendResult<Option<SiteFeeling>>;

    // === Comment operations ===

    /// Run a comment listing query.
    async fn comments_query(
        &self,
        query: &CommentQuery,
        source: ReadSource,
    ) -> BackendResult<Vec<Comment>>;

    /// Read one comment, hidden or not.
    async fn comment_get(
        &self,
        id: &CommentId,
        source: ReadSource,
    ) -> BackendResult<Option<Comment>>;

    /// Insert a comment with `hidden = false` and a server-assigned
    /// `created_at`, returning the stored document.
    async fn comment_insert(&self, new: NewComment) -> BackendResult<Comment>;

    /// Overwrite a comment's text and set `updated_at` to server time.
    async fn comment_update_text(&self, id: &CommentId, text: String) -> BackendResult<()>;

    /// Set the soft-delete flag.
    async fn comment_set_hidden(&self, id: &CommentId, hidden: bool) -> BackendResult<()>;

    /// Physically remove a comment. Moderation use only; the client path
    /// never calls this.
    async fn comment_delete(&self, id: &CommentId) -> BackendResult<()>;

    // === CommentReport operations ===

    /// Create or overwrite a report at its composite key, returning the
    /// prior report if one existed.
    async fn report_upsert(
        &self,
        key: &ReportKey,
        report: CommentReport,
    ) -> BackendResult<Option<CommentReport>>;

    /// List every live report. Moderation use only.
    async fn reports_list(&self) -> BackendResult<Vec<(ReportKey, CommentReport)>>;

    /// Physically remove a report. Moderation use only.
    async fn report_delete(&self, key: &ReportKey) -> BackendResult<()>;

    // === User operations ===

    /// Read a user profile.
    async fn user_get(&self, uid: &UserId, source: ReadSource)
        -> BackendResult<Option<UserProfile>>;

    /// Create or replace a user profile.
    async fn user_put(&self, profile: UserProfile) -> BackendResult<()>;

    /// Set the user's `last_write` to server time.
    async fn user_touch(&self, uid: &UserId) -> BackendResult<()>;
}

// ============================================================================
// QUERY EVALUATION
// ============================================================================

/// Ascending comparison of two comments under the given sort field, with the
/// comment id as tiebreak.
fn sort_cmp(a: &Comment, b: &Comment, sort: CommentSort) -> std::cmp::Ordering {
    match sort {
        CommentSort::CreatedAt => a
            .created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id)),
        CommentSort::Text => a.text.cmp(&b.text).then_with(|| a.id.cmp(&b.id)),
    }
}

/// True when `comment` sits strictly after `cursor` in the descending
/// ordering, i.e. strictly below it in ascending key order.
fn after_cursor(comment: &Comment, cursor: &CommentCursor, sort: CommentSort) -> bool {
    use std::cmp::Ordering::Less;
    match sort {
        CommentSort::CreatedAt => {
            (comment.created_at, &comment.id).cmp(&(cursor.created_at, &cursor.id)) == Less
        }
        CommentSort::Text => {
            (comment.text.as_str(), &comment.id).cmp(&(cursor.text.as_str(), &cursor.id)) == Less
        }
    }
}

/// Evaluate a comment query over a set of candidate documents: site
/// equality, `hidden == false`, descending sort, start-after cursor, limit.
///
/// Both backends use this so that device-cache and server listings agree on
/// ordering and cursor semantics.
pub(crate) fn evaluate_comment_query<'a, I>(items: I, query: &CommentQuery) -> Vec<Comment>
where
    I: IntoIterator<Item = &'a Comment>,
{
    let mut matching: Vec<&Comment> = items
        .into_iter()
        .filter(|c| c.site == query.site && !c.hidden)
        .collect();

    matching.sort_by(|a, b| sort_cmp(b, a, query.sort));

    matching
        .into_iter()
        .filter(|c| match &query.cursor {
            Some(cursor) => after_cursor(c, cursor, query.sort),
            None => true,
        })
        .take(query.limit)
        .cloned()
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
