//! Read-through data access over the document backend
//!
//! Reads follow one protocol: compute the cache key for the query shape, try
//! the device cache (errors are misses), then go to the server when the
//! staleness tracker says so, when the caller forces it, or when the cache
//! had nothing usable - recording the fetch on success. Cursor-based comment
//! pages always take the server round trip: a cursor means there was more
//! data than fit before, so the device cache alone cannot satisfy it
//! reliably.
//!
//! Writes never consult the cache. Validation runs before anything leaves
//! the process, and permission rejections stay distinguishable so the view
//! layer can show its "too many requests" notice.

use std::sync::Arc;

use stance_core::{
    clean_comment, Comment, CommentId, CommentReport, CommentSort, FeelingKey, ReportKey,
    ReportReason, Site, SiteFeeling, SiteKey, StanceResult, UserId, UserProfile,
};
use stance_store::{
    CommentCursor, CommentQuery, DocumentBackend, NewComment, ReadSource, SettingsStore,
    StalenessConfig, StalenessTracker, DEFAULT_PAGE_SIZE,
};

/// Configuration for the data access layer.
#[derive(Debug, Clone)]
pub struct DataAccessConfig {
    /// Comment page size.
    pub page_size: usize,
    /// Staleness tracker settings (freshness TTL).
    pub staleness: StalenessConfig,
}

impl Default for DataAccessConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            staleness: StalenessConfig::default(),
        }
    }
}

impl DataAccessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_staleness(mut self, staleness: StalenessConfig) -> Self {
        self.staleness = staleness;
        self
    }
}

/// The data access layer consumed by the view layer.
pub struct DataAccess {
    backend: Arc<dyn DocumentBackend>,
    staleness: StalenessTracker,
    config: DataAccessConfig,
}

impl DataAccess {
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        settings: Arc<dyn SettingsStore>,
        config: DataAccessConfig,
    ) -> Self {
        let staleness = StalenessTracker::new(settings, config.staleness.clone());
        Self {
            backend,
            staleness,
            config,
        }
    }

    pub fn config(&self) -> &DataAccessConfig {
        &self.config
    }

    // ========================================================================
    // READS (cache-gated)
    // ========================================================================

    /// Read a site's like/dislike aggregate.
    pub async fn get_site(&self, site: &SiteKey, force: bool) -> StanceResult<Option<Site>> {
        let stale = self.staleness.is_stale(site.as_str()).await;

        // Device cache first; a failed cache read is a miss, not an error.
        let mut snapshot = self
            .backend
            .site_get(site, ReadSource::DeviceCache)
            .await
            .unwrap_or(None);

        if stale || force || snapshot.is_none() {
            snapshot = self.backend.site_get(site, ReadSource::Server).await?;
            self.staleness.record_fetch(site.as_str()).await;
        }

        Ok(snapshot)
    }

    /// Read the user's own vote on a site, if any.
    pub async fn get_user_feeling(
        &self,
        user: &UserId,
        site: &SiteKey,
        force: bool,
    ) -> StanceResult<Option<SiteFeeling>> {
        let key = FeelingKey::new(user, site);
        let stale = self.staleness.is_stale(site.as_str()).await;

        let mut snapshot = self
            .backend
            .feeling_get(&key, ReadSource::DeviceCache)
            .await
            .unwrap_or(None);

        if stale || force || snapshot.is_none() {
            snapshot = self.backend.feeling_get(&key, ReadSource::Server).await?;
            self.staleness.record_fetch(site.as_str()).await;
        }

        Ok(snapshot)
    }

    /// Read a user profile, gated by the user's own cache key.
    pub async fn get_user_profile(&self, uid: &UserId) -> StanceResult<Option<UserProfile>> {
        let stale = self.staleness.is_stale(uid.as_str()).await;

        let mut snapshot = self
            .backend
            .user_get(uid, ReadSource::DeviceCache)
            .await
            .unwrap_or(None);

        if stale || snapshot.is_none() {
            snapshot = self.backend.user_get(uid, ReadSource::Server).await?;
            self.staleness.record_fetch(uid.as_str()).await;
        }

        Ok(snapshot)
    }

    /// List one page of a site's visible comments, sorted descending.
    ///
    /// Requesting the same (site, sort, cursor) twice without intervening
    /// writes returns the same identifiers.
    pub async fn list_comments(
        &self,
        site: &SiteKey,
        sort: CommentSort,
        cursor: Option<CommentCursor>,
    ) -> StanceResult<Vec<Comment>> {
        let query = CommentQuery::new(site.clone())
            .with_sort(sort)
            .with_cursor(cursor)
            .with_limit(self.config.page_size);

        let stale = self.staleness.is_stale(site.as_str()).await;

        let cached = self
            .backend
            .comments_query(&query, ReadSource::DeviceCache)
            .await
            .unwrap_or_default();

        // An empty cached page is "no usable result": a site with no cached
        // comments always asks the server.
        if stale || query.cursor.is_some() || cached.is_empty() {
            let page = self
                .backend
                .comments_query(&query, ReadSource::Server)
                .await?;
            self.staleness.record_fetch(site.as_str()).await;
            return Ok(page);
        }

        Ok(cached)
    }

    // ========================================================================
    // WRITES (straight through)
    // ========================================================================

    /// Validate, filter, and post a comment, then touch the author.
    pub async fn create_comment(
        &self,
        text: &str,
        user: &UserId,
        site: &SiteKey,
    ) -> StanceResult<Comment> {
        // Validation failures prevent the network call entirely.
        let cleaned = clean_comment(text)?;

        let comment = self
            .backend
            .comment_insert(NewComment {
                text: cleaned,
                user: user.clone(),
                site: site.clone(),
            })
            .await?;

        self.backend.user_touch(user).await?;

        tracing::debug!(comment_id = %comment.id, site = %site, "comment created");
        Ok(comment)
    }

    /// Validate and overwrite a comment's text; the backend stamps
    /// `updated_at`. Authorship is enforced by the store's access-control
    /// rules, surfacing as `PermissionDenied`.
    pub async fn update_comment(
        &self,
        id: &CommentId,
        text: &str,
    ) -> StanceResult<()> {
        let cleaned = clean_comment(text)?;
        self.backend.comment_update_text(id, cleaned).await?;
        Ok(())
    }

    /// Soft-delete: the record stays in the store with `hidden = true` and
    /// disappears from listings. Physical removal happens only in the
    /// moderation job.
    pub async fn delete_comment(&self, id: &CommentId) -> StanceResult<()> {
        self.backend.comment_set_hidden(id, true).await?;
        Ok(())
    }

    /// Cast (or change) the user's vote on a site, then touch the voter.
    /// A later vote overwrites the prior one; no history is kept.
    pub async fn cast_vote(
        &self,
        like: bool,
        user: &UserId,
        site: &SiteKey,
        url: &str,
    ) -> StanceResult<()> {
        self.backend
            .feeling_upsert(SiteFeeling {
                site: site.clone(),
                url: url.to_string(),
                user: user.clone(),
                like,
            })
            .await?;

        self.backend.user_touch(user).await?;

        tracing::debug!(user = %user, site = %site, like, "vote cast");
        Ok(())
    }

    /// Report a comment, overwriting any earlier report by the same
    /// reporter, then touch the reporter.
    pub async fn report_comment(
        &self,
        reason: ReportReason,
        reporter: &UserId,
        comment: &CommentId,
    ) -> StanceResult<()> {
        let key = ReportKey::new(reporter, comment);
        self.backend
            .report_upsert(
                &key,
                CommentReport {
                    reason,
                    comment: comment.clone(),
                    reported_by: reporter.clone(),
                },
            )
            .await?;

        self.backend.user_touch(reporter).await?;
        Ok(())
    }
}

impl std::fmt::Debug for DataAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataAccess")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================
