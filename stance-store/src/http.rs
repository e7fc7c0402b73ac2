//! HTTP document backend
//!
//! Talks to the hosted document database through a JSON API: point
//! get/put/patch/delete per collection plus a comment query endpoint.
//! Server reads are mirrored best-effort into a local bucket store, which is
//! what `ReadSource::DeviceCache` reads are served from - the on-device
//! cache the staleness tracker gates.
//!
//! Status classification is the single place backend failures become typed:
//! 401/403/429 are the store's access-control rejection (`PermissionDenied`,
//! commonly rate limiting), 404 on a read is an absent document
//! (`Ok(None)`), everything else is `Unavailable`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use stance_core::{
    BackendError, BackendResult, Comment, CommentId, CommentReport, FeelingKey, ReportKey, Site,
    SiteFeeling, SiteKey, UserId, UserProfile,
};

use crate::backend::{evaluate_comment_query, CommentQuery, DocumentBackend, NewComment, ReadSource};
use crate::settings::{get_bucket, set_bucket, SettingsStore};

/// Response wrapper for upserts: the server echoes the prior document.
#[derive(Debug, Deserialize)]
struct UpsertResponse<T> {
    previous: Option<T>,
}

/// Row shape of the report listing.
#[derive(Debug, Serialize, Deserialize)]
struct ReportRow {
    key: ReportKey,
    report: CommentReport,
}

/// HTTP-backed [`DocumentBackend`].
pub struct HttpBackend {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    mirror: Option<Arc<dyn SettingsStore>>,
}

impl HttpBackend {
    /// Create a backend for the given API base URL, without a device mirror
    /// (every `DeviceCache` read misses).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            auth_token: None,
            mirror: None,
        }
    }

    /// Attach a bearer token sent with every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Attach a local bucket store used as the on-device document cache.
    pub fn with_mirror(mut self, mirror: Arc<dyn SettingsStore>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.client.request(method, self.url(path));
        if let Some(ref token) = self.auth_token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Send a request and decode a JSON body. `404` maps to `Ok(None)`.
    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        req: RequestBuilder,
    ) -> BackendResult<Option<T>> {
        let response = req
            .send()
            .await
            .map_err(|e| BackendError::unavailable(operation, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(operation, status, &body));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| BackendError::Corrupted {
                reason: format!("{operation}: {e}"),
            })
    }

    /// Send a request where only the status matters.
    async fn send_unit(&self, operation: &'static str, req: RequestBuilder) -> BackendResult<()> {
        let response = req
            .send()
            .await
            .map_err(|e| BackendError::unavailable(operation, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(operation, status, &body));
        }
        Ok(())
    }

    /// Read a mirrored document. Only called on the `DeviceCache` path, so
    /// failures surface as `Corrupted` for the caller to swallow.
    async fn mirror_get<T: DeserializeOwned>(&self, bucket: &str) -> BackendResult<Option<T>> {
        let Some(ref mirror) = self.mirror else {
            return Ok(None);
        };
        get_bucket(mirror.as_ref(), bucket)
            .await
            .map_err(|e| BackendError::Corrupted {
                reason: e.to_string(),
            })
    }

    /// Mirror a server read. Best effort: a failed mirror write never fails
    /// the read that produced the data.
    async fn mirror_put<T: Serialize>(&self, bucket: &str, value: &T) {
        if let Some(ref mirror) = self.mirror {
            if let Err(e) = set_bucket(mirror.as_ref(), bucket, value).await {
                tracing::debug!(bucket, error = %e, "device mirror write failed");
            }
        }
    }
}

fn classify_status(operation: &str, status: StatusCode, body: &str) -> BackendError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            BackendError::permission_denied(operation)
        }
        _ => BackendError::unavailable(operation, format!("status {status}: {body}")),
    }
}

fn doc_bucket(collection: &str, id: &str) -> String {
    format!("doc:{collection}:{id}")
}

fn feed_bucket(query: &CommentQuery) -> String {
    format!(
        "feed:{}:{}",
        query.site.as_str(),
        query.sort.field_name()
    )
}

#[async_trait]
impl DocumentBackend for HttpBackend {
    async fn site_get(&self, key: &SiteKey, source: ReadSource) -> BackendResult<Option<Site>> {
        let bucket = doc_bucket("sites", key.as_str());
        match source {
            ReadSource::DeviceCache => self.mirror_get(&bucket).await,
            ReadSource::Server => {
                let site: Option<Site> = self
                    .send_json("site_get", self.request(Method::GET, &format!("sites/{key}")))
                    .await?;
                if let Some(ref site) = site {
                    self.mirror_put(&bucket, site).await;
                }
                Ok(site)
            }
        }
    }

    async fn site_put(&self, key: &SiteKey, site: Site) -> BackendResult<()> {
        self.send_unit(
            "site_put",
            self.request(Method::PUT, &format!("sites/{key}")).json(&site),
        )
        .await?;
        self.mirror_put(&doc_bucket("sites", key.as_str()), &site).await;
        Ok(())
    }

    async fn site_adjust_counts(
        &self,
        key: &SiteKey,
        likes_delta: i64,
        dislikes_delta: i64,
    ) -> BackendResult<()> {
        let body = serde_json::json!({
            "likes_delta": likes_delta,
            "dislikes_delta": dislikes_delta,
        });
        self.send_unit(
            "site_adjust_counts",
            self.request(Method::POST, &format!("sites/{key}/adjust"))
                .json(&body),
        )
        .await
    }

    async fn feeling_get(
        &self,
        key: &FeelingKey,
        source: ReadSource,
    ) -> BackendResult<Option<SiteFeeling>> {
        let bucket = doc_bucket("siteFeelings", key.as_str());
        match source {
            ReadSource::DeviceCache => self.mirror_get(&bucket).await,
            ReadSource::Server => {
                let feeling: Option<SiteFeeling> = self
                    .send_json(
                        "feeling_get",
                        self.request(Method::GET, &format!("siteFeelings/{key}")),
                    )
                    .await?;
                if let Some(ref feeling) = feeling {
                    self.mirror_put(&bucket, feeling).await;
                }
                Ok(feeling)
            }
        }
    }

    async fn feeling_upsert(&self, feeling: SiteFeeling) -> BackendResult<Option<SiteFeeling>> {
        let key = FeelingKey::new(&feeling.user, &feeling.site);
        let response: Option<UpsertResponse<SiteFeeling>> = self
            .send_json(
                "feeling_upsert",
                self.request(Method::PUT, &format!("siteFeelings/{key}"))
                    .json(&feeling),
            )
            .await?;
        self.mirror_put(&doc_bucket("siteFeelings", key.as_str()), &feeling)
            .await;
        Ok(response.and_then(|r| r.previous))
    }

    async fn comments_query(
        &self,
        query: &CommentQuery,
        source: ReadSource,
    ) -> BackendResult<Vec<Comment>> {
        match source {
            ReadSource::DeviceCache => {
                // Re-run the query over the last mirrored page so cursor and
                // hidden semantics match the server's.
                let cached: Option<Vec<Comment>> = self.mirror_get(&feed_bucket(query)).await?;
                Ok(cached
                    .map(|page| evaluate_comment_query(page.iter(), query))
                    .unwrap_or_default())
            }
            ReadSource::Server => {
                let page: Option<Vec<Comment>> = self
                    .send_json(
                        "comments_query",
                        self.request(Method::POST, "comments/query").json(query),
                    )
                    .await?;
                let page = page.unwrap_or_default();
                if query.cursor.is_none() {
                    self.mirror_put(&feed_bucket(query), &page).await;
                }
                Ok(page)
            }
        }
    }

    async fn comment_get(
        &self,
        id: &CommentId,
        source: ReadSource,
    ) -> BackendResult<Option<Comment>> {
        let bucket = doc_bucket("comments", id.as_str());
        match source {
            ReadSource::DeviceCache => self.mirror_get(&bucket).await,
            ReadSource::Server => {
                let comment: Option<Comment> = self
                    .send_json(
                        "comment_get",
                        self.request(Method::GET, &format!("comments/{id}")),
                    )
                    .await?;
                if let Some(ref comment) = comment {
                    self.mirror_put(&bucket, comment).await;
                }
                Ok(comment)
            }
        }
    }

    async fn comment_insert(&self, new: NewComment) -> BackendResult<Comment> {
        let comment: Option<Comment> = self
            .send_json(
                "comment_insert",
                self.request(Method::POST, "comments").json(&new),
            )
            .await?;
        let comment = comment.ok_or_else(|| BackendError::Corrupted {
            reason: "comment_insert: empty response".to_string(),
        })?;
        self.mirror_put(&doc_bucket("comments", comment.id.as_str()), &comment)
            .await;

        // Locally posted comments show up in device-cache listings right
        // away, the way the store SDK's cache reflects its own writes.
        for sort in [stance_core::CommentSort::CreatedAt, stance_core::CommentSort::Text] {
            let bucket = feed_bucket(&CommentQuery::new(comment.site.clone()).with_sort(sort));
            if let Ok(Some(mut page)) = self.mirror_get::<Vec<Comment>>(&bucket).await {
                page.push(comment.clone());
                self.mirror_put(&bucket, &page).await;
            }
        }

        Ok(comment)
    }

    async fn comment_update_text(&self, id: &CommentId, text: String) -> BackendResult<()> {
        let body = serde_json::json!({ "text": text });
        self.send_unit(
            "comment_update_text",
            self.request(Method::PATCH, &format!("comments/{id}")).json(&body),
        )
        .await
    }

    async fn comment_set_hidden(&self, id: &CommentId, hidden: bool) -> BackendResult<()> {
        let body = serde_json::json!({ "hidden": hidden });
        self.send_unit(
            "comment_set_hidden",
            self.request(Method::PATCH, &format!("comments/{id}")).json(&body),
        )
        .await
    }

    async fn comment_delete(&self, id: &CommentId) -> BackendResult<()> {
        self.send_unit(
            "comment_delete",
            self.request(Method::DELETE, &format!("comments/{id}")),
        )
        .await
    }

    async fn report_upsert(
        &self,
        key: &ReportKey,
        report: CommentReport,
    ) -> BackendResult<Option<CommentReport>> {
        let response: Option<UpsertResponse<CommentReport>> = self
            .send_json(
                "report_upsert",
                self.request(Method::PUT, &format!("commentReports/{key}"))
                    .json(&report),
            )
            .await?;
        Ok(response.and_then(|r| r.previous))
    }

    async fn reports_list(&self) -> BackendResult<Vec<(ReportKey, CommentReport)>> {
        let rows: Option<Vec<ReportRow>> = self
            .send_json("reports_list", self.request(Method::GET, "commentReports"))
            .await?;
        Ok(rows
            .unwrap_or_default()
            .into_iter()
            .map(|row| (row.key, row.report))
            .collect())
    }

    async fn report_delete(&self, key: &ReportKey) -> BackendResult<()> {
        self.send_unit(
            "report_delete",
            self.request(Method::DELETE, &format!("commentReports/{key}")),
        )
        .await
    }

    async fn user_get(
        &self,
        uid: &UserId,
        source: ReadSource,
    ) -> BackendResult<Option<UserProfile>> {
        let bucket = doc_bucket("users", uid.as_str());
        match source {
            ReadSource::DeviceCache => self.mirror_get(&bucket).await,
            ReadSource::Server => {
                let profile: Option<UserProfile> = self
                    .send_json("user_get", self.request(Method::GET, &format!("users/{uid}")))
                    .await?;
                if let Some(ref profile) = profile {
                    self.mirror_put(&bucket, profile).await;
                }
                Ok(profile)
            }
        }
    }

    async fn user_put(&self, profile: UserProfile) -> BackendResult<()> {
        let path = format!("users/{}", profile.uid);
        self.send_unit("user_put", self.request(Method::PUT, &path).json(&profile))
            .await?;
        self.mirror_put(&doc_bucket("users", profile.uid.as_str()), &profile)
            .await;
        Ok(())
    }

    async fn user_touch(&self, uid: &UserId) -> BackendResult<()> {
        self.send_unit(
            "user_touch",
            self.request(Method::POST, &format!("users/{uid}/touch")),
        )
        .await
    }
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("mirror", &self.mirror.is_some())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
