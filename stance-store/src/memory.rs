//! In-memory document backend
//!
//! Authoritative server state plus a separate device-cache mirror, so tests
//! can exercise the read-through protocol for real: server reads populate
//! the mirror, writes go through to both, and the mirror can be wiped or
//! broken independently of the server.
//!
//! Failure injection covers the three conditions the data-access layer must
//! classify: server unavailable, writes denied by access control, and a
//! broken device cache (which the client swallows).

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use stance_core::{
    BackendError, BackendResult, Comment, CommentId, CommentReport, FeelingKey, ReportKey, Site,
    SiteFeeling, SiteKey, UserId, UserProfile,
};

use crate::backend::{
    evaluate_comment_query, BackendStats, CommentQuery, DocumentBackend, NewComment, ReadSource,
};

/// One copy of every collection. The backend holds two: the authoritative
/// server state and the on-device mirror.
#[derive(Debug, Default)]
struct Collections {
    sites: HashMap<SiteKey, Site>,
    feelings: HashMap<FeelingKey, SiteFeeling>,
    comments: HashMap<CommentId, Comment>,
    reports: BTreeMap<ReportKey, CommentReport>,
    users: HashMap<UserId, UserProfile>,
}

/// In-memory [`DocumentBackend`] with failure injection and stats.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    server: RwLock<Collections>,
    device: RwLock<Collections>,

    server_down: AtomicBool,
    deny_writes: AtomicBool,
    device_broken: AtomicBool,

    server_reads: AtomicU64,
    device_reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the server being unreachable: every server read and every
    /// write fails with `Unavailable`.
    pub fn set_server_down(&self, down: bool) {
        self.server_down.store(down, Ordering::Relaxed);
    }

    /// Simulate access-control rejection: every write fails with
    /// `PermissionDenied`.
    pub fn set_deny_writes(&self, deny: bool) {
        self.deny_writes.store(deny, Ordering::Relaxed);
    }

    /// Simulate a broken on-device cache: every `DeviceCache` read fails
    /// with `Corrupted`.
    pub fn set_device_broken(&self, broken: bool) {
        self.device_broken.store(broken, Ordering::Relaxed);
    }

    /// Wipe the device mirror, as if the store had never cached anything.
    pub async fn clear_device_cache(&self) {
        let mut device = self.device.write().await;
        *device = Collections::default();
    }

    /// Operation counters since construction.
    pub fn stats(&self) -> BackendStats {
        BackendStats {
            server_reads: self.server_reads.load(Ordering::Relaxed),
            device_reads: self.device_reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    fn check_write(&self, operation: &str) -> BackendResult<()> {
        if self.deny_writes.load(Ordering::Relaxed) {
            return Err(BackendError::permission_denied(operation));
        }
        if self.server_down.load(Ordering::Relaxed) {
            return Err(BackendError::unavailable(operation, "server unreachable"));
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn check_read(&self, operation: &str, source: ReadSource) -> BackendResult<()> {
        match source {
            ReadSource::DeviceCache => {
                self.device_reads.fetch_add(1, Ordering::Relaxed);
                if self.device_broken.load(Ordering::Relaxed) {
                    return Err(BackendError::Corrupted {
                        reason: format!("device cache unreadable during {operation}"),
                    });
                }
            }
            ReadSource::Server => {
                if self.server_down.load(Ordering::Relaxed) {
                    return Err(BackendError::unavailable(operation, "server unreachable"));
                }
                self.server_reads.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn site_get(&self, key: &SiteKey, source: ReadSource) -> BackendResult<Option<Site>> {
        self.check_read("site_get", source)?;
        match source {
            ReadSource::DeviceCache => Ok(self.device.read().await.sites.get(key).cloned()),
            ReadSource::Server => {
                let site = self.server.read().await.sites.get(key).cloned();
                if let Some(ref site) = site {
                    self.device
                        .write()
                        .await
                        .sites
                        .insert(key.clone(), site.clone());
                }
                Ok(site)
            }
        }
    }

    async fn site_put(&self, key: &SiteKey, site: Site) -> BackendResult<()> {
        self.check_write("site_put")?;
        self.server
            .write()
            .await
            .sites
            .insert(key.clone(), site.clone());
        self.device.write().await.sites.insert(key.clone(), site);
        Ok(())
    }

    async fn site_adjust_counts(
        &self,
        key: &SiteKey,
        likes_delta: i64,
        dislikes_delta: i64,
    ) -> BackendResult<()> {
        self.check_write("site_adjust_counts")?;
        let mut server = self.server.write().await;
        let site = server.sites.get_mut(key).ok_or_else(|| {
            BackendError::unavailable("site_adjust_counts", "document does not exist")
        })?;
        site.likes = (site.likes + likes_delta).max(0);
        site.dislikes = (site.dislikes + dislikes_delta).max(0);
        let updated = site.clone();
        drop(server);
        self.device.write().await.sites.insert(key.clone(), updated);
        Ok(())
    }

    async fn feeling_get(
        &self,
        key: &FeelingKey,
        source: ReadSource,
    ) -> BackendResult<Option<SiteFeeling>> {
        self.check_read("feeling_get", source)?;
        match source {
            ReadSource::DeviceCache => Ok(self.device.read().await.feelings.get(key).cloned()),
            ReadSource::Server => {
                let feeling = self.server.read().await.feelings.get(key).cloned();
                if let Some(ref feeling) = feeling {
                    self.device
                        .write()
                        .await
                        .feelings
                        .insert(key.clone(), feeling.clone());
                }
                Ok(feeling)
            }
        }
    }

    async fn feeling_upsert(&self, feeling: SiteFeeling) -> BackendResult<Option<SiteFeeling>> {
        self.check_write("feeling_upsert")?;
        let key = FeelingKey::new(&feeling.user, &feeling.site);
        let prior = self
            .server
            .write()
            .await
            .feelings
            .insert(key.clone(), feeling.clone());
        self.device.write().await.feelings.insert(key, feeling);
        Ok(prior)
    }

    async fn comments_query(
        &self,
        query: &CommentQuery,
        source: ReadSource,
    ) -> BackendResult<Vec<Comment>> {
        self.check_read("comments_query", source)?;
        match source {
            ReadSource::DeviceCache => Ok(evaluate_comment_query(
                self.device.read().await.comments.values(),
                query,
            )),
            ReadSource::Server => {
                let page =
                    evaluate_comment_query(self.server.read().await.comments.values(), query);
                let mut device = self.device.write().await;
                for comment in &page {
                    device.comments.insert(comment.id.clone(), comment.clone());
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
        self.check_read("comment_get", source)?;
        match source {
            ReadSource::DeviceCache => Ok(self.device.read().await.comments.get(id).cloned()),
            ReadSource::Server => {
                let comment = self.server.read().await.comments.get(id).cloned();
                if let Some(ref comment) = comment {
                    self.device
                        .write()
                        .await
                        .comments
                        .insert(id.clone(), comment.clone());
                }
                Ok(comment)
            }
        }
    }

    async fn comment_insert(&self, new: NewComment) -> BackendResult<Comment> {
        self.check_write("comment_insert")?;
        let comment = Comment {
            id: CommentId::generate(),
            text: new.text,
            user: new.user,
            site: new.site,
            created_at: Utc::now(),
            updated_at: None,
            hidden: false,
        };
        self.server
            .write()
            .await
            .comments
            .insert(comment.id.clone(), comment.clone());
        self.device
            .write()
            .await
            .comments
            .insert(comment.id.clone(), comment.clone());
        Ok(comment)
    }

    async fn comment_update_text(&self, id: &CommentId, text: String) -> BackendResult<()> {
        self.check_write("comment_update_text")?;
        let mut server = self.server.write().await;
        let comment = server.comments.get_mut(id).ok_or_else(|| {
            BackendError::unavailable("comment_update_text", "document does not exist")
        })?;
        comment.text = text;
        comment.updated_at = Some(Utc::now());
        let updated = comment.clone();
        drop(server);
        self.device
            .write()
            .await
            .comments
            .insert(id.clone(), updated);
        Ok(())
    }

    async fn comment_set_hidden(&self, id: &CommentId, hidden: bool) -> BackendResult<()> {
        self.check_write("comment_set_hidden")?;
        let mut server = self.server.write().await;
        let comment = server.comments.get_mut(id).ok_or_else(|| {
            BackendError::unavailable("comment_set_hidden", "document does not exist")
        })?;
        comment.hidden = hidden;
        let updated = comment.clone();
        drop(server);
        self.device
            .write()
            .await
            .comments
            .insert(id.clone(), updated);
        Ok(())
    }

    async fn comment_delete(&self, id: &CommentId) -> BackendResult<()> {
        self.check_write("comment_delete")?;
        self.server.write().await.comments.remove(id);
        self.device.write().await.comments.remove(id);
        Ok(())
    }

    async fn report_upsert(
        &self,
        key: &ReportKey,
        report: CommentReport,
    ) -> BackendResult<Option<CommentReport>> {
        self.check_write("report_upsert")?;
        let prior = self
            .server
            .write()
            .await
            .reports
            .insert(key.clone(), report);
        Ok(prior)
    }

    async fn reports_list(&self) -> BackendResult<Vec<(ReportKey, CommentReport)>> {
        if self.server_down.load(Ordering::Relaxed) {
            return Err(BackendError::unavailable(
                "reports_list",
                "server unreachable",
            ));
        }
        self.server_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .server
            .read()
            .await
            .reports
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn report_delete(&self, key: &ReportKey) -> BackendResult<()> {
        self.check_write("report_delete")?;
        self.server.write().await.reports.remove(key);
        Ok(())
    }

    async fn user_get(
        &self,
        uid: &UserId,
        source: ReadSource,
    ) -> BackendResult<Option<UserProfile>> {
        self.check_read("user_get", source)?;
        match source {
            ReadSource::DeviceCache => Ok(self.device.read().await.users.get(uid).cloned()),
            ReadSource::Server => {
                let profile = self.server.read().await.users.get(uid).cloned();
                if let Some(ref profile) = profile {
                    self.device
                        .write()
                        .await
                        .users
                        .insert(uid.clone(), profile.clone());
                }
                Ok(profile)
            }
        }
    }

    async fn user_put(&self, profile: UserProfile) -> BackendResult<()> {
        self.check_write("user_put")?;
        self.server
            .write()
            .await
            .users
            .insert(profile.uid.clone(), profile.clone());
        self.device.write().await.users.insert(profile.uid.clone(), profile);
        Ok(())
    }

    async fn user_touch(&self, uid: &UserId) -> BackendResult<()> {
        self.check_write("user_touch")?;
        let mut server = self.server.write().await;
        let profile = server
            .users
            .get_mut(uid)
            .ok_or_else(|| BackendError::unavailable("user_touch", "document does not exist"))?;
        profile.last_write = Some(Utc::now());
        let updated = profile.clone();
        drop(server);
        self.device.write().await.users.insert(uid.clone(), updated);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
