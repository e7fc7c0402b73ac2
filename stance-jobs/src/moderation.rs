//! Report-threshold moderation sweep
//!
//! A scheduled job tallies CommentReports per comment and hard-deletes any
//! comment whose report count reaches the threshold, then deletes the
//! consumed reports. The tally lives in a map scoped to a single sweep
//! invocation; nothing accumulates across runs.
//!
//! [`moderation_task`] drives sweeps on an interval until the shutdown
//! signal is received, collecting metrics along the way.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use stance_core::{CommentId, ReportKey, StanceResult};
use stance_store::DocumentBackend;

/// Default report threshold. One report currently deletes a comment; the
/// value is configurable rather than assumed.
pub const DEFAULT_REPORT_THRESHOLD: usize = 1;

/// Default time between sweeps.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the moderation sweep.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Reports required before a comment is removed.
    pub threshold: usize,

    /// How often [`moderation_task`] runs a sweep.
    pub sweep_interval: Duration,

    /// Whether to log each deleted comment.
    pub log_deletions: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_REPORT_THRESHOLD,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            log_deletions: true,
        }
    }
}

impl ModerationConfig {
    /// Create ModerationConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `STANCE_REPORT_THRESHOLD`: reports required for deletion (default: 1)
    /// - `STANCE_SWEEP_INTERVAL_SECS`: seconds between sweeps (default: 86400)
    /// - `STANCE_LOG_DELETIONS`: whether to log deletions (default: true)
    pub fn from_env() -> Self {
        let threshold = std::env::var("STANCE_REPORT_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REPORT_THRESHOLD);

        let sweep_interval = Duration::from_secs(
            std::env::var("STANCE_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        );

        let log_deletions = std::env::var("STANCE_LOG_DELETIONS")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            threshold,
            sweep_interval,
            log_deletions,
        }
    }

    /// Short intervals for development and testing.
    pub fn development() -> Self {
        Self {
            threshold: DEFAULT_REPORT_THRESHOLD,
            sweep_interval: Duration::from_secs(10),
            log_deletions: true,
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters tracking sweep activity since startup.
#[derive(Debug, Default)]
pub struct ModerationMetrics {
    /// Comments hard-deleted for violations.
    pub comments_deleted: AtomicU64,

    /// Reports deleted after their comment was removed.
    pub reports_deleted: AtomicU64,

    /// Sweep cycles completed.
    pub sweep_cycles: AtomicU64,

    /// Errors encountered during sweeps.
    pub sweep_errors: AtomicU64,
}

impl ModerationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot of all counters.
    pub fn snapshot(&self) -> ModerationSnapshot {
        ModerationSnapshot {
            comments_deleted: self.comments_deleted.load(Ordering::Relaxed),
            reports_deleted: self.reports_deleted.load(Ordering::Relaxed),
            sweep_cycles: self.sweep_cycles.load(Ordering::Relaxed),
            sweep_errors: self.sweep_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationSnapshot {
    pub comments_deleted: u64,
    pub reports_deleted: u64,
    pub sweep_cycles: u64,
    pub sweep_errors: u64,
}

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub comments_deleted: u64,
    pub reports_deleted: u64,
}

// ============================================================================
// SWEEP
// ============================================================================

/// Run one moderation sweep.
///
/// Tallies all live reports per comment (the tally map is local to this
/// invocation), deletes every comment at or over the threshold, then
/// deletes the reports that counted against it. Per-comment failures are
/// logged and counted; the sweep keeps going.
pub async fn run_sweep(
    backend: &dyn DocumentBackend,
    config: &ModerationConfig,
    metrics: &ModerationMetrics,
) -> StanceResult<SweepSummary> {
    metrics.sweep_cycles.fetch_add(1, Ordering::Relaxed);

    let reports = backend.reports_list().await?;

    // Built fresh each run; never persisted across invocations.
    let mut by_comment: HashMap<CommentId, Vec<ReportKey>> = HashMap::new();
    for (key, report) in reports {
        by_comment.entry(report.comment).or_default().push(key);
    }

    let mut summary = SweepSummary::default();

    for (comment_id, report_keys) in by_comment {
        if report_keys.len() < config.threshold {
            continue;
        }

        if config.log_deletions {
            tracing::warn!(
                comment_id = %comment_id,
                reports = report_keys.len(),
                threshold = config.threshold,
                "deleting comment for violations"
            );
        }

        if let Err(e) = backend.comment_delete(&comment_id).await {
            tracing::error!(error = %e, comment_id = %comment_id, "failed to delete comment");
            metrics.sweep_errors.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        summary.comments_deleted += 1;
        metrics.comments_deleted.fetch_add(1, Ordering::Relaxed);

        // The reports are consumed once the comment is gone.
        for key in report_keys {
            match backend.report_delete(&key).await {
                Ok(()) => {
                    summary.reports_deleted += 1;
                    metrics.reports_deleted.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::error!(error = %e, report_key = %key, "failed to delete report");
                    metrics.sweep_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    Ok(summary)
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Run moderation sweeps on an interval until the shutdown signal fires.
///
/// Returns the metrics collected over the task's lifetime.
pub async fn moderation_task(
    backend: Arc<dyn DocumentBackend>,
    config: ModerationConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<ModerationMetrics> {
    let metrics = Arc::new(ModerationMetrics::new());

    let mut sweep_interval = interval(config.sweep_interval);
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        threshold = config.threshold,
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "moderation task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("moderation task shutting down");
                    break;
                }
            }

            _ = sweep_interval.tick() => {
                match run_sweep(backend.as_ref(), &config, &metrics).await {
                    Ok(summary) if summary.comments_deleted > 0 => {
                        tracing::info!(
                            comments = summary.comments_deleted,
                            reports = summary.reports_deleted,
                            "moderation sweep completed"
                        );
                    }
                    Ok(_) => {
                        tracing::trace!("moderation sweep completed with nothing to do");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "moderation sweep failed");
                        metrics.sweep_errors.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        comments_deleted = snapshot.comments_deleted,
        reports_deleted = snapshot.reports_deleted,
        sweep_cycles = snapshot.sweep_cycles,
        sweep_errors = snapshot.sweep_errors,
        "moderation task completed"
    );

    metrics
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use stance_core::{
        Comment, CommentReport, ReportReason, SiteKey, UserId,
    };
    use stance_store::{CommentQuery, MemoryBackend, NewComment, ReadSource};

    const URL: &str = "https://example.com/article";

    async fn post_comment(backend: &MemoryBackend, text: &str) -> Comment {
        backend
            .comment_insert(NewComment {
                text: text.to_string(),
                user: UserId::new("author"),
                site: SiteKey::from_url(URL),
            })
            .await
            .expect("insert")
    }

    async fn report(backend: &MemoryBackend, reporter: &str, comment: &CommentId) {
        let user = UserId::new(reporter);
        let key = ReportKey::new(&user, comment);
        backend
            .report_upsert(
                &key,
                CommentReport {
                    reason: ReportReason::Harassment,
                    comment: comment.clone(),
                    reported_by: user,
                },
            )
            .await
            .expect("report");
    }

    #[tokio::test]
    async fn test_single_report_deletes_comment_at_threshold_one() {
        let backend = MemoryBackend::new();
        let comment = post_comment(&backend, "reported comment").await;
        report(&backend, "reporter-1", &comment.id).await;

        let config = ModerationConfig::default();
        let metrics = ModerationMetrics::new();
        let summary = run_sweep(&backend, &config, &metrics)
            .await
            .expect("sweep");

        assert_eq!(summary.comments_deleted, 1);
        assert_eq!(summary.reports_deleted, 1);

        // The comment is physically gone, not just hidden.
        let stored = backend
            .comment_get(&comment.id, ReadSource::Server)
            .await
            .expect("get");
        assert!(stored.is_none());

        // Listings never return it again.
        let page = backend
            .comments_query(&CommentQuery::new(SiteKey::from_url(URL)), ReadSource::Server)
            .await
            .expect("query");
        assert!(page.is_empty());

        // The consumed report is gone too.
        assert!(backend.reports_list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_below_threshold_leaves_comment_alone() {
        let backend = MemoryBackend::new();
        let comment = post_comment(&backend, "twice-reported").await;
        report(&backend, "reporter-1", &comment.id).await;

        let config = ModerationConfig {
            threshold: 3,
            ..ModerationConfig::default()
        };
        let metrics = ModerationMetrics::new();
        let summary = run_sweep(&backend, &config, &metrics)
            .await
            .expect("sweep");

        assert_eq!(summary.comments_deleted, 0);
        assert!(backend
            .comment_get(&comment.id, ReadSource::Server)
            .await
            .expect("get")
            .is_some());
        assert_eq!(backend.reports_list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn test_reports_from_distinct_users_count_together() {
        let backend = MemoryBackend::new();
        let comment = post_comment(&backend, "widely reported").await;
        report(&backend, "reporter-1", &comment.id).await;
        report(&backend, "reporter-2", &comment.id).await;
        report(&backend, "reporter-3", &comment.id).await;

        let config = ModerationConfig {
            threshold: 3,
            ..ModerationConfig::default()
        };
        let metrics = ModerationMetrics::new();
        let summary = run_sweep(&backend, &config, &metrics)
            .await
            .expect("sweep");

        assert_eq!(summary.comments_deleted, 1);
        assert_eq!(summary.reports_deleted, 3);
    }

    #[tokio::test]
    async fn test_unreported_comments_survive_the_sweep() {
        let backend = MemoryBackend::new();
        let reported = post_comment(&backend, "bad").await;
        let innocent = post_comment(&backend, "good").await;
        report(&backend, "reporter-1", &reported.id).await;

        let metrics = ModerationMetrics::new();
        run_sweep(&backend, &ModerationConfig::default(), &metrics)
            .await
            .expect("sweep");

        assert!(backend
            .comment_get(&innocent.id, ReadSource::Server)
            .await
            .expect("get")
            .is_some());
    }

    #[tokio::test]
    async fn test_sweep_tally_does_not_leak_across_runs() {
        let backend = MemoryBackend::new();
        let config = ModerationConfig {
            threshold: 2,
            ..ModerationConfig::default()
        };
        let metrics = ModerationMetrics::new();

        let comment = post_comment(&backend, "reported once per run").await;
        report(&backend, "reporter-1", &comment.id).await;

        // One report, threshold two: survives this run.
        run_sweep(&backend, &config, &metrics).await.expect("sweep");
        assert!(backend
            .comment_get(&comment.id, ReadSource::Server)
            .await
            .expect("get")
            .is_some());

        // A second run sees the same single report. If the tally leaked
        // across invocations it would now read two and delete.
        run_sweep(&backend, &config, &metrics).await.expect("sweep");
        assert!(backend
            .comment_get(&comment.id, ReadSource::Server)
            .await
            .expect("get")
            .is_some());
    }

    #[tokio::test]
    async fn test_metrics_accumulate_across_sweeps() {
        let backend = MemoryBackend::new();
        let metrics = ModerationMetrics::new();
        let config = ModerationConfig::default();

        let c1 = post_comment(&backend, "first").await;
        report(&backend, "reporter-1", &c1.id).await;
        run_sweep(&backend, &config, &metrics).await.expect("sweep");

        let c2 = post_comment(&backend, "second").await;
        report(&backend, "reporter-1", &c2.id).await;
        run_sweep(&backend, &config, &metrics).await.expect("sweep");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.comments_deleted, 2);
        assert_eq!(snapshot.reports_deleted, 2);
        assert_eq!(snapshot.sweep_cycles, 2);
        assert_eq!(snapshot.sweep_errors, 0);
    }

    #[tokio::test]
    async fn test_moderation_task_shuts_down_on_signal() {
        let backend: Arc<dyn DocumentBackend> = Arc::new(MemoryBackend::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(moderation_task(
            backend,
            ModerationConfig {
                sweep_interval: Duration::from_millis(10),
                ..ModerationConfig::default()
            },
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).expect("signal");

        let metrics = handle.await.expect("join");
        assert!(metrics.snapshot().sweep_cycles >= 1);
    }

    #[test]
    fn test_config_default() {
        let config = ModerationConfig::default();
        assert_eq!(config.threshold, DEFAULT_REPORT_THRESHOLD);
        assert_eq!(config.sweep_interval, Duration::from_secs(86_400));
        assert!(config.log_deletions);
    }

    #[test]
    fn test_config_development() {
        let config = ModerationConfig::development();
        assert_eq!(config.sweep_interval, Duration::from_secs(10));
    }
}
