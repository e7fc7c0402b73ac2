//! Site aggregate counter triggers
//!
//! Fired after a SiteFeeling write, with the previous document as returned
//! by the upsert. The create path lazily builds the Site aggregate; the
//! update path swaps a prior vote's effect - decrement the old polarity and
//! increment the new one in the same update - so a changed vote never
//! double-counts. An unchanged polarity is a no-op: overwriting a vote with
//! itself must not move the counters.

use stance_core::{Site, SiteFeeling, StanceResult};
use stance_store::{DocumentBackend, ReadSource};

/// Maintain the Site aggregate after a vote write.
///
/// `before` is the document the upsert replaced (None on first vote).
pub async fn apply_feeling_change(
    backend: &dyn DocumentBackend,
    before: Option<&SiteFeeling>,
    after: &SiteFeeling,
) -> StanceResult<()> {
    match before {
        None => on_feeling_created(backend, after).await,
        Some(prev) if prev.like == after.like => {
            // Re-vote with the same polarity: nothing to adjust.
            Ok(())
        }
        Some(_) => on_feeling_updated(backend, after).await,
    }
}

/// First vote by this user on this site: create the aggregate lazily or
/// bump the matching counter.
async fn on_feeling_created(
    backend: &dyn DocumentBackend,
    feeling: &SiteFeeling,
) -> StanceResult<()> {
    let existing = backend.site_get(&feeling.site, ReadSource::Server).await?;

    match existing {
        Some(_) => {
            let (likes_delta, dislikes_delta) = if feeling.like { (1, 0) } else { (0, 1) };
            backend
                .site_adjust_counts(&feeling.site, likes_delta, dislikes_delta)
                .await?;
        }
        None => {
            let (likes, dislikes) = if feeling.like { (1, 0) } else { (0, 1) };
            backend
                .site_put(
                    &feeling.site,
                    Site {
                        url: feeling.url.clone(),
                        likes,
                        dislikes,
                    },
                )
                .await?;
            tracing::debug!(site = %feeling.site, "site aggregate created");
        }
    }

    Ok(())
}

/// Changed polarity: swap the prior vote's effect in one update.
async fn on_feeling_updated(
    backend: &dyn DocumentBackend,
    after: &SiteFeeling,
) -> StanceResult<()> {
    let (likes_delta, dislikes_delta) = if after.like { (1, -1) } else { (-1, 1) };
    backend
        .site_adjust_counts(&after.site, likes_delta, dislikes_delta)
        .await?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
