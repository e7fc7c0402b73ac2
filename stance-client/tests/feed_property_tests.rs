//! Property tests for the paginated comment feed.
//!
//! Walking a site's feed page by page, with each page's last item as the
//! next cursor, must yield every visible comment exactly once, in
//! non-increasing sort order, for any feed size and page size.

use proptest::prelude::*;
use std::sync::Arc;

use stance_client::{DataAccess, DataAccessConfig};
use stance_core::{Comment, CommentSort, SiteKey};
use stance_store::{CommentCursor, DocumentBackend, MemorySettings, SettingsStore};
use stance_test_utils::backend_with_comments;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime")
}

fn data_access_over(
    backend: Arc<stance_test_utils::MemoryBackend>,
    page_size: usize,
) -> DataAccess {
    DataAccess::new(
        backend as Arc<dyn DocumentBackend>,
        Arc::new(MemorySettings::new()) as Arc<dyn SettingsStore>,
        DataAccessConfig::new().with_page_size(page_size),
    )
}

/// Walk the whole feed, collecting every page.
async fn walk_feed(access: &DataAccess, site: &SiteKey, sort: CommentSort) -> Vec<Comment> {
    let mut all = Vec::new();
    let mut cursor = None;
    loop {
        let page = access
            .list_comments(site, sort, cursor.clone())
            .await
            .expect("list page");
        if page.is_empty() {
            break;
        }
        cursor = page.last().map(CommentCursor::from);
        all.extend(page);
    }
    all
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: the page walk yields all N comments with no duplicates and
    /// no omissions, in non-increasing created_at order.
    #[test]
    fn prop_page_walk_is_complete_and_ordered(
        count in 0usize..40,
        page_size in 1usize..12,
    ) {
        runtime().block_on(async {
            let site = SiteKey::from_url("https://feed.example.com/page");
            let (backend, seeded) = backend_with_comments(&site, count).await;
            let access = data_access_over(backend, page_size);

            let walked = walk_feed(&access, &site, CommentSort::CreatedAt).await;

            assert_eq!(walked.len(), seeded.len());

            let mut walked_ids: Vec<_> = walked.iter().map(|c| c.id.clone()).collect();
            walked_ids.sort();
            walked_ids.dedup();
            assert_eq!(walked_ids.len(), seeded.len(), "duplicates in page walk");

            for pair in walked.windows(2) {
                assert!(
                    pair[0].created_at >= pair[1].created_at,
                    "feed not in non-increasing created_at order"
                );
            }
        });
    }

    /// Property: the text sort walks the same set, reverse-alphabetically.
    #[test]
    fn prop_text_sort_walk_is_complete(
        count in 0usize..30,
        page_size in 1usize..8,
    ) {
        runtime().block_on(async {
            let site = SiteKey::from_url("https://feed.example.com/page");
            let (backend, seeded) = backend_with_comments(&site, count).await;
            let access = data_access_over(backend, page_size);

            let walked = walk_feed(&access, &site, CommentSort::Text).await;

            assert_eq!(walked.len(), seeded.len());
            for pair in walked.windows(2) {
                assert!(pair[0].text >= pair[1].text);
            }
        });
    }

    /// Property: repeating the same (site, sort, cursor) request without
    /// intervening writes returns the same identifiers.
    #[test]
    fn prop_page_requests_are_idempotent(
        count in 1usize..30,
        page_size in 1usize..10,
        page_index in 0usize..4,
    ) {
        runtime().block_on(async {
            let site = SiteKey::from_url("https://feed.example.com/page");
            let (backend, _) = backend_with_comments(&site, count).await;
            let access = data_access_over(backend, page_size);

            // Advance to the requested page.
            let mut cursor = None;
            for _ in 0..page_index {
                let page = access
                    .list_comments(&site, CommentSort::CreatedAt, cursor.clone())
                    .await
                    .expect("advance");
                match page.last() {
                    Some(last) => cursor = Some(CommentCursor::from(last)),
                    None => break,
                }
            }

            let first = access
                .list_comments(&site, CommentSort::CreatedAt, cursor.clone())
                .await
                .expect("first request");
            let second = access
                .list_comments(&site, CommentSort::CreatedAt, cursor)
                .await
                .expect("second request");

            let first_ids: Vec<_> = first.iter().map(|c| c.id.clone()).collect();
            let second_ids: Vec<_> = second.iter().map(|c| c.id.clone()).collect();
            assert_eq!(first_ids, second_ids);
        });
    }

    /// Property: hiding comments removes exactly those comments from the
    /// walk; everything else still appears once.
    #[test]
    fn prop_hidden_comments_never_appear(
        count in 1usize..25,
        page_size in 1usize..8,
        hide_every in 2usize..5,
    ) {
        runtime().block_on(async {
            let site = SiteKey::from_url("https://feed.example.com/page");
            let (backend, seeded) = backend_with_comments(&site, count).await;

            let mut hidden = Vec::new();
            for (i, comment) in seeded.iter().enumerate() {
                if i % hide_every == 0 {
                    backend
                        .comment_set_hidden(&comment.id, true)
                        .await
                        .expect("hide");
                    hidden.push(comment.id.clone());
                }
            }

            let access = data_access_over(backend, page_size);
            let walked = walk_feed(&access, &site, CommentSort::CreatedAt).await;

            assert_eq!(walked.len(), seeded.len() - hidden.len());
            for comment in &walked {
                assert!(!hidden.contains(&comment.id));
            }
        });
    }
}
