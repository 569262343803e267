//! Feed composition service.
//!
//! A feed page is a boosted overlay followed by organic posts. Boosted posts
//! fill up to the configured slot quota and never advance the cursor;
//! pagination and `has_more` are driven by the organic stream alone.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use commune_common::{AppResult, FeedConfig};
use commune_db::entities::{media, post};
use commune_db::repositories::{
    BoostedPostRepository, FollowEdgeRepository, PageRepository, PostRepository,
};
use sea_orm::DatabaseConnection;
use tracing::warn;

/// Where a feed item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrigin {
    /// Surfaced through an active boost.
    Boosted,
    /// Surfaced through the follow graph.
    Organic,
}

/// A single post in a composed feed.
#[derive(Debug, Clone)]
pub struct FeedItem {
    /// The post itself.
    pub post: post::Model,
    /// How the post entered this feed.
    pub origin: FeedOrigin,
    /// Media attached to the post.
    pub media: Vec<media::Model>,
}

/// One page of a composed feed.
#[derive(Debug, Clone)]
pub struct FeedPage {
    /// Items in display order: boosted overlay first, then organic.
    pub items: Vec<FeedItem>,
    /// The 1-based page number that was composed.
    pub page: u64,
    /// Whether more organic posts exist past this page.
    pub has_more: bool,
}

/// Feed totals by origin, plus the audience sizes behind them.
#[derive(Debug, Clone)]
pub struct FeedStats {
    /// Accounts whose posts the viewer sees (including themselves).
    pub audience_accounts: usize,
    /// Pages whose posts the viewer sees.
    pub audience_pages: usize,
    /// Total organic posts currently visible to the viewer.
    pub organic_total: u64,
    /// Active boosts currently eligible for the viewer's feed.
    pub boosted_active: u64,
}

/// The organic slice of a feed page: `(limit, offset)`.
///
/// Boosted items shrink the organic window instead of pushing organic posts
/// onto the next page, so the offset advances by the organic limit only.
const fn organic_window(limit: u64, boosted_count: u64, page: u64) -> (u64, u64) {
    let organic_limit = limit.saturating_sub(boosted_count);
    let offset = (page.saturating_sub(1)) * organic_limit;
    (organic_limit, offset)
}

/// Whether organic posts remain past the current window.
const fn has_more(offset: u64, returned: u64, total: u64) -> bool {
    offset + returned < total
}

/// Feed service for business logic.
#[derive(Clone)]
pub struct FeedService {
    follow_repo: FollowEdgeRepository,
    page_repo: PageRepository,
    post_repo: PostRepository,
    boost_repo: BoostedPostRepository,
    config: FeedConfig,
}

impl FeedService {
    /// Create a new feed service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: FeedConfig) -> Self {
        Self {
            follow_repo: FollowEdgeRepository::new(db.clone()),
            page_repo: PageRepository::new(db.clone()),
            post_repo: PostRepository::new(db.clone()),
            boost_repo: BoostedPostRepository::new(db),
            config,
        }
    }

    /// Compose one feed page for a viewer.
    ///
    /// `page` is 1-based; `limit` falls back to the configured default page
    /// size when not given.
    pub async fn compose_feed(
        &self,
        viewer_id: &str,
        page: u64,
        limit: Option<u64>,
    ) -> AppResult<FeedPage> {
        let limit = limit.unwrap_or(self.config.default_page_size).max(1);
        let page = page.max(1);
        let now = Utc::now().into();

        // Opportunistic sweep so stale boosts never surface; the background
        // sweep remains the authority
        if let Err(e) = self.boost_repo.expire_due(now).await {
            warn!(error = %e, "opportunistic boost expiry failed");
        }

        let (user_ids, page_ids) = self.audience(viewer_id).await?;

        let quota = self.config.boost_slot_quota.min(limit);
        let boosted: Vec<post::Model> = self
            .boost_repo
            .find_active_for_audience(&user_ids, &page_ids, quota, now)
            .await?
            .into_iter()
            .filter_map(|(_, post)| post)
            .collect();

        let exclude: Vec<String> = boosted.iter().map(|p| p.id.clone()).collect();
        let (organic_limit, offset) = organic_window(limit, boosted.len() as u64, page);

        let organic = if organic_limit == 0 {
            vec![]
        } else {
            self.post_repo
                .find_feed(&user_ids, &page_ids, &exclude, organic_limit, offset)
                .await?
        };

        let total = self
            .post_repo
            .count_feed(&user_ids, &page_ids, &exclude)
            .await?;
        let more = has_more(offset, organic.len() as u64, total);

        let items = self.attach_media(boosted, organic).await?;

        Ok(FeedPage {
            items,
            page,
            has_more: more,
        })
    }

    /// Feed totals by origin for a viewer.
    pub async fn compose_stats(&self, viewer_id: &str) -> AppResult<FeedStats> {
        let (user_ids, page_ids) = self.audience(viewer_id).await?;
        let organic_total = self.post_repo.count_feed(&user_ids, &page_ids, &[]).await?;
        let boosted_active = self
            .boost_repo
            .count_active_for_audience(&user_ids, &page_ids, Utc::now().into())
            .await?;

        Ok(FeedStats {
            audience_accounts: user_ids.len(),
            audience_pages: page_ids.len(),
            organic_total,
            boosted_active,
        })
    }

    /// The viewer's audience: themselves plus followed accounts, and the
    /// union of followed and joined pages.
    async fn audience(&self, viewer_id: &str) -> AppResult<(Vec<String>, Vec<String>)> {
        let mut user_ids = self.follow_repo.following_ids(viewer_id).await?;
        user_ids.push(viewer_id.to_string());

        let mut page_ids = self.page_repo.followed_page_ids(viewer_id).await?;
        for id in self.page_repo.member_page_ids(viewer_id).await? {
            if !page_ids.contains(&id) {
                page_ids.push(id);
            }
        }

        Ok((user_ids, page_ids))
    }

    /// Build the final item list, fetching media for every post in one query.
    async fn attach_media(
        &self,
        boosted: Vec<post::Model>,
        organic: Vec<post::Model>,
    ) -> AppResult<Vec<FeedItem>> {
        let post_ids: Vec<String> = boosted
            .iter()
            .chain(organic.iter())
            .map(|p| p.id.clone())
            .collect();

        let mut media_by_post: HashMap<String, Vec<media::Model>> = HashMap::new();
        for m in self.post_repo.find_media_by_post_ids(&post_ids).await? {
            media_by_post.entry(m.post_id.clone()).or_default().push(m);
        }

        let items = merge(boosted, organic)
            .into_iter()
            .map(|(post, origin)| {
                let media = media_by_post.remove(&post.id).unwrap_or_default();
                FeedItem {
                    post,
                    origin,
                    media,
                }
            })
            .collect();

        Ok(items)
    }
}

/// Interleave boosted posts ahead of organic ones, tagging each with its
/// origin.
fn merge(boosted: Vec<post::Model>, organic: Vec<post::Model>) -> Vec<(post::Model, FeedOrigin)> {
    boosted
        .into_iter()
        .map(|p| (p, FeedOrigin::Boosted))
        .chain(organic.into_iter().map(|p| (p, FeedOrigin::Organic)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use commune_db::test_utils::mock::test_post;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    #[test]
    fn test_organic_window_shrinks_for_boosted() {
        // 20-item page with 5 boosted leaves 15 organic slots
        assert_eq!(organic_window(20, 5, 1), (15, 0));
        assert_eq!(organic_window(20, 5, 2), (15, 15));
        assert_eq!(organic_window(20, 5, 3), (15, 30));
    }

    #[test]
    fn test_organic_window_boosts_cannot_exceed_limit() {
        assert_eq!(organic_window(5, 7, 1), (0, 0));
    }

    #[test]
    fn test_has_more_from_organic_total_only() {
        assert!(has_more(0, 15, 16));
        assert!(!has_more(0, 15, 15));
        assert!(!has_more(15, 0, 15));
        assert!(has_more(15, 15, 31));
    }

    #[test]
    fn test_merge_boosted_first() {
        let boosted = vec![test_post("b1", "u1")];
        let organic = vec![test_post("o1", "u2"), test_post("o2", "u3")];

        let merged = merge(boosted, organic);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].0.id, "b1");
        assert_eq!(merged[0].1, FeedOrigin::Boosted);
        assert_eq!(merged[1].0.id, "o1");
        assert_eq!(merged[1].1, FeedOrigin::Organic);
    }

    #[tokio::test]
    async fn test_compose_feed_boosted_overlay_first() {
        let hour_ago = Utc::now().fixed_offset() - Duration::hours(1);

        // A joined boost + post row, promoted an hour before the organic posts
        let boosted_row: BTreeMap<&str, Value> = BTreeMap::from([
            ("A_id", "b1".into()),
            ("A_post_id", "pb".into()),
            ("A_booster_id", "u9".into()),
            ("A_status", "accepted".into()),
            ("A_end_date", Value::ChronoDateTimeWithTimeZone(None)),
            ("A_deleted_at", Value::ChronoDateTimeWithTimeZone(None)),
            ("A_created_at", hour_ago.into()),
            ("B_id", "pb".into()),
            ("B_author_id", "u9".into()),
            ("B_page_id", Value::String(None)),
            ("B_post_type", "user".into()),
            ("B_content", "promoted".into()),
            ("B_deleted_at", Value::ChronoDateTimeWithTimeZone(None)),
            ("B_created_at", hour_ago.into()),
        ]);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .append_query_results([vec![BTreeMap::from([(
                    "following_id",
                    Value::from("u2"),
                )])]])
                .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
                .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
                .append_query_results([vec![boosted_row]])
                .append_query_results([vec![test_post("p1", "u2"), test_post("p2", "u2")]])
                .append_query_results([vec![BTreeMap::from([(
                    "num_items",
                    Value::BigInt(Some(2)),
                )])]])
                .append_query_results([Vec::<media::Model>::new()])
                .into_connection(),
        );

        let svc = FeedService::new(
            db,
            FeedConfig {
                boost_slot_quota: 5,
                default_page_size: 20,
            },
        );
        let page = svc.compose_feed("u1", 1, Some(10)).await.unwrap();

        assert_eq!(page.items.len(), 3);
        // The overlay leads even though the organic posts are more recent
        assert_eq!(page.items[0].post.id, "pb");
        assert_eq!(page.items[0].origin, FeedOrigin::Boosted);
        assert!(page.items[1].post.created_at > page.items[0].post.created_at);
        assert_eq!(page.items[1].origin, FeedOrigin::Organic);
        assert!(!page.has_more);
    }

    #[test]
    fn test_merge_no_boosted() {
        let organic = vec![test_post("o1", "u2")];

        let merged = merge(vec![], organic);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].1, FeedOrigin::Organic);
    }
}
