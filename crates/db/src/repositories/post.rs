//! Post repository.

use std::sync::Arc;

use crate::entities::post::PostType;
use crate::entities::{Media, Post, media, post};
use crate::visibility;
use commune_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Predicate matching posts whose author or owning page is in the audience.
#[must_use]
pub fn audience_condition(user_ids: &[String], page_ids: &[String]) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(post::Column::PostType.eq(PostType::User))
                .add(post::Column::AuthorId.is_in(user_ids.to_vec())),
        )
        .add(
            Condition::all()
                .add(post::Column::PostType.eq(PostType::Page))
                .add(post::Column::PageId.is_in(page_ids.to_vec())),
        )
}

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an alive post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .filter(visibility::alive_posts())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an alive post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Organic feed query: alive posts from the audience, minus posts already
    /// surfaced as boosted, newest first with id-ascending tie-break.
    pub async fn find_feed(
        &self,
        user_ids: &[String],
        page_ids: &[String],
        exclude_ids: &[String],
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post::Model>> {
        let mut query = Post::find()
            .filter(audience_condition(user_ids, page_ids))
            .filter(visibility::alive_posts());

        if !exclude_ids.is_empty() {
            query = query.filter(post::Column::Id.is_not_in(exclude_ids.to_vec()));
        }

        query
            .order_by_desc(post::Column::CreatedAt)
            .order_by_asc(post::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Total organic feed count for the same predicate as [`Self::find_feed`].
    pub async fn count_feed(
        &self,
        user_ids: &[String],
        page_ids: &[String],
        exclude_ids: &[String],
    ) -> AppResult<u64> {
        let mut query = Post::find()
            .filter(audience_condition(user_ids, page_ids))
            .filter(visibility::alive_posts());

        if !exclude_ids.is_empty() {
            query = query.filter(post::Column::Id.is_not_in(exclude_ids.to_vec()));
        }

        query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Alive media attachments for a set of posts.
    pub async fn find_media_by_post_ids(&self, post_ids: &[String]) -> AppResult<Vec<media::Model>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        Media::find()
            .filter(media::Column::PostId.is_in(post_ids.to_vec()))
            .filter(visibility::alive_media())
            .order_by_asc(media::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock::test_post;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_audience_condition_covers_both_post_types() {
        let users = vec!["u1".to_string()];
        let pages = vec!["p1".to_string()];
        let sql = Post::find()
            .filter(audience_condition(&users, &pages))
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""post"."post_type" = 'user'"#), "{sql}");
        assert!(sql.contains(r#""post"."author_id" IN ('u1')"#), "{sql}");
        assert!(sql.contains(r#""post"."post_type" = 'page'"#), "{sql}");
        assert!(sql.contains(r#""post"."page_id" IN ('p1')"#), "{sql}");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            sea_orm::MockDatabase::new(DbBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_feed_returns_rows() {
        let p1 = test_post("p1", "u1");
        let p2 = test_post("p2", "u2");

        let db = Arc::new(
            sea_orm::MockDatabase::new(DbBackend::Postgres)
                .append_query_results([[p1, p2]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let users = vec!["u1".to_string(), "u2".to_string()];
        let result = repo.find_feed(&users, &[], &[], 10, 0).await.unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_find_media_empty_post_ids_skips_query() {
        let db = Arc::new(sea_orm::MockDatabase::new(DbBackend::Postgres).into_connection());

        let repo = PostRepository::new(db);
        let result = repo.find_media_by_post_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }
}
