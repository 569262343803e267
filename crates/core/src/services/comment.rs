//! Comment service.

use std::sync::Arc;

use crate::services::notification::{NotificationEvent, NotificationService};
use chrono::Utc;
use commune_common::{AppError, AppResult, IdGenerator};
use commune_db::entities::comment;
use commune_db::repositories::{CommentRepository, PostRepository};
use sea_orm::{DatabaseConnection, Set};
use tracing::warn;

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, notifications: NotificationService) -> Self {
        Self {
            comment_repo: CommentRepository::new(db.clone()),
            post_repo: PostRepository::new(db),
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a comment to a post.
    pub async fn add_comment(
        &self,
        author_id: &str,
        post_id: &str,
        content: &str,
    ) -> AppResult<comment::Model> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("comment cannot be empty".to_string()));
        }

        self.post_repo.get_by_id(post_id).await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post_id.to_string()),
            author_id: Set(author_id.to_string()),
            content: Set(content.to_string()),
            deleted_at: Set(None),
            created_at: Set(Utc::now().into()),
        };
        let created = self.comment_repo.create(model).await?;

        if let Err(e) = self
            .notifications
            .dispatch(NotificationEvent::Commented {
                actor_id: author_id.to_string(),
                post_id: post_id.to_string(),
                comment_id: created.id.clone(),
            })
            .await
        {
            warn!(error = %e, "failed to dispatch comment notification");
        }

        Ok(created)
    }

    /// Delete a comment. Only the author may delete their own comment.
    pub async fn delete_comment(&self, actor_id: &str, comment_id: &str) -> AppResult<()> {
        let existing = self
            .comment_repo
            .find_by_id(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("comment {comment_id}")))?;

        if existing.author_id != actor_id {
            return Err(AppError::Forbidden(
                "only the author can delete a comment".to_string(),
            ));
        }

        self.comment_repo.soft_delete(existing).await
    }

    /// Comments on a post, oldest first.
    pub async fn list_for_post(
        &self,
        post_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<comment::Model>> {
        self.comment_repo.find_by_post(post_id, limit, offset).await
    }

    /// Count comments on a post.
    pub async fn count_for_post(&self, post_id: &str) -> AppResult<u64> {
        self.comment_repo.count_for_post(post_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commune_db::entities::post;
    use commune_db::repositories::{
        AccountRepository, NotificationRepository, PageRepository,
    };
    use commune_db::test_utils::mock::test_comment;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn service(db: Arc<DatabaseConnection>) -> CommentService {
        let notifications = NotificationService::new(
            NotificationRepository::new(db.clone()),
            AccountRepository::new(db.clone()),
            PostRepository::new(db.clone()),
            PageRepository::new(db.clone()),
        );
        CommentService::new(db, notifications)
    }

    #[tokio::test]
    async fn test_add_comment_rejects_blank() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let svc = service(db);

        let result = svc.add_comment("u1", "p1", "   ").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_add_comment_missing_post() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.add_comment("u1", "missing", "nice").await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_comment_by_other_is_forbidden() {
        let existing = test_comment("c1", "p1", "u1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.delete_comment("u2", "c1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_comment() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.delete_comment("u1", "missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
