//! Reaction service.

use std::sync::Arc;

use crate::services::map_insert_err;
use crate::services::notification::{NotificationEvent, NotificationService};
use chrono::Utc;
use commune_common::{AppError, AppResult, IdGenerator};
use commune_db::entities::reaction;
use commune_db::repositories::{PostRepository, ReactionRepository};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing::warn;

/// Reaction service for business logic.
#[derive(Clone)]
pub struct ReactionService {
    db: Arc<DatabaseConnection>,
    reaction_repo: ReactionRepository,
    post_repo: PostRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl ReactionService {
    /// Create a new reaction service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, notifications: NotificationService) -> Self {
        Self {
            reaction_repo: ReactionRepository::new(db.clone()),
            post_repo: PostRepository::new(db.clone()),
            db,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Like a post.
    pub async fn like(&self, user_id: &str, post_id: &str) -> AppResult<reaction::Model> {
        self.post_repo.get_by_id(post_id).await?;

        if self
            .reaction_repo
            .find_by_pair(user_id, post_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("already liked this post".to_string()));
        }

        let created = match self.reaction_repo.find_by_pair_any(user_id, post_id).await? {
            Some(dead) => self.reaction_repo.revive(dead).await?,
            None => {
                let model = reaction::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_id: Set(user_id.to_string()),
                    post_id: Set(post_id.to_string()),
                    deleted_at: Set(None),
                    created_at: Set(Utc::now().into()),
                };
                model
                    .insert(self.db.as_ref())
                    .await
                    .map_err(|e| map_insert_err(&e, "reaction"))?
            }
        };

        if let Err(e) = self
            .notifications
            .dispatch(NotificationEvent::Liked {
                actor_id: user_id.to_string(),
                post_id: post_id.to_string(),
            })
            .await
        {
            warn!(error = %e, "failed to dispatch like notification");
        }

        Ok(created)
    }

    /// Remove a like from a post.
    pub async fn unlike(&self, user_id: &str, post_id: &str) -> AppResult<()> {
        let existing = self
            .reaction_repo
            .find_by_pair(user_id, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("reaction".to_string()))?;
        self.reaction_repo.soft_delete(existing).await
    }

    /// Count likes on a post.
    pub async fn count_for_post(&self, post_id: &str) -> AppResult<u64> {
        self.reaction_repo.count_for_post(post_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commune_db::entities::post;
    use commune_db::repositories::{AccountRepository, NotificationRepository, PageRepository};
    use commune_db::test_utils::mock::{test_post, test_reaction};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn service(db: Arc<DatabaseConnection>) -> ReactionService {
        let notifications = NotificationService::new(
            NotificationRepository::new(db.clone()),
            AccountRepository::new(db.clone()),
            PostRepository::new(db.clone()),
            PageRepository::new(db.clone()),
        );
        ReactionService::new(db, notifications)
    }

    #[tokio::test]
    async fn test_like_missing_post() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.like("u1", "missing").await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_like_twice_conflicts() {
        let post = test_post("p1", "author1");
        let existing = test_reaction("r1", "u1", "p1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .append_query_results([[existing]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.like("u1", "p1").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unlike_without_like() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<reaction::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.unlike("u1", "p1").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
