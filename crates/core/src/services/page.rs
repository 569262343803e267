//! Page service.
//!
//! Pages are owned spaces with followers, likes, and a membership roster.
//! Creating a page seeds the owner's membership and follow in the same
//! transaction, so a page is never observable without its owner attached.

use std::sync::Arc;

use crate::services::notification::{NotificationEvent, NotificationService};
use crate::services::{map_db_err, map_insert_err};
use chrono::Utc;
use commune_common::{AppError, AppResult, IdGenerator};
use commune_db::entities::page_membership::{MembershipRole, MembershipStatus};
use commune_db::entities::{page, page_follow, page_membership};
use commune_db::repositories::{AccountRepository, PageRepository};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use tracing::warn;

/// Page service for business logic.
#[derive(Clone)]
pub struct PageService {
    db: Arc<DatabaseConnection>,
    page_repo: PageRepository,
    account_repo: AccountRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl PageService {
    /// Create a new page service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, notifications: NotificationService) -> Self {
        Self {
            page_repo: PageRepository::new(db.clone()),
            account_repo: AccountRepository::new(db.clone()),
            db,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a page with the owner as accepted member and follower.
    pub async fn create_page(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<String>,
        is_public: bool,
    ) -> AppResult<page::Model> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("page name cannot be empty".to_string()));
        }
        self.account_repo.get_by_id(owner_id).await?;

        let txn = self.db.begin().await.map_err(|e| map_db_err(&e))?;

        let created = page::ActiveModel {
            id: Set(self.id_gen.generate()),
            owner_id: Set(owner_id.to_string()),
            name: Set(name.to_string()),
            description: Set(description),
            is_public: Set(is_public),
            deleted_at: Set(None),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await
        .map_err(|e| map_db_err(&e))?;

        page_membership::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(owner_id.to_string()),
            page_id: Set(created.id.clone()),
            role: Set(MembershipRole::Owner),
            status: Set(MembershipStatus::Accepted),
            deleted_at: Set(None),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await
        .map_err(|e| map_db_err(&e))?;

        page_follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(owner_id.to_string()),
            page_id: Set(created.id.clone()),
            deleted_at: Set(None),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await
        .map_err(|e| map_db_err(&e))?;

        txn.commit().await.map_err(|e| map_db_err(&e))?;
        Ok(created)
    }

    // ==================== Follows ====================

    /// Follow a page.
    pub async fn follow_page(&self, user_id: &str, page_id: &str) -> AppResult<()> {
        let page = self.page_repo.get_by_id(page_id).await?;

        if self.page_repo.find_follow(user_id, page_id).await?.is_some() {
            return Err(AppError::Conflict("already following this page".to_string()));
        }

        match self.page_repo.find_follow_any(user_id, page_id).await? {
            Some(dead) => {
                self.page_repo.revive_follow(dead).await?;
            }
            None => {
                let model = page_follow::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_id: Set(user_id.to_string()),
                    page_id: Set(page_id.to_string()),
                    deleted_at: Set(None),
                    created_at: Set(Utc::now().into()),
                };
                model
                    .insert(self.db.as_ref())
                    .await
                    .map_err(|e| map_insert_err(&e, "page follow"))?;
            }
        }

        if page.owner_id != user_id {
            self.notify(NotificationEvent::PageFollowed {
                actor_id: user_id.to_string(),
                page_id: page_id.to_string(),
            })
            .await;
        }

        Ok(())
    }

    /// Unfollow a page.
    pub async fn unfollow_page(&self, user_id: &str, page_id: &str) -> AppResult<()> {
        let follow = self
            .page_repo
            .find_follow(user_id, page_id)
            .await?
            .ok_or_else(|| AppError::NotFound("page follow".to_string()))?;
        self.page_repo.soft_delete_follow(follow).await
    }

    // ==================== Likes ====================

    /// Like a page.
    pub async fn like_page(&self, user_id: &str, page_id: &str) -> AppResult<()> {
        let page = self.page_repo.get_by_id(page_id).await?;

        if self.page_repo.find_like(user_id, page_id).await?.is_some() {
            return Err(AppError::Conflict("already liked this page".to_string()));
        }

        match self.page_repo.find_like_any(user_id, page_id).await? {
            Some(dead) => {
                self.page_repo.revive_like(dead).await?;
            }
            None => {
                let model = commune_db::entities::page_like::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_id: Set(user_id.to_string()),
                    page_id: Set(page_id.to_string()),
                    deleted_at: Set(None),
                    created_at: Set(Utc::now().into()),
                };
                model
                    .insert(self.db.as_ref())
                    .await
                    .map_err(|e| map_insert_err(&e, "page like"))?;
            }
        }

        if page.owner_id != user_id {
            self.notify(NotificationEvent::PageLiked {
                actor_id: user_id.to_string(),
                page_id: page_id.to_string(),
            })
            .await;
        }

        Ok(())
    }

    /// Remove a like from a page.
    pub async fn unlike_page(&self, user_id: &str, page_id: &str) -> AppResult<()> {
        let like = self
            .page_repo
            .find_like(user_id, page_id)
            .await?
            .ok_or_else(|| AppError::NotFound("page like".to_string()))?;
        self.page_repo.soft_delete_like(like).await
    }

    // ==================== Membership ====================

    /// Request to join a page. The request waits for owner or admin review.
    pub async fn request_join(
        &self,
        user_id: &str,
        page_id: &str,
    ) -> AppResult<page_membership::Model> {
        self.page_repo.get_by_id(page_id).await?;

        if self
            .page_repo
            .find_membership(user_id, page_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "membership already exists or is pending".to_string(),
            ));
        }

        match self.page_repo.find_membership_any(user_id, page_id).await? {
            Some(dead) => {
                self.page_repo
                    .revive_membership(dead, MembershipRole::Member, MembershipStatus::Pending)
                    .await
            }
            None => {
                let model = page_membership::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_id: Set(user_id.to_string()),
                    page_id: Set(page_id.to_string()),
                    role: Set(MembershipRole::Member),
                    status: Set(MembershipStatus::Pending),
                    deleted_at: Set(None),
                    created_at: Set(Utc::now().into()),
                };
                model
                    .insert(self.db.as_ref())
                    .await
                    .map_err(|e| map_insert_err(&e, "join request"))
            }
        }
    }

    /// Approve a pending join request.
    pub async fn approve_member(
        &self,
        actor_id: &str,
        membership_id: &str,
    ) -> AppResult<page_membership::Model> {
        let membership = self.reviewable_membership(actor_id, membership_id).await?;
        let member_id = membership.user_id.clone();
        let page_id = membership.page_id.clone();

        let approved = self
            .page_repo
            .set_membership_status(membership, MembershipStatus::Accepted)
            .await?;

        self.notify(NotificationEvent::PageJoinApproved {
            actor_id: actor_id.to_string(),
            target_id: member_id,
            page_id,
        })
        .await;

        Ok(approved)
    }

    /// Reject a pending join request.
    pub async fn reject_member(&self, actor_id: &str, membership_id: &str) -> AppResult<()> {
        let membership = self.reviewable_membership(actor_id, membership_id).await?;
        let member_id = membership.user_id.clone();
        let page_id = membership.page_id.clone();

        self.page_repo.soft_delete_membership(membership).await?;

        self.notify(NotificationEvent::PageJoinRejected {
            actor_id: actor_id.to_string(),
            target_id: member_id,
            page_id,
        })
        .await;

        Ok(())
    }

    // ==================== Internals ====================

    /// Load a pending membership and check the actor may review it.
    async fn reviewable_membership(
        &self,
        actor_id: &str,
        membership_id: &str,
    ) -> AppResult<page_membership::Model> {
        let membership = self
            .page_repo
            .find_membership_by_id(membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("membership {membership_id}")))?;

        let page = self.page_repo.get_by_id(&membership.page_id).await?;

        let authorized = if page.owner_id == actor_id {
            true
        } else {
            self.page_repo
                .find_membership(actor_id, &membership.page_id)
                .await?
                .is_some_and(|m| {
                    m.status == MembershipStatus::Accepted
                        && matches!(m.role, MembershipRole::Admin | MembershipRole::Moderator)
                })
        };
        if !authorized {
            return Err(AppError::Forbidden(
                "only the page owner or admins can review join requests".to_string(),
            ));
        }

        if membership.status != MembershipStatus::Pending {
            return Err(AppError::InvalidState(
                "join request is not pending".to_string(),
            ));
        }

        Ok(membership)
    }

    async fn notify(&self, event: NotificationEvent) {
        if let Err(e) = self.notifications.dispatch(event).await {
            warn!(error = %e, "failed to dispatch page notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commune_db::repositories::{NotificationRepository, PostRepository};
    use commune_db::test_utils::mock::{test_page, test_page_membership};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn service(db: Arc<DatabaseConnection>) -> PageService {
        let notifications = NotificationService::new(
            NotificationRepository::new(db.clone()),
            AccountRepository::new(db.clone()),
            PostRepository::new(db.clone()),
            PageRepository::new(db.clone()),
        );
        PageService::new(db, notifications)
    }

    #[tokio::test]
    async fn test_create_page_rejects_blank_name() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let svc = service(db);

        let result = svc.create_page("u1", "   ", None, true).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_follow_page_twice_conflicts() {
        let page = test_page("pg1", "owner1", "Rustaceans");
        let follow = commune_db::entities::page_follow::Model {
            id: "pf1".to_string(),
            user_id: "u1".to_string(),
            page_id: "pg1".to_string(),
            deleted_at: None,
            created_at: chrono::Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[page]])
                .append_query_results([[follow]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.follow_page("u1", "pg1").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unfollow_page_not_following() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<commune_db::entities::page_follow::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.unfollow_page("u1", "pg1").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_request_join_duplicate_conflicts() {
        let page = test_page("pg1", "owner1", "Rustaceans");
        let pending = test_page_membership("m1", "u1", "pg1", MembershipStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[page]])
                .append_query_results([[pending]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.request_join("u1", "pg1").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_approve_member_requires_authority() {
        let membership = test_page_membership("m1", "u1", "pg1", MembershipStatus::Pending);
        let page = test_page("pg1", "owner1", "Rustaceans");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[membership]])
                .append_query_results([[page]])
                // The stranger has no membership on the page
                .append_query_results([Vec::<page_membership::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.approve_member("stranger", "m1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_approve_member_requires_pending() {
        let membership = test_page_membership("m1", "u1", "pg1", MembershipStatus::Accepted);
        let page = test_page("pg1", "owner1", "Rustaceans");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[membership]])
                .append_query_results([[page]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.approve_member("owner1", "m1").await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }
}
