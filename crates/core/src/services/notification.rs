//! Notification service.
//!
//! Turns domain events into persisted notifications. Dispatch is best-effort:
//! callers fire it after their own writes commit and log a warning on failure
//! rather than rolling the action back.

use chrono::Utc;
use commune_common::{AppError, AppResult, IdGenerator};
use commune_db::entities::notification::{self, NotificationType};
use commune_db::repositories::{
    AccountRepository, NotificationRepository, PageRepository, PostRepository,
};
use sea_orm::Set;

/// A domain event that may produce a notification.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    /// Someone liked a post.
    Liked { actor_id: String, post_id: String },
    /// Someone commented on a post.
    Commented {
        actor_id: String,
        post_id: String,
        comment_id: String,
    },
    /// Someone started following an account.
    Followed { actor_id: String, target_id: String },
    /// Someone sent a friend request.
    FriendRequested { actor_id: String, target_id: String },
    /// Someone accepted a friend request.
    FriendAccepted { actor_id: String, target_id: String },
    /// Someone followed a page.
    PageFollowed { actor_id: String, page_id: String },
    /// Someone liked a page.
    PageLiked { actor_id: String, page_id: String },
    /// A page join request was approved.
    PageJoinApproved {
        actor_id: String,
        target_id: String,
        page_id: String,
    },
    /// A page join request was rejected.
    PageJoinRejected {
        actor_id: String,
        target_id: String,
        page_id: String,
    },
}

impl NotificationEvent {
    /// The account that triggered the event.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        match self {
            Self::Liked { actor_id, .. }
            | Self::Commented { actor_id, .. }
            | Self::Followed { actor_id, .. }
            | Self::FriendRequested { actor_id, .. }
            | Self::FriendAccepted { actor_id, .. }
            | Self::PageFollowed { actor_id, .. }
            | Self::PageLiked { actor_id, .. }
            | Self::PageJoinApproved { actor_id, .. }
            | Self::PageJoinRejected { actor_id, .. } => actor_id,
        }
    }

    /// The stored notification type for this event.
    #[must_use]
    pub const fn notification_type(&self) -> NotificationType {
        match self {
            Self::Liked { .. } => NotificationType::Like,
            Self::Commented { .. } => NotificationType::Comment,
            Self::Followed { .. } => NotificationType::Follow,
            Self::FriendRequested { .. } => NotificationType::FriendRequest,
            Self::FriendAccepted { .. } => NotificationType::FriendAccept,
            Self::PageFollowed { .. } => NotificationType::PageFollow,
            Self::PageLiked { .. } => NotificationType::PageLike,
            Self::PageJoinApproved { .. } => NotificationType::PageJoinApproved,
            Self::PageJoinRejected { .. } => NotificationType::PageJoinRejected,
        }
    }
}

/// Result of dispatching an event.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// A notification row was written for the recipient.
    Delivered(notification::Model),
    /// No notification was produced (self-action, or a referenced row is gone).
    Skipped,
}

/// Render the title and body for an event given the actor's display name.
fn render_templates(event: &NotificationEvent, actor_name: &str) -> (String, String) {
    match event {
        NotificationEvent::Liked { .. } => (
            "New like".to_string(),
            format!("{actor_name} liked your post"),
        ),
        NotificationEvent::Commented { .. } => (
            "New comment".to_string(),
            format!("{actor_name} commented on your post"),
        ),
        NotificationEvent::Followed { .. } => (
            "New follower".to_string(),
            format!("{actor_name} started following you"),
        ),
        NotificationEvent::FriendRequested { .. } => (
            "Friend request".to_string(),
            format!("{actor_name} sent you a friend request"),
        ),
        NotificationEvent::FriendAccepted { .. } => (
            "Friend request accepted".to_string(),
            format!("{actor_name} accepted your friend request"),
        ),
        NotificationEvent::PageFollowed { .. } => (
            "New page follower".to_string(),
            format!("{actor_name} followed your page"),
        ),
        NotificationEvent::PageLiked { .. } => (
            "New page like".to_string(),
            format!("{actor_name} liked your page"),
        ),
        NotificationEvent::PageJoinApproved { .. } => (
            "Join request approved".to_string(),
            format!("{actor_name} approved your request to join the page"),
        ),
        NotificationEvent::PageJoinRejected { .. } => (
            "Join request rejected".to_string(),
            format!("{actor_name} rejected your request to join the page"),
        ),
    }
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    account_repo: AccountRepository,
    post_repo: PostRepository,
    page_repo: PageRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(
        notification_repo: NotificationRepository,
        account_repo: AccountRepository,
        post_repo: PostRepository,
        page_repo: PageRepository,
    ) -> Self {
        Self {
            notification_repo,
            account_repo,
            post_repo,
            page_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Resolve the recipient for an event.
    ///
    /// Returns `Ok(None)` when no notification should be produced: the
    /// recipient is the actor themselves, or the referenced post or page has
    /// since been removed.
    pub async fn resolve_recipient(&self, event: &NotificationEvent) -> AppResult<Option<String>> {
        let recipient = match event {
            NotificationEvent::Liked { post_id, .. }
            | NotificationEvent::Commented { post_id, .. } => {
                let Some(post) = self.post_repo.find_by_id(post_id).await? else {
                    return Ok(None);
                };
                // Activity on a page post belongs to the page owner
                match post.page_id {
                    Some(page_id) => match self.page_repo.find_by_id(&page_id).await? {
                        Some(page) => page.owner_id,
                        None => return Ok(None),
                    },
                    None => post.author_id,
                }
            }
            NotificationEvent::Followed { target_id, .. }
            | NotificationEvent::FriendRequested { target_id, .. }
            | NotificationEvent::FriendAccepted { target_id, .. }
            | NotificationEvent::PageJoinApproved { target_id, .. }
            | NotificationEvent::PageJoinRejected { target_id, .. } => target_id.clone(),
            NotificationEvent::PageFollowed { page_id, .. }
            | NotificationEvent::PageLiked { page_id, .. } => {
                match self.page_repo.find_by_id(page_id).await? {
                    Some(page) => page.owner_id,
                    None => return Ok(None),
                }
            }
        };

        if recipient == event.actor_id() {
            return Ok(None);
        }

        Ok(Some(recipient))
    }

    /// Dispatch an event, persisting a notification if one is warranted.
    pub async fn dispatch(&self, event: NotificationEvent) -> AppResult<DispatchOutcome> {
        let Some(recipient_id) = self.resolve_recipient(&event).await? else {
            return Ok(DispatchOutcome::Skipped);
        };

        let Some(actor) = self.account_repo.find_by_id(event.actor_id()).await? else {
            return Ok(DispatchOutcome::Skipped);
        };

        let (title, content) = render_templates(&event, &actor.display_name);

        let (post_id, comment_id, page_id) = match &event {
            NotificationEvent::Liked { post_id, .. } => (Some(post_id.clone()), None, None),
            NotificationEvent::Commented {
                post_id,
                comment_id,
                ..
            } => (Some(post_id.clone()), Some(comment_id.clone()), None),
            NotificationEvent::Followed { .. }
            | NotificationEvent::FriendRequested { .. }
            | NotificationEvent::FriendAccepted { .. } => (None, None, None),
            NotificationEvent::PageFollowed { page_id, .. }
            | NotificationEvent::PageLiked { page_id, .. }
            | NotificationEvent::PageJoinApproved { page_id, .. }
            | NotificationEvent::PageJoinRejected { page_id, .. } => {
                (None, None, Some(page_id.clone()))
            }
        };

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_id: Set(recipient_id),
            sender_id: Set(Some(actor.id)),
            notification_type: Set(event.notification_type()),
            title: Set(title),
            content: Set(content),
            post_id: Set(post_id),
            comment_id: Set(comment_id),
            page_id: Set(page_id),
            is_read: Set(false),
            deleted_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        let created = self.notification_repo.create(model).await?;
        Ok(DispatchOutcome::Delivered(created))
    }

    /// List notifications for a user, newest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_user(user_id, limit, offset)
            .await
    }

    /// Count unread notifications for a user.
    pub async fn unread_count(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    /// Mark specific notifications as read. IDs belonging to other recipients
    /// are ignored.
    pub async fn mark_read(&self, user_id: &str, ids: &[String]) -> AppResult<u64> {
        self.notification_repo.mark_read(user_id, ids).await
    }

    /// Mark all notifications as read for a user.
    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_read(user_id).await
    }

    /// Delete a notification owned by `user_id`.
    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        let affected = self
            .notification_repo
            .soft_delete_scoped(user_id, id)
            .await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!("notification {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commune_db::test_utils::mock::{test_account, test_page, test_page_post, test_post};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn service(db: Arc<sea_orm::DatabaseConnection>) -> NotificationService {
        NotificationService::new(
            NotificationRepository::new(db.clone()),
            AccountRepository::new(db.clone()),
            PostRepository::new(db.clone()),
            PageRepository::new(db),
        )
    }

    #[test]
    fn test_templates_use_display_name() {
        let event = NotificationEvent::Followed {
            actor_id: "u1".to_string(),
            target_id: "u2".to_string(),
        };
        let (title, content) = render_templates(&event, "Alice");

        assert_eq!(title, "New follower");
        assert_eq!(content, "Alice started following you");
    }

    #[tokio::test]
    async fn test_resolve_recipient_self_action_suppressed() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let svc = service(db);

        let event = NotificationEvent::Followed {
            actor_id: "u1".to_string(),
            target_id: "u1".to_string(),
        };
        let recipient = svc.resolve_recipient(&event).await.unwrap();

        assert!(recipient.is_none());
    }

    #[tokio::test]
    async fn test_resolve_recipient_like_goes_to_author() {
        let post = test_post("p1", "author1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );
        let svc = service(db);

        let event = NotificationEvent::Liked {
            actor_id: "u1".to_string(),
            post_id: "p1".to_string(),
        };
        let recipient = svc.resolve_recipient(&event).await.unwrap();

        assert_eq!(recipient, Some("author1".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_recipient_page_post_goes_to_owner() {
        let post = test_page_post("p1", "author1", "pg1");
        let page = test_page("pg1", "owner1", "Rustaceans");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .append_query_results([[page]])
                .into_connection(),
        );
        let svc = service(db);

        let event = NotificationEvent::Liked {
            actor_id: "u1".to_string(),
            post_id: "p1".to_string(),
        };
        let recipient = svc.resolve_recipient(&event).await.unwrap();

        assert_eq!(recipient, Some("owner1".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_recipient_missing_post_skips() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<commune_db::entities::post::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let event = NotificationEvent::Liked {
            actor_id: "u1".to_string(),
            post_id: "gone".to_string(),
        };
        let recipient = svc.resolve_recipient(&event).await.unwrap();

        assert!(recipient.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_skips_when_actor_is_recipient() {
        let post = test_post("p1", "u1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );
        let svc = service(db);

        // u1 liking their own post produces nothing
        let outcome = svc
            .dispatch(NotificationEvent::Liked {
                actor_id: "u1".to_string(),
                post_id: "p1".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Skipped));
    }

    #[tokio::test]
    async fn test_dispatch_skips_when_actor_gone() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<commune_db::entities::account::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let outcome = svc
            .dispatch(NotificationEvent::Followed {
                actor_id: "ghost".to_string(),
                target_id: "u2".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Skipped));
    }

    #[tokio::test]
    async fn test_delete_not_found_for_foreign_row() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([sea_orm::MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.delete("u2", "n1").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_dispatch_delivers_follow() {
        let actor = test_account("u1", "alice");
        let stored = commune_db::test_utils::mock::test_notification(
            "n1",
            "u2",
            NotificationType::Follow,
        );
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[actor]])
                .append_query_results([[stored]])
                .into_connection(),
        );
        let svc = service(db);

        let outcome = svc
            .dispatch(NotificationEvent::Followed {
                actor_id: "u1".to_string(),
                target_id: "u2".to_string(),
            })
            .await
            .unwrap();

        match outcome {
            DispatchOutcome::Delivered(n) => assert_eq!(n.recipient_id, "u2"),
            DispatchOutcome::Skipped => panic!("expected delivery"),
        }
    }
}
