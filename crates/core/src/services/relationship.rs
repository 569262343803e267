//! Relationship service.
//!
//! Friend requests, friendships, and follow edges. Friendship state and the
//! follow graph move together: accepting a request makes both accounts follow
//! each other, and a mutual follow quietly becomes a friendship. Multi-row
//! updates run inside a transaction so the graph never half-changes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::services::notification::{NotificationEvent, NotificationService};
use crate::services::{map_db_err, map_insert_err};
use chrono::Utc;
use commune_common::{AppError, AppResult, IdGenerator};
use commune_db::entities::friendship::FriendshipStatus;
use commune_db::entities::{FollowEdge, account, follow_edge, friendship};
use commune_db::repositories::{AccountRepository, FollowEdgeRepository, FriendshipRepository};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::warn;

/// How one account relates to another.
#[derive(Debug, Clone)]
pub struct RelationshipStatus {
    /// Whether the subject follows the other account.
    pub following: bool,
    /// Whether the other account follows the subject.
    pub followed_by: bool,
    /// The friendship between the two, if any.
    pub friendship: Option<FriendshipState>,
}

/// Friendship state from the subject's point of view.
#[derive(Debug, Clone)]
pub struct FriendshipState {
    /// Current status of the friendship row.
    pub status: FriendshipStatus,
    /// Whether the subject is the requester.
    pub requested_by_me: bool,
}

/// Relationship service for business logic.
#[derive(Clone)]
pub struct RelationshipService {
    db: Arc<DatabaseConnection>,
    account_repo: AccountRepository,
    follow_repo: FollowEdgeRepository,
    friendship_repo: FriendshipRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl RelationshipService {
    /// Create a new relationship service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, notifications: NotificationService) -> Self {
        Self {
            account_repo: AccountRepository::new(db.clone()),
            follow_repo: FollowEdgeRepository::new(db.clone()),
            friendship_repo: FriendshipRepository::new(db.clone()),
            db,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    // ==================== Friend requests ====================

    /// Send a friend request from `sender_id` to `receiver_id`.
    ///
    /// Sending also makes the sender follow the receiver. If the receiver
    /// already has a pending request towards the sender, the two requests
    /// collapse into an accepted friendship instead of crossing.
    pub async fn send_friend_request(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> AppResult<friendship::Model> {
        if sender_id == receiver_id {
            return Err(AppError::Conflict(
                "cannot send a friend request to yourself".to_string(),
            ));
        }

        self.account_repo.get_by_id(receiver_id).await?;

        let alive = self
            .friendship_repo
            .find_between(sender_id, receiver_id)
            .await?;

        if let Some(existing) = &alive {
            match existing.status {
                FriendshipStatus::Accepted => {
                    return Err(AppError::Conflict("already friends".to_string()));
                }
                FriendshipStatus::Pending if existing.user_a_id == sender_id => {
                    return Err(AppError::Conflict(
                        "friend request already sent".to_string(),
                    ));
                }
                FriendshipStatus::Pending => {
                    // The receiver asked first; both sides want this
                    return self.auto_accept(existing.clone(), sender_id).await;
                }
                FriendshipStatus::Rejected => {}
            }
        }

        // A rejected or soft-deleted row is revived in place; the unique pair
        // index forbids a second insert
        let prior = if alive.is_some() {
            alive
        } else {
            self.friendship_repo
                .find_between_any(sender_id, receiver_id)
                .await?
        };

        let request = match self.persist_request(prior, sender_id, receiver_id).await {
            Ok(row) => row,
            // A crossing request can land between the pre-read and the
            // insert; the normalized pair index rejects ours, so re-read
            // and collapse into theirs
            Err(AppError::Conflict(_)) => {
                return self.accept_crossed_request(sender_id, receiver_id).await;
            }
            Err(e) => return Err(e),
        };

        self.notify(NotificationEvent::FriendRequested {
            actor_id: sender_id.to_string(),
            target_id: receiver_id.to_string(),
        })
        .await;

        Ok(request)
    }

    /// Accept a pending friend request. Only the receiver may accept.
    pub async fn accept_friend_request(
        &self,
        request_id: &str,
        actor_id: &str,
    ) -> AppResult<friendship::Model> {
        let request = self
            .friendship_repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("friend request {request_id}")))?;

        if request.user_b_id != actor_id {
            return Err(AppError::Forbidden(
                "only the receiver can accept a friend request".to_string(),
            ));
        }
        if request.status != FriendshipStatus::Pending {
            return Err(AppError::InvalidState(
                "friend request is not pending".to_string(),
            ));
        }

        let requester_id = request.user_a_id.clone();
        let accepted = self.accept_in_txn(request).await?;

        self.notify(NotificationEvent::FriendAccepted {
            actor_id: actor_id.to_string(),
            target_id: requester_id,
        })
        .await;

        Ok(accepted)
    }

    /// Reject a pending friend request. Only the receiver may reject.
    ///
    /// The sender's follow edge stays in place; rejecting a request does not
    /// unfollow.
    pub async fn reject_friend_request(
        &self,
        request_id: &str,
        actor_id: &str,
    ) -> AppResult<friendship::Model> {
        let request = self
            .friendship_repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("friend request {request_id}")))?;

        if request.user_b_id != actor_id {
            return Err(AppError::Forbidden(
                "only the receiver can reject a friend request".to_string(),
            ));
        }
        if request.status != FriendshipStatus::Pending {
            return Err(AppError::InvalidState(
                "friend request is not pending".to_string(),
            ));
        }

        self.friendship_repo
            .set_status(request, FriendshipStatus::Rejected)
            .await
    }

    /// Cancel a pending friend request. Only the sender may cancel.
    ///
    /// The follow edge created alongside the request stays in place.
    pub async fn cancel_friend_request(&self, request_id: &str, actor_id: &str) -> AppResult<()> {
        let request = self
            .friendship_repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("friend request {request_id}")))?;

        if request.user_a_id != actor_id {
            return Err(AppError::Forbidden(
                "only the sender can cancel a friend request".to_string(),
            ));
        }
        if request.status != FriendshipStatus::Pending {
            return Err(AppError::InvalidState(
                "friend request is not pending".to_string(),
            ));
        }

        self.friendship_repo.soft_delete(request).await
    }

    /// Remove an accepted friendship and both follow edges.
    pub async fn unfriend(&self, user_id: &str, other_id: &str) -> AppResult<()> {
        let friendship = self
            .friendship_repo
            .find_between(user_id, other_id)
            .await?
            .filter(|f| f.status == FriendshipStatus::Accepted)
            .ok_or_else(|| AppError::NotFound("friendship".to_string()))?;

        let txn = self.db.begin().await.map_err(|e| map_db_err(&e))?;

        soft_delete_friendship(&txn, friendship)
            .await
            .map_err(|e| map_db_err(&e))?;
        retract_edge(&txn, user_id, other_id)
            .await
            .map_err(|e| map_db_err(&e))?;
        retract_edge(&txn, other_id, user_id)
            .await
            .map_err(|e| map_db_err(&e))?;

        txn.commit().await.map_err(|e| map_db_err(&e))
    }

    // ==================== Follows ====================

    /// Follow an account.
    ///
    /// If the target already follows the actor and no friendship exists, the
    /// mutual follow becomes an accepted friendship in the same transaction.
    pub async fn follow(&self, follower_id: &str, following_id: &str) -> AppResult<()> {
        if follower_id == following_id {
            return Err(AppError::Conflict("cannot follow yourself".to_string()));
        }

        self.account_repo.get_by_id(following_id).await?;

        if self
            .follow_repo
            .is_following(follower_id, following_id)
            .await?
        {
            return Err(AppError::Conflict("already following".to_string()));
        }

        let follows_back = self
            .follow_repo
            .is_following(following_id, follower_id)
            .await?;
        let existing_friendship = self
            .friendship_repo
            .find_between(follower_id, following_id)
            .await?;

        let txn = self.db.begin().await.map_err(|e| map_db_err(&e))?;

        self.ensure_edge(&txn, follower_id, following_id)
            .await
            .map_err(|e| map_insert_err(&e, "follow edge"))?;

        if follows_back && existing_friendship.is_none() {
            // Mutual follow: the account closing the loop is the requester
            let prior = self
                .friendship_repo
                .find_between_any(follower_id, following_id)
                .await?;
            match prior {
                Some(row) => {
                    revive_friendship(&txn, row, follower_id, FriendshipStatus::Accepted)
                        .await
                        .map_err(|e| map_db_err(&e))?;
                }
                None => {
                    let model = friendship::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        user_a_id: Set(follower_id.to_string()),
                        user_b_id: Set(following_id.to_string()),
                        status: Set(FriendshipStatus::Accepted),
                        deleted_at: Set(None),
                        created_at: Set(Utc::now().into()),
                        updated_at: Set(None),
                    };
                    model
                        .insert(&txn)
                        .await
                        .map_err(|e| map_insert_err(&e, "friendship"))?;
                }
            }
        }

        txn.commit().await.map_err(|e| map_db_err(&e))?;

        self.notify(NotificationEvent::Followed {
            actor_id: follower_id.to_string(),
            target_id: following_id.to_string(),
        })
        .await;

        Ok(())
    }

    /// Unfollow an account.
    ///
    /// Unfollowing breaks an accepted friendship with the target: friendship
    /// implies mutual follows, so removing either edge removes the friendship.
    pub async fn unfollow(&self, follower_id: &str, following_id: &str) -> AppResult<()> {
        let edge = self
            .follow_repo
            .find_by_pair(follower_id, following_id)
            .await?
            .ok_or_else(|| AppError::NotFound("follow".to_string()))?;

        let friendship = self
            .friendship_repo
            .find_between(follower_id, following_id)
            .await?
            .filter(|f| f.status == FriendshipStatus::Accepted);

        let txn = self.db.begin().await.map_err(|e| map_db_err(&e))?;

        let mut active: follow_edge::ActiveModel = edge.into();
        active.deleted_at = Set(Some(Utc::now().into()));
        active.update(&txn).await.map_err(|e| map_db_err(&e))?;

        if let Some(f) = friendship {
            soft_delete_friendship(&txn, f)
                .await
                .map_err(|e| map_db_err(&e))?;
        }

        txn.commit().await.map_err(|e| map_db_err(&e))
    }

    // ==================== Queries ====================

    /// Relationship between `user_id` and `other_id`, from `user_id`'s side.
    pub async fn get_status(&self, user_id: &str, other_id: &str) -> AppResult<RelationshipStatus> {
        let following = self.follow_repo.is_following(user_id, other_id).await?;
        let followed_by = self.follow_repo.is_following(other_id, user_id).await?;
        let friendship = self
            .friendship_repo
            .find_between(user_id, other_id)
            .await?
            .map(|f| FriendshipState {
                status: f.status,
                requested_by_me: f.user_a_id == user_id,
            });

        Ok(RelationshipStatus {
            following,
            followed_by,
            friendship,
        })
    }

    /// List a user's accepted friends, optionally narrowed by a name search.
    pub async fn list_friends(
        &self,
        user_id: &str,
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<account::Model>> {
        let friend_ids = self.friendship_repo.accepted_friend_ids(user_id).await?;
        self.account_repo
            .find_by_ids_paged(&friend_ids, search, limit, offset)
            .await
    }

    /// Accounts both users are friends with.
    pub async fn list_mutual_friends(
        &self,
        user_id: &str,
        other_id: &str,
    ) -> AppResult<Vec<account::Model>> {
        let mine: HashSet<String> = self
            .friendship_repo
            .accepted_friend_ids(user_id)
            .await?
            .into_iter()
            .collect();
        let theirs = self.friendship_repo.accepted_friend_ids(other_id).await?;

        let shared: Vec<String> = theirs.into_iter().filter(|id| mine.contains(id)).collect();
        self.account_repo.find_by_ids(&shared).await
    }

    /// Accounts following `user_id`, most recent first.
    pub async fn list_followers(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<account::Model>> {
        let edges = self.follow_repo.find_followers(user_id, limit, offset).await?;
        let ids: Vec<String> = edges.iter().map(|e| e.follower_id.clone()).collect();
        self.accounts_in_order(&ids).await
    }

    /// Accounts `user_id` follows, most recent first.
    pub async fn list_following(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<account::Model>> {
        let edges = self.follow_repo.find_following(user_id, limit, offset).await?;
        let ids: Vec<String> = edges.iter().map(|e| e.following_id.clone()).collect();
        self.accounts_in_order(&ids).await
    }

    /// Pending friend requests received by `user_id`.
    pub async fn list_received_requests(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<friendship::Model>> {
        self.friendship_repo
            .find_pending_received(user_id, limit, offset)
            .await
    }

    /// Pending friend requests sent by `user_id`.
    pub async fn list_sent_requests(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<friendship::Model>> {
        self.friendship_repo
            .find_pending_sent(user_id, limit, offset)
            .await
    }

    // ==================== Internals ====================

    /// Fetch accounts preserving the order of `ids`. Deleted accounts drop out.
    async fn accounts_in_order(&self, ids: &[String]) -> AppResult<Vec<account::Model>> {
        let accounts = self.account_repo.find_by_ids(ids).await?;
        let mut by_id: HashMap<String, account::Model> = accounts
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Write the pending request (revived or inserted) together with the
    /// sender's follow edge.
    async fn persist_request(
        &self,
        prior: Option<friendship::Model>,
        sender_id: &str,
        receiver_id: &str,
    ) -> AppResult<friendship::Model> {
        let txn = self.db.begin().await.map_err(|e| map_db_err(&e))?;

        let request = match prior {
            Some(row) => revive_friendship(&txn, row, sender_id, FriendshipStatus::Pending)
                .await
                .map_err(|e| map_db_err(&e))?,
            None => {
                let model = friendship::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_a_id: Set(sender_id.to_string()),
                    user_b_id: Set(receiver_id.to_string()),
                    status: Set(FriendshipStatus::Pending),
                    deleted_at: Set(None),
                    created_at: Set(Utc::now().into()),
                    updated_at: Set(None),
                };
                model
                    .insert(&txn)
                    .await
                    .map_err(|e| map_insert_err(&e, "friend request"))?
            }
        };

        self.ensure_edge(&txn, sender_id, receiver_id)
            .await
            .map_err(|e| map_insert_err(&e, "follow edge"))?;

        txn.commit().await.map_err(|e| map_db_err(&e))?;
        Ok(request)
    }

    /// Re-read after a pair-index conflict. If the other side's request
    /// landed first, accept it; anything else stays a conflict.
    async fn accept_crossed_request(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> AppResult<friendship::Model> {
        let crossed = self
            .friendship_repo
            .find_between(sender_id, receiver_id)
            .await?
            .filter(|f| f.status == FriendshipStatus::Pending && f.user_a_id == receiver_id)
            .ok_or_else(|| AppError::Conflict("friend request already exists".to_string()))?;

        self.auto_accept(crossed, sender_id).await
    }

    /// Collapse two crossing requests into an accepted friendship.
    async fn auto_accept(
        &self,
        request: friendship::Model,
        acceptor_id: &str,
    ) -> AppResult<friendship::Model> {
        let requester_id = request.user_a_id.clone();
        let accepted = self.accept_in_txn(request).await?;

        self.notify(NotificationEvent::FriendAccepted {
            actor_id: acceptor_id.to_string(),
            target_id: requester_id,
        })
        .await;

        Ok(accepted)
    }

    /// Mark a request accepted and make the follow edges mutual, atomically.
    async fn accept_in_txn(&self, request: friendship::Model) -> AppResult<friendship::Model> {
        let user_a = request.user_a_id.clone();
        let user_b = request.user_b_id.clone();

        let txn = self.db.begin().await.map_err(|e| map_db_err(&e))?;

        let mut active: friendship::ActiveModel = request.into();
        active.status = Set(FriendshipStatus::Accepted);
        active.updated_at = Set(Some(Utc::now().into()));
        let accepted = active.update(&txn).await.map_err(|e| map_db_err(&e))?;

        self.ensure_edge(&txn, &user_a, &user_b)
            .await
            .map_err(|e| map_insert_err(&e, "follow edge"))?;
        self.ensure_edge(&txn, &user_b, &user_a)
            .await
            .map_err(|e| map_insert_err(&e, "follow edge"))?;

        txn.commit().await.map_err(|e| map_db_err(&e))?;
        Ok(accepted)
    }

    /// Create or revive the follow edge `follower_id -> following_id`.
    async fn ensure_edge<C: ConnectionTrait>(
        &self,
        conn: &C,
        follower_id: &str,
        following_id: &str,
    ) -> Result<(), DbErr> {
        let existing = FollowEdge::find()
            .filter(follow_edge::Column::FollowerId.eq(follower_id))
            .filter(follow_edge::Column::FollowingId.eq(following_id))
            .one(conn)
            .await?;

        match existing {
            Some(edge) if edge.deleted_at.is_none() => Ok(()),
            Some(edge) => {
                let mut active: follow_edge::ActiveModel = edge.into();
                active.deleted_at = Set(None);
                active.created_at = Set(Utc::now().into());
                active.update(conn).await?;
                Ok(())
            }
            None => {
                let model = follow_edge::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    follower_id: Set(follower_id.to_string()),
                    following_id: Set(following_id.to_string()),
                    deleted_at: Set(None),
                    created_at: Set(Utc::now().into()),
                };
                model.insert(conn).await?;
                Ok(())
            }
        }
    }

    async fn notify(&self, event: NotificationEvent) {
        if let Err(e) = self.notifications.dispatch(event).await {
            warn!(error = %e, "failed to dispatch relationship notification");
        }
    }
}

/// Revive a friendship row as a fresh entry from `requester_id`.
async fn revive_friendship<C: ConnectionTrait>(
    conn: &C,
    model: friendship::Model,
    requester_id: &str,
    status: FriendshipStatus,
) -> Result<friendship::Model, DbErr> {
    let other = model.other_party(requester_id).to_string();
    let mut active: friendship::ActiveModel = model.into();
    active.user_a_id = Set(requester_id.to_string());
    active.user_b_id = Set(other);
    active.status = Set(status);
    active.deleted_at = Set(None);
    active.created_at = Set(Utc::now().into());
    active.updated_at = Set(None);
    active.update(conn).await
}

async fn soft_delete_friendship<C: ConnectionTrait>(
    conn: &C,
    model: friendship::Model,
) -> Result<(), DbErr> {
    let mut active: friendship::ActiveModel = model.into();
    active.deleted_at = Set(Some(Utc::now().into()));
    active.update(conn).await?;
    Ok(())
}

/// Soft-delete the edge `follower_id -> following_id` if it is alive.
async fn retract_edge<C: ConnectionTrait>(
    conn: &C,
    follower_id: &str,
    following_id: &str,
) -> Result<(), DbErr> {
    let existing = FollowEdge::find()
        .filter(follow_edge::Column::FollowerId.eq(follower_id))
        .filter(follow_edge::Column::FollowingId.eq(following_id))
        .filter(follow_edge::Column::DeletedAt.is_null())
        .one(conn)
        .await?;

    if let Some(edge) = existing {
        let mut active: follow_edge::ActiveModel = edge.into();
        active.deleted_at = Set(Some(Utc::now().into()));
        active.update(conn).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use commune_db::entities::notification::NotificationType;
    use commune_db::repositories::{NotificationRepository, PageRepository, PostRepository};
    use commune_db::test_utils::mock::{
        test_account, test_follow_edge, test_friendship, test_notification,
    };
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn service(db: Arc<DatabaseConnection>) -> RelationshipService {
        let notifications = NotificationService::new(
            NotificationRepository::new(db.clone()),
            AccountRepository::new(db.clone()),
            PostRepository::new(db.clone()),
            PageRepository::new(db.clone()),
        );
        RelationshipService::new(db, notifications)
    }

    #[tokio::test]
    async fn test_send_friend_request_to_self_conflicts() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let svc = service(db);

        let result = svc.send_friend_request("u1", "u1").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_send_friend_request_receiver_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<account::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.send_friend_request("u1", "ghost").await;

        assert!(matches!(result, Err(AppError::AccountNotFound(_))));
    }

    #[tokio::test]
    async fn test_send_friend_request_already_friends() {
        let receiver = test_account("u2", "bob");
        let accepted = test_friendship("f1", "u1", "u2", FriendshipStatus::Accepted);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[receiver]])
                .append_query_results([[accepted]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.send_friend_request("u1", "u2").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_send_friend_request_duplicate_pending() {
        let receiver = test_account("u2", "bob");
        let pending = test_friendship("f1", "u1", "u2", FriendshipStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[receiver]])
                .append_query_results([[pending]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.send_friend_request("u1", "u2").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_accept_by_sender_is_forbidden() {
        let pending = test_friendship("f1", "u1", "u2", FriendshipStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pending]])
                .into_connection(),
        );
        let svc = service(db);

        // u1 sent the request; only u2 may accept it
        let result = svc.accept_friend_request("f1", "u1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_accept_rejected_request_invalid_state() {
        let rejected = test_friendship("f1", "u1", "u2", FriendshipStatus::Rejected);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[rejected]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.accept_friend_request("f1", "u2").await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_accept_missing_request_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<friendship::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.accept_friend_request("missing", "u2").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cancel_by_receiver_is_forbidden() {
        let pending = test_friendship("f1", "u1", "u2", FriendshipStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pending]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.cancel_friend_request("f1", "u2").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_follow_self_conflicts() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let svc = service(db);

        let result = svc.follow("u1", "u1").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_follow_twice_conflicts() {
        let target = test_account("u2", "bob");
        let edge = test_follow_edge("e1", "u1", "u2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[target]])
                .append_query_results([[edge]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.follow("u1", "u2").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unfollow_without_edge_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<follow_edge::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.unfollow("u1", "u2").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unfriend_requires_accepted_friendship() {
        let pending = test_friendship("f1", "u1", "u2", FriendshipStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pending]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.unfriend("u1", "u2").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_send_friend_request_crossing_collapses() {
        let receiver = test_account("u1", "alice");
        let pending = test_friendship("f1", "u1", "u2", FriendshipStatus::Pending);
        let accepted = test_friendship("f1", "u1", "u2", FriendshipStatus::Accepted);
        let edge_ab = test_follow_edge("e1", "u1", "u2");
        let edge_ba = test_follow_edge("e2", "u2", "u1");
        let actor = test_account("u2", "bob");
        let stored = test_notification("n1", "u1", NotificationType::FriendAccept);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[receiver]])
                .append_query_results([[pending]])
                .append_query_results([[accepted]])
                .append_query_results([[edge_ab]])
                .append_query_results([Vec::<follow_edge::Model>::new()])
                .append_query_results([[edge_ba]])
                .append_query_results([[actor]])
                .append_query_results([[stored]])
                .into_connection(),
        );
        let svc = service(db);

        // u1 -> u2 is already pending, so u2 asking back accepts it
        let result = svc.send_friend_request("u2", "u1").await.unwrap();

        assert_eq!(result.status, FriendshipStatus::Accepted);
        assert_eq!(result.user_a_id, "u1");
    }

    #[tokio::test]
    async fn test_accept_creates_both_follow_edges() {
        let pending = test_friendship("f1", "u1", "u2", FriendshipStatus::Pending);
        let accepted = test_friendship("f1", "u1", "u2", FriendshipStatus::Accepted);
        let edge_ab = test_follow_edge("e1", "u1", "u2");
        let edge_ba = test_follow_edge("e2", "u2", "u1");
        let actor = test_account("u2", "bob");
        let stored = test_notification("n1", "u1", NotificationType::FriendAccept);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pending]])
                .append_query_results([[accepted]])
                .append_query_results([Vec::<follow_edge::Model>::new()])
                .append_query_results([[edge_ab]])
                .append_query_results([Vec::<follow_edge::Model>::new()])
                .append_query_results([[edge_ba]])
                .append_query_results([[actor]])
                .append_query_results([[stored]])
                .into_connection(),
        );
        let svc = service(db.clone());

        let result = svc.accept_friend_request("f1", "u2").await.unwrap();
        assert_eq!(result.status, FriendshipStatus::Accepted);

        drop(svc);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let dump = format!("{log:?}");
        // Neither side was following, so both edges are inserted
        assert_eq!(dump.matches(r#"INSERT INTO \"follow_edge\""#).count(), 2);
    }

    #[tokio::test]
    async fn test_unfriend_removes_friendship_and_both_edges() {
        let accepted = test_friendship("f1", "u1", "u2", FriendshipStatus::Accepted);
        let removed = test_friendship("f1", "u1", "u2", FriendshipStatus::Accepted);
        let edge_ab = test_follow_edge("e1", "u1", "u2");
        let edge_ba = test_follow_edge("e2", "u2", "u1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[accepted]])
                .append_query_results([[removed]])
                .append_query_results([[edge_ab.clone()]])
                .append_query_results([[edge_ab]])
                .append_query_results([[edge_ba.clone()]])
                .append_query_results([[edge_ba]])
                .into_connection(),
        );
        let svc = service(db.clone());

        svc.unfriend("u1", "u2").await.unwrap();

        drop(svc);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let dump = format!("{log:?}");
        assert_eq!(dump.matches(r#"UPDATE \"friendship\""#).count(), 1);
        assert_eq!(dump.matches(r#"UPDATE \"follow_edge\""#).count(), 2);
    }

    #[tokio::test]
    async fn test_crossing_race_accepts_after_pair_conflict() {
        // Both sides passed their pre-reads concurrently and the other
        // side's insert won; the re-read finds their pending row
        let pending = test_friendship("f1", "u1", "u2", FriendshipStatus::Pending);
        let accepted = test_friendship("f1", "u1", "u2", FriendshipStatus::Accepted);
        let edge_ab = test_follow_edge("e1", "u1", "u2");
        let edge_ba = test_follow_edge("e2", "u2", "u1");
        let actor = test_account("u2", "bob");
        let stored = test_notification("n1", "u1", NotificationType::FriendAccept);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pending]])
                .append_query_results([[accepted]])
                .append_query_results([[edge_ab]])
                .append_query_results([Vec::<follow_edge::Model>::new()])
                .append_query_results([[edge_ba]])
                .append_query_results([[actor]])
                .append_query_results([[stored]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.accept_crossed_request("u2", "u1").await.unwrap();

        assert_eq!(result.status, FriendshipStatus::Accepted);
    }

    #[tokio::test]
    async fn test_crossing_race_keeps_conflict_for_own_duplicate() {
        // The surviving row is the sender's own request, not a crossed one
        let own = test_friendship("f1", "u2", "u1", FriendshipStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[own]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.accept_crossed_request("u2", "u1").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_get_status_maps_friendship_direction() {
        let edge = test_follow_edge("e1", "u1", "u2");
        let friendship = test_friendship("f1", "u2", "u1", FriendshipStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[edge]])
                .append_query_results([Vec::<follow_edge::Model>::new()])
                .append_query_results([[friendship]])
                .into_connection(),
        );
        let svc = service(db);

        let status = svc.get_status("u1", "u2").await.unwrap();

        assert!(status.following);
        assert!(!status.followed_by);
        let state = status.friendship.unwrap();
        assert_eq!(state.status, FriendshipStatus::Pending);
        assert!(!state.requested_by_me);
    }
}
