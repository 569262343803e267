//! Page repository.
//!
//! Covers pages plus their membership, follow, and like relationship rows.

use std::sync::Arc;

use crate::entities::{
    Page, PageFollow, PageLike, PageMembership, page, page_follow, page_like, page_membership,
};
use crate::entities::page_membership::{MembershipRole, MembershipStatus};
use crate::visibility;
use chrono::Utc;
use commune_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
};

/// Page repository for database operations.
#[derive(Clone)]
pub struct PageRepository {
    db: Arc<DatabaseConnection>,
}

impl PageRepository {
    /// Create a new page repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an alive page by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<page::Model>> {
        Page::find_by_id(id)
            .filter(visibility::alive_pages())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an alive page by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<page::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("page {id}")))
    }

    // ==================== Membership ====================

    /// Find an alive membership by ID.
    pub async fn find_membership_by_id(
        &self,
        id: &str,
    ) -> AppResult<Option<page_membership::Model>> {
        PageMembership::find_by_id(id)
            .filter(visibility::alive_page_memberships())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an alive membership by user and page.
    pub async fn find_membership(
        &self,
        user_id: &str,
        page_id: &str,
    ) -> AppResult<Option<page_membership::Model>> {
        PageMembership::find()
            .filter(page_membership::Column::UserId.eq(user_id))
            .filter(page_membership::Column::PageId.eq(page_id))
            .filter(visibility::alive_page_memberships())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a membership by pair, including soft-deleted rows.
    pub async fn find_membership_any(
        &self,
        user_id: &str,
        page_id: &str,
    ) -> AppResult<Option<page_membership::Model>> {
        PageMembership::find()
            .filter(page_membership::Column::UserId.eq(user_id))
            .filter(page_membership::Column::PageId.eq(page_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Transition a membership to a new status.
    pub async fn set_membership_status(
        &self,
        model: page_membership::Model,
        status: MembershipStatus,
    ) -> AppResult<page_membership::Model> {
        let mut active: page_membership::ActiveModel = model.into();
        active.status = Set(status);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Revive a soft-deleted membership with a fresh role and status.
    pub async fn revive_membership(
        &self,
        model: page_membership::Model,
        role: MembershipRole,
        status: MembershipStatus,
    ) -> AppResult<page_membership::Model> {
        let mut active: page_membership::ActiveModel = model.into();
        active.role = Set(role);
        active.status = Set(status);
        active.deleted_at = Set(None);
        active.created_at = Set(Utc::now().into());
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Soft-delete a membership.
    pub async fn soft_delete_membership(&self, model: page_membership::Model) -> AppResult<()> {
        let mut active: page_membership::ActiveModel = model.into();
        active.deleted_at = Set(Some(Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// IDs of pages where `user_id` is an accepted member.
    pub async fn member_page_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        PageMembership::find()
            .select_only()
            .column(page_membership::Column::PageId)
            .filter(page_membership::Column::UserId.eq(user_id))
            .filter(page_membership::Column::Status.eq(MembershipStatus::Accepted))
            .filter(visibility::alive_page_memberships())
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Follows ====================

    /// Find an alive page follow by user and page.
    pub async fn find_follow(
        &self,
        user_id: &str,
        page_id: &str,
    ) -> AppResult<Option<page_follow::Model>> {
        PageFollow::find()
            .filter(page_follow::Column::UserId.eq(user_id))
            .filter(page_follow::Column::PageId.eq(page_id))
            .filter(visibility::alive_page_follows())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a page follow by pair, including soft-deleted rows.
    pub async fn find_follow_any(
        &self,
        user_id: &str,
        page_id: &str,
    ) -> AppResult<Option<page_follow::Model>> {
        PageFollow::find()
            .filter(page_follow::Column::UserId.eq(user_id))
            .filter(page_follow::Column::PageId.eq(page_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Revive a soft-deleted page follow.
    pub async fn revive_follow(&self, model: page_follow::Model) -> AppResult<page_follow::Model> {
        let mut active: page_follow::ActiveModel = model.into();
        active.deleted_at = Set(None);
        active.created_at = Set(Utc::now().into());
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Soft-delete a page follow.
    pub async fn soft_delete_follow(&self, model: page_follow::Model) -> AppResult<()> {
        let mut active: page_follow::ActiveModel = model.into();
        active.deleted_at = Set(Some(Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// IDs of pages `user_id` follows.
    pub async fn followed_page_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        PageFollow::find()
            .select_only()
            .column(page_follow::Column::PageId)
            .filter(page_follow::Column::UserId.eq(user_id))
            .filter(visibility::alive_page_follows())
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Likes ====================

    /// Find an alive page like by user and page.
    pub async fn find_like(
        &self,
        user_id: &str,
        page_id: &str,
    ) -> AppResult<Option<page_like::Model>> {
        PageLike::find()
            .filter(page_like::Column::UserId.eq(user_id))
            .filter(page_like::Column::PageId.eq(page_id))
            .filter(visibility::alive_page_likes())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a page like by pair, including soft-deleted rows.
    pub async fn find_like_any(
        &self,
        user_id: &str,
        page_id: &str,
    ) -> AppResult<Option<page_like::Model>> {
        PageLike::find()
            .filter(page_like::Column::UserId.eq(user_id))
            .filter(page_like::Column::PageId.eq(page_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Revive a soft-deleted page like.
    pub async fn revive_like(&self, model: page_like::Model) -> AppResult<page_like::Model> {
        let mut active: page_like::ActiveModel = model.into();
        active.deleted_at = Set(None);
        active.created_at = Set(Utc::now().into());
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Soft-delete a page like.
    pub async fn soft_delete_like(&self, model: page_like::Model) -> AppResult<()> {
        let mut active: page_like::ActiveModel = model.into();
        active.deleted_at = Set(Some(Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
