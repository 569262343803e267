//! Boosted post entity (time-boxed promotion of a post).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Boost review/lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum BoostStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "expired")]
    Expired,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "boosted_post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The promoted post
    #[sea_orm(indexed)]
    pub post_id: String,

    /// Account that purchased the boost
    #[sea_orm(indexed)]
    pub booster_id: String,

    pub status: BoostStatus,

    /// End of the promotion window; null means open-ended
    #[sea_orm(nullable)]
    pub end_date: Option<DateTimeWithTimeZone>,

    /// Soft-delete marker; null means the boost is alive
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,

    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::BoosterId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Booster,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the boost is currently active: accepted and inside its window.
    #[must_use]
    pub fn is_active(&self, now: DateTimeWithTimeZone) -> bool {
        self.status == BoostStatus::Accepted && self.end_date.is_none_or(|end| end > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn boost(status: BoostStatus, end_date: Option<DateTimeWithTimeZone>) -> Model {
        Model {
            id: "b1".to_string(),
            post_id: "p1".to_string(),
            booster_id: "u1".to_string(),
            status,
            end_date,
            deleted_at: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_accepted_without_end_date_is_active() {
        let now = Utc::now().into();
        assert!(boost(BoostStatus::Accepted, None).is_active(now));
    }

    #[test]
    fn test_accepted_past_end_date_is_inactive() {
        let now = Utc::now();
        let past = (now - Duration::hours(1)).into();
        assert!(!boost(BoostStatus::Accepted, Some(past)).is_active(now.into()));
    }

    #[test]
    fn test_pending_is_inactive() {
        let now = Utc::now();
        let future = (now + Duration::hours(1)).into();
        assert!(!boost(BoostStatus::Pending, Some(future)).is_active(now.into()));
    }
}
