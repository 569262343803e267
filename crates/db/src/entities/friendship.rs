//! Friendship entity.
//!
//! An undirected relationship stored as an ordered pair: `user_a_id` is
//! always the account that sent the request. A LEAST/GREATEST unique index
//! keeps one row per unordered pair; lookups still query both orderings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Friendship request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum FriendshipStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "friendship")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The requester at creation time
    pub user_a_id: String,

    /// The receiver of the request
    pub user_b_id: String,

    pub status: FriendshipStatus,

    /// Soft-delete marker; null means the friendship is alive
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::UserAId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    UserA,

    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::UserBId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    UserB,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The other party of the friendship, from `user_id`'s perspective.
    #[must_use]
    pub fn other_party(&self, user_id: &str) -> &str {
        if self.user_a_id == user_id {
            &self.user_b_id
        } else {
            &self.user_a_id
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn model(a: &str, b: &str) -> Model {
        Model {
            id: "f1".to_string(),
            user_a_id: a.to_string(),
            user_b_id: b.to_string(),
            status: FriendshipStatus::Pending,
            deleted_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_other_party() {
        let f = model("alice", "bob");
        assert_eq!(f.other_party("alice"), "bob");
        assert_eq!(f.other_party("bob"), "alice");
    }
}
