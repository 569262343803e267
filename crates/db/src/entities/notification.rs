//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum NotificationType {
    #[sea_orm(string_value = "like")]
    Like,
    #[sea_orm(string_value = "comment")]
    Comment,
    #[sea_orm(string_value = "follow")]
    Follow,
    #[sea_orm(string_value = "friend_request")]
    FriendRequest,
    #[sea_orm(string_value = "friend_accept")]
    FriendAccept,
    #[sea_orm(string_value = "page_follow")]
    PageFollow,
    #[sea_orm(string_value = "page_like")]
    PageLike,
    #[sea_orm(string_value = "page_join_approved")]
    PageJoinApproved,
    #[sea_orm(string_value = "page_join_rejected")]
    PageJoinRejected,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The account receiving the notification
    pub recipient_id: String,

    /// The account whose action triggered the notification
    #[sea_orm(nullable)]
    pub sender_id: Option<String>,

    pub notification_type: NotificationType,

    /// Denormalized headline
    pub title: String,

    /// Denormalized body composed from the sender's display name
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Related post
    #[sea_orm(nullable)]
    pub post_id: Option<String>,

    /// Related comment
    #[sea_orm(nullable)]
    pub comment_id: Option<String>,

    /// Related page
    #[sea_orm(nullable)]
    pub page_id: Option<String>,

    /// Has this notification been read?
    #[sea_orm(default_value = false)]
    pub is_read: bool,

    /// Soft-delete marker; null means the notification is alive
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::RecipientId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,

    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::SenderId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Sender,

    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
