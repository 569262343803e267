//! Visibility filter: soft-delete aware query predicates.
//!
//! Every read path composes these conditions into its query instead of
//! filtering rows after the fact. Each builder narrows a query to rows whose
//! own soft-delete marker is unset and whose directly referenced
//! soft-deletable entities are alive as well. The reference check is one hop
//! deep per builder; callers compose builders explicitly at each join level
//! (e.g. "comments whose post is alive" does not re-check the post's author).
//!
//! The builders are pure query transformations: they narrow, never error.

use crate::entities::{account, boosted_post, comment, follow_edge, friendship, media, notification, page, page_follow, page_like, page_membership, post, reaction};
use sea_orm::sea_query::{Query, SelectStatement};
use sea_orm::{ColumnTrait, Condition};

/// Sub-select of alive account ids.
fn alive_account_ids() -> SelectStatement {
    Query::select()
        .column(account::Column::Id)
        .from(account::Entity)
        .and_where(account::Column::DeletedAt.is_null())
        .to_owned()
}

/// Sub-select of alive page ids.
fn alive_page_ids() -> SelectStatement {
    Query::select()
        .column(page::Column::Id)
        .from(page::Entity)
        .and_where(page::Column::DeletedAt.is_null())
        .to_owned()
}

/// Sub-select of alive post ids.
fn alive_post_ids() -> SelectStatement {
    Query::select()
        .column(post::Column::Id)
        .from(post::Entity)
        .and_where(post::Column::DeletedAt.is_null())
        .to_owned()
}

/// Alive accounts.
#[must_use]
pub fn alive_accounts() -> Condition {
    Condition::all().add(account::Column::DeletedAt.is_null())
}

/// Alive follow edges whose endpoints are both alive.
#[must_use]
pub fn alive_follow_edges() -> Condition {
    Condition::all()
        .add(follow_edge::Column::DeletedAt.is_null())
        .add(follow_edge::Column::FollowerId.in_subquery(alive_account_ids()))
        .add(follow_edge::Column::FollowingId.in_subquery(alive_account_ids()))
}

/// Alive friendships whose parties are both alive.
#[must_use]
pub fn alive_friendships() -> Condition {
    Condition::all()
        .add(friendship::Column::DeletedAt.is_null())
        .add(friendship::Column::UserAId.in_subquery(alive_account_ids()))
        .add(friendship::Column::UserBId.in_subquery(alive_account_ids()))
}

/// Alive pages whose owner is alive.
#[must_use]
pub fn alive_pages() -> Condition {
    Condition::all()
        .add(page::Column::DeletedAt.is_null())
        .add(page::Column::OwnerId.in_subquery(alive_account_ids()))
}

/// Alive page memberships whose member and page are alive.
#[must_use]
pub fn alive_page_memberships() -> Condition {
    Condition::all()
        .add(page_membership::Column::DeletedAt.is_null())
        .add(page_membership::Column::UserId.in_subquery(alive_account_ids()))
        .add(page_membership::Column::PageId.in_subquery(alive_page_ids()))
}

/// Alive page follows whose follower and page are alive.
#[must_use]
pub fn alive_page_follows() -> Condition {
    Condition::all()
        .add(page_follow::Column::DeletedAt.is_null())
        .add(page_follow::Column::UserId.in_subquery(alive_account_ids()))
        .add(page_follow::Column::PageId.in_subquery(alive_page_ids()))
}

/// Alive page likes whose liker and page are alive.
#[must_use]
pub fn alive_page_likes() -> Condition {
    Condition::all()
        .add(page_like::Column::DeletedAt.is_null())
        .add(page_like::Column::UserId.in_subquery(alive_account_ids()))
        .add(page_like::Column::PageId.in_subquery(alive_page_ids()))
}

/// Alive posts whose author is alive and whose owning page, if any, is alive.
#[must_use]
pub fn alive_posts() -> Condition {
    Condition::all()
        .add(post::Column::DeletedAt.is_null())
        .add(post::Column::AuthorId.in_subquery(alive_account_ids()))
        .add(
            Condition::any()
                .add(post::Column::PageId.is_null())
                .add(post::Column::PageId.in_subquery(alive_page_ids())),
        )
}

/// Alive media rows whose post is alive.
#[must_use]
pub fn alive_media() -> Condition {
    Condition::all()
        .add(media::Column::DeletedAt.is_null())
        .add(media::Column::PostId.in_subquery(alive_post_ids()))
}

/// Alive comments whose author and target post are alive.
#[must_use]
pub fn alive_comments() -> Condition {
    Condition::all()
        .add(comment::Column::DeletedAt.is_null())
        .add(comment::Column::AuthorId.in_subquery(alive_account_ids()))
        .add(comment::Column::PostId.in_subquery(alive_post_ids()))
}

/// Alive reactions whose reactor and target post are alive.
#[must_use]
pub fn alive_reactions() -> Condition {
    Condition::all()
        .add(reaction::Column::DeletedAt.is_null())
        .add(reaction::Column::UserId.in_subquery(alive_account_ids()))
        .add(reaction::Column::PostId.in_subquery(alive_post_ids()))
}

/// Alive boosts whose promoted post is alive.
#[must_use]
pub fn alive_boosts() -> Condition {
    Condition::all()
        .add(boosted_post::Column::DeletedAt.is_null())
        .add(boosted_post::Column::PostId.in_subquery(alive_post_ids()))
}

/// Alive notifications whose sender, if any, is alive.
#[must_use]
pub fn alive_notifications() -> Condition {
    Condition::all()
        .add(notification::Column::DeletedAt.is_null())
        .add(
            Condition::any()
                .add(notification::Column::SenderId.is_null())
                .add(notification::Column::SenderId.in_subquery(alive_account_ids())),
        )
}
