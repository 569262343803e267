//! Business logic services.

#![allow(missing_docs)]

pub mod boost;
pub mod comment;
pub mod feed;
pub mod notification;
pub mod page;
pub mod reaction;
pub mod relationship;

pub use boost::BoostService;
pub use comment::CommentService;
pub use feed::{FeedItem, FeedOrigin, FeedPage, FeedService, FeedStats};
pub use notification::{DispatchOutcome, NotificationEvent, NotificationService};
pub use page::PageService;
pub use reaction::ReactionService;
pub use relationship::{FriendshipState, RelationshipService, RelationshipStatus};

use commune_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Map an insert failure to the domain error space.
///
/// A unique constraint violation means a concurrent writer got there first,
/// which surfaces to the caller as a conflict rather than a server fault.
pub(crate) fn map_insert_err(e: &DbErr, what: &str) -> AppError {
    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        AppError::Conflict(format!("{what} already exists"))
    } else {
        AppError::Database(e.to_string())
    }
}

pub(crate) fn map_db_err(e: &DbErr) -> AppError {
    AppError::Database(e.to_string())
}
