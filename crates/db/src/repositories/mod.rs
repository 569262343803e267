//! Repositories for database access.

#![allow(missing_docs)]

pub mod account;
pub mod boosted_post;
pub mod comment;
pub mod follow_edge;
pub mod friendship;
pub mod notification;
pub mod page;
pub mod post;
pub mod reaction;

pub use account::AccountRepository;
pub use boosted_post::BoostedPostRepository;
pub use comment::CommentRepository;
pub use follow_edge::FollowEdgeRepository;
pub use friendship::FriendshipRepository;
pub use notification::NotificationRepository;
pub use page::PageRepository;
pub use post::PostRepository;
pub use reaction::ReactionRepository;
