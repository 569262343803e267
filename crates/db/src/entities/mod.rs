//! Database entities.

#![allow(missing_docs)]

pub mod account;
pub mod boosted_post;
pub mod comment;
pub mod follow_edge;
pub mod friendship;
pub mod media;
pub mod notification;
pub mod page;
pub mod page_follow;
pub mod page_like;
pub mod page_membership;
pub mod post;
pub mod reaction;

pub use account::Entity as Account;
pub use boosted_post::Entity as BoostedPost;
pub use comment::Entity as Comment;
pub use follow_edge::Entity as FollowEdge;
pub use friendship::Entity as Friendship;
pub use media::Entity as Media;
pub use notification::Entity as Notification;
pub use page::Entity as Page;
pub use page_follow::Entity as PageFollow;
pub use page_like::Entity as PageLike;
pub use page_membership::Entity as PageMembership;
pub use post::Entity as Post;
pub use reaction::Entity as Reaction;
