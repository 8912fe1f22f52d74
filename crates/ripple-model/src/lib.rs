//! Ripple Model - Entity Model and Mutation Gateway
//!
//! In-memory state for everything a feed screen displays: the post
//! aggregate, its comment forest, the notification list, and direct-message
//! conversations. The model is owned exclusively by the engine for the
//! lifetime of the viewed screen; views read snapshots.
//!
//! # Architecture
//!
//! All mutation funnels through a single gateway, [`ModelHandle::apply`],
//! which applies one [`Patch`] atomically relative to every other patch.
//! Both the optimistic mutation engine and the real-time event merger issue
//! patches through this gateway; neither touches entity state directly.
//! Patches are structural (keyed by id / parent id), never positional, so
//! concurrent patches targeting different branches cannot corrupt each
//! other.
//!
//! The comment forest is an arena: an id-keyed map plus explicit
//! `parent_id`/`reply_ids` relations. Replace and remove are O(1) lookups at
//! any depth, and subtree walks are iterative.

pub mod comments;
pub mod entities;
pub mod handle;
pub mod model;
pub mod patch;

pub use comments::{CommentForest, CommentNode};
pub use entities::{
    Author, ChatMessage, CommentRecord, Conversation, Notification, NotificationKind,
    NotificationRef, PostState,
};
pub use handle::ModelHandle;
pub use model::FeedModel;
pub use patch::{EngagementTarget, NoopReason, Patch, PatchError, PatchOutcome};
