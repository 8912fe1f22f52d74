//! Patches: structural mutations applied through the gateway
//!
//! Every change to the entity model is expressed as a [`Patch`] and applied
//! through [`crate::ModelHandle::apply`]. Patches are keyed by id or parent
//! id, never by position, and each one is applied atomically relative to
//! every other patch.
//!
//! Outcome conventions:
//! - A replace or remove whose target has already been resolved or excised
//!   is a silent no-op, not an error. This is the expected shape of a
//!   confirm racing a rollback.
//! - A duplicate insert (push redelivery) is a no-op.
//! - An insert or read-marker referencing an id that has never been seen is
//!   a [`PatchError::MissingReference`], so the event merger can buffer the
//!   patch and retry once the referenced entity arrives.

use ripple_core::{CommentId, MessageId, NotificationId, PostId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::comments::CommentNode;
use crate::entities::{ChatMessage, CommentRecord, Notification, PostState};

/// The entity an engagement toggle addresses
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngagementTarget {
    /// A post's like state
    Post(PostId),
    /// A comment's like state
    Comment {
        /// Post whose forest holds the comment
        post_id: PostId,
        /// The comment itself, at any depth
        comment_id: CommentId,
    },
}

/// A structural mutation of the entity model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Patch {
    /// Insert a comment at the position encoded by its `parent_id`
    /// (`None` appends to the post's root list)
    InsertComment {
        /// Post whose forest receives the node
        post_id: PostId,
        /// The node to insert
        node: CommentNode,
    },
    /// Replace the node at `id` in place, inheriting its structural position
    ReplaceComment {
        /// Post whose forest holds the node
        post_id: PostId,
        /// Target id (normally provisional)
        id: CommentId,
        /// The confirmed replacement
        node: CommentNode,
    },
    /// Remove the node at `id` together with its subtree
    RemoveComment {
        /// Post whose forest holds the node
        post_id: PostId,
        /// Target id, at any depth
        id: CommentId,
    },
    /// Flip a like flag and shift its count by exactly the paired delta
    SetEngagement {
        /// The entity being toggled
        target: EngagementTarget,
        /// New liked flag
        is_liked: bool,
        /// Count delta, always ±1, applied atomically with the flag
        likes_delta: i32,
    },
    /// Adopt authoritative engagement state (successful confirms only)
    ReconcileEngagement {
        /// The entity being reconciled
        target: EngagementTarget,
        /// Authoritative count, already adjusted for pending local deltas
        likes_count: Option<u32>,
        /// Authoritative liked flag, when no local toggles are pending
        is_liked: Option<bool>,
    },
    /// Set a post's bookmark flag
    SetBookmarked {
        /// The post
        post_id: PostId,
        /// New bookmark flag
        bookmarked: bool,
    },
    /// Insert a pushed notification at the head of the list
    InsertNotification {
        /// The notification (durable id)
        notification: Notification,
    },
    /// Mark a notification seen (one-directional, idempotent)
    MarkNotificationSeen {
        /// The notification
        id: NotificationId,
    },
    /// Delete a notification
    RemoveNotification {
        /// The notification
        id: NotificationId,
    },
    /// Append an incoming direct message (dedupes by id)
    InsertMessage {
        /// Conversation peer
        peer: UserId,
        /// The message (durable id)
        message: ChatMessage,
    },
    /// Mark a direct message read
    MarkMessageRead {
        /// Conversation peer
        peer: UserId,
        /// The message
        id: MessageId,
    },
    /// Install a post aggregate fetched at screen open
    HydratePost {
        /// The post aggregate
        post: PostState,
    },
    /// Install a post's comment batch fetched at screen open
    HydrateComments {
        /// The post
        post_id: PostId,
        /// Ordered batch from the fetch API
        records: Vec<CommentRecord>,
    },
    /// Install the notification list fetched at session start
    HydrateNotifications {
        /// Ordered batch from the fetch API, newest first
        notifications: Vec<Notification>,
    },
    /// Install a conversation's message history
    HydrateConversation {
        /// Conversation peer
        peer: UserId,
        /// Ordered batch from the fetch API, oldest first
        messages: Vec<ChatMessage>,
    },
}

/// Why a patch was accepted without changing anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoopReason {
    /// The target was already replaced or removed
    AlreadyResolved,
    /// The entity is already present (push redelivery)
    Duplicate,
    /// The one-directional flag was already set
    AlreadyApplied,
}

/// Result of applying a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchOutcome {
    /// The model changed
    Applied,
    /// A comment removal; reports how many nodes were excised
    Removed {
        /// Nodes removed (target + descendants)
        nodes: u32,
    },
    /// Nothing to do; see the reason
    Noop(NoopReason),
}

impl PatchOutcome {
    /// Whether the patch changed the model
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Noop(_))
    }
}

/// A patch referenced an entity the model has never seen
///
/// Distinct from the silent no-op cases: a missing reference may mean the
/// referenced entity's creation simply has not arrived yet, so the event
/// merger buffers these and retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("patch references unknown {entity} {id}")]
pub struct PatchError {
    /// What kind of entity was missing ("post", "comment", ...)
    pub entity: &'static str,
    /// Display form of the missing id
    pub id: String,
}

impl PatchError {
    /// Create a missing-reference error
    pub fn missing(entity: &'static str, id: impl ToString) -> Self {
        Self {
            entity,
            id: id.to_string(),
        }
    }
}
