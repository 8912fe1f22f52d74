//! Entity value shapes
//!
//! Fixed shapes for everything that enters the model. Network responses are
//! normalized into these at the API boundary; the core never branches on
//! which endpoint an entity arrived from.

use ripple_core::{CommentId, MessageId, NotificationId, PostId, SessionContext, UserId};
use serde::{Deserialize, Serialize};

use crate::comments::CommentNode;

/// Author display fields carried on comments and replies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Author's user id
    pub id: UserId,
    /// Display name
    pub display_name: String,
    /// Handle
    pub username: String,
    /// Avatar URL, if any
    pub avatar: Option<String>,
}

impl From<&SessionContext> for Author {
    fn from(session: &SessionContext) -> Self {
        Self {
            id: session.user_id.clone(),
            display_name: session.display_name.clone(),
            username: session.username.clone(),
            avatar: session.avatar.clone(),
        }
    }
}

/// Post aggregate
///
/// Only the fields the interaction engine mutates live here; presentational
/// post content stays with the embedding application. `comments_count` is
/// kept equal to the number of nodes reachable in the post's comment forest
/// by the gateway on every insert, remove, and hydration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostState {
    /// Post identifier
    pub id: PostId,
    /// Total comments reachable in the post's forest (roots + descendants)
    pub comments_count: u32,
    /// Like count
    pub likes_count: u32,
    /// Whether the session user has liked this post
    pub is_liked: bool,
    /// Whether the session user has bookmarked this post
    pub is_bookmarked: bool,
}

impl PostState {
    /// Create a post aggregate with zeroed interaction state
    pub fn new(id: PostId) -> Self {
        Self {
            id,
            comments_count: 0,
            likes_count: 0,
            is_liked: false,
            is_bookmarked: false,
        }
    }
}

/// Kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Someone liked a post or comment of yours
    Like,
    /// Someone commented on a post of yours
    Comment,
    /// Someone replied to a comment of yours
    Reply,
    /// Someone followed you
    Follow,
    /// A direct message arrived
    Message,
    /// Platform announcement
    System,
}

/// What a notification refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationRef {
    /// A post
    Post(PostId),
    /// A comment within a post
    Comment {
        /// The post containing the comment
        post_id: PostId,
        /// The comment itself
        comment_id: CommentId,
    },
    /// A user (follows)
    User(UserId),
    /// No referent (system notices)
    None,
}

/// A notification
///
/// Created by a push event or the initial bulk fetch; mutated only by
/// mark-read (one-directional, idempotent); removed by explicit delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification identifier
    pub id: NotificationId,
    /// Kind of event this notification reports
    pub kind: NotificationKind,
    /// Whether the user has seen it
    pub seen: bool,
    /// Creation time, epoch milliseconds
    pub created_at: u64,
    /// What the notification refers to
    pub payload: NotificationRef,
}

/// A direct message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message identifier
    pub id: MessageId,
    /// Sender's user id
    pub sender_id: UserId,
    /// Message text
    pub content: String,
    /// Send time, epoch milliseconds
    pub created_at: u64,
    /// Whether the recipient has read it
    pub read: bool,
}

/// A direct-message conversation with one peer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Messages in arrival order
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Find a message by id
    pub fn message(&self, id: &MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == *id)
    }

    /// Find a message by id, mutably
    pub fn message_mut(&mut self, id: &MessageId) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == *id)
    }

    /// Whether a message with this id is present
    pub fn contains(&self, id: &MessageId) -> bool {
        self.message(id).is_some()
    }
}

/// A confirmed comment as returned by the remote system
///
/// The normalized wire shape for comment creation responses, bulk comment
/// fetches, and comment push events. Converted to a [`CommentNode`] before
/// entering the forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    /// Durable id assigned by the remote system
    pub id: String,
    /// Post the comment belongs to
    pub post_id: PostId,
    /// Durable id of the parent comment, if this is a reply
    pub parent_id: Option<String>,
    /// Comment text
    pub content: String,
    /// Author display fields
    pub author: Author,
    /// Creation time, epoch milliseconds
    pub created_at: u64,
    /// Like count at fetch time
    pub likes_count: u32,
    /// Whether the session user has liked it
    pub is_liked: bool,
}

impl CommentRecord {
    /// Convert into a forest node (no children yet; links are built on
    /// insertion)
    pub fn into_node(self) -> CommentNode {
        CommentNode {
            id: CommentId::Durable(self.id),
            content: self.content,
            author: self.author,
            created_at: self.created_at,
            parent_id: self.parent_id.map(CommentId::Durable),
            likes_count: self.likes_count,
            is_liked: self.is_liked,
            reply_ids: Vec::new(),
        }
    }
}
