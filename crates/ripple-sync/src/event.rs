//! Push events and interests
//!
//! The `{type, payload}` events the channel delivers, already normalized
//! into the fixed entity shapes of `ripple-model`, and the interests a
//! session registers to receive them.

use ripple_core::{MessageId, PostId, UserId};
use ripple_model::{ChatMessage, CommentRecord, Notification};
use serde::{Deserialize, Serialize};

/// A server-pushed event
///
/// Every payload is confirmed by construction: durable ids only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PushEvent {
    /// A new notification for the session user
    NotificationCreated {
        /// The notification
        notification: Notification,
    },
    /// An incoming direct message
    MessageCreated {
        /// Conversation peer
        peer: UserId,
        /// The message
        message: ChatMessage,
    },
    /// A direct message was read
    MessageRead {
        /// Conversation peer
        peer: UserId,
        /// The message that was read
        message_id: MessageId,
    },
    /// Another user commented on a thread this session watches
    CommentCreated {
        /// The confirmed comment
        record: CommentRecord,
    },
}

impl PushEvent {
    /// Short label for logging
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotificationCreated { .. } => "notification-created",
            Self::MessageCreated { .. } => "message-created",
            Self::MessageRead { .. } => "message-read",
            Self::CommentCreated { .. } => "comment-created",
        }
    }
}

/// A thread or conversation the session currently cares about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interest {
    /// A post's comment thread
    Thread(PostId),
    /// A direct-message conversation
    Conversation(UserId),
}
