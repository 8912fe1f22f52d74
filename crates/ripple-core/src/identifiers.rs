//! Identifier types used across the Ripple feed engine
//!
//! Durable identifiers are assigned by the remote system and arrive as
//! opaque strings. Provisional identifiers are generated locally for
//! entities that have been speculated but not yet confirmed; they live in a
//! separate id space so the two can never be confused.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Post identifier, assigned by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostId(pub String);

impl PostId {
    /// Create from a remote-assigned id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "post-{}", self.0)
    }
}

impl From<&str> for PostId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// User identifier, assigned by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Create from a remote-assigned id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user-{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Notification identifier, assigned by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationId(pub String);

impl NotificationId {
    /// Create from a remote-assigned id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notif-{}", self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Chat message identifier, assigned by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Create from a remote-assigned id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Locally generated identifier for a not-yet-confirmed entity
///
/// Unique within the session. Displays with a `local-` prefix so a
/// provisional id is recognizable in logs and can never collide with the
/// remote id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProvisionalId(pub Uuid);

impl ProvisionalId {
    /// Generate a fresh provisional id
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ProvisionalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local-{}", self.0)
    }
}

/// Comment identifier: either durable (remote-assigned) or provisional
///
/// A provisional id is replaced exactly once by exactly one durable id, or
/// removed on rollback; it is never itself treated as durable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommentId {
    /// Assigned by the remote system, permanent for the entity's lifetime
    Durable(String),
    /// Generated locally while the creation is in flight
    Provisional(ProvisionalId),
}

impl CommentId {
    /// Create a durable id from a remote-assigned string
    pub fn durable(id: impl Into<String>) -> Self {
        Self::Durable(id.into())
    }

    /// Create a fresh provisional id
    pub fn provisional() -> Self {
        Self::Provisional(ProvisionalId::fresh())
    }

    /// Whether this id is still provisional
    pub fn is_provisional(&self) -> bool {
        matches!(self, Self::Provisional(_))
    }

    /// The durable id string, if this id is durable
    pub fn as_durable(&self) -> Option<&str> {
        match self {
            Self::Durable(id) => Some(id),
            Self::Provisional(_) => None,
        }
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Durable(id) => write!(f, "comment-{id}"),
            Self::Provisional(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for CommentId {
    fn from(id: &str) -> Self {
        Self::Durable(id.to_string())
    }
}
