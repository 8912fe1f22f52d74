//! Remote mutation API contract
//!
//! The request/response collaborator the engine speculates against. Each
//! call returns either a confirmed entity (durable id, authoritative
//! counts) or a structured failure. Idempotency is not assumed: the engine
//! never retries automatically on ambiguous failures.

use async_trait::async_trait;
use ripple_core::{ApiError, CommentId, NotificationId, PostId};
use ripple_model::CommentRecord;
use serde::{Deserialize, Serialize};

/// Request to create a comment or reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    /// Post the comment targets
    pub post_id: PostId,
    /// Durable parent id for a reply, `None` for a root comment
    pub parent_id: Option<String>,
    /// Comment text
    pub content: String,
}

/// Acknowledgement of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementAck {
    /// Liked state after the toggle, as the server sees it
    pub liked: bool,
    /// Authoritative like count, when the server reports one
    pub likes_count: Option<u32>,
}

/// Acknowledgement of a bookmark toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkAck {
    /// Bookmarked state after the toggle, as the server sees it
    pub bookmarked: bool,
}

/// The remote mutation API
///
/// An opaque collaborator supplied by the embedding application. Responses
/// are already normalized into the fixed entity shapes of `ripple-model`.
#[async_trait]
pub trait MutationApi: Send + Sync {
    /// Create a comment or reply; returns the confirmed record
    async fn create_comment(&self, request: CreateCommentRequest)
        -> Result<CommentRecord, ApiError>;

    /// Toggle the session user's like on a post
    async fn toggle_post_like(&self, post_id: &PostId) -> Result<EngagementAck, ApiError>;

    /// Toggle the session user's like on a comment
    async fn toggle_comment_like(&self, comment_id: &CommentId)
        -> Result<EngagementAck, ApiError>;

    /// Toggle the session user's bookmark on a post
    async fn toggle_bookmark(&self, post_id: &PostId) -> Result<BookmarkAck, ApiError>;

    /// Delete an owned comment
    async fn delete_comment(&self, comment_id: &CommentId) -> Result<(), ApiError>;

    /// Mark a notification read
    async fn mark_notification_read(&self, id: &NotificationId) -> Result<(), ApiError>;
}
