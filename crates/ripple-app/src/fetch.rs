//! Bulk fetch API contract
//!
//! The paginated request/response collaborator used for screen-open
//! hydration and resynchronizing fetches after a reconnect. Each call
//! returns an ordered batch; pagination cursors live with the embedding
//! application, the core only ingests what it is handed.

use async_trait::async_trait;
use ripple_core::{ApiError, PostId, UserId};
use ripple_model::{ChatMessage, CommentRecord, Notification, PostState};

/// The remote fetch API
#[async_trait]
pub trait FetchApi: Send + Sync {
    /// Fetch a post aggregate
    async fn fetch_post(&self, post_id: &PostId) -> Result<PostState, ApiError>;

    /// Fetch a post's comments as an ordered batch (parents before children)
    async fn fetch_comments(&self, post_id: &PostId) -> Result<Vec<CommentRecord>, ApiError>;

    /// Fetch the session user's notifications, newest first
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ApiError>;

    /// Fetch the message history with a peer, oldest first
    async fn fetch_conversation(&self, peer: &UserId) -> Result<Vec<ChatMessage>, ApiError>;
}
