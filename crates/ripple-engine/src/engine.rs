//! The optimistic engine
//!
//! Speculate/confirm/rollback for comment creation, and the engagement
//! specialization for likes and bookmarks. All state changes go through the
//! model gateway; the engine owns only the in-flight bookkeeping (toggle
//! lanes and the screen epoch).

use ripple_core::{ApiError, Clock, CommentId, NotificationId, PostId, SessionContext, SystemClock};
use ripple_model::{
    Author, CommentNode, EngagementTarget, ModelHandle, Patch, PatchOutcome,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{CreateCommentRequest, EngagementAck, MutationApi};
use crate::lanes::{Lane, LaneKey, LaneMap};

/// Engine tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long to wait for a confirm before firing rollback, milliseconds
    pub confirm_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confirm_timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    /// Confirm timeout as a `Duration`
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }
}

/// Failures surfaced by engine operations
///
/// `RolledBack` means a speculation was applied and then reversed; the
/// model is already consistent when the error is returned. `Remote` means
/// a confirm-then-apply operation failed before touching the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The post is not hydrated into the model
    #[error("post {0} is not hydrated")]
    UnknownPost(PostId),

    /// The comment is not present in the post's forest
    #[error("comment {0} not found")]
    UnknownComment(CommentId),

    /// The target is still awaiting its own confirmation
    #[error("comment {0} is still awaiting confirmation")]
    StillPending(CommentId),

    /// The speculation was rolled back after a remote failure
    #[error("rolled back: {source}")]
    RolledBack {
        /// The remote failure that triggered the rollback
        source: ApiError,
    },

    /// A confirm-then-apply operation failed remotely; nothing was applied
    #[error("remote operation failed: {0}")]
    Remote(#[from] ApiError),

    /// The screen was retired while the operation was in flight
    #[error("screen no longer displayed")]
    ScreenRetired,
}

/// The optimistic mutation engine
///
/// One instance per session. Holds the model handle, the remote API, and
/// the session identity used to author provisional entities. Operations
/// apply their speculative patch synchronously before the first await
/// point, so the caller never observes the pre-speculation state after an
/// operation starts.
pub struct OptimisticEngine {
    model: ModelHandle,
    api: Arc<dyn MutationApi>,
    session: SessionContext,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    lanes: LaneMap,
    screen: AtomicU64,
}

impl OptimisticEngine {
    /// Create an engine with default configuration and the system clock
    pub fn new(model: ModelHandle, api: Arc<dyn MutationApi>, session: SessionContext) -> Self {
        Self::with_config(model, api, session, EngineConfig::default())
    }

    /// Create an engine with explicit configuration
    pub fn with_config(
        model: ModelHandle,
        api: Arc<dyn MutationApi>,
        session: SessionContext,
        config: EngineConfig,
    ) -> Self {
        Self {
            model,
            api,
            session,
            clock: Arc::new(SystemClock),
            config,
            lanes: LaneMap::default(),
            screen: AtomicU64::new(0),
        }
    }

    /// Replace the clock (tests pin time with this)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The model handle this engine mutates through
    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// The session identity this engine authors entities as
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Retire the current screen
    ///
    /// Pending operations keep their network requests running but apply no
    /// further patches once they resolve; they return `ScreenRetired`.
    pub fn retire_screen(&self) {
        self.screen.fetch_add(1, Ordering::SeqCst);
    }

    fn screen_epoch(&self) -> u64 {
        self.screen.load(Ordering::SeqCst)
    }

    async fn with_timeout<T>(
        &self,
        call: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        match tokio::time::timeout(self.config.confirm_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout),
        }
    }

    // ========================================================================
    // Comment creation (speculate → await → replace | remove)
    // ========================================================================

    /// Create a root comment under a post
    ///
    /// The provisional node appears at the tail of the post's root list and
    /// `comments_count` is bumped before this function first suspends.
    pub async fn add_root_comment(
        &self,
        post_id: &PostId,
        content: impl Into<String>,
    ) -> Result<CommentNode, EngineError> {
        self.create_comment(post_id, None, content.into()).await
    }

    /// Create a reply under an existing comment, at any depth
    pub async fn add_reply(
        &self,
        post_id: &PostId,
        parent_id: &CommentId,
        content: impl Into<String>,
    ) -> Result<CommentNode, EngineError> {
        self.create_comment(post_id, Some(parent_id.clone()), content.into())
            .await
    }

    async fn create_comment(
        &self,
        post_id: &PostId,
        parent_id: Option<CommentId>,
        content: String,
    ) -> Result<CommentNode, EngineError> {
        let parent_durable = match &parent_id {
            Some(parent) => match parent.as_durable() {
                Some(durable) => Some(durable.to_string()),
                // The remote system cannot address an unconfirmed parent.
                None => return Err(EngineError::StillPending(parent.clone())),
            },
            None => None,
        };

        let epoch = self.screen_epoch();
        let provisional_id = CommentId::provisional();
        let node = CommentNode {
            id: provisional_id.clone(),
            content: content.clone(),
            author: Author::from(&self.session),
            created_at: self.clock.now_ms(),
            parent_id: parent_id.clone(),
            likes_count: 0,
            is_liked: false,
            reply_ids: Vec::new(),
        };

        // Phase 1: provisional node and count delta land synchronously.
        self.model
            .apply(Patch::InsertComment {
                post_id: post_id.clone(),
                node,
            })
            .map_err(|err| match err.entity {
                "post" => EngineError::UnknownPost(post_id.clone()),
                _ => match &parent_id {
                    Some(parent) => EngineError::UnknownComment(parent.clone()),
                    None => EngineError::UnknownPost(post_id.clone()),
                },
            })?;
        debug!(post = %post_id, provisional = %provisional_id, "comment speculated");

        // Phase 2
        let result = self
            .with_timeout(self.api.create_comment(CreateCommentRequest {
                post_id: post_id.clone(),
                parent_id: parent_durable,
                content,
            }))
            .await;

        if self.screen_epoch() != epoch {
            debug!(provisional = %provisional_id, "screen retired, dropping comment resolution");
            return Err(EngineError::ScreenRetired);
        }

        match result {
            Ok(record) => {
                let confirmed = record.into_node();
                let confirmed_id = confirmed.id.clone();
                let outcome = self
                    .model
                    .apply(Patch::ReplaceComment {
                        post_id: post_id.clone(),
                        id: provisional_id.clone(),
                        node: confirmed.clone(),
                    })
                    .unwrap_or(PatchOutcome::Noop(ripple_model::NoopReason::AlreadyResolved));
                debug!(provisional = %provisional_id, durable = %confirmed_id, ?outcome, "comment confirmed");
                // Read back so adopted children are visible to the caller.
                let node = self.model.read(|m| {
                    m.comment_forest(post_id)
                        .and_then(|forest| forest.get(&confirmed_id).cloned())
                });
                Ok(node.unwrap_or(confirmed))
            }
            Err(err) => {
                warn!(provisional = %provisional_id, error = %err, "comment creation failed, rolling back");
                let _ = self.model.apply(Patch::RemoveComment {
                    post_id: post_id.clone(),
                    id: provisional_id,
                });
                Err(EngineError::RolledBack { source: err })
            }
        }
    }

    // ========================================================================
    // Engagement toggles (flag + counter, per-entity serialization)
    // ========================================================================

    /// Toggle the session user's like on a post
    pub async fn toggle_post_like(&self, post_id: &PostId) -> Result<(), EngineError> {
        self.run_like_toggle(
            LaneKey::PostLike(post_id.clone()),
            EngagementTarget::Post(post_id.clone()),
        )
        .await
    }

    /// Toggle the session user's like on a comment, at any depth
    pub async fn toggle_comment_like(
        &self,
        post_id: &PostId,
        comment_id: &CommentId,
    ) -> Result<(), EngineError> {
        if comment_id.is_provisional() {
            return Err(EngineError::StillPending(comment_id.clone()));
        }
        self.run_like_toggle(
            LaneKey::CommentLike(comment_id.clone()),
            EngagementTarget::Comment {
                post_id: post_id.clone(),
                comment_id: comment_id.clone(),
            },
        )
        .await
    }

    async fn run_like_toggle(
        &self,
        lane_key: LaneKey,
        target: EngagementTarget,
    ) -> Result<(), EngineError> {
        let epoch = self.screen_epoch();
        let lane = self.lanes.lane(&lane_key);

        // Phase 1: flip and count delta land atomically, serialized with
        // other toggles' bookkeeping through the lane's pending lock.
        let delta = {
            let mut pending = lane.pending.lock();
            let is_liked = self
                .current_liked(&target)
                .ok_or_else(|| Self::unknown_target(&target))?;
            let delta: i32 = if is_liked { -1 } else { 1 };
            self.model
                .apply(Patch::SetEngagement {
                    target: target.clone(),
                    is_liked: !is_liked,
                    likes_delta: delta,
                })
                .map_err(|_| Self::unknown_target(&target))?;
            *pending += i64::from(delta);
            delta
        };

        // Phase 2: one call per entity at a time, in initiation order.
        let _serial = lane.serial.lock().await;
        let result = match &target {
            EngagementTarget::Post(id) => self.with_timeout(self.api.toggle_post_like(id)).await,
            EngagementTarget::Comment { comment_id, .. } => {
                self.with_timeout(self.api.toggle_comment_like(comment_id))
                    .await
            }
        };

        // Phase 3, under the pending lock so later toggles' speculation
        // cannot slip between the adjustment and the patch.
        self.resolve_toggle(&lane, &target, delta, epoch, result)
    }

    fn resolve_toggle(
        &self,
        lane: &Lane,
        target: &EngagementTarget,
        delta: i32,
        epoch: u64,
        result: Result<EngagementAck, ApiError>,
    ) -> Result<(), EngineError> {
        let mut pending = lane.pending.lock();
        *pending -= i64::from(delta);
        let remaining = *pending;

        if self.screen_epoch() != epoch {
            debug!("screen retired, dropping toggle resolution");
            return Err(EngineError::ScreenRetired);
        }

        match result {
            Ok(ack) => {
                // Adopt the authoritative count, shifted by toggles that were
                // speculated after this one; adopt the flag only once no
                // later toggle is pending.
                let likes_count = ack.likes_count.map(|count| {
                    let adjusted = i64::from(count) + remaining;
                    adjusted.max(0) as u32
                });
                let is_liked = (remaining == 0).then_some(ack.liked);
                if likes_count.is_some() || is_liked.is_some() {
                    let _ = self.model.apply(Patch::ReconcileEngagement {
                        target: target.clone(),
                        likes_count,
                        is_liked,
                    });
                }
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "toggle failed, rolling back");
                if let Some(is_liked) = self.current_liked(target) {
                    let _ = self.model.apply(Patch::SetEngagement {
                        target: target.clone(),
                        is_liked: !is_liked,
                        likes_delta: -delta,
                    });
                }
                Err(EngineError::RolledBack { source: err })
            }
        }
    }

    fn current_liked(&self, target: &EngagementTarget) -> Option<bool> {
        self.model.read(|model| match target {
            EngagementTarget::Post(id) => model.post(id).map(|p| p.is_liked),
            EngagementTarget::Comment {
                post_id,
                comment_id,
            } => model
                .comment_forest(post_id)
                .and_then(|forest| forest.get(comment_id))
                .map(|node| node.is_liked),
        })
    }

    fn unknown_target(target: &EngagementTarget) -> EngineError {
        match target {
            EngagementTarget::Post(id) => EngineError::UnknownPost(id.clone()),
            EngagementTarget::Comment { comment_id, .. } => {
                EngineError::UnknownComment(comment_id.clone())
            }
        }
    }

    /// Toggle the session user's bookmark on a post
    ///
    /// The flag-only engagement variant: no count travels with it.
    pub async fn toggle_bookmark(&self, post_id: &PostId) -> Result<(), EngineError> {
        let epoch = self.screen_epoch();
        let lane = self.lanes.lane(&LaneKey::Bookmark(post_id.clone()));

        let flipped = {
            let _pending = lane.pending.lock();
            let bookmarked = self
                .model
                .read(|m| m.post(post_id).map(|p| p.is_bookmarked))
                .ok_or_else(|| EngineError::UnknownPost(post_id.clone()))?;
            self.model
                .apply(Patch::SetBookmarked {
                    post_id: post_id.clone(),
                    bookmarked: !bookmarked,
                })
                .map_err(|_| EngineError::UnknownPost(post_id.clone()))?;
            !bookmarked
        };
        debug!(post = %post_id, bookmarked = flipped, "bookmark speculated");

        let _serial = lane.serial.lock().await;
        let result = self.with_timeout(self.api.toggle_bookmark(post_id)).await;

        if self.screen_epoch() != epoch {
            debug!("screen retired, dropping bookmark resolution");
            return Err(EngineError::ScreenRetired);
        }

        match result {
            Ok(_ack) => Ok(()),
            Err(err) => {
                warn!(post = %post_id, error = %err, "bookmark toggle failed, rolling back");
                let _pending = lane.pending.lock();
                if let Some(bookmarked) = self.model.read(|m| m.post(post_id).map(|p| p.is_bookmarked))
                {
                    let _ = self.model.apply(Patch::SetBookmarked {
                        post_id: post_id.clone(),
                        bookmarked: !bookmarked,
                    });
                }
                Err(EngineError::RolledBack { source: err })
            }
        }
    }

    // ========================================================================
    // Confirm-then-apply operations
    // ========================================================================

    /// Delete an owned comment (and its subtree)
    ///
    /// Applied only after the remote system confirms: `seen`-style
    /// one-directional effects and destructive removals are not speculated.
    pub async fn delete_comment(
        &self,
        post_id: &PostId,
        comment_id: &CommentId,
    ) -> Result<(), EngineError> {
        if comment_id.is_provisional() {
            return Err(EngineError::StillPending(comment_id.clone()));
        }
        let epoch = self.screen_epoch();
        self.with_timeout(self.api.delete_comment(comment_id))
            .await?;
        if self.screen_epoch() != epoch {
            return Err(EngineError::ScreenRetired);
        }
        let _ = self.model.apply(Patch::RemoveComment {
            post_id: post_id.clone(),
            id: comment_id.clone(),
        });
        Ok(())
    }

    /// Mark a notification read
    pub async fn mark_notification_read(&self, id: &NotificationId) -> Result<(), EngineError> {
        let epoch = self.screen_epoch();
        self.with_timeout(self.api.mark_notification_read(id))
            .await?;
        if self.screen_epoch() != epoch {
            return Err(EngineError::ScreenRetired);
        }
        let _ = self.model.apply(Patch::MarkNotificationSeen { id: id.clone() });
        Ok(())
    }
}
