//! Application facade
//!
//! `AppCore` owns the session's model, engine, and merger. Frontends open
//! screens (which hydrate state and register push interests), issue
//! mutations, and read snapshots; everything else happens behind the
//! gateway.

use parking_lot::Mutex;
use ripple_core::{ApiError, CommentId, NotificationId, PostId, SessionContext, UserId};
use ripple_engine::{EngineConfig, EngineError, MutationApi, OptimisticEngine};
use ripple_model::{
    CommentNode, Conversation, ModelHandle, Notification, Patch, PatchError, PostState,
};
use ripple_sync::{
    EventMerger, Interest, MergerConfig, MergerHandle, PushChannel, StreamHealth, SyncError,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

use crate::fetch::FetchApi;
use crate::views::{self, ThreadNode};

/// Failures surfaced by facade operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// A fetch call failed; the screen stays unhydrated
    #[error(transparent)]
    Fetch(#[from] ApiError),

    /// An engine operation failed (rollback already applied where relevant)
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Hydration referenced state the model does not hold
    #[error("hydration failed: {0}")]
    Hydration(#[from] PatchError),
}

/// The headless application core for one session
pub struct AppCore {
    model: ModelHandle,
    engine: OptimisticEngine,
    fetch: Arc<dyn FetchApi>,
    session: SessionContext,
    sync: MergerHandle,
    sync_task: JoinHandle<Result<(), SyncError>>,
    open_threads: Mutex<HashSet<PostId>>,
    open_conversations: Mutex<HashSet<UserId>>,
}

impl AppCore {
    /// Start the core: build the model and engine, spawn the merger
    ///
    /// Must be called within a tokio runtime. Collaborators are explicit;
    /// the core reads no ambient state.
    pub fn start<C>(
        api: Arc<dyn MutationApi>,
        fetch: Arc<dyn FetchApi>,
        channel: C,
        session: SessionContext,
    ) -> Self
    where
        C: PushChannel + 'static,
    {
        Self::start_with_config(
            api,
            fetch,
            channel,
            session,
            EngineConfig::default(),
            MergerConfig::default(),
        )
    }

    /// Start the core with explicit engine and merger configuration
    pub fn start_with_config<C>(
        api: Arc<dyn MutationApi>,
        fetch: Arc<dyn FetchApi>,
        channel: C,
        session: SessionContext,
        engine_config: EngineConfig,
        merger_config: MergerConfig,
    ) -> Self
    where
        C: PushChannel + 'static,
    {
        let model = ModelHandle::new();
        let engine =
            OptimisticEngine::with_config(model.clone(), api, session.clone(), engine_config);
        let (merger, sync) = EventMerger::with_config(
            model.clone(),
            channel,
            session.user_id.clone(),
            merger_config,
        );
        let sync_task = tokio::spawn(merger.run());
        info!(user = %session.user_id, "app core started");
        Self {
            model,
            engine,
            fetch,
            session,
            sync,
            sync_task,
            open_threads: Mutex::new(HashSet::new()),
            open_conversations: Mutex::new(HashSet::new()),
        }
    }

    /// The model handle (snapshot reads)
    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// The optimistic engine
    pub fn engine(&self) -> &OptimisticEngine {
        &self.engine
    }

    /// The merger handle (health watch, manual interest control)
    pub fn sync(&self) -> &MergerHandle {
        &self.sync
    }

    /// The session context
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    // ========================================================================
    // Screen lifecycle
    // ========================================================================

    /// Open a post screen: hydrate the aggregate and its comments, then
    /// register interest in the thread
    pub async fn open_post(&self, post_id: &PostId) -> Result<(), AppError> {
        let post = self.fetch.fetch_post(post_id).await?;
        self.model.apply(Patch::HydratePost { post })?;
        let records = self.fetch.fetch_comments(post_id).await?;
        self.model.apply(Patch::HydrateComments {
            post_id: post_id.clone(),
            records,
        })?;
        self.open_threads.lock().insert(post_id.clone());
        self.sync.subscribe(Interest::Thread(post_id.clone()));
        Ok(())
    }

    /// Close a post screen: drop interest and retire pending resolutions
    pub fn close_post(&self, post_id: &PostId) {
        self.open_threads.lock().remove(post_id);
        self.sync.unsubscribe(Interest::Thread(post_id.clone()));
        self.engine.retire_screen();
    }

    /// Hydrate the notification list
    pub async fn open_notifications(&self) -> Result<(), AppError> {
        let notifications = self.fetch.fetch_notifications().await?;
        self.model
            .apply(Patch::HydrateNotifications { notifications })?;
        Ok(())
    }

    /// Open a conversation: hydrate history and register interest
    pub async fn open_conversation(&self, peer: &UserId) -> Result<(), AppError> {
        let messages = self.fetch.fetch_conversation(peer).await?;
        self.model.apply(Patch::HydrateConversation {
            peer: peer.clone(),
            messages,
        })?;
        self.open_conversations.lock().insert(peer.clone());
        self.sync.subscribe(Interest::Conversation(peer.clone()));
        Ok(())
    }

    /// Close a conversation
    pub fn close_conversation(&self, peer: &UserId) {
        self.open_conversations.lock().remove(peer);
        self.sync.unsubscribe(Interest::Conversation(peer.clone()));
    }

    /// Re-fetch everything currently open, then declare the stream live
    ///
    /// Called after the merger reports `Recovering`: pushed events may have
    /// been missed while disconnected, so state is rebuilt from the fetch
    /// API before the "may be out of date" signal clears.
    pub async fn resync(&self) -> Result<(), AppError> {
        self.open_notifications().await?;
        let threads: Vec<PostId> = self.open_threads.lock().iter().cloned().collect();
        for post_id in threads {
            let post = self.fetch.fetch_post(&post_id).await?;
            self.model.apply(Patch::HydratePost { post })?;
            let records = self.fetch.fetch_comments(&post_id).await?;
            self.model.apply(Patch::HydrateComments {
                post_id: post_id.clone(),
                records,
            })?;
        }
        let peers: Vec<UserId> = self.open_conversations.lock().iter().cloned().collect();
        for peer in peers {
            let messages = self.fetch.fetch_conversation(&peer).await?;
            self.model.apply(Patch::HydrateConversation {
                peer: peer.clone(),
                messages,
            })?;
        }
        self.sync.mark_live();
        Ok(())
    }

    /// Stop the merger and wait for it to drain
    pub async fn shutdown(self) {
        self.sync.shutdown();
        let _ = self.sync_task.await;
    }

    // ========================================================================
    // Mutations (delegated to the engine)
    // ========================================================================

    /// Post a root comment
    pub async fn comment(
        &self,
        post_id: &PostId,
        content: impl Into<String>,
    ) -> Result<CommentNode, AppError> {
        Ok(self.engine.add_root_comment(post_id, content).await?)
    }

    /// Post a reply under a comment
    pub async fn reply(
        &self,
        post_id: &PostId,
        parent_id: &CommentId,
        content: impl Into<String>,
    ) -> Result<CommentNode, AppError> {
        Ok(self.engine.add_reply(post_id, parent_id, content).await?)
    }

    /// Toggle the session user's like on a post
    pub async fn like_post(&self, post_id: &PostId) -> Result<(), AppError> {
        Ok(self.engine.toggle_post_like(post_id).await?)
    }

    /// Toggle the session user's like on a comment
    pub async fn like_comment(
        &self,
        post_id: &PostId,
        comment_id: &CommentId,
    ) -> Result<(), AppError> {
        Ok(self.engine.toggle_comment_like(post_id, comment_id).await?)
    }

    /// Toggle the session user's bookmark on a post
    pub async fn bookmark_post(&self, post_id: &PostId) -> Result<(), AppError> {
        Ok(self.engine.toggle_bookmark(post_id).await?)
    }

    /// Delete an owned comment
    pub async fn delete_comment(
        &self,
        post_id: &PostId,
        comment_id: &CommentId,
    ) -> Result<(), AppError> {
        Ok(self.engine.delete_comment(post_id, comment_id).await?)
    }

    /// Mark a notification read
    pub async fn mark_notification_read(&self, id: &NotificationId) -> Result<(), AppError> {
        Ok(self.engine.mark_notification_read(id).await?)
    }

    // ========================================================================
    // Reads and projections
    // ========================================================================

    /// Snapshot a post aggregate
    pub fn post(&self, post_id: &PostId) -> Option<PostState> {
        self.model.post(post_id)
    }

    /// Project a post's comment thread for display
    pub fn thread(&self, post_id: &PostId) -> Vec<ThreadNode> {
        self.model
            .comment_forest(post_id)
            .map(|forest| views::thread_view(&forest))
            .unwrap_or_default()
    }

    /// Snapshot the notification list, newest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.model.notifications()
    }

    /// Count of unseen notifications
    pub fn unread_count(&self) -> usize {
        views::unread_count(&self.model.notifications())
    }

    /// The newest few unseen notifications for the dropdown preview
    pub fn latest_unread(&self) -> Vec<Notification> {
        views::latest_unread(&self.model.notifications(), views::LATEST_UNREAD_LIMIT)
    }

    /// Snapshot the conversation with a peer
    pub fn conversation(&self, peer: &UserId) -> Option<Conversation> {
        self.model.conversation(peer)
    }

    /// Current push stream freshness
    pub fn stream_health(&self) -> StreamHealth {
        self.sync.health()
    }
}
