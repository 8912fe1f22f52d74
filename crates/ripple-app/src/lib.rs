//! Ripple App - Portable Headless Application Core
//!
//! Wires the entity model, the optimistic mutation engine, and the
//! real-time event merger into one facade a frontend can drive. The core
//! is headless: frontends call operations and read snapshots/projections;
//! no view framework types appear anywhere in this crate.
//!
//! # Architecture
//!
//! ```text
//! user action ─▶ OptimisticEngine ─┐
//!                                  ├─▶ ModelHandle::apply ─▶ FeedModel
//! push event  ─▶ EventMerger ──────┘            │
//!                                               ▼
//!                                   views (pure projections)
//! ```
//!
//! Collaborators (mutation API, fetch API, push channel, session identity)
//! are supplied at construction; the core never reads ambient globals.

pub mod app;
pub mod fetch;
pub mod views;

pub use app::{AppCore, AppError};
pub use fetch::FetchApi;

// Re-export the layer types frontends need alongside the facade.
pub use ripple_core::{
    ApiError, CommentId, MessageId, NotificationId, PostId, ProvisionalId, SessionContext, Theme,
    UserId,
};
pub use ripple_engine::{EngineConfig, EngineError, MutationApi, OptimisticEngine};
pub use ripple_model::{
    Author, ChatMessage, CommentForest, CommentNode, CommentRecord, Conversation, ModelHandle,
    Notification, NotificationKind, NotificationRef, PostState,
};
pub use ripple_sync::{
    Interest, MergerConfig, MergerHandle, PushChannel, PushEvent, RetryConfig, StreamHealth,
    SyncError,
};
