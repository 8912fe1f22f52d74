//! Ripple Core - Shared Foundation Types
//!
//! This crate provides the identifier, session, and error types shared by
//! every layer of the Ripple feed engine:
//!
//! - Identifiers: `PostId`, `UserId`, `NotificationId`, `MessageId`, and the
//!   durable-vs-provisional `CommentId` space
//! - Session: `SessionContext` carrying the current user's identity and
//!   theme, passed explicitly into the engine and merger at construction
//! - Time: the `Clock` abstraction used wherever "now" is observed
//! - Errors: `ApiError`, the failure taxonomy of the remote mutation API
//!
//! # Architecture
//!
//! This is the interface layer: it has no async runtime coupling and no
//! knowledge of the entity model. Higher crates (`ripple-model`,
//! `ripple-engine`, `ripple-sync`, `ripple-app`) all depend on it.

pub mod errors;
pub mod identifiers;
pub mod session;
pub mod time;

pub use errors::ApiError;
pub use identifiers::{CommentId, MessageId, NotificationId, PostId, ProvisionalId, UserId};
pub use session::{SessionContext, Theme};
pub use time::{Clock, FixedClock, SystemClock};
