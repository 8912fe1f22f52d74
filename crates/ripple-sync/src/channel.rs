//! Push channel contract
//!
//! The persistent, server-initiated delivery stream. Implementations wrap
//! whatever transport the embedding application uses; the merger only
//! relies on this trait.

use async_trait::async_trait;
use ripple_core::UserId;
use thiserror::Error;

use crate::event::{Interest, PushEvent};

/// Failures of the push channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The connection dropped; reconnecting may recover it
    #[error("push channel disconnected: {0}")]
    Disconnected(String),

    /// The channel was closed deliberately and will deliver nothing more
    #[error("push channel closed")]
    Closed,
}

impl ChannelError {
    /// Create a disconnect error
    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self::Disconnected(reason.into())
    }
}

/// A persistent server-push event stream
///
/// Contract:
/// - `connect` declares the session identity and must complete before any
///   event for that identity is delivered; it is also how the merger
///   re-attaches after a disconnect.
/// - `subscribe`/`unsubscribe` register interest per thread or
///   conversation; subscriptions do not survive a reconnect, so the merger
///   re-registers them after each successful `connect`.
/// - `next_event` yields events in server push order and must be
///   cancel-safe: dropping the future before completion loses no event.
#[async_trait]
pub trait PushChannel: Send {
    /// Declare identity to the channel (initial connect and reconnects)
    async fn connect(&mut self, identity: &UserId) -> Result<(), ChannelError>;

    /// Register interest in a thread or conversation
    async fn subscribe(&mut self, interest: &Interest) -> Result<(), ChannelError>;

    /// Drop interest in a thread or conversation
    async fn unsubscribe(&mut self, interest: &Interest) -> Result<(), ChannelError>;

    /// Wait for the next event, in delivery order
    async fn next_event(&mut self) -> Result<PushEvent, ChannelError>;
}
