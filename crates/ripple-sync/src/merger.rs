//! The event merger
//!
//! Single consumer loop over the push channel. Every event becomes a patch
//! on the shared model gateway, so pushed entities and optimistic
//! speculation can never interleave mid-application.

use ripple_core::UserId;
use ripple_model::{ModelHandle, Patch, PatchError, PatchOutcome};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::channel::{ChannelError, PushChannel};
use crate::event::{Interest, PushEvent};
use crate::retry::RetryConfig;

/// Freshness of the merged event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamHealth {
    /// Connected; events are flowing
    Live,
    /// Disconnected; displayed state may be out of date
    Stale,
    /// Reconnected; awaiting a resynchronizing fetch before going live
    Recovering,
    /// Reconnect attempts exhausted; manual refresh remains available
    Exhausted,
    /// Closed deliberately; no further events will arrive
    Closed,
}

impl StreamHealth {
    /// Whether displayed state should carry a "may be out of date" signal
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Merger failure modes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Reconnect retries were exhausted; the stream degrades to manual
    /// refresh, this is reported but not fatal to the application
    #[error("push channel reconnect exhausted after {attempts} attempts")]
    RetriesExhausted {
        /// Connect attempts made
        attempts: u32,
    },
}

/// Merger tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergerConfig {
    /// Reconnect backoff policy
    pub reconnect: RetryConfig,
    /// Delay before retrying deferred (out-of-order) events, milliseconds
    pub defer_retry_ms: u64,
    /// Deferrals per event before it is dropped and logged
    pub defer_limit: u32,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            reconnect: RetryConfig::default(),
            defer_retry_ms: 250,
            defer_limit: 5,
        }
    }
}

/// Commands the embedding application sends the running merger
#[derive(Debug)]
enum MergerCommand {
    Subscribe(Interest),
    Unsubscribe(Interest),
    MarkLive,
    Shutdown,
}

/// Handle for steering a running merger
#[derive(Debug, Clone)]
pub struct MergerHandle {
    commands: mpsc::UnboundedSender<MergerCommand>,
    health: watch::Receiver<StreamHealth>,
}

impl MergerHandle {
    /// Register interest in a thread or conversation
    pub fn subscribe(&self, interest: Interest) {
        let _ = self.commands.send(MergerCommand::Subscribe(interest));
    }

    /// Drop interest in a thread or conversation
    pub fn unsubscribe(&self, interest: Interest) {
        let _ = self.commands.send(MergerCommand::Unsubscribe(interest));
    }

    /// Declare the resynchronizing fetch complete; the stream goes live
    pub fn mark_live(&self) {
        let _ = self.commands.send(MergerCommand::MarkLive);
    }

    /// Stop the merger loop
    pub fn shutdown(&self) {
        let _ = self.commands.send(MergerCommand::Shutdown);
    }

    /// Current stream freshness
    pub fn health(&self) -> StreamHealth {
        *self.health.borrow()
    }

    /// Watch stream freshness changes
    pub fn health_watch(&self) -> watch::Receiver<StreamHealth> {
        self.health.clone()
    }
}

/// A pushed event waiting for the entity it references to arrive
#[derive(Debug)]
struct Deferred {
    event: PushEvent,
    attempts: u32,
}

enum Step {
    Command(Option<MergerCommand>),
    Event(Result<PushEvent, ChannelError>),
    FlushDeferred,
}

/// The real-time event merger
///
/// Owns the push channel for its whole lifecycle and routes every received
/// event through the model's patch gateway.
pub struct EventMerger<C: PushChannel> {
    model: ModelHandle,
    channel: C,
    identity: UserId,
    config: MergerConfig,
    interests: HashSet<Interest>,
    deferred: VecDeque<Deferred>,
    health_tx: watch::Sender<StreamHealth>,
    commands: mpsc::UnboundedReceiver<MergerCommand>,
}

impl<C: PushChannel> EventMerger<C> {
    /// Create a merger and the handle used to steer it
    pub fn new(model: ModelHandle, channel: C, identity: UserId) -> (Self, MergerHandle) {
        Self::with_config(model, channel, identity, MergerConfig::default())
    }

    /// Create a merger with explicit configuration
    pub fn with_config(
        model: ModelHandle,
        channel: C,
        identity: UserId,
        config: MergerConfig,
    ) -> (Self, MergerHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (health_tx, health_rx) = watch::channel(StreamHealth::Stale);
        let merger = Self {
            model,
            channel,
            identity,
            config,
            interests: HashSet::new(),
            deferred: VecDeque::new(),
            health_tx,
            commands: command_rx,
        };
        let handle = MergerHandle {
            commands: command_tx,
            health: health_rx,
        };
        (merger, handle)
    }

    /// Drive the merger until the channel closes, shutdown is requested, or
    /// reconnect retries are exhausted
    pub async fn run(mut self) -> Result<(), SyncError> {
        if !self.establish().await? {
            return Ok(());
        }
        self.set_health(StreamHealth::Live);

        loop {
            let step = tokio::select! {
                biased;
                command = self.commands.recv() => Step::Command(command),
                event = self.channel.next_event() => Step::Event(event),
                () = tokio::time::sleep(Duration::from_millis(self.config.defer_retry_ms)),
                    if !self.deferred.is_empty() => Step::FlushDeferred,
            };

            match step {
                Step::Command(None | Some(MergerCommand::Shutdown)) => {
                    info!("event merger shutting down");
                    self.set_health(StreamHealth::Closed);
                    return Ok(());
                }
                Step::Command(Some(MergerCommand::Subscribe(interest))) => {
                    if self.interests.insert(interest.clone()) {
                        let _ = self.channel.subscribe(&interest).await;
                    }
                }
                Step::Command(Some(MergerCommand::Unsubscribe(interest))) => {
                    if self.interests.remove(&interest) {
                        let _ = self.channel.unsubscribe(&interest).await;
                    }
                }
                Step::Command(Some(MergerCommand::MarkLive)) => {
                    self.set_health(StreamHealth::Live);
                }
                Step::Event(Ok(event)) => self.ingest(event),
                Step::Event(Err(ChannelError::Closed)) => {
                    info!("push channel closed");
                    self.set_health(StreamHealth::Closed);
                    return Ok(());
                }
                Step::Event(Err(ChannelError::Disconnected(reason))) => {
                    warn!(reason = %reason, "push channel disconnected");
                    self.set_health(StreamHealth::Stale);
                    if !self.establish().await? {
                        return Ok(());
                    }
                    // Stale until the application's resynchronizing fetch
                    // lands and calls `mark_live`.
                    self.set_health(StreamHealth::Recovering);
                }
                Step::FlushDeferred => self.flush_deferred(),
            }
        }
    }

    /// Connect (or reconnect) with bounded backoff, then re-declare every
    /// active interest
    ///
    /// Returns `false` when the channel was closed deliberately.
    async fn establish(&mut self) -> Result<bool, SyncError> {
        let mut attempt = 1u32;
        loop {
            match self.channel.connect(&self.identity).await {
                Ok(()) => {
                    debug!(identity = %self.identity, attempt, "push channel connected");
                    for interest in &self.interests {
                        let _ = self.channel.subscribe(interest).await;
                    }
                    return Ok(true);
                }
                Err(ChannelError::Closed) => {
                    info!("push channel closed during connect");
                    self.set_health(StreamHealth::Closed);
                    // A deliberate close is not a failure.
                    return Ok(false);
                }
                Err(ChannelError::Disconnected(reason)) => {
                    if attempt >= self.config.reconnect.max_attempts {
                        error!(
                            attempts = attempt,
                            reason = %reason,
                            "push channel reconnect exhausted"
                        );
                        self.set_health(StreamHealth::Exhausted);
                        return Err(SyncError::RetriesExhausted { attempts: attempt });
                    }
                    let delay = self.config.reconnect.backoff_delay(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "push channel connect failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn ingest(&mut self, event: PushEvent) {
        match self.apply_event(&event) {
            Ok(outcome) => {
                debug!(event = event.label(), ?outcome, "push event applied");
                // Something new landed; deferred events may resolve now.
                if outcome.changed() && !self.deferred.is_empty() {
                    self.flush_deferred();
                }
            }
            Err(err) => {
                debug!(event = event.label(), %err, "push event references unknown entity, deferring");
                self.deferred.push_back(Deferred { event, attempts: 0 });
            }
        }
    }

    fn apply_event(&self, event: &PushEvent) -> Result<PatchOutcome, PatchError> {
        let patch = match event.clone() {
            PushEvent::NotificationCreated { notification } => {
                Patch::InsertNotification { notification }
            }
            PushEvent::MessageCreated { peer, message } => Patch::InsertMessage { peer, message },
            PushEvent::MessageRead { peer, message_id } => Patch::MarkMessageRead {
                peer,
                id: message_id,
            },
            PushEvent::CommentCreated { record } => Patch::InsertComment {
                post_id: record.post_id.clone(),
                node: record.into_node(),
            },
        };
        self.model.apply(patch)
    }

    fn flush_deferred(&mut self) {
        let mut requeue = VecDeque::new();
        while let Some(mut deferred) = self.deferred.pop_front() {
            match self.apply_event(&deferred.event) {
                Ok(outcome) => {
                    debug!(event = deferred.event.label(), ?outcome, "deferred event applied");
                }
                Err(err) => {
                    deferred.attempts += 1;
                    if deferred.attempts >= self.config.defer_limit {
                        warn!(
                            event = deferred.event.label(),
                            attempts = deferred.attempts,
                            %err,
                            "dropping push event after repeated unknown references"
                        );
                    } else {
                        requeue.push_back(deferred);
                    }
                }
            }
        }
        self.deferred = requeue;
    }

    fn set_health(&self, health: StreamHealth) {
        let _ = self.health_tx.send(health);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use ripple_core::{MessageId, NotificationId, PostId};
    use ripple_model::{
        ChatMessage, Notification, NotificationKind, NotificationRef, PostState,
    };
    use std::sync::Arc;

    fn notification(id: &str) -> Notification {
        Notification {
            id: NotificationId::new(id),
            kind: NotificationKind::Comment,
            seen: false,
            created_at: 1,
            payload: NotificationRef::Post(PostId::new("p1")),
        }
    }

    fn message(id: &str, sender: &str) -> ChatMessage {
        ChatMessage {
            id: MessageId::new(id),
            sender_id: UserId::new(sender),
            content: "hi".to_string(),
            created_at: 1,
            read: false,
        }
    }

    /// Shared, inspectable state for the scripted channel.
    #[derive(Default)]
    struct ChannelState {
        events: VecDeque<Result<PushEvent, ChannelError>>,
        failing_connects: u32,
        connects: u32,
        subscriptions: Vec<Interest>,
        connected: bool,
        hang_when_drained: bool,
    }

    #[derive(Clone, Default)]
    struct ScriptChannel {
        state: Arc<Mutex<ChannelState>>,
    }

    impl ScriptChannel {
        fn with_events(events: Vec<Result<PushEvent, ChannelError>>) -> Self {
            let channel = Self::default();
            channel.state.lock().events = events.into();
            channel
        }
    }

    #[async_trait]
    impl PushChannel for ScriptChannel {
        async fn connect(&mut self, _identity: &UserId) -> Result<(), ChannelError> {
            let mut state = self.state.lock();
            state.connects += 1;
            if state.failing_connects > 0 {
                state.failing_connects -= 1;
                return Err(ChannelError::disconnected("connect refused"));
            }
            state.connected = true;
            Ok(())
        }

        async fn subscribe(&mut self, interest: &Interest) -> Result<(), ChannelError> {
            self.state.lock().subscriptions.push(interest.clone());
            Ok(())
        }

        async fn unsubscribe(&mut self, interest: &Interest) -> Result<(), ChannelError> {
            self.state.lock().subscriptions.retain(|i| i != interest);
            Ok(())
        }

        async fn next_event(&mut self) -> Result<PushEvent, ChannelError> {
            let (event, hang) = {
                let mut state = self.state.lock();
                assert!(state.connected, "events before identity declared");
                (state.events.pop_front(), state.hang_when_drained)
            };
            match event {
                Some(Err(ChannelError::Disconnected(reason))) => {
                    self.state.lock().connected = false;
                    Err(ChannelError::Disconnected(reason))
                }
                Some(result) => result,
                None if hang => std::future::pending().await,
                None => Err(ChannelError::Closed),
            }
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_events_apply_in_delivery_order() {
        let model = ModelHandle::new();
        let channel = ScriptChannel::with_events(vec![
            Ok(PushEvent::NotificationCreated {
                notification: notification("n1"),
            }),
            Ok(PushEvent::NotificationCreated {
                notification: notification("n2"),
            }),
        ]);
        let (merger, _handle) = EventMerger::new(model.clone(), channel, UserId::new("u1"));

        merger.run().await.unwrap();

        let ids: Vec<_> = model
            .notifications()
            .iter()
            .map(|n| n.id.as_str().to_string())
            .collect();
        // Pushed notifications prepend: newest first.
        assert_eq!(ids, vec!["n2", "n1"]);
    }

    #[tokio::test]
    async fn test_read_before_create_is_buffered_then_applied() {
        let model = ModelHandle::new();
        let channel = ScriptChannel::with_events(vec![
            // Read marker arrives before the message it refers to.
            Ok(PushEvent::MessageRead {
                peer: UserId::new("u2"),
                message_id: MessageId::new("m1"),
            }),
            Ok(PushEvent::MessageCreated {
                peer: UserId::new("u2"),
                message: message("m1", "u2"),
            }),
        ]);
        let (merger, _handle) = EventMerger::new(model.clone(), channel, UserId::new("u1"));

        merger.run().await.unwrap();

        let conversation = model.conversation(&UserId::new("u2")).unwrap();
        assert_eq!(conversation.messages.len(), 1);
        assert!(conversation.messages[0].read);
    }

    #[tokio::test]
    async fn test_unresolvable_event_is_dropped_after_bounded_retries() {
        let model = ModelHandle::new();
        let channel = ScriptChannel::with_events(vec![
            Ok(PushEvent::MessageRead {
                peer: UserId::new("u2"),
                message_id: MessageId::new("ghost"),
            }),
            Ok(PushEvent::NotificationCreated {
                notification: notification("n1"),
            }),
            Ok(PushEvent::NotificationCreated {
                notification: notification("n2"),
            }),
            Ok(PushEvent::NotificationCreated {
                notification: notification("n3"),
            }),
        ]);
        let (merger, _handle) = EventMerger::with_config(
            model.clone(),
            channel,
            UserId::new("u1"),
            MergerConfig {
                defer_limit: 2,
                ..MergerConfig::default()
            },
        );

        merger.run().await.unwrap();

        // The ghost read marker was dropped, never guessed into state.
        assert!(model.conversation(&UserId::new("u2")).is_none());
        assert_eq!(model.notifications().len(), 3);
    }

    #[tokio::test]
    async fn test_comment_push_lands_in_forest() {
        use ripple_model::{Author, CommentRecord, Patch};
        let model = ModelHandle::new();
        model
            .apply(Patch::HydratePost {
                post: PostState::new(PostId::new("p1")),
            })
            .unwrap();

        let record = CommentRecord {
            id: "c1".to_string(),
            post_id: PostId::new("p1"),
            parent_id: None,
            content: "from another user".to_string(),
            author: Author {
                id: UserId::new("u9"),
                display_name: "Bo".to_string(),
                username: "bo".to_string(),
                avatar: None,
            },
            created_at: 5,
            likes_count: 0,
            is_liked: false,
        };
        let channel =
            ScriptChannel::with_events(vec![Ok(PushEvent::CommentCreated { record })]);
        let (merger, _handle) = EventMerger::new(model.clone(), channel, UserId::new("u1"));

        merger.run().await.unwrap();

        assert_eq!(model.post(&PostId::new("p1")).unwrap().comments_count, 1);
        let forest = model.comment_forest(&PostId::new("p1")).unwrap();
        assert_eq!(forest.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_redeclares_identity_and_interests() {
        let model = ModelHandle::new();
        let channel = ScriptChannel::with_events(vec![
            Ok(PushEvent::NotificationCreated {
                notification: notification("n1"),
            }),
            Err(ChannelError::disconnected("tcp reset")),
            Ok(PushEvent::NotificationCreated {
                notification: notification("n2"),
            }),
        ]);
        let state = Arc::clone(&channel.state);
        let (merger, handle) = EventMerger::new(model.clone(), channel, UserId::new("u1"));
        handle.subscribe(Interest::Thread(PostId::new("p1")));

        merger.run().await.unwrap();

        assert_eq!(model.notifications().len(), 2);
        let state = state.lock();
        // Initial connect plus one reconnect.
        assert_eq!(state.connects, 2);
        // The interest was re-declared after the reconnect.
        assert_eq!(
            state.subscriptions,
            vec![
                Interest::Thread(PostId::new("p1")),
                Interest::Thread(PostId::new("p1"))
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_exhaustion_is_reported_not_fatal() {
        let model = ModelHandle::new();
        let channel = ScriptChannel::default();
        channel.state.lock().failing_connects = 10;
        let (merger, handle) = EventMerger::with_config(
            model,
            channel,
            UserId::new("u1"),
            MergerConfig {
                reconnect: RetryConfig {
                    max_attempts: 3,
                    base_delay_ms: 10,
                    max_delay_ms: 100,
                    backoff_multiplier: 2.0,
                },
                ..MergerConfig::default()
            },
        );

        let result = merger.run().await;
        assert_matches!(result, Err(SyncError::RetriesExhausted { attempts: 3 }));
        assert_eq!(handle.health(), StreamHealth::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_goes_stale_then_recovering_then_live() {
        let model = ModelHandle::new();
        let channel = ScriptChannel::with_events(vec![Err(ChannelError::disconnected("blip"))]);
        channel.state.lock().hang_when_drained = true;
        let (merger, handle) = EventMerger::new(model, channel, UserId::new("u1"));

        let mut health = handle.health_watch();
        let task = tokio::spawn(merger.run());

        // Wait for the reconnect cycle to settle in Recovering.
        while *health.borrow() != StreamHealth::Recovering {
            health.changed().await.unwrap();
        }

        // The application resynchronized; declare the stream live again.
        handle.mark_live();
        while *health.borrow() != StreamHealth::Live {
            health.changed().await.unwrap();
        }

        handle.shutdown();
        task.await.unwrap().unwrap();
        assert_eq!(handle.health(), StreamHealth::Closed);
    }

    #[tokio::test]
    async fn test_subscribe_and_unsubscribe_reach_the_channel() {
        let model = ModelHandle::new();
        let channel = ScriptChannel::default();
        channel.state.lock().hang_when_drained = true;
        let state = Arc::clone(&channel.state);
        let (merger, handle) = EventMerger::new(model, channel, UserId::new("u1"));

        let task = tokio::spawn(merger.run());
        handle.subscribe(Interest::Conversation(UserId::new("u2")));
        settle().await;
        assert_eq!(
            state.lock().subscriptions,
            vec![Interest::Conversation(UserId::new("u2"))]
        );

        handle.unsubscribe(Interest::Conversation(UserId::new("u2")));
        settle().await;
        assert!(state.lock().subscriptions.is_empty());

        handle.shutdown();
        task.await.unwrap().unwrap();
    }
}
