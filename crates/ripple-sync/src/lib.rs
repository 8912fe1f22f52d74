//! Ripple Sync - Real-Time Event Merger
//!
//! Consumes a long-lived push channel (one event at a time, server push
//! order preserved) and folds externally created entities into the same
//! model the optimistic engine mutates, through the same patch gateway.
//! Pushed entities always carry durable ids; there is no speculation phase
//! here.
//!
//! # Lifecycle
//!
//! On (re)connect the merger declares the session identity to the channel
//! before any event flows, then re-registers every active interest. A
//! disconnect marks the stream stale rather than failing; reconnects use
//! bounded exponential backoff, and exhaustion degrades to manual refresh
//! instead of an abort.
//!
//! # Ordering
//!
//! Events apply in delivery order through a single consumer loop. An event
//! referencing an id that has not arrived yet (a read marker racing its
//! message's creation) is buffered and retried after a short delay; after a
//! bounded number of deferrals it is dropped and logged, never applied
//! under a guessed referent.

pub mod channel;
pub mod event;
pub mod merger;
pub mod retry;

pub use channel::{ChannelError, PushChannel};
pub use event::{Interest, PushEvent};
pub use merger::{EventMerger, MergerConfig, MergerHandle, StreamHealth, SyncError};
pub use retry::RetryConfig;
