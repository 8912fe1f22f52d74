//! Ripple Engine - Optimistic Mutation Engine
//!
//! Wraps every "fire network call, speculate locally" action in a uniform
//! three-phase protocol:
//!
//! ```text
//! speculate (sync patch) → await (network) → confirm (replace) | rollback (remove)
//! ```
//!
//! Phase 1 applies the provisional mutation and its aggregate deltas in the
//! same tick as the user action; no intermediate state ever shows the
//! pre-speculation view. Phase 2 is the only suspension point; arbitrarily
//! many operations may be in flight, each tracked by its own provisional
//! id. Phase 3 replaces the provisional entity at its exact structural
//! position, or excises it and reverses exactly what Phase 1 added.
//!
//! Engagement toggles (likes, bookmarks) are the flag+counter
//! specialization: per-entity lanes serialize their network calls so
//! re-entrant toggles can never interleave into a lost double-flip, while
//! each toggle's optimistic flip still lands immediately.

pub mod api;
pub mod engine;
mod lanes;

pub use api::{BookmarkAck, CreateCommentRequest, EngagementAck, MutationApi};
pub use engine::{EngineConfig, EngineError, OptimisticEngine};
