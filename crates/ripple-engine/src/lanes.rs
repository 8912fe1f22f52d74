//! Per-entity toggle lanes
//!
//! One lane per toggled entity. The lane's serial lock queues network calls
//! so a second toggle on the same entity never interleaves with the first,
//! and its pending sum tracks the optimistic deltas currently in flight so
//! a confirm carrying an authoritative count can be adjusted for toggles
//! applied after it.

use parking_lot::Mutex;
use ripple_core::{CommentId, PostId};
use std::collections::HashMap;
use std::sync::Arc;

/// Identity of a toggle lane
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum LaneKey {
    /// Like state of a post
    PostLike(PostId),
    /// Like state of a comment
    CommentLike(CommentId),
    /// Bookmark state of a post
    Bookmark(PostId),
}

/// Shared per-entity toggle state
#[derive(Debug, Clone, Default)]
pub(crate) struct Lane {
    /// Serializes the network calls of toggles on this entity
    pub serial: Arc<tokio::sync::Mutex<()>>,
    /// Sum of optimistic deltas currently awaiting resolution
    pub pending: Arc<Mutex<i64>>,
}

/// Lane registry, keyed by entity
#[derive(Debug, Default)]
pub(crate) struct LaneMap {
    lanes: Mutex<HashMap<LaneKey, Lane>>,
}

impl LaneMap {
    /// Fetch (or create) the lane for an entity
    pub fn lane(&self, key: &LaneKey) -> Lane {
        let mut lanes = self.lanes.lock();
        lanes.entry(key.clone()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_yields_same_lane() {
        let map = LaneMap::default();
        let a = map.lane(&LaneKey::PostLike(PostId::new("p1")));
        let b = map.lane(&LaneKey::PostLike(PostId::new("p1")));
        assert!(Arc::ptr_eq(&a.serial, &b.serial));
        assert!(Arc::ptr_eq(&a.pending, &b.pending));
    }

    #[test]
    fn test_distinct_keys_yield_distinct_lanes() {
        let map = LaneMap::default();
        let like = map.lane(&LaneKey::PostLike(PostId::new("p1")));
        let bookmark = map.lane(&LaneKey::Bookmark(PostId::new("p1")));
        assert!(!Arc::ptr_eq(&like.serial, &bookmark.serial));
    }
}
