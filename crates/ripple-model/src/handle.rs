//! Shared model handle
//!
//! Wraps the feed model in the serialization point every mutation funnels
//! through. The optimistic engine and the event merger each hold a clone;
//! patches apply atomically under one lock, and reads return consistent
//! snapshots (never a mid-patch view).

use parking_lot::Mutex;
use ripple_core::{PostId, UserId};
use std::sync::Arc;
use tracing::debug;

use crate::comments::CommentForest;
use crate::entities::{Conversation, Notification, PostState};
use crate::model::FeedModel;
use crate::patch::{Patch, PatchError, PatchOutcome};

/// Cloneable handle to the session's feed model
#[derive(Debug, Clone, Default)]
pub struct ModelHandle {
    inner: Arc<Mutex<FeedModel>>,
}

impl ModelHandle {
    /// Create a handle around an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one patch atomically relative to all other patches
    pub fn apply(&self, patch: Patch) -> Result<PatchOutcome, PatchError> {
        let mut model = self.inner.lock();
        let outcome = model.apply(patch);
        match &outcome {
            Ok(result) => debug!(?result, "patch applied"),
            Err(err) => debug!(%err, "patch rejected"),
        }
        outcome
    }

    /// Run a closure against a consistent read view of the model
    ///
    /// Used when a caller needs several reads to observe the same state
    /// (e.g. computing a toggle delta from the current flag).
    pub fn read<R>(&self, f: impl FnOnce(&FeedModel) -> R) -> R {
        let model = self.inner.lock();
        f(&model)
    }

    /// Snapshot a post aggregate
    pub fn post(&self, id: &PostId) -> Option<PostState> {
        self.inner.lock().post(id).cloned()
    }

    /// Snapshot a post's comment forest
    pub fn comment_forest(&self, post_id: &PostId) -> Option<CommentForest> {
        self.inner.lock().comment_forest(post_id).cloned()
    }

    /// Snapshot the notification list, newest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.lock().notifications().to_vec()
    }

    /// Snapshot the conversation with a peer
    pub fn conversation(&self, peer: &UserId) -> Option<Conversation> {
        self.inner.lock().conversation(peer).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Patch;

    #[test]
    fn test_snapshots_are_detached_from_the_model() {
        let handle = ModelHandle::new();
        handle
            .apply(Patch::HydratePost {
                post: PostState::new(PostId::new("p1")),
            })
            .unwrap();

        let snapshot = handle.post(&PostId::new("p1")).unwrap();
        handle
            .apply(Patch::SetBookmarked {
                post_id: PostId::new("p1"),
                bookmarked: true,
            })
            .unwrap();

        // The earlier snapshot does not observe the later patch.
        assert!(!snapshot.is_bookmarked);
        assert!(handle.post(&PostId::new("p1")).unwrap().is_bookmarked);
    }

    #[test]
    fn test_read_sees_consistent_state() {
        let handle = ModelHandle::new();
        handle
            .apply(Patch::HydratePost {
                post: PostState::new(PostId::new("p1")),
            })
            .unwrap();
        let (count, liked) = handle.read(|model| {
            let post = model.post(&PostId::new("p1")).unwrap();
            (post.likes_count, post.is_liked)
        });
        assert_eq!(count, 0);
        assert!(!liked);
    }
}
