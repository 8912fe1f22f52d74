//! Feed model
//!
//! The reconciled in-memory state for one user session's feed screens. All
//! mutation enters through [`FeedModel::apply`]; aggregate fields (comment
//! counts) are kept in sync here so callers can never skew them.

use indexmap::IndexMap;
use ripple_core::{PostId, UserId};
use std::collections::HashMap;
use tracing::warn;

use crate::comments::{CommentForest, ForestError};
use crate::entities::{Conversation, Notification, PostState};
use crate::patch::{EngagementTarget, NoopReason, Patch, PatchError, PatchOutcome};

/// Entity state for the session's visible screens
#[derive(Debug, Clone, Default)]
pub struct FeedModel {
    posts: IndexMap<PostId, PostState>,
    comments: HashMap<PostId, CommentForest>,
    notifications: Vec<Notification>,
    conversations: IndexMap<UserId, Conversation>,
}

impl FeedModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a post aggregate
    pub fn post(&self, id: &PostId) -> Option<&PostState> {
        self.posts.get(id)
    }

    /// Read a post's comment forest
    pub fn comment_forest(&self, post_id: &PostId) -> Option<&CommentForest> {
        self.comments.get(post_id)
    }

    /// Read the notification list, newest first
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Read the conversation with a peer
    pub fn conversation(&self, peer: &UserId) -> Option<&Conversation> {
        self.conversations.get(peer)
    }

    /// Iterate all conversations
    pub fn conversations(&self) -> impl Iterator<Item = (&UserId, &Conversation)> {
        self.conversations.iter()
    }

    /// Apply one patch atomically
    ///
    /// The single mutation gateway. See [`crate::patch`] for the outcome
    /// conventions.
    pub fn apply(&mut self, patch: Patch) -> Result<PatchOutcome, PatchError> {
        match patch {
            Patch::InsertComment { post_id, node } => self.insert_comment(post_id, node),
            Patch::ReplaceComment { post_id, id, node } => {
                let Some(forest) = self.comments.get_mut(&post_id) else {
                    return Ok(PatchOutcome::Noop(NoopReason::AlreadyResolved));
                };
                if forest.replace(&id, node) {
                    Ok(PatchOutcome::Applied)
                } else {
                    Ok(PatchOutcome::Noop(NoopReason::AlreadyResolved))
                }
            }
            Patch::RemoveComment { post_id, id } => {
                let Some(forest) = self.comments.get_mut(&post_id) else {
                    return Ok(PatchOutcome::Noop(NoopReason::AlreadyResolved));
                };
                match forest.remove(&id) {
                    Some(nodes) => {
                        if let Some(post) = self.posts.get_mut(&post_id) {
                            post.comments_count = post.comments_count.saturating_sub(nodes);
                        }
                        Ok(PatchOutcome::Removed { nodes })
                    }
                    None => Ok(PatchOutcome::Noop(NoopReason::AlreadyResolved)),
                }
            }
            Patch::SetEngagement {
                target,
                is_liked,
                likes_delta,
            } => match target {
                EngagementTarget::Post(post_id) => {
                    let post = self
                        .posts
                        .get_mut(&post_id)
                        .ok_or_else(|| PatchError::missing("post", &post_id))?;
                    post.is_liked = is_liked;
                    post.likes_count = post.likes_count.saturating_add_signed(likes_delta);
                    Ok(PatchOutcome::Applied)
                }
                EngagementTarget::Comment {
                    post_id,
                    comment_id,
                } => {
                    let node = self
                        .comments
                        .get_mut(&post_id)
                        .and_then(|forest| forest.get_mut(&comment_id))
                        .ok_or_else(|| PatchError::missing("comment", &comment_id))?;
                    node.is_liked = is_liked;
                    node.likes_count = node.likes_count.saturating_add_signed(likes_delta);
                    Ok(PatchOutcome::Applied)
                }
            },
            Patch::ReconcileEngagement {
                target,
                likes_count,
                is_liked,
            } => match target {
                EngagementTarget::Post(post_id) => match self.posts.get_mut(&post_id) {
                    Some(post) => {
                        if let Some(count) = likes_count {
                            post.likes_count = count;
                        }
                        if let Some(liked) = is_liked {
                            post.is_liked = liked;
                        }
                        Ok(PatchOutcome::Applied)
                    }
                    None => Ok(PatchOutcome::Noop(NoopReason::AlreadyResolved)),
                },
                EngagementTarget::Comment {
                    post_id,
                    comment_id,
                } => {
                    let node = self
                        .comments
                        .get_mut(&post_id)
                        .and_then(|forest| forest.get_mut(&comment_id));
                    match node {
                        Some(node) => {
                            if let Some(count) = likes_count {
                                node.likes_count = count;
                            }
                            if let Some(liked) = is_liked {
                                node.is_liked = liked;
                            }
                            Ok(PatchOutcome::Applied)
                        }
                        None => Ok(PatchOutcome::Noop(NoopReason::AlreadyResolved)),
                    }
                }
            },
            Patch::SetBookmarked { post_id, bookmarked } => {
                let post = self
                    .posts
                    .get_mut(&post_id)
                    .ok_or_else(|| PatchError::missing("post", &post_id))?;
                post.is_bookmarked = bookmarked;
                Ok(PatchOutcome::Applied)
            }
            Patch::InsertNotification { notification } => {
                if self.notifications.iter().any(|n| n.id == notification.id) {
                    return Ok(PatchOutcome::Noop(NoopReason::Duplicate));
                }
                // Push events arrive newest-last; the list reads newest-first.
                self.notifications.insert(0, notification);
                Ok(PatchOutcome::Applied)
            }
            Patch::MarkNotificationSeen { id } => {
                match self.notifications.iter_mut().find(|n| n.id == id) {
                    Some(notification) if notification.seen => {
                        Ok(PatchOutcome::Noop(NoopReason::AlreadyApplied))
                    }
                    Some(notification) => {
                        notification.seen = true;
                        Ok(PatchOutcome::Applied)
                    }
                    None => Ok(PatchOutcome::Noop(NoopReason::AlreadyResolved)),
                }
            }
            Patch::RemoveNotification { id } => {
                let before = self.notifications.len();
                self.notifications.retain(|n| n.id != id);
                if self.notifications.len() == before {
                    Ok(PatchOutcome::Noop(NoopReason::AlreadyResolved))
                } else {
                    Ok(PatchOutcome::Applied)
                }
            }
            Patch::InsertMessage { peer, message } => {
                let conversation = self.conversations.entry(peer).or_default();
                if conversation.contains(&message.id) {
                    return Ok(PatchOutcome::Noop(NoopReason::Duplicate));
                }
                conversation.messages.push(message);
                Ok(PatchOutcome::Applied)
            }
            Patch::MarkMessageRead { peer, id } => {
                let conversation = self
                    .conversations
                    .get_mut(&peer)
                    .ok_or_else(|| PatchError::missing("conversation", &peer))?;
                let message = conversation
                    .message_mut(&id)
                    .ok_or_else(|| PatchError::missing("message", &id))?;
                if message.read {
                    Ok(PatchOutcome::Noop(NoopReason::AlreadyApplied))
                } else {
                    message.read = true;
                    Ok(PatchOutcome::Applied)
                }
            }
            Patch::HydratePost { post } => {
                self.comments.entry(post.id.clone()).or_default();
                self.posts.insert(post.id.clone(), post);
                Ok(PatchOutcome::Applied)
            }
            Patch::HydrateComments { post_id, records } => {
                if !self.posts.contains_key(&post_id) {
                    return Err(PatchError::missing("post", &post_id));
                }
                let mut forest = CommentForest::new();
                for record in records {
                    let node = record.into_node();
                    match forest.insert(node) {
                        Ok(()) => {}
                        Err(ForestError::Duplicate(id)) => {
                            warn!(comment = %id, "duplicate comment in hydration batch, skipped");
                        }
                        Err(ForestError::UnknownParent(parent)) => {
                            warn!(parent = %parent, "orphan comment in hydration batch, skipped");
                        }
                    }
                }
                let total = forest.len() as u32;
                self.comments.insert(post_id.clone(), forest);
                if let Some(post) = self.posts.get_mut(&post_id) {
                    post.comments_count = total;
                }
                Ok(PatchOutcome::Applied)
            }
            Patch::HydrateNotifications { notifications } => {
                self.notifications = notifications;
                Ok(PatchOutcome::Applied)
            }
            Patch::HydrateConversation { peer, messages } => {
                self.conversations.insert(peer, Conversation { messages });
                Ok(PatchOutcome::Applied)
            }
        }
    }

    fn insert_comment(
        &mut self,
        post_id: PostId,
        node: crate::comments::CommentNode,
    ) -> Result<PatchOutcome, PatchError> {
        if !self.posts.contains_key(&post_id) {
            return Err(PatchError::missing("post", &post_id));
        }
        let forest = self.comments.entry(post_id.clone()).or_default();
        match forest.insert(node) {
            Ok(()) => {
                if let Some(post) = self.posts.get_mut(&post_id) {
                    post.comments_count = post.comments_count.saturating_add(1);
                }
                Ok(PatchOutcome::Applied)
            }
            Err(ForestError::Duplicate(_)) => Ok(PatchOutcome::Noop(NoopReason::Duplicate)),
            Err(ForestError::UnknownParent(parent)) => Err(PatchError::missing("comment", parent)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::CommentNode;
    use crate::entities::{Author, ChatMessage, Notification, NotificationKind, NotificationRef};
    use ripple_core::{CommentId, MessageId, NotificationId};

    fn author() -> Author {
        Author {
            id: UserId::new("u1"),
            display_name: "Ada".to_string(),
            username: "ada".to_string(),
            avatar: None,
        }
    }

    fn comment(id: CommentId, parent: Option<CommentId>) -> CommentNode {
        CommentNode {
            id,
            content: "text".to_string(),
            author: author(),
            created_at: 1,
            parent_id: parent,
            likes_count: 0,
            is_liked: false,
            reply_ids: Vec::new(),
        }
    }

    fn notification(id: &str) -> Notification {
        Notification {
            id: NotificationId::new(id),
            kind: NotificationKind::Like,
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

    fn model_with_post(post_id: &str) -> FeedModel {
        let mut model = FeedModel::new();
        model
            .apply(Patch::HydratePost {
                post: PostState::new(PostId::new(post_id)),
            })
            .unwrap();
        model
    }

    fn count_matches_forest(model: &FeedModel, post_id: &PostId) -> bool {
        let post = model.post(post_id).unwrap();
        let forest = model.comment_forest(post_id).unwrap();
        post.comments_count as usize == forest.reachable_count()
    }

    #[test]
    fn test_insert_comment_bumps_count() {
        let mut model = model_with_post("p1");
        let outcome = model
            .apply(Patch::InsertComment {
                post_id: PostId::new("p1"),
                node: comment(CommentId::provisional(), None),
            })
            .unwrap();
        assert_eq!(outcome, PatchOutcome::Applied);
        assert_eq!(model.post(&PostId::new("p1")).unwrap().comments_count, 1);
        assert!(count_matches_forest(&model, &PostId::new("p1")));
    }

    #[test]
    fn test_insert_comment_unknown_post_is_missing_reference() {
        let mut model = FeedModel::new();
        let err = model
            .apply(Patch::InsertComment {
                post_id: PostId::new("p1"),
                node: comment(CommentId::provisional(), None),
            })
            .unwrap_err();
        assert_eq!(err.entity, "post");
    }

    #[test]
    fn test_remove_subtree_restores_count() {
        let mut model = model_with_post("p1");
        let root = CommentId::durable("c1");
        model
            .apply(Patch::InsertComment {
                post_id: PostId::new("p1"),
                node: comment(root.clone(), None),
            })
            .unwrap();
        model
            .apply(Patch::InsertComment {
                post_id: PostId::new("p1"),
                node: comment(CommentId::durable("c2"), Some(root.clone())),
            })
            .unwrap();
        assert_eq!(model.post(&PostId::new("p1")).unwrap().comments_count, 2);

        let outcome = model
            .apply(Patch::RemoveComment {
                post_id: PostId::new("p1"),
                id: root,
            })
            .unwrap();
        assert_eq!(outcome, PatchOutcome::Removed { nodes: 2 });
        assert_eq!(model.post(&PostId::new("p1")).unwrap().comments_count, 0);
        assert!(count_matches_forest(&model, &PostId::new("p1")));
    }

    #[test]
    fn test_replace_after_remove_is_silent_noop() {
        let mut model = model_with_post("p1");
        let provisional = CommentId::provisional();
        model
            .apply(Patch::InsertComment {
                post_id: PostId::new("p1"),
                node: comment(provisional.clone(), None),
            })
            .unwrap();
        model
            .apply(Patch::RemoveComment {
                post_id: PostId::new("p1"),
                id: provisional.clone(),
            })
            .unwrap();

        // Confirm arriving after a rollback already excised the node.
        let outcome = model
            .apply(Patch::ReplaceComment {
                post_id: PostId::new("p1"),
                id: provisional,
                node: comment(CommentId::durable("c-99"), None),
            })
            .unwrap();
        assert_eq!(outcome, PatchOutcome::Noop(NoopReason::AlreadyResolved));
        assert_eq!(model.post(&PostId::new("p1")).unwrap().comments_count, 0);
    }

    #[test]
    fn test_engagement_flips_both_fields_atomically() {
        let mut model = model_with_post("p1");
        model
            .apply(Patch::SetEngagement {
                target: EngagementTarget::Post(PostId::new("p1")),
                is_liked: true,
                likes_delta: 1,
            })
            .unwrap();
        let post = model.post(&PostId::new("p1")).unwrap();
        assert!(post.is_liked);
        assert_eq!(post.likes_count, 1);
    }

    #[test]
    fn test_engagement_count_never_goes_negative() {
        let mut model = model_with_post("p1");
        model
            .apply(Patch::SetEngagement {
                target: EngagementTarget::Post(PostId::new("p1")),
                is_liked: false,
                likes_delta: -1,
            })
            .unwrap();
        assert_eq!(model.post(&PostId::new("p1")).unwrap().likes_count, 0);
    }

    #[test]
    fn test_notification_mark_seen_is_idempotent_and_one_directional() {
        let mut model = FeedModel::new();
        model
            .apply(Patch::InsertNotification {
                notification: notification("n1"),
            })
            .unwrap();

        let first = model
            .apply(Patch::MarkNotificationSeen {
                id: NotificationId::new("n1"),
            })
            .unwrap();
        assert_eq!(first, PatchOutcome::Applied);

        let second = model
            .apply(Patch::MarkNotificationSeen {
                id: NotificationId::new("n1"),
            })
            .unwrap();
        assert_eq!(second, PatchOutcome::Noop(NoopReason::AlreadyApplied));
        assert!(model.notifications()[0].seen);
    }

    #[test]
    fn test_pushed_notifications_prepend() {
        let mut model = FeedModel::new();
        model
            .apply(Patch::InsertNotification {
                notification: notification("n1"),
            })
            .unwrap();
        model
            .apply(Patch::InsertNotification {
                notification: notification("n2"),
            })
            .unwrap();
        let ids: Vec<_> = model.notifications().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n2", "n1"]);
    }

    #[test]
    fn test_duplicate_notification_is_noop() {
        let mut model = FeedModel::new();
        model
            .apply(Patch::InsertNotification {
                notification: notification("n1"),
            })
            .unwrap();
        let outcome = model
            .apply(Patch::InsertNotification {
                notification: notification("n1"),
            })
            .unwrap();
        assert_eq!(outcome, PatchOutcome::Noop(NoopReason::Duplicate));
        assert_eq!(model.notifications().len(), 1);
    }

    #[test]
    fn test_message_read_before_create_is_missing_reference() {
        let mut model = FeedModel::new();
        model
            .apply(Patch::InsertMessage {
                peer: UserId::new("u2"),
                message: message("m1", "u2"),
            })
            .unwrap();

        let err = model
            .apply(Patch::MarkMessageRead {
                peer: UserId::new("u2"),
                id: MessageId::new("m2"),
            })
            .unwrap_err();
        assert_eq!(err.entity, "message");

        let outcome = model
            .apply(Patch::MarkMessageRead {
                peer: UserId::new("u2"),
                id: MessageId::new("m1"),
            })
            .unwrap();
        assert_eq!(outcome, PatchOutcome::Applied);
    }

    #[test]
    fn test_duplicate_message_is_noop() {
        let mut model = FeedModel::new();
        model
            .apply(Patch::InsertMessage {
                peer: UserId::new("u2"),
                message: message("m1", "u2"),
            })
            .unwrap();
        let outcome = model
            .apply(Patch::InsertMessage {
                peer: UserId::new("u2"),
                message: message("m1", "u2"),
            })
            .unwrap();
        assert_eq!(outcome, PatchOutcome::Noop(NoopReason::Duplicate));
        assert_eq!(
            model.conversation(&UserId::new("u2")).unwrap().messages.len(),
            1
        );
    }

    #[test]
    fn test_hydrate_comments_links_tree_and_sets_count() {
        let mut model = model_with_post("p1");
        let records = vec![
            crate::entities::CommentRecord {
                id: "c1".to_string(),
                post_id: PostId::new("p1"),
                parent_id: None,
                content: "root".to_string(),
                author: author(),
                created_at: 1,
                likes_count: 0,
                is_liked: false,
            },
            crate::entities::CommentRecord {
                id: "c2".to_string(),
                post_id: PostId::new("p1"),
                parent_id: Some("c1".to_string()),
                content: "reply".to_string(),
                author: author(),
                created_at: 2,
                likes_count: 0,
                is_liked: false,
            },
        ];
        model
            .apply(Patch::HydrateComments {
                post_id: PostId::new("p1"),
                records,
            })
            .unwrap();

        let post = model.post(&PostId::new("p1")).unwrap();
        assert_eq!(post.comments_count, 2);
        let forest = model.comment_forest(&PostId::new("p1")).unwrap();
        assert_eq!(
            forest.get(&CommentId::durable("c1")).unwrap().reply_ids,
            vec![CommentId::durable("c2")]
        );
        assert!(count_matches_forest(&model, &PostId::new("p1")));
    }
}
