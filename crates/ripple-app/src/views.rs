//! View projections
//!
//! Pure functions deriving display-ready aggregates from model snapshots.
//! No side effects, no network access: identical input produces identical
//! output no matter how many times a projection runs.

use ripple_core::{CommentId, UserId};
use ripple_model::{CommentForest, CommentNode, Conversation, Notification};
use serde::{Deserialize, Serialize};

/// Replies shown per node before the user expands the list
pub const DEFAULT_VISIBLE_REPLIES: usize = 1;

/// Notifications shown in the dropdown preview
pub const LATEST_UNREAD_LIMIT: usize = 3;

/// Count of unseen notifications
pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.seen).count()
}

/// The newest `limit` unseen notifications, in list order
pub fn latest_unread(notifications: &[Notification], limit: usize) -> Vec<Notification> {
    notifications
        .iter()
        .filter(|n| !n.seen)
        .take(limit)
        .cloned()
        .collect()
}

/// Total comments under a post, derived by traversal (roots + descendants)
pub fn comment_total(forest: &CommentForest) -> usize {
    forest.reachable_count()
}

/// A comment with its replies nested for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadNode {
    /// The comment itself
    pub comment: CommentNode,
    /// Nested replies, in insertion order
    pub replies: Vec<ThreadNode>,
}

/// Project the forest snapshot into nested display trees, one per root
pub fn thread_view(forest: &CommentForest) -> Vec<ThreadNode> {
    forest
        .roots()
        .iter()
        .filter_map(|root| build_tree(forest, root))
        .collect()
}

/// Build one nested tree with an explicit stack; thread depth is unbounded
/// so the projection must not recurse.
fn build_tree(forest: &CommentForest, root: &CommentId) -> Option<ThreadNode> {
    struct Frame<'a> {
        node: &'a CommentNode,
        replies: Vec<ThreadNode>,
        next_child: usize,
    }

    let mut stack = vec![Frame {
        node: forest.get(root)?,
        replies: Vec::new(),
        next_child: 0,
    }];

    loop {
        let frame = stack.last_mut()?;
        if let Some(child_id) = frame.node.reply_ids.get(frame.next_child) {
            frame.next_child += 1;
            if let Some(child) = forest.get(child_id) {
                stack.push(Frame {
                    node: child,
                    replies: Vec::new(),
                    next_child: 0,
                });
            }
            continue;
        }

        let done = stack.pop()?;
        let built = ThreadNode {
            comment: done.node.clone(),
            replies: done.replies,
        };
        match stack.last_mut() {
            Some(parent) => parent.replies.push(built),
            None => return Some(built),
        }
    }
}

/// The replies visible for a node under the display policy
///
/// One reply shows by default; the rest appear on expand. Expansion is
/// pure view state: this slices the projection, the underlying reply list
/// keeps its order and membership.
pub fn visible_replies(replies: &[ThreadNode], expanded: bool) -> &[ThreadNode] {
    if expanded || replies.len() <= DEFAULT_VISIBLE_REPLIES {
        replies
    } else {
        &replies[..DEFAULT_VISIBLE_REPLIES]
    }
}

/// How many replies the expand affordance would reveal
pub fn hidden_reply_count(replies: &[ThreadNode], expanded: bool) -> usize {
    if expanded {
        0
    } else {
        replies.len().saturating_sub(DEFAULT_VISIBLE_REPLIES)
    }
}

/// Unread incoming messages in one conversation
pub fn conversation_unread(conversation: &Conversation, session_user: &UserId) -> usize {
    conversation
        .messages
        .iter()
        .filter(|m| m.sender_id != *session_user && !m.read)
        .count()
}
