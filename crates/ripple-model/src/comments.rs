//! Comment forest
//!
//! Arena representation of a post's comment thread: nodes live in an
//! id-keyed map, structure lives in explicit `parent_id`/`reply_ids`
//! relations, and root order lives in a dedicated list. Sibling order is
//! append-at-tail and survives replacement. Depth is unbounded; every
//! subtree walk is iterative.

use indexmap::IndexMap;
use ripple_core::CommentId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::Author;

/// A single comment or reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
    /// Comment identifier (durable or provisional)
    pub id: CommentId,
    /// Comment text
    pub content: String,
    /// Author display fields
    pub author: Author,
    /// Creation time, epoch milliseconds
    pub created_at: u64,
    /// Parent comment, or `None` for a root comment
    pub parent_id: Option<CommentId>,
    /// Like count
    pub likes_count: u32,
    /// Whether the session user has liked it
    pub is_liked: bool,
    /// Children, in insertion order
    pub reply_ids: Vec<CommentId>,
}

/// Structural errors from forest operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForestError {
    /// A node with this id is already present
    #[error("comment {0} already present")]
    Duplicate(CommentId),

    /// The referenced parent is not in the forest
    #[error("parent comment {0} not found")]
    UnknownParent(CommentId),
}

/// A post's comment tree of arbitrary depth
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentForest {
    nodes: IndexMap<CommentId, CommentNode>,
    roots: Vec<CommentId>,
}

impl CommentForest {
    /// Create an empty forest
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the forest (roots + all descendants)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the forest is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root comment ids in insertion order
    pub fn roots(&self) -> &[CommentId] {
        &self.roots
    }

    /// Look up a node by id, at any depth
    pub fn get(&self, id: &CommentId) -> Option<&CommentNode> {
        self.nodes.get(id)
    }

    /// Look up a node by id, mutably
    pub fn get_mut(&mut self, id: &CommentId) -> Option<&mut CommentNode> {
        self.nodes.get_mut(id)
    }

    /// Whether a node with this id is present
    pub fn contains(&self, id: &CommentId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterate all nodes in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = &CommentNode> {
        self.nodes.values()
    }

    /// Insert a node at the position encoded by its `parent_id`
    ///
    /// Appends to the parent's reply list (or the root list) at the tail.
    /// Any `reply_ids` on the incoming node are discarded; links are owned
    /// by the forest.
    pub fn insert(&mut self, mut node: CommentNode) -> Result<(), ForestError> {
        if self.nodes.contains_key(&node.id) {
            return Err(ForestError::Duplicate(node.id));
        }
        node.reply_ids.clear();
        match &node.parent_id {
            Some(parent_id) => {
                let id = node.id.clone();
                let parent = self
                    .nodes
                    .get_mut(parent_id)
                    .ok_or_else(|| ForestError::UnknownParent(parent_id.clone()))?;
                parent.reply_ids.push(id);
            }
            None => self.roots.push(node.id.clone()),
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Replace the node at `old_id` with `node`, preserving its structural
    /// position exactly
    ///
    /// The replacement keeps the old node's parent and sibling slot, adopts
    /// any children attached in the meantime, and re-parents those children
    /// to the new id. Returns `false` if `old_id` is absent (already
    /// resolved or removed), which callers treat as a silent no-op.
    pub fn replace(&mut self, old_id: &CommentId, mut node: CommentNode) -> bool {
        let Some(old) = self.nodes.swap_remove(old_id) else {
            return false;
        };
        let new_id = node.id.clone();
        node.parent_id = old.parent_id.clone();
        node.reply_ids = old.reply_ids;
        for child_id in &node.reply_ids {
            if let Some(child) = self.nodes.get_mut(child_id) {
                child.parent_id = Some(new_id.clone());
            }
        }
        match &old.parent_id {
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(parent_id) {
                    if let Some(slot) = parent.reply_ids.iter_mut().find(|id| *id == old_id) {
                        *slot = new_id.clone();
                    }
                }
            }
            None => {
                if let Some(slot) = self.roots.iter_mut().find(|id| *id == old_id) {
                    *slot = new_id.clone();
                }
            }
        }
        self.nodes.insert(new_id, node);
        true
    }

    /// Remove the node at `id` together with its entire subtree
    ///
    /// Returns the number of nodes excised, or `None` if the id is absent.
    /// The walk is an explicit stack, so arbitrarily deep threads cannot
    /// overflow the call stack.
    pub fn remove(&mut self, id: &CommentId) -> Option<u32> {
        let root = self.nodes.swap_remove(id)?;

        // Detach from the sibling list it occupied.
        match &root.parent_id {
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(parent_id) {
                    parent.reply_ids.retain(|child| child != id);
                }
            }
            None => self.roots.retain(|r| r != id),
        }

        let mut removed = 1u32;
        let mut stack = root.reply_ids;
        while let Some(child_id) = stack.pop() {
            if let Some(child) = self.nodes.swap_remove(&child_id) {
                removed += 1;
                stack.extend(child.reply_ids);
            }
        }
        Some(removed)
    }

    /// Total nodes reachable from the roots, derived by traversal
    ///
    /// Equals `len()` whenever the parent/child links are consistent; used
    /// by tests and projections that must not trust the stored count.
    pub fn reachable_count(&self) -> usize {
        let mut count = 0usize;
        let mut stack: Vec<&CommentId> = self.roots.iter().rev().collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                count += 1;
                stack.extend(node.reply_ids.iter().rev());
            }
        }
        count
    }
}
