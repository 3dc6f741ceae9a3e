// SPDX-License-Identifier: Apache-2.0

use pagoda_model::{Comment, CommentId};
use serde::Serialize;
use std::collections::HashMap;

/// A rooted forest over one post's comments.
///
/// The comments live in an arena indexed by id; reply structure is a
/// separate adjacency map from parent id to ordered child ids. The
/// nested [`CommentNode`] shape exists only at the serialization
/// boundary. Built transiently per read request, never persisted.
#[derive(Debug, Clone)]
pub struct CommentForest {
    arena: Vec<Comment>,
    index: HashMap<CommentId, usize>,
    children: HashMap<CommentId, Vec<CommentId>>,
    roots: Vec<CommentId>,
}

/// A comment plus its ordered direct replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

/// Builds the forest from a flat list ordered by creation time
/// ascending. Children keep the input order at every level; nothing is
/// re-sorted. A comment whose parent_id is not present in the input is
/// promoted to a root — explicit orphan policy, not an error.
#[must_use]
pub fn build_comment_forest(comments: Vec<Comment>) -> CommentForest {
    let mut index = HashMap::with_capacity(comments.len());
    for (slot, comment) in comments.iter().enumerate() {
        index.insert(comment.id, slot);
    }

    let mut children: HashMap<CommentId, Vec<CommentId>> = HashMap::with_capacity(comments.len());
    let mut roots = Vec::new();
    for comment in &comments {
        match comment.parent_id {
            Some(parent) if index.contains_key(&parent) => {
                children.entry(parent).or_default().push(comment.id);
            }
            _ => roots.push(comment.id),
        }
    }

    CommentForest {
        arena: comments,
        index,
        children,
        roots,
    }
}

impl CommentForest {
    /// Total comment count, roots and replies alike.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    #[must_use]
    pub fn roots(&self) -> &[CommentId] {
        &self.roots
    }

    #[must_use]
    pub fn get(&self, id: CommentId) -> Option<&Comment> {
        self.index.get(&id).map(|&slot| &self.arena[slot])
    }

    /// Direct replies of `id` in creation order; empty for leaves and
    /// unknown ids.
    #[must_use]
    pub fn replies_of(&self, id: CommentId) -> &[CommentId] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Depth-first walk over the whole forest; `visit` receives each
    /// comment with its depth (roots at 0). Sibling order is preserved.
    pub fn walk<F: FnMut(&Comment, usize)>(&self, mut visit: F) {
        let mut stack: Vec<(CommentId, usize)> = Vec::with_capacity(self.arena.len());
        for &root in self.roots.iter().rev() {
            stack.push((root, 0));
        }
        while let Some((id, depth)) = stack.pop() {
            if let Some(comment) = self.get(id) {
                visit(comment, depth);
            }
            for &child in self.replies_of(id).iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }

    /// Materializes the nested reply shape for JSON responses.
    #[must_use]
    pub fn to_nodes(&self) -> Vec<CommentNode> {
        self.roots.iter().map(|&id| self.node(id)).collect()
    }

    fn node(&self, id: CommentId) -> CommentNode {
        // roots and children only ever hold ids recorded in the index.
        let slot = self.index[&id];
        CommentNode {
            comment: self.arena[slot].clone(),
            replies: self.replies_of(id).iter().map(|&c| self.node(c)).collect(),
        }
    }
}
