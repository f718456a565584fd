//! Collection synchronizer: keeps a node's children an order-preserving
//! image of an external ordered collection.
//!
//! The collection reports its mutations as `CollectionChange` messages.
//! `bind` performs the initial full rebuild; `apply` replays one change.
//! Inserts, removals and resets are supported. In-place replace and move
//! are not: they are rejected before any child is touched.

use crate::tree::{NodeTree, TreeNode};
use petgraph::graph::NodeIndex;

/// A single mutation of an observed collection.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionChange<T> {
    /// `items` were inserted at `at`, in order.
    Insert { at: usize, items: Vec<T> },
    /// `count` consecutive items starting at `at` were removed.
    Remove { at: usize, count: usize },
    /// Items starting at `at` were overwritten in place.
    Replace { at: usize, items: Vec<T> },
    /// `count` items moved from `from` to `to`.
    Move { from: usize, to: usize, count: usize },
    /// Contents changed wholesale; `items` is the collection afterwards.
    Reset { items: Vec<T> },
}

impl<T> CollectionChange<T> {
    pub fn kind(&self) -> &'static str {
        match self {
            CollectionChange::Insert { .. } => "insert",
            CollectionChange::Remove { .. } => "remove",
            CollectionChange::Replace { .. } => "replace",
            CollectionChange::Move { .. } => "move",
            CollectionChange::Reset { .. } => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The collection emitted a change kind the tree cannot mirror.
    /// This is a defect in the collection's owner, not a runtime condition.
    #[error("unsupported collection change: {0}")]
    Unsupported(&'static str),

    #[error("{kind} at {at} (count {count}) is out of range for {len} children")]
    OutOfRange {
        kind: &'static str,
        at: usize,
        count: usize,
        len: usize,
    },
}

/// Replace `parent`'s children with the mapped image of `items`.
pub fn bind<T>(
    tree: &mut NodeTree,
    parent: NodeIndex,
    items: &[T],
    mut map: impl FnMut(&T) -> TreeNode,
) {
    tree.clear_children(parent);
    tree.insert_children(parent, 0, items.iter().map(&mut map));
    log::debug!("bound {} children under {parent:?}", items.len());
}

/// Replay one change onto `parent`'s children.
///
/// # Errors
/// `Unsupported` for replace/move and `OutOfRange` for indices outside the
/// current children; the children are left untouched in both cases.
pub fn apply<T>(
    tree: &mut NodeTree,
    parent: NodeIndex,
    change: &CollectionChange<T>,
    mut map: impl FnMut(&T) -> TreeNode,
) -> Result<(), SyncError> {
    let len = tree.children(parent).len();
    match change {
        CollectionChange::Insert { at, items } => {
            if *at > len {
                return Err(SyncError::OutOfRange {
                    kind: "insert",
                    at: *at,
                    count: items.len(),
                    len,
                });
            }
            tree.insert_children(parent, *at, items.iter().map(&mut map));
            log::debug!("inserted {} children at {at}", items.len());
        }
        CollectionChange::Remove { at, count } => {
            if at.checked_add(*count).is_none_or(|end| end > len) {
                return Err(SyncError::OutOfRange {
                    kind: "remove",
                    at: *at,
                    count: *count,
                    len,
                });
            }
            tree.remove_children(parent, *at, *count);
            log::debug!("removed {count} children at {at}");
        }
        CollectionChange::Reset { items } => bind(tree, parent, items, map),
        CollectionChange::Replace { .. } | CollectionChange::Move { .. } => {
            return Err(SyncError::Unsupported(change.kind()));
        }
    }
    Ok(())
}
