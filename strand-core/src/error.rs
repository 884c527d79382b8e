//! Error types.
//!
//! Graph bookkeeping (subscribe, cleanup, dispose) never fails. Everything
//! that can fail funnels into [`Error`]: tree operations on stale handles,
//! dense-vector writes past the end, list desynchronization, and errors
//! returned by user watcher bodies.

use thiserror::Error;

use crate::dom::NodeId;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// An index write landed past the end of the mounted/backing list.
    ///
    /// Raised by [`ReactiveVec::set`](crate::reactive::ReactiveVec::set) for
    /// sparse writes and by [`For`](crate::components::For) when the backing
    /// vector and the mount list have desynchronized.
    #[error("index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The handle refers to a node that has been released from the arena.
    #[error("node {0} is no longer alive")]
    DeadNode(NodeId),

    /// Inserting `child` under `parent` would create a cycle.
    #[error("cannot insert {child} into {parent}: the new child is an ancestor of the parent")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// The reference node is not a child of the given parent.
    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// A sibling-relative operation was attempted on a node without a parent.
    #[error("node {0} has no parent")]
    Detached(NodeId),

    /// Text accessors on an element, or attribute accessors on a text node.
    #[error("node {node} does not support {operation}")]
    WrongNodeKind {
        node: NodeId,
        operation: &'static str,
    },

    /// An error returned by a user-supplied watcher or render callback.
    #[error(transparent)]
    Callback(#[from] Box<dyn std::error::Error + 'static>),
}

impl Error {
    /// Wrap an arbitrary error raised inside a watcher body.
    pub fn callback<E>(err: E) -> Self
    where
        E: std::error::Error + 'static,
    {
        Self::Callback(Box::new(err))
    }
}
