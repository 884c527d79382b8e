//! Events dispatched on display nodes.

use serde::Serialize;

use super::NodeId;

/// Dispatched on a node and its descendants after they are attached under
/// the document root.
pub const MOUNT: &str = "mount";

/// Dispatched on a node and its descendants after they are detached from
/// the document root.
pub const UNMOUNT: &str = "unmount";

/// Dispatched manually by [`destroy_node`](super::destroy_node) when a node
/// will not be reattached. Computations bound to the node dispose on it.
pub const DESTROY: &str = "destroy";

/// A dispatched event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
}

impl Event {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }
}

/// Identifies one registered listener, for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    pub(crate) node: NodeId,
    pub(crate) id: u64,
}

impl ListenerHandle {
    /// The node the listener is registered on.
    pub fn node(&self) -> NodeId {
        self.node
    }
}
