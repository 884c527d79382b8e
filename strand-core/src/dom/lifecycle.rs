//! Subtree notifications.

use tracing::debug;

use super::events::DESTROY;
use super::{Document, NodeId};
use crate::Result;

/// Dispatch `event` on `node` and every descendant, in document order.
///
/// The subtree is captured before the first listener runs. Nodes released
/// by an earlier listener are skipped, as is a `node` that is already dead.
/// Returns how many listeners ran.
pub fn notify_subtree(doc: &Document, node: NodeId, event: &str) -> Result<usize> {
    if !doc.is_alive(node) {
        return Ok(0);
    }

    let mut called = 0;
    for target in doc.subtree(node)? {
        if doc.is_alive(target) {
            called += doc.dispatch(target, event)?;
        }
    }
    Ok(called)
}

/// Announce that `node` will not be reattached.
///
/// Computations bound to the node or its descendants dispose themselves on
/// this notification. The nodes stay in the tree; removing them is up to
/// the caller.
pub fn destroy_node(doc: &Document, node: NodeId) -> Result<()> {
    let called = notify_subtree(doc, node, DESTROY)?;
    debug!(%node, listeners = called, "destroyed subtree");
    Ok(())
}
