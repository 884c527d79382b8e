//! Position anchors.
//!
//! A [`PositionAnchor`] remembers where a run of nodes lived so that new
//! nodes can be put back there after the run has been removed entirely,
//! for instance when a rendered list shrinks to zero and later grows again.

use tracing::warn;

use super::{Document, NodeId};
use crate::{Error, Result};

/// A captured `{ parent, prev, next }` location. Immutable once captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionAnchor {
    parent: NodeId,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Where to insert, resolved against the current tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPoint {
    After(NodeId),
    Before(NodeId),
    Prepend(NodeId),
    Append(NodeId),
}

impl PositionAnchor {
    /// The location of `node`.
    pub fn capture(doc: &Document, node: NodeId) -> Result<Self> {
        Self::spanning(doc, node, node)
    }

    /// The location of the sibling run from `first` to `last`.
    pub fn spanning(doc: &Document, first: NodeId, last: NodeId) -> Result<Self> {
        let parent = doc.parent(first)?.ok_or(Error::Detached(first))?;
        if doc.parent(last)? != Some(parent) {
            return Err(Error::NotAChild {
                parent,
                child: last,
            });
        }

        Ok(Self {
            parent,
            prev: doc.prev_sibling(first)?,
            next: doc.next_sibling(last)?,
        })
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    /// Resolve the anchor: after `prev` if it is still in place, else before
    /// `next`, else the start or the end of the parent depending on which
    /// edge the run was at.
    pub fn insertion_point(&self, doc: &Document) -> InsertionPoint {
        let in_place = |node: NodeId| doc.parent(node).ok().flatten() == Some(self.parent);

        match (self.prev, self.next) {
            (Some(prev), _) if in_place(prev) => InsertionPoint::After(prev),
            (_, Some(next)) if in_place(next) => InsertionPoint::Before(next),
            (None, _) => InsertionPoint::Prepend(self.parent),
            (Some(_), _) => {
                warn!(parent = %self.parent, "both neighbours of the anchor moved; appending");
                InsertionPoint::Append(self.parent)
            }
        }
    }

    /// Insert `nodes` in order at the anchored location.
    pub fn insert(&self, doc: &Document, nodes: &[NodeId]) -> Result<()> {
        self.insertion_point(doc).insert(doc, nodes)
    }
}

impl InsertionPoint {
    pub fn insert(self, doc: &Document, nodes: &[NodeId]) -> Result<()> {
        match self {
            InsertionPoint::After(prev) => doc.after(prev, nodes),
            InsertionPoint::Before(next) => doc.before(next, nodes),
            InsertionPoint::Prepend(parent) => {
                let first = doc.first_child(parent)?;
                for &node in nodes {
                    doc.insert_before(parent, node, first)?;
                }
                Ok(())
            }
            InsertionPoint::Append(parent) => {
                for &node in nodes {
                    doc.append_child(parent, node)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(doc: &Document, n: usize) -> (NodeId, Vec<NodeId>) {
        let parent = doc.create_element("div");
        let children = (0..n)
            .map(|i| {
                let child = doc.create_text(i.to_string());
                doc.append_child(parent, child).unwrap();
                child
            })
            .collect();
        (parent, children)
    }

    #[test]
    fn reinserts_where_the_run_was() {
        let doc = Document::new();
        let (parent, c) = row(&doc, 4);

        let anchor = PositionAnchor::spanning(&doc, c[1], c[2]).unwrap();
        doc.remove(c[1]).unwrap();
        doc.remove(c[2]).unwrap();

        let fresh = doc.create_text("x");
        assert_eq!(anchor.insertion_point(&doc), InsertionPoint::After(c[0]));
        anchor.insert(&doc, &[fresh]).unwrap();
        assert_eq!(doc.children(parent).unwrap(), vec![c[0], fresh, c[3]]);
    }

    #[test]
    fn falls_back_to_next_then_edges() {
        let doc = Document::new();
        let (parent, c) = row(&doc, 3);

        let anchor = PositionAnchor::capture(&doc, c[1]).unwrap();
        doc.remove(c[0]).unwrap();
        assert_eq!(anchor.insertion_point(&doc), InsertionPoint::Before(c[2]));

        let first = PositionAnchor::capture(&doc, c[1]).unwrap();
        doc.remove(c[1]).unwrap();
        doc.remove(c[2]).unwrap();
        assert_eq!(first.insertion_point(&doc), InsertionPoint::Prepend(parent));

        let lone = doc.create_text("y");
        first.insert(&doc, &[lone]).unwrap();
        assert_eq!(doc.children(parent).unwrap(), vec![lone]);
    }

    #[test]
    fn capture_requires_a_parent() {
        let doc = Document::new();
        let lone = doc.create_comment("");
        assert!(matches!(
            PositionAnchor::capture(&doc, lone),
            Err(Error::Detached(id)) if id == lone
        ));
    }
}
