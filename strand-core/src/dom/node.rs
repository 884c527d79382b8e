//! Node storage.
//!
//! Nodes live in a slot arena. A [`NodeId`] is an index plus the generation
//! of the slot it was issued for, so a handle to a released node stays
//! invalid even after its slot is reused.

use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use super::events::{Event, ListenerHandle};
use super::Document;
use crate::{Error, Result};

/// Generational handle to a display node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        classes: IndexSet<String>,
    },
    Text(String),
    Comment(String),
}

impl NodeKind {
    pub fn element(tag: impl Into<String>) -> Self {
        NodeKind::Element {
            tag: tag.into(),
            attributes: IndexMap::new(),
            classes: IndexSet::new(),
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, NodeKind::Element { .. })
    }
}

pub(crate) type Callback = Rc<dyn Fn(&Document, &Event)>;

pub(crate) struct Listener {
    pub handle: ListenerHandle,
    pub event: String,
    pub callback: Callback,
    pub once: bool,
}

pub(crate) struct NodeData {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub listeners: Vec<Listener>,
}

impl NodeData {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/// Slot arena with a free list.
#[derive(Default)]
pub(crate) struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Tree {
    pub fn insert(&mut self, data: NodeData) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.data = Some(data);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            data: Some(data),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Result<&NodeData> {
        self.slot(id).ok_or(Error::DeadNode(id))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_mut())
            .ok_or(Error::DeadNode(id))
    }

    /// Free the slot. The caller is responsible for unlinking the node.
    pub fn release(&mut self, id: NodeId) -> Option<NodeData> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let data = slot.data.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(data)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Number of registered event listeners across all live nodes.
    pub fn listener_count(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|slot| slot.data.as_ref())
            .map(|data| data.listeners.len())
            .sum()
    }

    fn slot(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
    }

    /// `node` followed by all of its descendants, in document order.
    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(data) = self.slot(id) else { continue };
            out.push(id);
            stack.extend(data.children.iter().rev());
        }
        out
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.slot(id).and_then(|data| data.parent);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_handles_go_stale() {
        let mut tree = Tree::default();
        let a = tree.insert(NodeData::new(NodeKind::Text("a".into())));
        assert!(tree.contains(a));

        assert!(tree.release(a).is_some());
        assert!(!tree.contains(a));
        assert!(matches!(tree.get(a), Err(Error::DeadNode(id)) if id == a));

        let b = tree.insert(NodeData::new(NodeKind::Text("b".into())));
        assert_eq!(b.index(), a.index());
        assert_ne!(b, a);
        assert!(tree.release(a).is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn subtree_is_in_document_order() {
        let mut tree = Tree::default();
        let root = tree.insert(NodeData::new(NodeKind::element("ul")));
        let first = tree.insert(NodeData::new(NodeKind::element("li")));
        let second = tree.insert(NodeData::new(NodeKind::element("li")));
        let text = tree.insert(NodeData::new(NodeKind::Text("x".into())));

        tree.get_mut(root).unwrap().children = vec![first, second];
        tree.get_mut(first).unwrap().children = vec![text];
        tree.get_mut(text).unwrap().parent = Some(first);
        tree.get_mut(first).unwrap().parent = Some(root);

        assert_eq!(tree.subtree(root), vec![root, first, text, second]);
        assert!(tree.is_inclusive_ancestor(root, text));
        assert!(!tree.is_inclusive_ancestor(second, text));
    }

    #[test]
    fn node_ids_display_index_and_generation() {
        let mut tree = Tree::default();
        let id = tree.insert(NodeData::new(NodeKind::Comment(String::new())));
        assert_eq!(id.to_string(), "#0v0");
        assert_eq!(format!("{id:?}"), "NodeId(0v0)");
    }
}
