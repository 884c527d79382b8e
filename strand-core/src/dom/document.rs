//! The host display tree.
//!
//! A [`Document`] owns every node it creates. Handles are [`NodeId`]s; a
//! handle to a released node fails with [`Error::DeadNode`] instead of
//! touching a reused slot.
//!
//! # Lifecycle
//!
//! Attach and detach are the only places lifecycle notifications come from.
//! Attaching a node under a connected parent queues a microtask that
//! dispatches [`MOUNT`] on the node and its descendants; detaching a
//! connected node queues [`UNMOUNT`]. Microtasks drain in FIFO order on
//! [`Document::flush_microtasks`], so a batch of insertions made by one
//! piece of construction code is observed after that code finishes.
//!
//! # Re-entrancy
//!
//! User callbacks (event listeners, microtasks) are never invoked while the
//! tree is borrowed, so they are free to mutate the document.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, error, trace, warn};

use super::events::{Event, ListenerHandle, MOUNT, UNMOUNT};
use super::lifecycle::notify_subtree;
use super::node::{Listener, NodeData, NodeKind, Tree};
use super::{DocumentConfig, NodeId, NodeSnapshot};
use crate::{Error, Result};

type Microtask = Box<dyn FnOnce(&Document) -> Result<()>>;

struct Inner {
    tree: RefCell<Tree>,
    microtasks: RefCell<VecDeque<Microtask>>,
    next_listener: Cell<u64>,
    root: NodeId,
    config: DocumentConfig,
}

/// A live tree of display nodes.
///
/// Cloning is cheap and yields another handle to the same document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<Inner>,
}

impl Document {
    pub fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    pub fn with_config(config: DocumentConfig) -> Self {
        let mut tree = Tree::default();
        let root = tree.insert(NodeData::new(NodeKind::element(config.root_tag.clone())));

        Self {
            inner: Rc::new(Inner {
                tree: RefCell::new(tree),
                microtasks: RefCell::new(VecDeque::new()),
                next_listener: Cell::new(0),
                root,
                config,
            }),
        }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.inner.config
    }

    /// The root element. A node is connected when the root is one of its
    /// inclusive ancestors.
    pub fn root(&self) -> NodeId {
        self.inner.root
    }

    /// Whether two handles refer to the same document.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    pub fn create_element(&self, tag: impl Into<String>) -> NodeId {
        self.create(NodeKind::element(tag))
    }

    pub fn create_text(&self, text: impl Into<String>) -> NodeId {
        self.create(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&self, text: impl Into<String>) -> NodeId {
        self.create(NodeKind::Comment(text.into()))
    }

    fn create(&self, kind: NodeKind) -> NodeId {
        let id = self.inner.tree.borrow_mut().insert(NodeData::new(kind));
        trace!(node = %id, "created node");
        id
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.inner.tree.borrow().contains(node)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        let tree = self.inner.tree.borrow();
        tree.contains(node) && tree.is_inclusive_ancestor(self.inner.root, node)
    }

    /// A copy of the node's kind and content.
    pub fn kind(&self, node: NodeId) -> Result<NodeKind> {
        Ok(self.inner.tree.borrow().get(node)?.kind.clone())
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.inner.tree.borrow().get(node)?.parent)
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.inner.tree.borrow().get(node)?.children.clone())
    }

    pub fn first_child(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.inner.tree.borrow().get(node)?.children.first().copied())
    }

    pub fn last_child(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.inner.tree.borrow().get(node)?.children.last().copied())
    }

    pub fn next_sibling(&self, node: NodeId) -> Result<Option<NodeId>> {
        self.sibling(node, 1)
    }

    pub fn prev_sibling(&self, node: NodeId) -> Result<Option<NodeId>> {
        self.sibling(node, -1)
    }

    fn sibling(&self, node: NodeId, offset: isize) -> Result<Option<NodeId>> {
        let tree = self.inner.tree.borrow();
        let Some(parent) = tree.get(node)?.parent else {
            return Ok(None);
        };
        let siblings = &tree.get(parent)?.children;
        let position = siblings
            .iter()
            .position(|&id| id == node)
            .ok_or(Error::NotAChild {
                parent,
                child: node,
            })?;
        Ok(position
            .checked_add_signed(offset)
            .and_then(|i| siblings.get(i))
            .copied())
    }

    /// `node` followed by all of its descendants, in document order.
    pub fn subtree(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let tree = self.inner.tree.borrow();
        tree.get(node)?;
        Ok(tree.subtree(node))
    }

    /// Number of live nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.inner.tree.borrow().len()
    }

    /// Number of event listeners registered across all live nodes.
    pub fn listener_count(&self) -> usize {
        self.inner.tree.borrow().listener_count()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Insert `child` under `parent` before `reference`, or at the end when
    /// `reference` is `None`. A child that already has a parent is moved.
    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        {
            let tree = self.inner.tree.borrow();
            tree.get(parent)?;
            tree.get(child)?;
            if tree.is_inclusive_ancestor(child, parent) {
                return Err(Error::HierarchyRequest { parent, child });
            }
            if let Some(reference) = reference {
                if tree.get(reference)?.parent != Some(parent) {
                    return Err(Error::NotAChild {
                        parent,
                        child: reference,
                    });
                }
            }
        }

        // Inserting a node before itself keeps its place.
        let reference = match reference {
            Some(r) if r == child => self.next_sibling(child)?,
            other => other,
        };

        self.detach(child)?;

        {
            let mut tree = self.inner.tree.borrow_mut();
            let siblings = &mut tree.get_mut(parent)?.children;
            let index = match reference {
                Some(r) => siblings
                    .iter()
                    .position(|&id| id == r)
                    .ok_or(Error::NotAChild { parent, child: r })?,
                None => siblings.len(),
            };
            siblings.insert(index, child);
            tree.get_mut(child)?.parent = Some(parent);
        }

        trace!(%parent, %child, "attached");
        if self.inner.config.observe_lifecycle && self.is_connected(parent) {
            self.queue_lifecycle(child, MOUNT);
        }
        Ok(())
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` right after `reference`, or first when
    /// `reference` is `None`.
    pub fn insert_after(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        let next = match reference {
            Some(reference) => {
                if self.parent(reference)? != Some(parent) {
                    return Err(Error::NotAChild {
                        parent,
                        child: reference,
                    });
                }
                self.next_sibling(reference)?
            }
            None => self.first_child(parent)?,
        };
        self.insert_before(parent, child, next)
    }

    /// Insert `nodes` in order right before `reference`.
    pub fn before(&self, reference: NodeId, nodes: &[NodeId]) -> Result<()> {
        let parent = self.parent(reference)?.ok_or(Error::Detached(reference))?;
        let next = self.viable_sibling(reference, nodes, false)?;
        for &node in nodes {
            self.insert_before(parent, node, next)?;
        }
        Ok(())
    }

    /// Insert `nodes` in order right after `reference`.
    pub fn after(&self, reference: NodeId, nodes: &[NodeId]) -> Result<()> {
        let parent = self.parent(reference)?.ok_or(Error::Detached(reference))?;
        let next = self.viable_sibling(reference, nodes, true)?;
        for &node in nodes {
            self.insert_before(parent, node, next)?;
        }
        Ok(())
    }

    /// Put `nodes` in place of `node`, in one operation.
    pub fn replace_with(&self, node: NodeId, nodes: &[NodeId]) -> Result<()> {
        let parent = self.parent(node)?.ok_or(Error::Detached(node))?;
        let next = self.viable_sibling(node, nodes, true)?;
        if !nodes.contains(&node) {
            self.remove(node)?;
        }
        for &child in nodes {
            self.insert_before(parent, child, next)?;
        }
        Ok(())
    }

    /// The sibling new nodes should be inserted before: `node` itself when
    /// inserting before it, otherwise the first following sibling that is
    /// not among the nodes being inserted.
    fn viable_sibling(
        &self,
        node: NodeId,
        inserting: &[NodeId],
        following: bool,
    ) -> Result<Option<NodeId>> {
        let mut candidate = if following {
            self.next_sibling(node)?
        } else {
            Some(node)
        };
        while let Some(id) = candidate {
            if !inserting.contains(&id) {
                break;
            }
            candidate = self.next_sibling(id)?;
        }
        Ok(candidate)
    }

    /// Detach `node` from its parent. Detached nodes stay alive.
    pub fn remove(&self, node: NodeId) -> Result<()> {
        self.detach(node)
    }

    /// Detach `node` and free it and its descendants.
    pub fn release(&self, node: NodeId) -> Result<()> {
        if node == self.inner.root {
            warn!(%node, "refusing to release the document root");
            return Ok(());
        }
        self.detach(node)?;

        let mut tree = self.inner.tree.borrow_mut();
        for id in tree.subtree(node) {
            tree.release(id);
        }
        trace!(%node, "released");
        Ok(())
    }

    fn detach(&self, node: NodeId) -> Result<()> {
        let was_connected = self.is_connected(node);
        {
            let mut tree = self.inner.tree.borrow_mut();
            let Some(parent) = tree.get_mut(node)?.parent.take() else {
                return Ok(());
            };
            tree.get_mut(parent)?.children.retain(|&id| id != node);
            trace!(%parent, child = %node, "detached");
        }

        if self.inner.config.observe_lifecycle && was_connected {
            self.queue_lifecycle(node, UNMOUNT);
        }
        Ok(())
    }

    fn queue_lifecycle(&self, node: NodeId, event: &'static str) {
        debug!(%node, event, "queued lifecycle notification");
        self.queue_microtask(move |doc| {
            notify_subtree(doc, node, event)?;
            Ok(())
        });
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Text of a text or comment node, or the concatenated text of an
    /// element's descendants.
    pub fn text_content(&self, node: NodeId) -> Result<String> {
        Ok(self.snapshot(node)?.text_content())
    }

    pub fn set_text(&self, node: NodeId, text: impl Into<String>) -> Result<()> {
        let mut tree = self.inner.tree.borrow_mut();
        match &mut tree.get_mut(node)?.kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => {
                *data = text.into();
                Ok(())
            }
            NodeKind::Element { .. } => Err(Error::WrongNodeKind {
                node,
                operation: "set_text",
            }),
        }
    }

    pub fn tag(&self, node: NodeId) -> Result<Option<String>> {
        Ok(match &self.inner.tree.borrow().get(node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        })
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>> {
        self.with_element(node, "attribute", |attributes, _| {
            attributes.get(name).cloned()
        })
    }

    pub fn set_attribute(
        &self,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        self.with_element(node, "set_attribute", |attributes, _| {
            attributes.insert(name.into(), value.into());
        })
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<Option<String>> {
        self.with_element(node, "remove_attribute", |attributes, _| {
            attributes.shift_remove(name)
        })
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> Result<bool> {
        self.with_element(node, "has_class", |_, classes| classes.contains(class))
    }

    pub fn add_class(&self, node: NodeId, class: impl Into<String>) -> Result<()> {
        self.with_element(node, "add_class", |_, classes| {
            classes.insert(class.into());
        })
    }

    pub fn remove_class(&self, node: NodeId, class: &str) -> Result<()> {
        self.with_element(node, "remove_class", |_, classes| {
            classes.shift_remove(class);
        })
    }

    /// Add `class` when `on` is true, remove it otherwise.
    pub fn toggle_class(&self, node: NodeId, class: &str, on: bool) -> Result<()> {
        if on {
            self.add_class(node, class)
        } else {
            self.remove_class(node, class)
        }
    }

    fn with_element<R>(
        &self,
        node: NodeId,
        operation: &'static str,
        f: impl FnOnce(&mut IndexMap<String, String>, &mut indexmap::IndexSet<String>) -> R,
    ) -> Result<R> {
        let mut tree = self.inner.tree.borrow_mut();
        match &mut tree.get_mut(node)?.kind {
            NodeKind::Element {
                attributes,
                classes,
                ..
            } => Ok(f(attributes, classes)),
            _ => Err(Error::WrongNodeKind { node, operation }),
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener<F>(
        &self,
        node: NodeId,
        event: impl Into<String>,
        callback: F,
    ) -> Result<ListenerHandle>
    where
        F: Fn(&Document, &Event) + 'static,
    {
        self.register(node, event.into(), Rc::new(callback), false)
    }

    /// Register a listener that is removed after its first call.
    pub fn add_event_listener_once<F>(
        &self,
        node: NodeId,
        event: impl Into<String>,
        callback: F,
    ) -> Result<ListenerHandle>
    where
        F: Fn(&Document, &Event) + 'static,
    {
        self.register(node, event.into(), Rc::new(callback), true)
    }

    fn register(
        &self,
        node: NodeId,
        event: String,
        callback: Rc<dyn Fn(&Document, &Event)>,
        once: bool,
    ) -> Result<ListenerHandle> {
        let id = self.inner.next_listener.get();
        let handle = ListenerHandle { node, id };

        self.inner.tree.borrow_mut().get_mut(node)?.listeners.push(Listener {
            handle,
            event,
            callback,
            once,
        });
        self.inner.next_listener.set(id + 1);
        Ok(handle)
    }

    /// Returns `false` if the listener or its node is already gone.
    pub fn remove_event_listener(&self, handle: ListenerHandle) -> bool {
        let mut tree = self.inner.tree.borrow_mut();
        let Ok(data) = tree.get_mut(handle.node) else {
            return false;
        };
        let before = data.listeners.len();
        data.listeners.retain(|l| l.handle != handle);
        data.listeners.len() != before
    }

    /// Dispatch `event` on `node`; returns how many listeners ran.
    ///
    /// Events do not bubble. A listener removed by an earlier listener of
    /// the same dispatch is not called.
    pub fn dispatch(&self, node: NodeId, event: &str) -> Result<usize> {
        let matching: Vec<_> = {
            let mut tree = self.inner.tree.borrow_mut();
            let data = tree.get_mut(node)?;
            let matching = data
                .listeners
                .iter()
                .filter(|l| l.event == event)
                .map(|l| (l.handle, Rc::clone(&l.callback), l.once))
                .collect();
            data.listeners.retain(|l| !(l.once && l.event == event));
            matching
        };

        let payload = Event::new(event, node);
        let mut called = 0;
        for (handle, callback, once) in matching {
            if !once && !self.has_listener(handle) {
                continue;
            }
            callback(self, &payload);
            called += 1;
        }
        Ok(called)
    }

    fn has_listener(&self, handle: ListenerHandle) -> bool {
        self.inner
            .tree
            .borrow()
            .get(handle.node)
            .is_ok_and(|data| data.listeners.iter().any(|l| l.handle == handle))
    }

    // ------------------------------------------------------------------
    // Microtasks
    // ------------------------------------------------------------------

    pub fn queue_microtask<F>(&self, task: F)
    where
        F: FnOnce(&Document) -> Result<()> + 'static,
    {
        self.inner.microtasks.borrow_mut().push_back(Box::new(task));
    }

    pub fn pending_microtasks(&self) -> usize {
        self.inner.microtasks.borrow().len()
    }

    /// Run queued microtasks until the queue is empty, including any queued
    /// while flushing. Returns how many ran. Failures are logged.
    pub fn flush_microtasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let Some(task) = self.inner.microtasks.borrow_mut().pop_front() else {
                break;
            };
            if let Err(err) = task(self) {
                error!(%err, "microtask failed");
            }
            ran += 1;
        }
        ran
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Serialize a subtree as markup.
    pub fn to_html(&self, node: NodeId) -> Result<String> {
        let mut out = String::new();
        write_html(&self.snapshot(node)?, &mut out);
        Ok(out)
    }

    /// A detached, serializable copy of a subtree.
    pub fn snapshot(&self, node: NodeId) -> Result<NodeSnapshot> {
        let tree = self.inner.tree.borrow();
        snapshot_of(&tree, node)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.inner.root)
            .field("nodes", &self.node_count())
            .field("pending_microtasks", &self.pending_microtasks())
            .finish()
    }
}

fn snapshot_of(tree: &Tree, node: NodeId) -> Result<NodeSnapshot> {
    let data = tree.get(node)?;
    Ok(match &data.kind {
        NodeKind::Element {
            tag,
            attributes,
            classes,
        } => NodeSnapshot::Element {
            tag: tag.clone(),
            attributes: attributes.clone(),
            classes: classes.iter().cloned().collect(),
            children: data
                .children
                .iter()
                .map(|&child| snapshot_of(tree, child))
                .collect::<Result<_>>()?,
        },
        NodeKind::Text(text) => NodeSnapshot::Text { text: text.clone() },
        NodeKind::Comment(text) => NodeSnapshot::Comment { text: text.clone() },
    })
}

fn write_html(node: &NodeSnapshot, out: &mut String) {
    match node {
        NodeSnapshot::Element {
            tag,
            attributes,
            classes,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push_str(&format!(" {name}=\"{}\"", escape(value, true)));
            }
            if !classes.is_empty() {
                out.push_str(&format!(" class=\"{}\"", escape(&classes.join(" "), true)));
            }
            out.push('>');
            for child in children {
                write_html(child, out);
            }
            out.push_str(&format!("</{tag}>"));
        }
        NodeSnapshot::Text { text } => out.push_str(&escape(text, false)),
        NodeSnapshot::Comment { text } => out.push_str(&format!("<!--{text}-->")),
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
