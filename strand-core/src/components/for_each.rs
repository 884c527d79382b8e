//! Keyed list reconciliation.
//!
//! [`For`] renders one node set per item of a [`ReactiveVec`] and keeps the
//! rendered run in step with the vector without re-rendering it. Items are
//! keyed by [`Identity`], so an item that moves keeps its nodes.
//!
//! # How Reconciliation Works
//!
//! The vector reports every change as index writes followed by at most one
//! length write. The reconciler keeps a mount list of `(item, node)` pairs
//! mirroring the vector and handles each write on its own:
//!
//! 1. **Index write `i := v`**
//!    - the item at `i` is already `v`: nothing to do
//!    - `v` is mounted elsewhere at `j`: swap the two node sets in the
//!      document through placeholder comments, swap the list entries and
//!      update both index cells
//!    - `i` is the end of the list: render `v` and insert it after the last
//!      mounted element
//!    - otherwise: render `v` in place of the old node, which is destroyed
//!    - `i` past the end: the lists have desynchronized; the write fails
//!      and the reconciler stops
//!
//! 2. **Length write `n`**: destroy and remove every node at `n` or later.
//!    Growth is ignored, the index writes carry the new items.
//!
//! After every write, `mount[k].index == k` and the document order of the
//! concatenated elements equals the mount list order.
//!
//! The first render happens one microtask after construction, once the
//! anchor comment has been placed in the tree.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, warn};

use super::{Elements, Identity, IntoElements};
use crate::dom::{destroy_node, Document, NodeId, PositionAnchor, DESTROY};
use crate::reactive::{try_watch_only, untrack, PropKey, ReactiveVec, Ref, Trigger, Watcher};
use crate::{Error, Result};

/// Where a [`For`] is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first render.
    Unmounted,
    /// Rendered and following the vector.
    Mounted,
    /// A write could not be applied; later writes are ignored.
    Failed,
    /// Stopped by [`For::dispose`] or by destroying its nodes.
    Disposed,
}

/// One write to the backing vector, as seen by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<T> {
    Index(usize, T),
    Length(usize),
}

struct ReconcilerNode {
    index: Ref<usize>,
    elements: Elements,
}

type Render<T> = dyn FnMut(&Document, &T, Ref<usize>) -> Result<Elements>;

enum Plan {
    Keep,
    Append,
    Move(usize),
    Replace,
}

struct Shared<T: 'static> {
    doc: Document,
    anchor: NodeId,
    each: ReactiveVec<T>,
    render: RefCell<Box<Render<T>>>,
    mount: RefCell<Vec<(T, ReconcilerNode)>>,
    phase: Cell<Phase>,
    /// Where to put items back after the list has been emptied.
    position: Cell<Option<PositionAnchor>>,
    watcher: Cell<Option<Watcher>>,
}

/// A reactive list rendered from a [`ReactiveVec`].
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
/// use strand_core::components::For;
/// use strand_core::dom::Document;
/// use strand_core::reactive::ReactiveVec;
///
/// let doc = Document::new();
/// let ul = doc.create_element("ul");
/// doc.append_child(doc.root(), ul).unwrap();
///
/// let items = ReactiveVec::from_vec(vec![Rc::new("a"), Rc::new("b")]);
/// let list = For::new(&doc, items.clone(), |doc, item, _index| {
///     let li = doc.create_element("li");
///     doc.append_child(li, doc.create_text(**item))?;
///     Ok(li)
/// })
/// .unwrap();
/// doc.append_child(ul, list.anchor()).unwrap();
/// doc.flush_microtasks();
///
/// items.push(Rc::new("c")).unwrap();
/// assert_eq!(doc.to_html(ul).unwrap(), "<ul><li>a</li><li>b</li><li>c</li></ul>");
/// ```
pub struct For<T: 'static> {
    shared: Rc<Shared<T>>,
    watcher: Watcher,
}

impl<T: Identity + Clone + 'static> For<T> {
    /// Create the list. Insert [`anchor`](Self::anchor) where the list
    /// belongs; the items are rendered in its place on the next microtask
    /// flush.
    pub fn new<E, R>(doc: &Document, each: ReactiveVec<T>, mut render: R) -> Result<Self>
    where
        E: IntoElements,
        R: FnMut(&Document, &T, Ref<usize>) -> Result<E> + 'static,
    {
        let anchor = doc.create_comment("For");
        let render: Box<Render<T>> = Box::new(move |doc, item, index| {
            render(doc, item, index).map(IntoElements::into_elements)
        });

        let shared = Rc::new(Shared {
            doc: doc.clone(),
            anchor,
            each: each.clone(),
            render: RefCell::new(render),
            mount: RefCell::new(Vec::new()),
            phase: Cell::new(Phase::Unmounted),
            position: Cell::new(None),
            watcher: Cell::new(None),
        });

        let target = Rc::clone(&shared);
        let watcher = try_watch_only([each.listeners()], move |trigger| target.on_write(trigger))?;
        shared.watcher.set(Some(watcher));

        let weak = Rc::downgrade(&shared);
        doc.add_event_listener_once(anchor, DESTROY, move |_, _| {
            if let Some(shared) = weak.upgrade() {
                if shared.phase.get() == Phase::Unmounted {
                    shared.dispose();
                }
            }
        })?;

        let target = Rc::clone(&shared);
        doc.queue_microtask(move |_| {
            let result = target.mount();
            if result.is_err() {
                target.phase.set(Phase::Failed);
            }
            result
        });

        Ok(Self { shared, watcher })
    }

    /// The comment the list renders in place of. It is released once the
    /// list has mounted.
    pub fn anchor(&self) -> NodeId {
        self.shared.anchor
    }

    /// Feed one write to the reconciler, as the backing vector does.
    pub fn apply(&self, mutation: Mutation<T>) -> Result<()> {
        self.shared.apply(mutation)
    }

    /// Stop following the vector. Rendered nodes stay where they are.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    pub fn phase(&self) -> Phase {
        self.shared.phase.get()
    }

    pub fn watcher(&self) -> Watcher {
        self.watcher
    }

    /// Number of mounted items.
    pub fn len(&self) -> usize {
        self.shared.mount.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mounted items, in list order.
    pub fn items(&self) -> Vec<T> {
        self.shared
            .mount
            .borrow()
            .iter()
            .map(|(item, _)| item.clone())
            .collect()
    }

    /// Mounted elements, concatenated in list order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.shared.elements()
    }

    /// Current value of every item's index cell, in list order.
    pub fn indices(&self) -> Vec<usize> {
        self.shared
            .mount
            .borrow()
            .iter()
            .map(|(_, node)| node.index.get_untracked())
            .collect()
    }
}

impl<T: 'static> fmt::Debug for For<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("For")
            .field("anchor", &self.shared.anchor)
            .field("phase", &self.shared.phase.get())
            .field("len", &self.shared.mount.borrow().len())
            .finish()
    }
}

impl<T: Identity + Clone + 'static> Shared<T> {
    fn mount(self: &Rc<Self>) -> Result<()> {
        if self.phase.get() != Phase::Unmounted {
            return Ok(());
        }
        if !self.doc.is_connected(self.anchor) {
            warn!(anchor = %self.anchor, "list anchor is not mounted");
            return Ok(());
        }
        let parent = self
            .doc
            .parent(self.anchor)?
            .ok_or(Error::Detached(self.anchor))?;

        let mut mount = Vec::new();
        for (i, item) in self.each.to_vec_untracked().into_iter().enumerate() {
            let node = self.render_node(&item, i)?;
            mount.push((item, node));
        }

        let elements: Vec<NodeId> = mount
            .iter()
            .flat_map(|(_, node)| node.elements.iter().copied())
            .collect();
        if elements.is_empty() {
            self.position
                .set(Some(PositionAnchor::capture(&self.doc, self.anchor)?));
        } else {
            self.doc.replace_with(self.anchor, &elements)?;
        }
        // The anchor is spent once the list has a position of its own.
        self.doc.release(self.anchor)?;

        *self.mount.borrow_mut() = mount;
        self.phase.set(Phase::Mounted);

        let weak: Weak<Self> = Rc::downgrade(self);
        self.doc.add_event_listener_once(parent, DESTROY, move |_, _| {
            if let Some(shared) = weak.upgrade() {
                shared.dispose();
            }
        })?;

        debug!(anchor = %self.anchor, items = self.mount.borrow().len(), "mounted list");
        Ok(())
    }

    fn on_write(&self, trigger: &Trigger<'_>) -> Result<()> {
        let mutation = match trigger.key() {
            Some(PropKey::Length) => match trigger.value::<usize>() {
                Some(&len) => Mutation::Length(len),
                None => return Ok(()),
            },
            Some(PropKey::Index(index)) => match trigger.value::<T>() {
                Some(item) => Mutation::Index(index, item.clone()),
                None => return Ok(()),
            },
            _ => return Ok(()),
        };
        self.apply(mutation)
    }

    fn apply(&self, mutation: Mutation<T>) -> Result<()> {
        match self.phase.get() {
            Phase::Mounted => {}
            Phase::Unmounted => {
                debug!(anchor = %self.anchor, "list not mounted yet; ignoring write");
                return Ok(());
            }
            Phase::Disposed => return Ok(()),
            Phase::Failed => {
                error!(anchor = %self.anchor, "list reconciler has failed; ignoring write");
                return Ok(());
            }
        }

        let result = match mutation {
            Mutation::Length(len) => self.shrink(len),
            Mutation::Index(index, item) => self.write(index, item),
        };
        if result.is_err() {
            self.phase.set(Phase::Failed);
        }
        result
    }

    fn shrink(&self, len: usize) -> Result<()> {
        let removed = {
            let mut mount = self.mount.borrow_mut();
            if len >= mount.len() {
                return Ok(());
            }
            mount.split_off(len)
        };

        if len == 0 {
            let first = removed
                .first()
                .and_then(|(_, node)| node.elements.first().copied());
            let last = removed
                .last()
                .and_then(|(_, node)| node.elements.last().copied());
            if let (Some(first), Some(last)) = (first, last) {
                match PositionAnchor::spanning(&self.doc, first, last) {
                    Ok(position) => self.position.set(Some(position)),
                    Err(err) => warn!(%err, "could not capture the list position"),
                }
            }
        }

        debug!(anchor = %self.anchor, from = len + removed.len(), to = len, "truncating list");
        for (_, node) in removed.into_iter().rev() {
            self.discard(node)?;
        }
        Ok(())
    }

    fn write(&self, index: usize, item: T) -> Result<()> {
        let plan = {
            let mount = self.mount.borrow();
            let len = mount.len();
            if index > len {
                return Err(Error::IndexOutOfBounds { index, len });
            }

            if index < len && mount[index].0.same(&item) {
                Plan::Keep
            } else if index == len {
                Plan::Append
            } else {
                mount
                    .iter()
                    .enumerate()
                    .find(|(k, (mounted, _))| *k != index && mounted.same(&item))
                    .map_or(Plan::Replace, |(k, _)| Plan::Move(k))
            }
        };

        match plan {
            Plan::Keep => Ok(()),
            Plan::Append => self.append(item),
            Plan::Move(from) => self.swap(index, from),
            Plan::Replace => self.replace(index, item),
        }
    }

    fn append(&self, item: T) -> Result<()> {
        let index = self.mount.borrow().len();
        let node = self.render_node(&item, index)?;

        let last = self
            .mount
            .borrow()
            .last()
            .and_then(|(_, node)| node.elements.last().copied());
        match (last, self.position.get()) {
            (Some(last), _) => self.doc.after(last, &node.elements)?,
            (None, Some(position)) => {
                position.insert(&self.doc, &node.elements)?;
                self.position.set(None);
            }
            (None, None) => return Err(Error::Detached(self.anchor)),
        }

        self.mount.borrow_mut().push((item, node));
        debug!(anchor = %self.anchor, index, "appended item");
        Ok(())
    }

    fn swap(&self, a: usize, b: usize) -> Result<()> {
        let (first, second) = {
            let mount = self.mount.borrow();
            (mount[a].1.elements.clone(), mount[b].1.elements.clone())
        };

        let doc = &self.doc;
        let hold_first = doc.create_comment("");
        let hold_second = doc.create_comment("");
        doc.before(first[0], &[hold_first])?;
        doc.before(second[0], &[hold_second])?;
        doc.replace_with(hold_first, &second)?;
        doc.replace_with(hold_second, &first)?;
        doc.release(hold_first)?;
        doc.release(hold_second)?;

        let (index_a, index_b) = {
            let mut mount = self.mount.borrow_mut();
            mount.swap(a, b);
            (mount[a].1.index.clone(), mount[b].1.index.clone())
        };
        debug!(anchor = %self.anchor, a, b, "moved item");

        index_a.set(a)?;
        index_b.set(b)
    }

    fn replace(&self, index: usize, item: T) -> Result<()> {
        let node = self.render_node(&item, index)?;
        let old_first = self.mount.borrow()[index].1.elements[0];
        self.doc.before(old_first, &node.elements)?;

        let (_, previous) = std::mem::replace(&mut self.mount.borrow_mut()[index], (item, node));
        debug!(anchor = %self.anchor, index, "replaced item");
        self.discard(previous)
    }

    fn render_node(&self, item: &T, index: usize) -> Result<ReconcilerNode> {
        let index = Ref::new(index);
        let elements = {
            let mut render = self.render.borrow_mut();
            untrack(|| (&mut **render)(&self.doc, item, index.clone()))?
        };

        // Every node keeps at least one element so it has a position.
        let elements = if elements.is_empty() {
            smallvec::smallvec![self.doc.create_comment("")]
        } else {
            elements
        };
        Ok(ReconcilerNode { index, elements })
    }

    fn discard(&self, node: ReconcilerNode) -> Result<()> {
        for &element in &node.elements {
            if self.doc.is_alive(element) {
                destroy_node(&self.doc, element)?;
                self.doc.release(element)?;
            }
        }
        Ok(())
    }

    fn elements(&self) -> Vec<NodeId> {
        self.mount
            .borrow()
            .iter()
            .flat_map(|(_, node)| node.elements.iter().copied())
            .collect()
    }
}

impl<T: 'static> Shared<T> {
    fn dispose(&self) {
        if self.phase.replace(Phase::Disposed) == Phase::Disposed {
            return;
        }
        if let Some(watcher) = self.watcher.get() {
            watcher.dispose();
        }
        debug!(anchor = %self.anchor, "disposed list");
    }
}

/// Render a fixed slice once, concatenating the results.
///
/// For lists that never change size. Use [`For`] otherwise.
pub fn fixed_for<T, E, R>(doc: &Document, items: &[T], mut render: R) -> Result<Elements>
where
    E: IntoElements,
    R: FnMut(&Document, &T, usize) -> Result<E>,
{
    let mut elements = Elements::new();
    for (index, item) in items.iter().enumerate() {
        elements.extend(render(doc, item, index)?.into_elements());
    }
    Ok(elements)
}
