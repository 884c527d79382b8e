//! Conditional rendering.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, warn};

use super::{Elements, IntoElements};
use crate::dom::{destroy_node, Document, NodeId, DESTROY};
use crate::reactive::{try_watch, untrack, Watcher};
use crate::Result;

/// Show the nodes built by `create` in place of `anchor` while `condition`
/// holds, and put `anchor` back when it stops holding.
///
/// `create` runs once, the first time the condition holds, and its reads
/// are not tracked; the same nodes are reused on every later switch.
/// Destroying the shown nodes, or the anchor while they are hidden, stops
/// the watcher.
pub fn show<C, E, F>(
    doc: &Document,
    anchor: NodeId,
    mut create: C,
    mut condition: F,
) -> Result<Watcher>
where
    C: FnMut(&Document) -> Result<E> + 'static,
    E: IntoElements,
    F: FnMut() -> bool + 'static,
{
    let created: Rc<RefCell<Option<Elements>>> = Rc::new(RefCell::new(None));
    let slot: Rc<Cell<Option<Watcher>>> = Rc::new(Cell::new(None));

    let target = doc.clone();
    let nodes = Rc::clone(&created);
    let owner = Rc::clone(&slot);
    let mut showing = false;

    let watcher = try_watch(move |_| {
        let want = condition();
        if want == showing {
            return Ok(());
        }

        if want {
            if target.parent(anchor)?.is_none() {
                warn!(%anchor, "conditional anchor has no parent; not showing");
                return Ok(());
            }
            let existing = nodes.borrow().clone();
            let elements = match existing {
                Some(elements) => elements,
                None => {
                    let elements = build(&target, &mut create, anchor, &owner)?;
                    *nodes.borrow_mut() = Some(elements.clone());
                    elements
                }
            };
            target.replace_with(anchor, &elements)?;
        } else {
            let Some(elements) = nodes.borrow().clone() else {
                return Ok(());
            };
            if target.parent(elements[0])?.is_none() {
                warn!(%anchor, "conditional nodes have no parent; not hiding");
                return Ok(());
            }
            target.before(elements[0], &[anchor])?;
            for &node in &elements {
                target.remove(node)?;
            }
        }

        debug!(%anchor, showing = want, "switched conditional");
        showing = want;
        Ok(())
    })?;
    slot.set(Some(watcher));

    doc.add_event_listener_once(anchor, DESTROY, move |doc, _| {
        let shown = created.borrow().clone();
        match shown {
            Some(elements) => {
                for &node in &elements {
                    if let Err(err) = destroy_node(doc, node) {
                        warn!(%err, "failed to destroy conditional nodes");
                    }
                }
            }
            None => {
                watcher.dispose();
            }
        }
    })?;

    Ok(watcher)
}

fn build<C, E>(
    doc: &Document,
    create: &mut C,
    anchor: NodeId,
    owner: &Rc<Cell<Option<Watcher>>>,
) -> Result<Elements>
where
    C: FnMut(&Document) -> Result<E>,
    E: IntoElements,
{
    let mut elements = untrack(|| (*create)(doc))?.into_elements();
    if elements.is_empty() {
        elements.push(doc.create_comment(""));
    }

    for &node in &elements {
        let owner = Rc::clone(owner);
        doc.add_event_listener_once(node, DESTROY, move |doc, _| {
            if let Some(watcher) = owner.get() {
                watcher.dispose();
            }
            if doc.is_alive(anchor) {
                if let Err(err) = doc.remove(anchor) {
                    warn!(%err, "failed to remove conditional anchor");
                }
            }
        })?;
    }
    Ok(elements)
}
