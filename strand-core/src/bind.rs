//! Binding glue between watchers and display nodes.
//!
//! Each binding creates one watcher that keeps one node up to date and
//! ties the watcher's lifetime to that node's [`DESTROY`] notification.
//! `unmount` does not stop a binding: a detached node keeps tracking so it
//! is current when reattached.

use std::fmt::Display;

use tracing::trace;

use crate::dom::{Document, ListenerHandle, NodeId, DESTROY};
use crate::reactive::{try_watch, Watcher};
use crate::Result;

/// Dispose `watcher` when `node` is destroyed.
pub fn dispose_on_destroy(
    doc: &Document,
    node: NodeId,
    watcher: Watcher,
) -> Result<ListenerHandle> {
    doc.add_event_listener_once(node, DESTROY, move |_, event| {
        if watcher.dispose() {
            trace!(node = %event.target, "disposed binding on destroy");
        }
    })
}

/// Replace `anchor` with a text node whose content tracks `f`.
///
/// Returns the text node.
pub fn text<F, S>(doc: &Document, anchor: NodeId, mut f: F) -> Result<NodeId>
where
    F: FnMut() -> S + 'static,
    S: Display,
{
    let node = doc.create_text("");
    doc.replace_with(anchor, &[node])?;

    let target = doc.clone();
    let watcher = try_watch(move |_| target.set_text(node, f().to_string()))?;
    dispose_on_destroy(doc, node, watcher)?;
    Ok(node)
}

/// Keep attribute `name` of `node` in sync with `f`: `Some` sets it, `None`
/// removes it.
pub fn attribute<F>(
    doc: &Document,
    node: NodeId,
    name: impl Into<String>,
    mut f: F,
) -> Result<Watcher>
where
    F: FnMut() -> Option<String> + 'static,
{
    let name = name.into();
    let target = doc.clone();
    let watcher = try_watch(move |_| match f() {
        Some(value) => target.set_attribute(node, name.clone(), value),
        None => target.remove_attribute(node, &name).map(drop),
    })?;
    dispose_on_destroy(doc, node, watcher)?;
    Ok(watcher)
}

/// Toggle `class` on `node` as `f` flips.
pub fn class<F>(
    doc: &Document,
    node: NodeId,
    class: impl Into<String>,
    mut f: F,
) -> Result<Watcher>
where
    F: FnMut() -> bool + 'static,
{
    let class = class.into();
    let target = doc.clone();
    let watcher = try_watch(move |_| target.toggle_class(node, &class, f()))?;
    dispose_on_destroy(doc, node, watcher)?;
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::destroy_node;
    use crate::reactive::Ref;

    fn mounted_anchor(doc: &Document) -> (NodeId, NodeId) {
        let p = doc.create_element("p");
        let anchor = doc.create_comment("");
        doc.append_child(p, anchor).unwrap();
        doc.append_child(doc.root(), p).unwrap();
        (p, anchor)
    }

    #[test]
    fn text_tracks_its_source() {
        let doc = Document::new();
        let (p, anchor) = mounted_anchor(&doc);
        let count = Ref::new(1);

        let c = count.clone();
        let node = text(&doc, anchor, move || format!("count: {}", c.get())).unwrap();
        assert_eq!(doc.to_html(p).unwrap(), "<p>count: 1</p>");
        assert_eq!(doc.parent(anchor).unwrap(), None);

        count.set(2).unwrap();
        assert_eq!(doc.text_content(node).unwrap(), "count: 2");
    }

    #[test]
    fn destroy_disposes_exactly_once_and_unmount_does_not() {
        let doc = Document::new();
        let (p, anchor) = mounted_anchor(&doc);
        let count = Ref::new(0);

        let c = count.clone();
        let node = text(&doc, anchor, move || c.get()).unwrap();
        assert_eq!(count.subscriber_count(), 1);

        doc.remove(p).unwrap();
        doc.flush_microtasks();
        count.set(5).unwrap();
        assert_eq!(doc.text_content(node).unwrap(), "5");

        destroy_node(&doc, p).unwrap();
        assert_eq!(count.subscriber_count(), 0);
        assert_eq!(doc.listener_count(), 0);

        count.set(6).unwrap();
        assert_eq!(doc.text_content(node).unwrap(), "5");
    }

    #[test]
    fn attribute_sets_and_removes() {
        let doc = Document::new();
        let input = doc.create_element("input");
        let title = Ref::new(Some("hi".to_string()));

        let t = title.clone();
        attribute(&doc, input, "title", move || t.get()).unwrap();
        assert_eq!(doc.attribute(input, "title").unwrap().as_deref(), Some("hi"));

        title.set(None).unwrap();
        assert_eq!(doc.attribute(input, "title").unwrap(), None);
    }

    #[test]
    fn class_toggles() {
        let doc = Document::new();
        let div = doc.create_element("div");
        let active = Ref::new(false);

        let a = active.clone();
        let watcher = class(&doc, div, "active", move || a.get()).unwrap();
        assert!(!doc.has_class(div, "active").unwrap());

        active.set(true).unwrap();
        assert!(doc.has_class(div, "active").unwrap());

        destroy_node(&doc, div).unwrap();
        assert!(watcher.is_disposed());
    }

    #[test]
    fn binding_a_dead_node_fails_at_creation() {
        let doc = Document::new();
        let div = doc.create_element("div");
        doc.release(div).unwrap();

        let err = class(&doc, div, "x", || true).unwrap_err();
        assert!(matches!(err, crate::Error::DeadNode(_)));
    }
}
