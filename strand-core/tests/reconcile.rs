//! Integration Tests for Keyed List Reconciliation
//!
//! These tests drive a `For` list through its backing vector and check the
//! rendered tree, node identity, index cells and resource release.

use std::rc::Rc;

use strand_core::bind;
use strand_core::components::{For, Mutation, Phase};
use strand_core::dom::{destroy_node, Document, NodeId, NodeSnapshot};
use strand_core::reactive::{ReactiveVec, Runtime};
use strand_core::Error;

type Item = Rc<String>;

fn item(name: &str) -> Item {
    Rc::new(name.to_string())
}

/// A mounted `<ul>` whose items render as `<li>{index}:{name}</li>`, with
/// the index kept live by a text binding.
fn mounted(names: &[&str]) -> (Document, NodeId, ReactiveVec<Item>, For<Item>) {
    let doc = Document::new();
    let ul = doc.create_element("ul");
    doc.append_child(doc.root(), ul).unwrap();

    let each = ReactiveVec::from_vec(names.iter().map(|n| item(n)).collect());
    let list = For::new(&doc, each.clone(), |doc, item: &Item, index| {
        let li = doc.create_element("li");
        let slot = doc.create_comment("");
        doc.append_child(li, slot)?;
        let name = Rc::clone(item);
        bind::text(doc, slot, move || format!("{}:{}", index.get(), name))?;
        Ok(li)
    })
    .unwrap();

    doc.append_child(ul, list.anchor()).unwrap();
    doc.flush_microtasks();
    (doc, ul, each, list)
}

fn texts(doc: &Document, ul: NodeId) -> Vec<String> {
    doc.children(ul)
        .unwrap()
        .into_iter()
        .map(|li| doc.text_content(li).unwrap())
        .collect()
}

fn assert_in_sync(doc: &Document, ul: NodeId, list: &For<Item>) {
    assert_eq!(list.elements(), doc.children(ul).unwrap());
    assert_eq!(list.indices(), (0..list.len()).collect::<Vec<_>>());
    assert!(Runtime::is_consistent());
}

/// Appending three items to an empty list renders them in order.
#[test]
fn append_to_an_empty_list() {
    let (doc, ul, each, list) = mounted(&[]);

    for name in ["a", "b", "c"] {
        each.push(item(name)).unwrap();
    }

    assert_eq!(texts(&doc, ul), vec!["0:a", "1:b", "2:c"]);
    assert_in_sync(&doc, ul, &list);
}

/// Swapping two items moves their nodes rather than re-rendering them, and
/// updates their index cells.
#[test]
fn moves_preserve_node_identity() {
    let (doc, ul, each, list) = mounted(&["a", "b", "c"]);
    let before = list.elements();

    each.swap(0, 2).unwrap();

    assert_eq!(texts(&doc, ul), vec!["0:c", "1:b", "2:a"]);
    assert_eq!(list.elements(), vec![before[2], before[1], before[0]]);
    assert_in_sync(&doc, ul, &list);
}

/// Sorting reorders by moves only.
#[test]
fn sorting_reuses_every_node() {
    let (doc, ul, each, list) = mounted(&["d", "b", "a", "c"]);
    let before = list.elements();

    each.sort_by(|x, y| x.cmp(y)).unwrap();

    assert_eq!(texts(&doc, ul), vec!["0:a", "1:b", "2:c", "3:d"]);
    let mut after = list.elements();
    after.sort_by_key(|id| id.index());
    let mut original = before;
    original.sort_by_key(|id| id.index());
    assert_eq!(after, original);
    assert_in_sync(&doc, ul, &list);
}

/// Truncating from five to two destroys the tail; the head stays reactive.
#[test]
fn truncation_keeps_the_head_reactive() {
    let (doc, ul, each, list) = mounted(&["a", "b", "c", "d", "e"]);
    let head: Vec<_> = list.elements()[..2].to_vec();
    let tail: Vec<_> = list.elements()[2..].to_vec();

    each.truncate(2).unwrap();
    assert_eq!(texts(&doc, ul), vec!["0:a", "1:b"]);
    assert_eq!(list.elements(), head);
    assert!(tail.iter().all(|&id| !doc.is_alive(id)));

    // Index 0 still reacts.
    each.set(0, item("z")).unwrap();
    assert_eq!(texts(&doc, ul), vec!["0:z", "1:b"]);

    // Moving still updates the live index bindings.
    each.swap(0, 1).unwrap();
    assert_eq!(texts(&doc, ul), vec!["0:b", "1:z"]);
    assert_in_sync(&doc, ul, &list);
}

/// A write past the end fails, leaves the mount list untouched and stops
/// the reconciler.
#[test]
fn out_of_bounds_write_fails_and_leaves_the_list() {
    let (doc, ul, each, list) = mounted(&["a", "b", "c"]);
    let before = list.elements();

    let err = list.apply(Mutation::Index(10, item("x"))).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfBounds { index: 10, len: 3 }));
    assert_eq!(list.elements(), before);
    assert_eq!(list.phase(), Phase::Failed);

    // Later writes are ignored.
    each.push(item("d")).unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(texts(&doc, ul), vec!["0:a", "1:b", "2:c"]);
}

/// Destroying the list's parent releases every computation the list and
/// its items created.
#[test]
fn destroy_releases_resources() {
    let baseline = Runtime::computation_count();
    let (doc, ul, each, list) = mounted(&["a", "b", "c"]);
    assert!(Runtime::computation_count() > baseline);

    destroy_node(&doc, ul).unwrap();

    assert_eq!(list.phase(), Phase::Disposed);
    assert_eq!(Runtime::computation_count(), baseline);
    assert_eq!(Runtime::subscriber_count(each.listeners()), 0);
    assert_eq!(doc.listener_count(), 0);
}

/// Removing from the middle shifts later items down by moves, and
/// inserting re-renders only what it must.
#[test]
fn middle_removal_and_insertion() {
    let (doc, ul, each, list) = mounted(&["a", "b", "c", "d"]);
    let d = list.elements()[3];

    each.remove(1).unwrap();
    assert_eq!(texts(&doc, ul), vec!["0:a", "1:c", "2:d"]);
    assert_eq!(list.elements()[2], d);

    each.insert(1, item("x")).unwrap();
    assert_eq!(texts(&doc, ul), vec!["0:a", "1:x", "2:c", "3:d"]);
    assert_in_sync(&doc, ul, &list);
}

/// The rendered tree serializes for structural assertions.
#[test]
fn snapshot_of_a_rendered_list() {
    let (doc, ul, _each, _list) = mounted(&["a"]);

    let snapshot = doc.snapshot(ul).unwrap();
    let NodeSnapshot::Element { tag, children, .. } = &snapshot else {
        panic!("expected an element");
    };
    assert_eq!(tag, "ul");
    assert_eq!(children.len(), 1);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["children"][0]["children"][0]["text"], "0:a");
}
