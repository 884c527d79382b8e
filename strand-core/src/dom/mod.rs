//! Host Display Tree
//!
//! An arena of display nodes (elements, text, comments) that the reactive
//! layer mutates in place. It provides the primitive tree operations the
//! binding and list code is written against, the `mount` / `unmount` /
//! `destroy` lifecycle, and a microtask queue standing in for the host's
//! microtask checkpoint.
//!
//! # Example
//!
//! ```rust
//! use strand_core::dom::Document;
//!
//! let doc = Document::new();
//! let p = doc.create_element("p");
//! doc.append_child(p, doc.create_text("hello")).unwrap();
//! doc.append_child(doc.root(), p).unwrap();
//!
//! assert_eq!(doc.to_html(p).unwrap(), "<p>hello</p>");
//! ```

mod anchor;
mod config;
mod document;
mod events;
mod lifecycle;
mod node;
mod snapshot;

pub use anchor::{InsertionPoint, PositionAnchor};
pub use config::DocumentConfig;
pub use document::Document;
pub use events::{Event, ListenerHandle, DESTROY, MOUNT, UNMOUNT};
pub use lifecycle::{destroy_node, notify_subtree};
pub use node::{NodeId, NodeKind};
pub use snapshot::NodeSnapshot;
