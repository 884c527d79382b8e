//! Strand Core
//!
//! This crate provides the core runtime for the Strand fine-grained reactive
//! DOM engine. It implements:
//!
//! - Reactive primitives (cells, keyed containers, watchers, computeds)
//! - A thread-local dependency graph with per-key granularity
//! - A host display tree with mount/unmount/destroy lifecycle events
//! - Keyed list reconciliation that moves nodes instead of re-rendering them
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Dependency bookkeeping between listener sets and computations
//! - `reactive`: Cells, containers, watchers and the tracking context
//! - `dom`: The arena-backed display tree the engine mutates
//! - `bind`: Watchers that keep one node's text, attribute or class current
//! - `components`: The list reconciler and conditional rendering
//!
//! Everything runs synchronously on one thread. A write re-runs its
//! watchers before it returns, and watchers mutate the tree directly.
//!
//! # Example
//!
//! ```rust
//! use strand_core::bind;
//! use strand_core::dom::Document;
//! use strand_core::reactive::Ref;
//!
//! let doc = Document::new();
//! let p = doc.create_element("p");
//! let slot = doc.create_comment("");
//! doc.append_child(p, slot).unwrap();
//! doc.append_child(doc.root(), p).unwrap();
//!
//! let count = Ref::new(0);
//! let c = count.clone();
//! bind::text(&doc, slot, move || format!("Count: {}", c.get())).unwrap();
//!
//! count.set(5).unwrap();
//! assert_eq!(doc.to_html(p).unwrap(), "<p>Count: 5</p>");
//! ```

pub mod bind;
pub mod components;
pub mod dom;
pub mod error;
pub mod graph;
pub mod reactive;

pub use error::{Error, Result};
