//! Dependency Graph
//!
//! This module implements the subscription bookkeeping between observable
//! storage and the computations that read it.
//!
//! # Overview
//!
//! The graph is bipartite:
//!
//! - Listener sets stand for one cell, or one key of a reactive container
//! - Computations stand for one watcher body
//!
//! An edge (listener set, computation) means "writing this cell re-runs
//! this computation". Edges are navigable from both sides: a listener set
//! enumerates its subscribers when it is written, and a computation
//! enumerates its listener sets when it is cleaned up before a re-run.
//!
//! # Design Decisions
//!
//! 1. The graph is thread-local. Reactivity is single-threaded and
//!    synchronous, so no locking is involved.
//!
//! 2. Nodes are indexed by ID for O(1) lookups, and both endpoints of an
//!    edge are updated in the same call.
//!
//! 3. Subscriber order is insertion order, which fixes notification order.

mod node;
mod store;

pub use node::{ComputationNode, ListenerId, ListenerNode, SubscriberId, Tracking};
pub use store::Graph;

pub(crate) use node::Body;
pub(crate) use store::{try_with_graph, with_graph, RunStart};
