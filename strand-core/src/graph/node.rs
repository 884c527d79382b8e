//! Graph Nodes
//!
//! This module defines the two kinds of node that live in the dependency
//! graph: listener sets, owned by cells and keyed properties, and
//! computations, owned by watchers.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

use crate::reactive::Trigger;
use crate::Result;

/// Unique identifier for a listener set in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener set ID.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Unique identifier for a computation (watcher) in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// The body of a computation, invoked with the write that caused the run.
pub(crate) type Body = Rc<RefCell<dyn FnMut(&Trigger<'_>) -> Result<()>>>;

/// How a computation chooses what it is subscribed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tracking {
    /// Subscriptions are rebuilt from the reads performed during each run.
    Implicit,

    /// Subscriptions are fixed at creation; reads inside the body are ignored.
    Fixed(Vec<ListenerId>),
}

/// A listener set: the computations currently subscribed to one cell or key.
///
/// Subscribers are kept in insertion order, which is also notification order.
#[derive(Debug, Default)]
pub struct ListenerNode {
    subscribers: IndexSet<SubscriberId>,
}

impl ListenerNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subscriber(&mut self, id: SubscriberId) -> bool {
        self.subscribers.insert(id)
    }

    /// Remove a subscriber, preserving the order of the rest.
    pub fn remove_subscriber(&mut self, id: SubscriberId) -> bool {
        self.subscribers.shift_remove(&id)
    }

    pub fn subscribers(&self) -> &IndexSet<SubscriberId> {
        &self.subscribers
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// A computation node.
pub struct ComputationNode {
    /// Unique identifier for this node.
    id: SubscriberId,

    /// Listener sets this computation is currently part of.
    dependencies: IndexSet<ListenerId>,

    tracking: Tracking,

    body: Body,

    /// Set while the body is executing.
    running: bool,

    /// A write to one of its dependencies arrived while it was running.
    pending: bool,

    /// Number of times the body has been entered.
    runs: usize,
}

impl ComputationNode {
    pub(crate) fn new(tracking: Tracking, body: Body) -> Self {
        Self {
            id: SubscriberId::new(),
            dependencies: IndexSet::new(),
            tracking,
            body,
            running: false,
            pending: false,
            runs: 0,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn tracking(&self) -> &Tracking {
        &self.tracking
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub(crate) fn body(&self) -> Body {
        Rc::clone(&self.body)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        if running {
            self.runs += 1;
        } else {
            self.pending = false;
        }
        self.running = running;
    }

    pub(crate) fn mark_pending(&mut self) {
        self.pending = true;
    }

    pub(crate) fn take_pending(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn add_dependency(&mut self, id: ListenerId) -> bool {
        self.dependencies.insert(id)
    }

    pub fn remove_dependency(&mut self, id: ListenerId) -> bool {
        self.dependencies.shift_remove(&id)
    }

    pub fn dependencies(&self) -> &IndexSet<ListenerId> {
        &self.dependencies
    }

    /// Clear all dependencies, returning what was held.
    pub(crate) fn take_dependencies(&mut self) -> IndexSet<ListenerId> {
        std::mem::take(&mut self.dependencies)
    }
}

impl fmt::Debug for ComputationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputationNode")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("tracking", &self.tracking)
            .field("running", &self.running)
            .field("pending", &self.pending)
            .field("runs", &self.runs)
            .finish()
    }
}
