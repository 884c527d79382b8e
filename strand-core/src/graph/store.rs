//! Graph Store
//!
//! The store owns every listener set and computation on the current thread
//! and the edges between them. Edges are recorded on both endpoints at once,
//! and every removal path (cleanup, disposal, dropping a listener set) clears
//! both endpoints together, so an edge never exists in only one direction.

use std::cell::RefCell;
use std::collections::HashMap;

use super::node::{Body, ComputationNode, ListenerId, ListenerNode, SubscriberId, Tracking};

thread_local! {
    static GRAPH: RefCell<Graph> = RefCell::new(Graph::new());
}

/// Run `f` against this thread's graph.
///
/// `f` must not call back into user code: the graph stays borrowed for its
/// whole duration.
pub(crate) fn with_graph<R>(f: impl FnOnce(&mut Graph) -> R) -> R {
    GRAPH.with(|graph| f(&mut graph.borrow_mut()))
}

/// Like [`with_graph`], but tolerates thread-local teardown.
///
/// Used from `Drop` impls, which may run after the graph itself is gone.
pub(crate) fn try_with_graph<R>(f: impl FnOnce(&mut Graph) -> R) -> Option<R> {
    GRAPH
        .try_with(|graph| graph.try_borrow_mut().ok().map(|mut g| f(&mut g)))
        .ok()
        .flatten()
}

/// What happened when a run was requested.
pub(crate) enum RunStart {
    /// The computation was cleaned up and marked running.
    Started { body: Body, tracked: bool },
    /// The computation is already executing further up the stack.
    Busy,
    /// The computation has been disposed.
    Gone,
}

/// The dependency graph.
#[derive(Debug, Default)]
pub struct Graph {
    listeners: HashMap<ListenerId, ListenerNode>,
    computations: HashMap<SubscriberId, ComputationNode>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener_set(&mut self) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.insert(id, ListenerNode::new());
        id
    }

    /// Remove a listener set, unlinking it from every subscribed computation.
    pub fn remove_listener_set(&mut self, id: ListenerId) {
        if let Some(node) = self.listeners.remove(&id) {
            for sub in node.subscribers() {
                if let Some(computation) = self.computations.get_mut(sub) {
                    computation.remove_dependency(id);
                }
            }
        }
    }

    pub(crate) fn add_computation(&mut self, node: ComputationNode) -> SubscriberId {
        let id = node.id();
        self.computations.insert(id, node);
        id
    }

    /// Remove a computation and every edge it participates in.
    ///
    /// The node is handed back so the caller can drop its body once the
    /// graph is no longer borrowed; the body may own listener sets whose
    /// drop unregisters them here.
    pub fn remove_computation(&mut self, id: SubscriberId) -> Option<ComputationNode> {
        self.cleanup(id);
        self.computations.remove(&id)
    }

    pub fn contains_computation(&self, id: SubscriberId) -> bool {
        self.computations.contains_key(&id)
    }

    pub fn computation(&self, id: SubscriberId) -> Option<&ComputationNode> {
        self.computations.get(&id)
    }

    /// Add the edge (listener set, computation).
    ///
    /// A no-op if either endpoint is missing.
    pub fn subscribe(&mut self, sub: SubscriberId, listener: ListenerId) -> bool {
        let (Some(computation), Some(node)) = (
            self.computations.get_mut(&sub),
            self.listeners.get_mut(&listener),
        ) else {
            return false;
        };
        node.add_subscriber(sub);
        computation.add_dependency(listener)
    }

    pub fn unsubscribe(&mut self, sub: SubscriberId, listener: ListenerId) {
        if let Some(node) = self.listeners.get_mut(&listener) {
            node.remove_subscriber(sub);
        }
        if let Some(computation) = self.computations.get_mut(&sub) {
            computation.remove_dependency(listener);
        }
    }

    /// Remove a computation from every listener set it is part of.
    pub fn cleanup(&mut self, sub: SubscriberId) {
        let Some(computation) = self.computations.get_mut(&sub) else {
            return;
        };
        for listener in computation.take_dependencies() {
            if let Some(node) = self.listeners.get_mut(&listener) {
                node.remove_subscriber(sub);
            }
        }
    }

    /// Snapshot of the subscribers of a listener set, in notification order.
    pub fn subscribers(&self, listener: ListenerId) -> Vec<SubscriberId> {
        self.listeners
            .get(&listener)
            .map(|node| node.subscribers().iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn dependencies(&self, sub: SubscriberId) -> Vec<ListenerId> {
        self.computations
            .get(&sub)
            .map(|node| node.dependencies().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Prepare a computation for a run: clean up, re-subscribe fixed
    /// dependencies, and mark it running.
    ///
    /// A computation that is already running is marked pending instead and
    /// picked up by [`Graph::restart_pending`] once its current run ends.
    pub(crate) fn begin_run(&mut self, sub: SubscriberId) -> RunStart {
        match self.computations.get_mut(&sub) {
            None => return RunStart::Gone,
            Some(node) if node.is_running() => {
                node.mark_pending();
                return RunStart::Busy;
            }
            Some(_) => {}
        }

        match self.restart(sub) {
            Some((body, tracked)) => RunStart::Started { body, tracked },
            None => RunStart::Gone,
        }
    }

    /// If a write arrived during the run that just finished, prepare the
    /// computation for another run and return `true`.
    pub(crate) fn restart_pending(&mut self, sub: SubscriberId) -> bool {
        let pending = self
            .computations
            .get_mut(&sub)
            .is_some_and(|node| node.take_pending());
        pending && self.restart(sub).is_some()
    }

    fn restart(&mut self, sub: SubscriberId) -> Option<(Body, bool)> {
        self.cleanup(sub);

        let node = self.computations.get_mut(&sub)?;
        node.set_running(true);
        let body = node.body();
        let fixed = match node.tracking() {
            Tracking::Implicit => None,
            Tracking::Fixed(deps) => Some(deps.clone()),
        };

        let tracked = fixed.is_none();
        for listener in fixed.into_iter().flatten() {
            self.subscribe(sub, listener);
        }

        Some((body, tracked))
    }

    pub(crate) fn end_run(&mut self, sub: SubscriberId) {
        if let Some(node) = self.computations.get_mut(&sub) {
            node.set_running(false);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn computation_count(&self) -> usize {
        self.computations.len()
    }

    /// Total number of edges, counted from the listener side.
    pub fn edge_count(&self) -> usize {
        self.listeners.values().map(|n| n.subscribers().len()).sum()
    }

    /// Check that every edge is recorded on both endpoints.
    pub fn is_consistent(&self) -> bool {
        let forward = self.listeners.iter().all(|(lid, node)| {
            node.subscribers().iter().all(|sub| {
                self.computations
                    .get(sub)
                    .is_some_and(|c| c.dependencies().contains(lid))
            })
        });
        let backward = self.computations.iter().all(|(sid, node)| {
            node.dependencies().iter().all(|lid| {
                self.listeners
                    .get(lid)
                    .is_some_and(|l| l.subscribers().contains(sid))
            })
        });
        forward && backward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Trigger;
    use std::rc::Rc;

    fn computation(graph: &mut Graph, tracking: Tracking) -> SubscriberId {
        let body: Body = Rc::new(RefCell::new(|_: &Trigger<'_>| Ok(())));
        graph.add_computation(ComputationNode::new(tracking, body))
    }

    #[test]
    fn subscribe_records_both_directions() {
        let mut graph = Graph::new();
        let listener = graph.add_listener_set();
        let sub = computation(&mut graph, Tracking::Implicit);

        assert!(graph.subscribe(sub, listener));
        assert_eq!(graph.subscribers(listener), vec![sub]);
        assert_eq!(graph.dependencies(sub), vec![listener]);
        assert!(graph.is_consistent());

        graph.unsubscribe(sub, listener);
        assert!(graph.subscribers(listener).is_empty());
        assert!(graph.dependencies(sub).is_empty());
    }

    #[test]
    fn subscribe_to_missing_endpoint_is_a_noop() {
        let mut graph = Graph::new();
        let listener = graph.add_listener_set();
        let sub = computation(&mut graph, Tracking::Implicit);
        graph.remove_computation(sub);

        assert!(!graph.subscribe(sub, listener));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn cleanup_removes_every_edge() {
        let mut graph = Graph::new();
        let a = graph.add_listener_set();
        let b = graph.add_listener_set();
        let sub = computation(&mut graph, Tracking::Implicit);
        let other = computation(&mut graph, Tracking::Implicit);

        graph.subscribe(sub, a);
        graph.subscribe(sub, b);
        graph.subscribe(other, a);

        graph.cleanup(sub);

        assert_eq!(graph.subscribers(a), vec![other]);
        assert!(graph.subscribers(b).is_empty());
        assert!(graph.dependencies(sub).is_empty());
        assert!(graph.is_consistent());
    }

    #[test]
    fn removing_a_listener_set_unlinks_subscribers() {
        let mut graph = Graph::new();
        let listener = graph.add_listener_set();
        let sub = computation(&mut graph, Tracking::Implicit);
        graph.subscribe(sub, listener);

        graph.remove_listener_set(listener);

        assert!(graph.dependencies(sub).is_empty());
        assert_eq!(graph.listener_count(), 0);
        assert!(graph.is_consistent());
    }

    #[test]
    fn begin_run_resubscribes_fixed_dependencies() {
        let mut graph = Graph::new();
        let fixed = graph.add_listener_set();
        let incidental = graph.add_listener_set();
        let sub = computation(&mut graph, Tracking::Fixed(vec![fixed]));
        graph.subscribe(sub, incidental);

        let RunStart::Started { tracked, .. } = graph.begin_run(sub) else {
            panic!("expected the run to start");
        };
        assert!(!tracked);
        assert_eq!(graph.dependencies(sub), vec![fixed]);

        assert!(matches!(graph.begin_run(sub), RunStart::Busy));
        graph.end_run(sub);
        assert_eq!(graph.computation(sub).map(|c| c.runs()), Some(1));
    }

    #[test]
    fn begin_run_on_removed_computation_is_gone() {
        let mut graph = Graph::new();
        let sub = computation(&mut graph, Tracking::Implicit);
        assert!(graph.remove_computation(sub).is_some());
        assert!(graph.remove_computation(sub).is_none());
        assert!(matches!(graph.begin_run(sub), RunStart::Gone));
    }

    #[test]
    fn trigger_while_running_restarts_once() {
        let mut graph = Graph::new();
        let fixed = graph.add_listener_set();
        let sub = computation(&mut graph, Tracking::Fixed(vec![fixed]));

        assert!(matches!(graph.begin_run(sub), RunStart::Started { .. }));
        assert!(!graph.restart_pending(sub));

        assert!(matches!(graph.begin_run(sub), RunStart::Busy));
        assert!(matches!(graph.begin_run(sub), RunStart::Busy));
        assert!(graph.restart_pending(sub));
        assert_eq!(graph.dependencies(sub), vec![fixed]);
        assert!(!graph.restart_pending(sub));

        graph.end_run(sub);
        assert_eq!(graph.computation(sub).map(|c| c.runs()), Some(2));
        assert!(graph.is_consistent());
    }
}
