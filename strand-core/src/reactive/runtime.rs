//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects cells, containers,
//! and watchers. It subscribes the running computation on reads and re-runs
//! subscribers on writes.
//!
//! # How It Works
//!
//! 1. When a cell is created, it registers a listener set with the graph.
//!
//! 2. When a watcher reads a cell, the runtime records the edge
//!    (listener set, watcher).
//!
//! 3. When a cell is written, the runtime:
//!    a. Snapshots the listener set's subscribers
//!    b. Runs each one in order, synchronously, before the write returns
//!    c. Each run first cleans up the watcher's previous subscriptions
//!
//! Writes are never batched and equality is never checked: every write
//! notifies. A write that reaches a computation while it is still running
//! is deferred: the computation runs again as soon as its current run
//! returns, with [`Trigger::Rerun`].

use tracing::{trace, warn};

use super::context::ReactiveContext;
use super::Trigger;
use crate::graph::{
    try_with_graph, with_graph, Body, ComputationNode, ListenerId, RunStart, SubscriberId,
    Tracking,
};
use crate::Result;

/// An owned listener set.
///
/// Each cell and each tracked key owns one. Dropping it unlinks every
/// computation that was subscribed.
#[derive(Debug)]
pub struct ListenerSet {
    id: ListenerId,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self {
            id: with_graph(|graph| graph.add_listener_set()),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Subscribe the running computation, if any.
    pub fn track(&self) {
        Runtime::track(self.id);
    }

    /// Run every subscriber with the given trigger.
    pub fn notify(&self, trigger: &Trigger<'_>) -> Result<()> {
        Runtime::notify(self.id, trigger)
    }

    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.id)
    }
}

impl Default for ListenerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ListenerSet {
    fn drop(&mut self) {
        try_with_graph(|graph| graph.remove_listener_set(self.id));
    }
}

/// Marks a computation as finished when dropped.
struct RunGuard {
    subscriber: SubscriberId,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        try_with_graph(|graph| graph.end_run(self.subscriber));
    }
}

/// The reactive runtime.
///
/// A stateless facade over this thread's dependency graph.
pub struct Runtime;

impl Runtime {
    /// Subscribe the running computation to a listener set.
    ///
    /// Called automatically when a cell is read within a tracked context.
    pub fn track(listener: ListenerId) {
        if let Some(subscriber) = ReactiveContext::current_subscriber() {
            if with_graph(|graph| graph.subscribe(subscriber, listener)) {
                trace!(?listener, ?subscriber, "subscribed");
            }
        }
    }

    /// Re-run every subscriber of a listener set.
    ///
    /// Subscribers are snapshotted first, since a run may subscribe or
    /// unsubscribe. The first error stops the notification and is returned
    /// to the writer.
    pub fn notify(listener: ListenerId, trigger: &Trigger<'_>) -> Result<()> {
        let subscribers = with_graph(|graph| graph.subscribers(listener));
        if subscribers.is_empty() {
            return Ok(());
        }

        trace!(?listener, count = subscribers.len(), ?trigger, "notifying");
        for subscriber in subscribers {
            Self::run(subscriber, trigger)?;
        }
        Ok(())
    }

    /// Register a computation without running it.
    pub(crate) fn create(tracking: Tracking, body: Body) -> SubscriberId {
        with_graph(|graph| graph.add_computation(ComputationNode::new(tracking, body)))
    }

    /// Clean up and run a computation.
    ///
    /// Disposed computations are skipped. A computation that is already
    /// running further up the stack is not re-entered; it is marked pending
    /// and runs again once the outer run returns, until no write arrives
    /// during a run. An error ends the loop.
    pub fn run(subscriber: SubscriberId, trigger: &Trigger<'_>) -> Result<()> {
        let (body, tracked) = match with_graph(|graph| graph.begin_run(subscriber)) {
            RunStart::Started { body, tracked } => (body, tracked),
            RunStart::Gone => return Ok(()),
            RunStart::Busy => {
                trace!(?subscriber, "triggered while running; deferring");
                return Ok(());
            }
        };

        let _running = RunGuard { subscriber };
        let _ctx = if tracked {
            ReactiveContext::enter(subscriber)
        } else {
            ReactiveContext::untracked()
        };

        let Ok(mut body) = body.try_borrow_mut() else {
            warn!(?subscriber, "watcher body is already borrowed; skipping run");
            return Ok(());
        };
        (*body)(trigger)?;

        while with_graph(|graph| graph.restart_pending(subscriber)) {
            trace!(?subscriber, "re-running after a write during its run");
            (*body)(&Trigger::Rerun)?;
        }
        Ok(())
    }

    /// Remove a computation and all of its subscriptions.
    ///
    /// Returns `false` if it had already been disposed.
    pub fn dispose(subscriber: SubscriberId) -> bool {
        let removed = with_graph(|graph| graph.remove_computation(subscriber));
        let disposed = removed.is_some();
        // The body may own listener sets, which unregister themselves on
        // drop and so need the graph unborrowed.
        drop(removed);
        if disposed {
            trace!(?subscriber, "disposed");
        }
        disposed
    }

    pub fn is_alive(subscriber: SubscriberId) -> bool {
        with_graph(|graph| graph.contains_computation(subscriber))
    }

    pub fn subscriber_count(listener: ListenerId) -> usize {
        with_graph(|graph| graph.subscribers(listener).len())
    }

    pub fn subscribers(listener: ListenerId) -> Vec<SubscriberId> {
        with_graph(|graph| graph.subscribers(listener))
    }

    pub fn dependencies(subscriber: SubscriberId) -> Vec<ListenerId> {
        with_graph(|graph| graph.dependencies(subscriber))
    }

    pub fn run_count(subscriber: SubscriberId) -> usize {
        with_graph(|graph| graph.computation(subscriber).map_or(0, |c| c.runs()))
    }

    /// Number of live listener sets on this thread.
    pub fn listener_count() -> usize {
        with_graph(|graph| graph.listener_count())
    }

    /// Number of live computations on this thread.
    pub fn computation_count() -> usize {
        with_graph(|graph| graph.computation_count())
    }

    /// Number of live edges on this thread.
    pub fn edge_count() -> usize {
        with_graph(|graph| graph.edge_count())
    }

    /// Check the two-way edge invariant over the whole graph.
    pub fn is_consistent() -> bool {
        with_graph(|graph| graph.is_consistent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn counting(tracking: Tracking, count: Rc<Cell<usize>>) -> SubscriberId {
        let body: Body = Rc::new(RefCell::new(move |_: &Trigger<'_>| {
            count.set(count.get() + 1);
            Ok(())
        }));
        Runtime::create(tracking, body)
    }

    #[test]
    fn runtime_notifies_subscribers() {
        let listeners = ListenerSet::new();
        let count = Rc::new(Cell::new(0));
        let sub = counting(Tracking::Fixed(vec![listeners.id()]), count.clone());

        Runtime::run(sub, &Trigger::Initial).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(listeners.subscriber_count(), 1);

        listeners.notify(&Trigger::Initial).unwrap();
        assert_eq!(count.get(), 2);
        assert_eq!(Runtime::run_count(sub), 2);

        Runtime::dispose(sub);
    }

    #[test]
    fn track_outside_a_computation_is_a_noop() {
        let listeners = ListenerSet::new();
        listeners.track();
        assert_eq!(listeners.subscriber_count(), 0);
    }

    #[test]
    fn dispose_is_idempotent_and_unlinks() {
        let listeners = ListenerSet::new();
        let count = Rc::new(Cell::new(0));
        let sub = counting(Tracking::Fixed(vec![listeners.id()]), count.clone());
        Runtime::run(sub, &Trigger::Initial).unwrap();

        assert!(Runtime::dispose(sub));
        assert!(!Runtime::dispose(sub));
        assert_eq!(listeners.subscriber_count(), 0);

        listeners.notify(&Trigger::Initial).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn disposing_releases_listener_sets_owned_by_the_body() {
        let baseline = Runtime::listener_count();
        for _ in 0..100 {
            let owned = ListenerSet::new();
            let body: Body = Rc::new(RefCell::new(move |_: &Trigger<'_>| {
                owned.track();
                Ok(())
            }));
            let sub = Runtime::create(Tracking::Implicit, body);
            Runtime::run(sub, &Trigger::Initial).unwrap();
            assert!(Runtime::dispose(sub));
        }
        assert_eq!(Runtime::listener_count(), baseline);
        assert!(Runtime::is_consistent());
    }

    #[test]
    fn a_notification_during_a_run_defers_to_one_rerun() {
        let listeners = Rc::new(ListenerSet::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (l, s) = (Rc::clone(&listeners), Rc::clone(&seen));
        let body: Body = Rc::new(RefCell::new(move |trigger: &Trigger<'_>| {
            s.borrow_mut().push(format!("{trigger:?}"));
            if trigger.is_initial() {
                l.notify(&Trigger::Initial)?;
                l.notify(&Trigger::Initial)?;
            }
            Ok(())
        }));
        let sub = Runtime::create(Tracking::Fixed(vec![listeners.id()]), body);

        Runtime::run(sub, &Trigger::Initial).unwrap();
        assert_eq!(*seen.borrow(), vec!["Initial", "Rerun"]);
        assert_eq!(Runtime::run_count(sub), 2);
        assert_eq!(listeners.subscriber_count(), 1);

        Runtime::dispose(sub);
    }

    #[test]
    fn dropping_a_listener_set_unlinks_subscribers() {
        let count = Rc::new(Cell::new(0));
        let listeners = ListenerSet::new();
        let sub = counting(Tracking::Fixed(vec![listeners.id()]), count);
        Runtime::run(sub, &Trigger::Initial).unwrap();
        assert_eq!(Runtime::dependencies(sub).len(), 1);

        drop(listeners);
        assert!(Runtime::dependencies(sub).is_empty());
        assert!(Runtime::is_consistent());

        Runtime::dispose(sub);
    }
}
