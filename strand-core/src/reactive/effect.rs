//! Watcher Implementation
//!
//! A watcher is a side-effecting computation that re-runs whenever a cell
//! it read during its last run is written.
//!
//! # How Watchers Work
//!
//! 1. When created, the watcher runs its body immediately to establish
//!    initial subscriptions and perform the initial side effect.
//!
//! 2. When any subscribed cell is written, the watcher re-runs
//!    synchronously, before the write returns.
//!
//! 3. Before re-running, the watcher is removed from every listener set it
//!    was part of; the run rebuilds its subscriptions from scratch.
//!
//! [`watch_only`] is the selective variant: its subscriptions are fixed at
//! creation and reads inside the body are ignored.
//!
//! # Disposal
//!
//! Watchers live until [`Watcher::dispose`] is called. Watchers that keep
//! one display node updated are disposed by that node's `destroy`
//! notification (see [`crate::bind::dispose_on_destroy`]).

use std::cell::RefCell;
use std::rc::Rc;

use tracing::error;

use super::runtime::Runtime;
use super::Trigger;
use crate::graph::{Body, ListenerId, SubscriberId, Tracking};
use crate::Result;

/// Handle to a running watcher.
///
/// The handle is a plain ID: copying it does not keep the watcher alive and
/// dropping it does not dispose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Watcher {
    id: SubscriberId,
}

impl Watcher {
    /// Get the subscriber ID of this watcher.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the watcher from every listener set and drop its body.
    ///
    /// Returns `false` if it had already been disposed.
    pub fn dispose(&self) -> bool {
        Runtime::dispose(self.id)
    }

    pub fn is_disposed(&self) -> bool {
        !Runtime::is_alive(self.id)
    }

    /// Number of times the body has been entered.
    pub fn run_count(&self) -> usize {
        Runtime::run_count(self.id)
    }

    /// Listener sets the watcher is currently subscribed to.
    pub fn dependencies(&self) -> Vec<ListenerId> {
        Runtime::dependencies(self.id)
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies().len()
    }
}

fn spawn<F>(tracking: Tracking, body: F) -> Result<Watcher>
where
    F: FnMut(&Trigger<'_>) -> Result<()> + 'static,
{
    let body: Body = Rc::new(RefCell::new(body));
    let watcher = Watcher {
        id: Runtime::create(tracking, body),
    };

    if let Err(err) = Runtime::run(watcher.id, &Trigger::Initial) {
        watcher.dispose();
        return Err(err);
    }
    Ok(watcher)
}

fn spawn_infallible<F>(tracking: Tracking, mut f: F) -> Watcher
where
    F: FnMut() + 'static,
{
    let body: Body = Rc::new(RefCell::new(move |_: &Trigger<'_>| {
        f();
        Ok(())
    }));
    let watcher = Watcher {
        id: Runtime::create(tracking, body),
    };

    if let Err(err) = Runtime::run(watcher.id, &Trigger::Initial) {
        error!(%err, "infallible watcher body reported an error");
    }
    watcher
}

/// Run `f` now and again whenever a cell it read last time is written.
///
/// # Example
///
/// ```rust
/// use strand_core::reactive::{watch, Ref};
/// use std::{cell::Cell, rc::Rc};
///
/// let name = Ref::new("a");
/// let runs = Rc::new(Cell::new(0));
///
/// let (n, r) = (name.clone(), runs.clone());
/// let watcher = watch(move || {
///     n.get();
///     r.set(r.get() + 1);
/// });
///
/// name.set("b").unwrap();
/// assert_eq!(runs.get(), 2);
/// watcher.dispose();
/// ```
pub fn watch<F>(f: F) -> Watcher
where
    F: FnMut() + 'static,
{
    spawn_infallible(Tracking::Implicit, f)
}

/// Fallible [`watch`]: the body sees the triggering write and may fail.
///
/// If the initial run fails the watcher is disposed and the error returned.
/// Later failures propagate to the write that triggered them.
pub fn try_watch<F>(f: F) -> Result<Watcher>
where
    F: FnMut(&Trigger<'_>) -> Result<()> + 'static,
{
    spawn(Tracking::Implicit, f)
}

/// Like [`watch`], but subscribed to exactly `deps`.
///
/// Reads inside `f` do not subscribe anything.
pub fn watch_only<I, F>(deps: I, f: F) -> Watcher
where
    I: IntoIterator<Item = ListenerId>,
    F: FnMut() + 'static,
{
    spawn_infallible(Tracking::Fixed(deps.into_iter().collect()), f)
}

/// Fallible [`watch_only`].
pub fn try_watch_only<I, F>(deps: I, f: F) -> Result<Watcher>
where
    I: IntoIterator<Item = ListenerId>,
    F: FnMut(&Trigger<'_>) -> Result<()> + 'static,
{
    spawn(Tracking::Fixed(deps.into_iter().collect()), f)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Ref;
    use crate::Error;
    use std::cell::Cell;

    #[derive(Debug, thiserror::Error)]
    #[error("watcher failed")]
    struct Failed;

    #[test]
    fn watch_runs_on_creation() {
        let runs = Rc::new(Cell::new(0));
        let r = runs.clone();

        let watcher = watch(move || r.set(r.get() + 1));

        assert_eq!(runs.get(), 1);
        assert_eq!(watcher.run_count(), 1);
        assert_eq!(watcher.dependency_count(), 0);
        watcher.dispose();
    }

    #[test]
    fn watch_reruns_once_per_write() {
        let cell = Ref::new(0);
        let runs = Rc::new(Cell::new(0));

        let (c, r) = (cell.clone(), runs.clone());
        let watcher = watch(move || {
            c.get();
            r.set(r.get() + 1);
        });

        for i in 1..=3 {
            cell.set(i).unwrap();
            assert_eq!(runs.get(), 1 + i as usize);
        }
        watcher.dispose();
    }

    #[test]
    fn disposed_watcher_does_not_run() {
        let cell = Ref::new(0);
        let runs = Rc::new(Cell::new(0));

        let (c, r) = (cell.clone(), runs.clone());
        let watcher = watch(move || {
            c.get();
            r.set(r.get() + 1);
        });

        assert!(watcher.dispose());
        assert!(watcher.is_disposed());
        assert_eq!(cell.subscriber_count(), 0);

        cell.set(1).unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn conditional_reads_do_not_leave_stale_subscriptions() {
        let flag = Ref::new(true);
        let left = Ref::new(0);
        let right = Ref::new(0);

        let (f, l, r) = (flag.clone(), left.clone(), right.clone());
        let watcher = watch(move || {
            if f.get() {
                l.get();
            } else {
                r.get();
            }
        });

        assert_eq!(watcher.dependencies(), vec![flag.listeners(), left.listeners()]);

        flag.set(false).unwrap();
        assert_eq!(watcher.dependencies(), vec![flag.listeners(), right.listeners()]);
        assert_eq!(left.subscriber_count(), 0);

        flag.set(true).unwrap();
        assert_eq!(watcher.dependencies(), vec![flag.listeners(), left.listeners()]);
        assert_eq!(right.subscriber_count(), 0);

        watcher.dispose();
    }

    #[test]
    fn watch_only_ignores_incidental_reads() {
        let dep = Ref::new(0);
        let incidental = Ref::new(0);
        let runs = Rc::new(Cell::new(0));

        let (i, r) = (incidental.clone(), runs.clone());
        let watcher = watch_only([dep.listeners()], move || {
            i.get();
            r.set(r.get() + 1);
        });

        incidental.set(1).unwrap();
        assert_eq!(runs.get(), 1);

        dep.set(1).unwrap();
        assert_eq!(runs.get(), 2);
        assert_eq!(watcher.dependencies(), vec![dep.listeners()]);

        watcher.dispose();
    }

    #[test]
    fn errors_propagate_to_the_writer_after_cleanup() {
        let cell = Ref::new(0);
        let c = cell.clone();
        let watcher = try_watch(move |_| {
            if c.get() > 0 {
                return Err(Error::callback(Failed));
            }
            Ok(())
        })
        .unwrap();

        let err = cell.set(1).unwrap_err();
        assert_eq!(err.to_string(), "watcher failed");

        // The failing run re-subscribed before failing, and nothing leaked.
        assert_eq!(watcher.dependencies(), vec![cell.listeners()]);
        assert!(Runtime::is_consistent());
        assert!(crate::reactive::ReactiveContext::current_subscriber().is_none());

        watcher.dispose();
    }

    #[test]
    fn failing_initial_run_disposes_the_watcher() {
        let cell = Ref::new(0);
        let c = cell.clone();
        let result = try_watch(move |_| {
            c.get();
            Err(Error::callback(Failed))
        });

        assert!(result.is_err());
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn self_triggering_watcher_reruns_after_its_run() {
        let cell = Ref::new(0);
        let c = cell.clone();
        let watcher = watch(move || {
            let v = c.get();
            if v < 5 {
                c.set(v + 1).unwrap();
            }
        });

        // Each nested write defers one more run until the guard stops it.
        assert_eq!(cell.get(), 5);
        assert_eq!(watcher.run_count(), 6);
        assert_eq!(cell.subscriber_count(), 1);
        watcher.dispose();
    }

    #[test]
    fn clamping_watcher_settles_on_the_clamped_value() {
        let cell = Ref::new(0);
        let shown = Ref::new(0);
        let (c, s) = (cell.clone(), shown.clone());
        let watcher = watch(move || {
            let v = c.get();
            if v > 10 {
                c.set(10).unwrap();
                return;
            }
            s.set(v).unwrap();
        });

        cell.set(15).unwrap();
        assert_eq!(cell.get(), 10);
        assert_eq!(shown.get(), 10);

        cell.set(3).unwrap();
        assert_eq!(shown.get(), 3);
        watcher.dispose();
    }

    #[test]
    fn nested_watchers_track_independently() {
        let outer_dep = Ref::new(0);
        let inner_dep = Ref::new(0);
        let inner_watchers = Rc::new(RefCell::new(Vec::new()));

        let (o, i, w) = (outer_dep.clone(), inner_dep.clone(), inner_watchers.clone());
        let outer = watch(move || {
            o.get();
            let i = i.clone();
            w.borrow_mut().push(watch(move || {
                i.get();
            }));
        });

        assert_eq!(outer.dependencies(), vec![outer_dep.listeners()]);
        assert_eq!(inner_dep.subscriber_count(), 1);

        outer.dispose();
        for w in inner_watchers.borrow().iter() {
            w.dispose();
        }
    }
}
