//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a cell is read, we can
//! subscribe the current computation to it.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Running a computation pushes a
//! tracked frame; running a `watch_only` body or an `untrack` closure pushes
//! an untracked frame, which hides any outer computation from reads. The
//! frame is popped by a guard, so the stack stays balanced even when the
//! body returns an error or panics.

use std::cell::RefCell;

use crate::graph::SubscriberId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    /// The computation reads should subscribe, or `None` when untracked.
    subscriber: Option<SubscriberId>,
}

/// Guard that pops the context when dropped.
#[must_use = "the context is exited as soon as the guard is dropped"]
pub struct ReactiveContext {
    frame: Frame,
}

impl ReactiveContext {
    /// Enter a tracked context for the given computation.
    ///
    /// While this context is active, any cell that is read will subscribe
    /// the computation.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        Self::push(Frame {
            subscriber: Some(subscriber_id),
        })
    }

    /// Enter a context in which reads are not tracked.
    pub fn untracked() -> Self {
        Self::push(Frame { subscriber: None })
    }

    fn push(frame: Frame) -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(frame));
        Self { frame }
    }

    /// Check if a tracked computation is active.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Get the computation that reads should subscribe, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|f| f.subscriber))
    }

    /// Depth of the context stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let _ = CONTEXT_STACK.try_with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(frame) = popped {
                debug_assert_eq!(
                    frame, self.frame,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.frame, frame
                );
            }
        });
    }
}

/// Run `f` without subscribing the current computation to anything it reads.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::untracked();
    f()
}
