//! Computed Implementation
//!
//! A [`Computed`] is a read-only derived cell: a [`Ref`] kept up to date by
//! a watcher.
//!
//! # How Computeds Work
//!
//! 1. On creation, the watcher runs the computation and stores the result
//!    in a fresh cell.
//!
//! 2. When any cell read by the computation is written, the watcher
//!    re-runs and writes the new result into the cell.
//!
//! 3. Writing the cell notifies everything that read the computed, so
//!    chains of computeds propagate transitively and synchronously.
//!
//! Like every cell, a computed notifies on every recomputation even when
//! the result is unchanged.

use std::cell::OnceCell;
use std::fmt::Debug;
use std::rc::Rc;

use super::effect::{try_watch, Watcher};
use super::signal::Ref;
use crate::graph::ListenerId;
use crate::Result;

/// A derived value that updates whenever its inputs change.
pub struct Computed<T: 'static> {
    cell: Ref<T>,
    watcher: Watcher,
}

impl<T: 'static> Computed<T> {
    /// Borrow the current value, subscribing the running watcher.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    pub fn listeners(&self) -> ListenerId {
        self.cell.listeners()
    }

    /// The watcher that keeps this value up to date.
    pub fn watcher(&self) -> Watcher {
        self.watcher
    }

    /// Stop recomputing. The last value stays readable.
    pub fn dispose(&self) -> bool {
        self.watcher.dispose()
    }

    pub fn subscriber_count(&self) -> usize {
        self.cell.subscriber_count()
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Get the current value, subscribing the running watcher.
    pub fn get(&self) -> T {
        self.cell.get()
    }

    pub fn get_untracked(&self) -> T {
        self.cell.get_untracked()
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            watcher: self.watcher,
        }
    }
}

impl<T: Debug + 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("cell", &self.cell)
            .field("watcher", &self.watcher)
            .finish()
    }
}

/// Create a derived cell from `f`.
///
/// Errors from writes made while propagating a recomputation are returned
/// from the write that triggered it; the initial computation cannot fail.
///
/// # Example
///
/// ```rust
/// use strand_core::reactive::{computed, Ref};
///
/// let count = Ref::new(2);
/// let c = count.clone();
/// let doubled = computed(move || c.get() * 2).unwrap();
///
/// count.set(5).unwrap();
/// assert_eq!(doubled.get(), 10);
/// ```
pub fn computed<T, F>(mut f: F) -> Result<Computed<T>>
where
    T: 'static,
    F: FnMut() -> T + 'static,
{
    let slot: Rc<OnceCell<Ref<T>>> = Rc::new(OnceCell::new());

    let target = Rc::clone(&slot);
    let watcher = try_watch(move |_| {
        let value = f();
        match target.get() {
            Some(cell) => cell.set(value),
            None => {
                // First run: there are no readers yet.
                let _ = target.set(Ref::new(value));
                Ok(())
            }
        }
    })?;

    let cell = slot
        .get()
        .cloned()
        .expect("the initial watcher run always fills the slot");

    Ok(Computed { cell, watcher })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
