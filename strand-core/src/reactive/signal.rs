//! Cell Implementation
//!
//! A [`Ref`] is the fundamental reactive primitive. It holds a value and
//! one listener set.
//!
//! # How Cells Work
//!
//! 1. When a cell is read within a running watcher, the cell subscribes
//!    that watcher.
//!
//! 2. When a cell is written, every subscriber re-runs before `set`
//!    returns, receiving the value the cell held before the write.
//!
//! 3. Writing an equal value still notifies.
//!
//! [`create_cell`] is the split form: a getter and a setter sharing one
//! cell, for code that hands out read and write access separately.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use super::runtime::ListenerSet;
use super::Trigger;
use crate::graph::ListenerId;
use crate::Result;

struct Inner<T> {
    value: RefCell<T>,
    listeners: ListenerSet,
}

/// A reactive cell holding a value of type `T`.
///
/// Clones share the same cell.
///
/// # Example
///
/// ```rust
/// use strand_core::reactive::{watch, Ref};
///
/// let count = Ref::new(0);
/// let seen = Ref::new(0);
///
/// let (c, s) = (count.clone(), seen.clone());
/// let _watcher = watch(move || s.set(c.get() * 2).unwrap());
///
/// count.set(5).unwrap();
/// assert_eq!(seen.get(), 10);
/// ```
pub struct Ref<T: 'static> {
    inner: Rc<Inner<T>>,
}

impl<T: 'static> Ref<T> {
    /// Create a new cell with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                listeners: ListenerSet::new(),
            }),
        }
    }

    /// The listener set of this cell, for use with `watch_only`.
    pub fn listeners(&self) -> ListenerId {
        self.inner.listeners.id()
    }

    /// Borrow the current value, subscribing the running watcher.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.listeners.track();
        f(&self.inner.value.borrow())
    }

    /// Borrow the current value without subscribing anything.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store a new value and re-run every subscriber.
    ///
    /// Subscribers receive the previous value through
    /// [`Trigger::previous`]. An error from a subscriber is returned here,
    /// after that subscriber has been cleaned up.
    pub fn set(&self, value: T) -> Result<()> {
        let previous = self.inner.value.replace(value);
        self.inner.listeners.notify(&Trigger::Cell {
            previous: &previous,
        })
    }

    /// Update the value using a function of the current value.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Result<()> {
        let next = f(&self.inner.value.borrow());
        self.set(next)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.subscriber_count()
    }

    /// Whether two handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + 'static> Ref<T> {
    /// Get the current value, subscribing the running watcher.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without subscribing anything.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: 'static> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Ref<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ref")
            .field("listeners", &self.listeners())
            .field("value", &*self.inner.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Read half of a cell created by [`create_cell`].
pub struct Getter<T: 'static>(Ref<T>);

/// Write half of a cell created by [`create_cell`].
pub struct Setter<T: 'static>(Ref<T>);

/// Create a cell and split it into a getter and a setter.
pub fn create_cell<T: 'static>(initial: T) -> (Getter<T>, Setter<T>) {
    let cell = Ref::new(initial);
    (Getter(cell.clone()), Setter(cell))
}

impl<T: Clone + 'static> Getter<T> {
    pub fn get(&self) -> T {
        self.0.get()
    }
}

impl<T: 'static> Getter<T> {
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with(f)
    }

    pub fn listeners(&self) -> ListenerId {
        self.0.listeners()
    }
}

impl<T: 'static> Setter<T> {
    pub fn set(&self, value: T) -> Result<()> {
        self.0.set(value)
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Result<()> {
        self.0.update(f)
    }
}

impl<T: 'static> Clone for Getter<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: 'static> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{try_watch, watch};
    use std::cell::Cell;

    #[test]
    fn ref_get_and_set() {
        let cell = Ref::new(0);
        assert_eq!(cell.get(), 0);

        cell.set(42).unwrap();
        assert_eq!(cell.get(), 42);
    }

    #[test]
    fn ref_update() {
        let cell = Ref::new(10);
        cell.update(|v| v + 5).unwrap();
        assert_eq!(cell.get(), 15);
    }

    #[test]
    fn ref_clone_shares_state() {
        let a = Ref::new(0);
        let b = a.clone();

        a.set(42).unwrap();
        assert_eq!(b.get(), 42);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Ref::new(42)));
    }

    #[test]
    fn subscribers_receive_previous_value() {
        let cell = Ref::new(1);
        let previous = Rc::new(RefCell::new(Vec::new()));

        let (c, p) = (cell.clone(), previous.clone());
        let watcher = try_watch(move |trigger| {
            c.get();
            if let Some(prev) = trigger.previous::<i32>() {
                p.borrow_mut().push(*prev);
            }
            Ok(())
        })
        .unwrap();

        cell.set(2).unwrap();
        cell.set(3).unwrap();
        assert_eq!(*previous.borrow(), vec![1, 2]);

        watcher.dispose();
    }

    #[test]
    fn equal_writes_still_notify() {
        let cell = Ref::new(7);
        let runs = Rc::new(Cell::new(0));

        let (c, r) = (cell.clone(), runs.clone());
        let watcher = watch(move || {
            c.get();
            r.set(r.get() + 1);
        });

        cell.set(7).unwrap();
        cell.set(7).unwrap();
        assert_eq!(runs.get(), 3);

        watcher.dispose();
    }

    #[test]
    fn split_cell_shares_one_value() {
        let (get, set) = create_cell(String::from("a"));
        set.set("b".into()).unwrap();
        assert_eq!(get.get(), "b");
        set.update(|s| format!("{s}c")).unwrap();
        assert_eq!(get.with(|s| s.len()), 2);
    }
}
