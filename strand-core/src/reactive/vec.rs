//! Reactive Vec
//!
//! A vector whose every index and whose length are individually observable.
//!
//! Three levels of granularity:
//!
//! 1. Per-index listener sets: `vec.get(0)` only subscribes index 0
//! 2. A length listener set: `vec.len()` only subscribes the length
//! 3. A whole-vector listener set: notified on every write, with the key
//!    and value of that write; `to_vec` and `watch_only` consumers use it
//!
//! Structural operations (`insert`, `remove`, `swap`, `assign`) are carried
//! out as sequences of index writes followed by at most one length write,
//! the way array methods behave. Consumers such as the list reconciler
//! therefore only ever see two kinds of write: index and length.
//!
//! The vector is dense: writing past the end is an error rather than a hole.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::rc::Rc;

use super::runtime::ListenerSet;
use super::{PropKey, Trigger};
use crate::graph::ListenerId;
use crate::{Error, Result};

struct Inner<T> {
    items: RefCell<Vec<T>>,
    /// Created lazily, on first read or write of an index.
    indices: RefCell<HashMap<usize, ListenerSet>>,
    length: ListenerSet,
    all: ListenerSet,
}

/// A reactive vector with per-index granularity.
///
/// Clones share the same vector.
pub struct ReactiveVec<T: 'static> {
    inner: Rc<Inner<T>>,
}

impl<T: Clone + 'static> ReactiveVec<T> {
    /// Create a new empty reactive vector.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Create a reactive vector from an existing vector.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(Inner {
                items: RefCell::new(items),
                indices: RefCell::new(HashMap::new()),
                length: ListenerSet::new(),
                all: ListenerSet::new(),
            }),
        }
    }

    /// The whole-vector listener set, notified on every write.
    pub fn listeners(&self) -> ListenerId {
        self.inner.all.id()
    }

    pub fn length_listeners(&self) -> ListenerId {
        self.inner.length.id()
    }

    /// The listener set of one index, created if needed.
    pub fn index_listeners(&self, index: usize) -> ListenerId {
        self.inner
            .indices
            .borrow_mut()
            .entry(index)
            .or_default()
            .id()
    }

    /// Get the element at `index`, subscribing to that index only.
    pub fn get(&self, index: usize) -> Option<T> {
        self.with(index, T::clone)
    }

    /// Borrow the element at `index`, subscribing to that index only.
    pub fn with<R>(&self, index: usize, f: impl FnOnce(&T) -> R) -> Option<R> {
        super::Runtime::track(self.index_listeners(index));
        self.inner.items.borrow().get(index).map(f)
    }

    /// Get the length, subscribing to the length only.
    pub fn len(&self) -> usize {
        self.inner.length.track();
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out every element, subscribing to every write.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.all.track();
        self.to_vec_untracked()
    }

    /// Iterate over a snapshot taken now. Subscribes like [`to_vec`](Self::to_vec).
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.to_vec().into_iter()
    }

    pub fn to_vec_untracked(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }

    pub fn len_untracked(&self) -> usize {
        self.inner.items.borrow().len()
    }

    /// Write `value` at `index`.
    ///
    /// `index == len` appends and also notifies the length. Writing past
    /// the end fails with [`Error::IndexOutOfBounds`].
    pub fn set(&self, index: usize, value: T) -> Result<()> {
        let len = self.len_untracked();
        if index > len {
            return Err(Error::IndexOutOfBounds { index, len });
        }

        {
            let mut items = self.inner.items.borrow_mut();
            if index == len {
                items.push(value.clone());
            } else {
                items[index] = value.clone();
            }
        }

        self.notify_index(index, &value)?;
        if index == len {
            self.notify_length(len + 1)?;
        }
        Ok(())
    }

    /// Append an element.
    pub fn push(&self, value: T) -> Result<()> {
        self.set(self.len_untracked(), value)
    }

    /// Remove the last element.
    pub fn pop(&self) -> Result<Option<T>> {
        let popped = self.inner.items.borrow_mut().pop();
        if popped.is_some() {
            let len = self.len_untracked();
            let notified = self.notify_length(len);
            self.prune_indices(len);
            notified?;
        }
        Ok(popped)
    }

    /// Shorten the vector to `len` elements. Longer lengths are ignored.
    pub fn truncate(&self, len: usize) -> Result<()> {
        if len >= self.len_untracked() {
            return Ok(());
        }
        self.inner.items.borrow_mut().truncate(len);
        let notified = self.notify_length(len);
        self.prune_indices(len);
        notified
    }

    pub fn clear(&self) -> Result<()> {
        self.truncate(0)
    }

    /// Exchange two elements with two index writes.
    pub fn swap(&self, a: usize, b: usize) -> Result<()> {
        let len = self.len_untracked();
        for index in [a, b] {
            if index >= len {
                return Err(Error::IndexOutOfBounds { index, len });
            }
        }
        if a == b {
            return Ok(());
        }

        let (va, vb) = {
            let items = self.inner.items.borrow();
            (items[a].clone(), items[b].clone())
        };
        self.set(a, vb)?;
        self.set(b, va)
    }

    /// Insert at `index`, shifting later elements right.
    pub fn insert(&self, index: usize, value: T) -> Result<()> {
        let len = self.len_untracked();
        if index > len {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        if index == len {
            return self.push(value);
        }

        // Shift from the back so every source is read before it is written.
        for k in (index + 1..=len).rev() {
            let moved = self.inner.items.borrow()[k - 1].clone();
            self.set(k, moved)?;
        }
        self.set(index, value)
    }

    /// Remove the element at `index`, shifting later elements left.
    pub fn remove(&self, index: usize) -> Result<T> {
        let len = self.len_untracked();
        if index >= len {
            return Err(Error::IndexOutOfBounds { index, len });
        }

        let removed = self.inner.items.borrow()[index].clone();
        for k in index..len - 1 {
            let moved = self.inner.items.borrow()[k + 1].clone();
            self.set(k, moved)?;
        }
        self.truncate(len - 1)?;
        Ok(removed)
    }

    /// Overwrite the contents with `items`: one index write per position,
    /// then a truncation if the new contents are shorter.
    pub fn assign(&self, items: Vec<T>) -> Result<()> {
        let new_len = items.len();
        for (index, value) in items.into_iter().enumerate() {
            self.set(index, value)?;
        }
        self.truncate(new_len)
    }

    /// Sort in place through [`assign`](Self::assign).
    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> std::cmp::Ordering) -> Result<()> {
        let mut items = self.to_vec_untracked();
        items.sort_by(compare);
        self.assign(items)
    }

    fn notify_index(&self, index: usize, value: &T) -> Result<()> {
        let trigger = Trigger::Property {
            key: PropKey::Index(index),
            value: Some(value as &dyn Any),
        };

        let listeners = self.inner.indices.borrow().get(&index).map(ListenerSet::id);
        if let Some(listeners) = listeners {
            super::Runtime::notify(listeners, &trigger)?;
        }
        self.inner.all.notify(&trigger)
    }

    fn notify_length(&self, len: usize) -> Result<()> {
        let trigger = Trigger::Property {
            key: PropKey::Length,
            value: Some(&len as &dyn Any),
        };
        self.inner.length.notify(&trigger)?;
        self.inner.all.notify(&trigger)
    }

    /// Drop the listener sets of indices at or past `len` that nobody is
    /// subscribed to any more.
    fn prune_indices(&self, len: usize) {
        self.inner
            .indices
            .borrow_mut()
            .retain(|&index, set| index < len || set.subscriber_count() > 0);
    }
}

impl<T: 'static> ReactiveVec<T> {
    /// Whether two handles refer to the same vector.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + 'static> Default for ReactiveVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> From<Vec<T>> for ReactiveVec<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T: 'static> Clone for ReactiveVec<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for ReactiveVec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveVec")
            .field("items", &*self.inner.items.borrow())
            .finish()
    }
}
