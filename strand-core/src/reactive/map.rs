//! Reactive Map
//!
//! The object form of a reactive container: a keyed record where reading a
//! key subscribes to that key alone and writing a key notifies exactly the
//! readers of that key, plus whole-object subscribers.
//!
//! Entries keep insertion order.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;

use super::runtime::{ListenerSet, Runtime};
use super::{PropKey, Trigger};
use crate::graph::ListenerId;
use crate::Result;

struct Inner<K, V> {
    entries: RefCell<IndexMap<K, V>>,
    /// Created lazily, on first read or write of a key.
    keys: RefCell<HashMap<K, ListenerSet>>,
    all: ListenerSet,
}

/// A reactive keyed record.
///
/// Clones share the same map.
pub struct ReactiveMap<K: 'static, V: 'static> {
    inner: Rc<Inner<K, V>>,
}

impl<K, V> ReactiveMap<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: Clone + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                entries: RefCell::new(IndexMap::new()),
                keys: RefCell::new(HashMap::new()),
                all: ListenerSet::new(),
            }),
        }
    }

    /// The whole-object listener set, notified on every write.
    pub fn listeners(&self) -> ListenerId {
        self.inner.all.id()
    }

    /// The listener set of one key, created if needed.
    pub fn key_listeners(&self, key: &K) -> ListenerId {
        let mut keys = self.inner.keys.borrow_mut();
        if let Some(set) = keys.get(key) {
            return set.id();
        }
        keys.entry(key.clone()).or_default().id()
    }

    /// Get the value of `key`, subscribing to that key only.
    pub fn get(&self, key: &K) -> Option<V> {
        self.with(key, V::clone)
    }

    pub fn with<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        Runtime::track(self.key_listeners(key));
        self.inner.entries.borrow().get(key).map(f)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.with(key, |_| ()).is_some()
    }

    /// Number of entries, subscribing to every write.
    pub fn len(&self) -> usize {
        self.inner.all.track();
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in insertion order, subscribing to every write.
    pub fn keys(&self) -> Vec<K> {
        self.inner.all.track();
        self.inner.entries.borrow().keys().cloned().collect()
    }

    /// Write `value` under `key` and notify its readers.
    pub fn set(&self, key: K, value: V) -> Result<()> {
        self.inner
            .entries
            .borrow_mut()
            .insert(key.clone(), value.clone());
        self.notify(&key, Some(&value as &dyn Any))
    }

    /// Remove `key`; readers are notified with no value.
    pub fn remove(&self, key: &K) -> Result<Option<V>> {
        let removed = self.inner.entries.borrow_mut().shift_remove(key);
        if removed.is_some() {
            let notified = self.notify(key, None);
            self.prune_key(key);
            notified?;
        }
        Ok(removed)
    }

    /// Drop the listener set of `key` if nobody is subscribed to it.
    fn prune_key(&self, key: &K) {
        let mut keys = self.inner.keys.borrow_mut();
        if keys.get(key).is_some_and(|set| set.subscriber_count() == 0) {
            keys.remove(key);
        }
    }

    fn notify(&self, key: &K, value: Option<&dyn Any>) -> Result<()> {
        let trigger = Trigger::Property {
            key: PropKey::Field(key),
            value,
        };

        let listeners = self.inner.keys.borrow().get(key).map(ListenerSet::id);
        if let Some(listeners) = listeners {
            Runtime::notify(listeners, &trigger)?;
        }
        self.inner.all.notify(&trigger)
    }
}

impl<K: 'static, V: 'static> ReactiveMap<K, V> {
    /// Whether two handles refer to the same map.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<K, V> Default for ReactiveMap<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for ReactiveMap<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: Clone + 'static,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::new();
        map.inner.entries.borrow_mut().extend(iter);
        map
    }
}

impl<K: 'static, V: 'static> Clone for ReactiveMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: Debug + 'static, V: Debug + 'static> Debug for ReactiveMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.inner.entries.borrow().iter())
            .finish()
    }
}
