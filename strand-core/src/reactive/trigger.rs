//! Triggers
//!
//! A trigger describes the write that caused a computation to run. Cells
//! pass their previous value; keyed containers pass the written key and the
//! new value. Values are type-erased because one computation may subscribe
//! to containers of different element types.

use std::any::Any;
use std::fmt;

/// The key of a keyed container write.
#[derive(Clone, Copy)]
pub enum PropKey<'a> {
    /// An element of a [`ReactiveVec`](super::ReactiveVec).
    Index(usize),
    /// The length of a [`ReactiveVec`](super::ReactiveVec).
    Length,
    /// A field of a [`ReactiveMap`](super::ReactiveMap).
    Field(&'a dyn Any),
}

impl<'a> PropKey<'a> {
    /// Downcast a field key.
    pub fn field<K: 'static>(&self) -> Option<&'a K> {
        match self {
            PropKey::Field(key) => key.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for PropKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropKey::Index(i) => f.debug_tuple("Index").field(i).finish(),
            PropKey::Length => f.write_str("Length"),
            PropKey::Field(_) => f.write_str("Field(..)"),
        }
    }
}

/// Why a computation is running.
#[derive(Clone, Copy)]
pub enum Trigger<'a> {
    /// The first run, performed when the watcher is created.
    Initial,

    /// A cell was written; carries the value it held before the write.
    Cell { previous: &'a dyn Any },

    /// A key of a container was written. `value` is `None` for removals.
    Property {
        key: PropKey<'a>,
        value: Option<&'a dyn Any>,
    },

    /// A dependency was written while the computation was running, usually
    /// by the computation itself. The write's payload is no longer
    /// available; the run happens once the previous one returns.
    Rerun,
}

impl<'a> Trigger<'a> {
    pub fn is_initial(&self) -> bool {
        matches!(self, Trigger::Initial)
    }

    /// The previous value of the written cell, if this is a cell write of `T`.
    pub fn previous<T: 'static>(&self) -> Option<&'a T> {
        match self {
            Trigger::Cell { previous } => previous.downcast_ref(),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<PropKey<'a>> {
        match self {
            Trigger::Property { key, .. } => Some(*key),
            _ => None,
        }
    }

    /// The newly written value, if this is a container write of `T`.
    pub fn value<T: 'static>(&self) -> Option<&'a T> {
        match self {
            Trigger::Property { value, .. } => value.and_then(|v| v.downcast_ref()),
            _ => None,
        }
    }
}

impl fmt::Debug for Trigger<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Initial => f.write_str("Initial"),
            Trigger::Rerun => f.write_str("Rerun"),
            Trigger::Cell { .. } => f.write_str("Cell { .. }"),
            Trigger::Property { key, value } => f
                .debug_struct("Property")
                .field("key", key)
                .field("removed", &value.is_none())
                .finish(),
        }
    }
}
