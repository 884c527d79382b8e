//! Components
//!
//! Consumers of the reactive layer that manage a run of display nodes
//! rather than a single one:
//!
//! - [`For`]: a list kept in sync with a [`ReactiveVec`], keyed by item
//!   identity
//! - [`fixed_for`]: a list rendered once
//! - [`show`]: a node set swapped in and out as a condition flips

mod for_each;
mod show;

use std::rc::Rc;

use smallvec::SmallVec;

use crate::dom::NodeId;
use crate::reactive::{ReactiveMap, ReactiveVec, Ref};

pub use for_each::{fixed_for, For, Mutation, Phase};
pub use show::show;

/// The nodes produced by one render call.
pub type Elements = SmallVec<[NodeId; 2]>;

/// Reference identity, used as the key when reconciling lists.
///
/// Two values are the same item when they are handles to the same
/// allocation, regardless of their contents.
pub trait Identity {
    fn same(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Identity for Rc<T> {
    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: 'static> Identity for Ref<T> {
    fn same(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<K: 'static, V: 'static> Identity for ReactiveMap<K, V> {
    fn same(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: 'static> Identity for ReactiveVec<T> {
    fn same(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Anything a render function may return.
pub trait IntoElements {
    fn into_elements(self) -> Elements;
}

impl IntoElements for NodeId {
    fn into_elements(self) -> Elements {
        smallvec::smallvec![self]
    }
}

impl IntoElements for Vec<NodeId> {
    fn into_elements(self) -> Elements {
        Elements::from_vec(self)
    }
}

impl IntoElements for Elements {
    fn into_elements(self) -> Elements {
        self
    }
}

impl<const N: usize> IntoElements for [NodeId; N] {
    fn into_elements(self) -> Elements {
        self.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_by_reference() {
        let a = Rc::new(String::from("x"));
        let b = Rc::new(String::from("x"));
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));

        let cell = Ref::new(1);
        assert!(cell.same(&cell.clone()));
        assert!(!cell.same(&Ref::new(1)));
    }
}
