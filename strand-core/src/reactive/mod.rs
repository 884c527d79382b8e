//! Reactive Primitives
//!
//! This module implements the reactive system: cells, keyed containers,
//! watchers, and computeds. These primitives drive every update the engine
//! makes to the display tree.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`Ref`] is a container for mutable state. When a cell is read within a
//! running watcher, the cell subscribes that watcher. When the cell is
//! written, every subscriber re-runs before the write returns.
//!
//! ## Containers
//!
//! [`ReactiveVec`] and [`ReactiveMap`] give every index or key its own
//! listener set, so a watcher re-runs only for the keys it actually read.
//! Array length is a key of its own.
//!
//! ## Watchers
//!
//! A watcher ([`watch`]) is a side-effecting computation. It re-runs
//! whenever a cell read during its last run is written, rebuilding its
//! subscriptions on every run. [`watch_only`] fixes the subscriptions
//! instead.
//!
//! ## Computeds
//!
//! A [`Computed`] is a read-only cell kept up to date by a watcher.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to detect
//! dependencies automatically, and a thread-local graph to store them.
//! Everything runs synchronously on one thread.

mod context;
mod effect;
mod map;
mod memo;
mod runtime;
mod signal;
mod trigger;
mod vec;

pub use context::{untrack, ReactiveContext};
pub use effect::{try_watch, try_watch_only, watch, watch_only, Watcher};
pub use map::ReactiveMap;
pub use memo::{computed, Computed};
pub use runtime::{ListenerSet, Runtime};
pub use signal::{create_cell, Getter, Ref, Setter};
pub use trigger::{PropKey, Trigger};
pub use vec::ReactiveVec;
