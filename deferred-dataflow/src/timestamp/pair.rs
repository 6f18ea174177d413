//! A pair of timestamps, the time type of an iteration scope.
//!
//! The pair is partially ordered by the product order and totally ordered lexicographically,
//! which is a linear extension of the product order. The engine uses the partial order to decide
//! when a time is complete and the total order to decide what to work on next.

use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};
use timely::order::PartialOrder;

use crate::lattice::Lattice;
use crate::timestamp::{Round, Timestamp};

/// A pair of timestamps, partially ordered by the product order.
#[derive(Hash, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Pair<S, T> {
    /// Outer timestamp coordinate, e.g. the epoch of an input update.
    pub outer: S,
    /// Inner timestamp coordinate, e.g. an iteration round.
    pub inner: T,
}

impl<S, T> Pair<S, T> {
    /// Create a new pair.
    pub fn new(outer: S, inner: T) -> Self {
        Pair { outer, inner }
    }
}

impl<S: Clone> Pair<S, Round> {
    /// The same outer time, `rounds` iterations later.
    pub fn advance_round(&self, rounds: Round) -> Self {
        Pair::new(self.outer.clone(), self.inner.saturating_add(rounds))
    }
}

impl<S: PartialOrder, T: PartialOrder> PartialOrder for Pair<S, T> {
    #[inline]
    fn less_equal(&self, other: &Self) -> bool {
        self.outer.less_equal(&other.outer) && self.inner.less_equal(&other.inner)
    }
}

impl<S: Lattice, T: Lattice> Lattice for Pair<S, T> {
    #[inline]
    fn join(&self, other: &Self) -> Self {
        Pair {
            outer: self.outer.join(&other.outer),
            inner: self.inner.join(&other.inner),
        }
    }
    #[inline]
    fn meet(&self, other: &Self) -> Self {
        Pair {
            outer: self.outer.meet(&other.outer),
            inner: self.inner.meet(&other.inner),
        }
    }
}

impl<S: Timestamp, T: Timestamp> Timestamp for Pair<S, T> {
    fn minimum() -> Self {
        Pair { outer: S::minimum(), inner: T::minimum() }
    }
}

/// Debug implementation to avoid seeing fully qualified path names.
impl<S: Debug, T: Debug> Debug for Pair<S, T> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(&format!("({:?}, {:?})", self.outer, self.inner))
    }
}
