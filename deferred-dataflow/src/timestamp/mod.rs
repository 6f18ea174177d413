//! Timestamp types and the relationship between nested timestamps.

use std::fmt::Debug;
use std::hash::Hash;

use crate::lattice::Lattice;

pub mod pair;

pub use self::pair::Pair;

/// The round coordinate added by an iteration scope.
pub type Round = u64;

/// A logical time.
///
/// The partial order and lattice operations come from `Lattice`; the total order `Ord` must be a
/// linear extension of the partial order, as the work queue pops items in `Ord` order and relies
/// on never seeing a time after one of its successors.
pub trait Timestamp : Lattice + Ord + Hash + Clone + Debug + 'static {
    /// The least element, at which input sessions begin.
    fn minimum() -> Self;
}

macro_rules! implement_timestamp {
    ($($index_type:ty,)*) => (
        $(
            impl Timestamp for $index_type {
                #[inline] fn minimum() -> Self { <$index_type>::MIN }
            }
        )*
    )
}

implement_timestamp!(u8, u16, u32, u64, usize, i32, i64,);

impl Timestamp for () {
    fn minimum() -> Self { }
}

/// Conversion between an outer timestamp and a timestamp of a nested scope.
pub trait Refines<Outer: Timestamp> : Timestamp {
    /// Extends an outer time to the least inner time that projects onto it.
    fn to_inner(outer: Outer) -> Self;
    /// Strips the inner coordinates, recovering the outer time.
    fn to_outer(self) -> Outer;
}

impl<Outer: Timestamp> Refines<Outer> for Pair<Outer, Round> {
    fn to_inner(outer: Outer) -> Self {
        Pair::new(outer, 0)
    }
    fn to_outer(self) -> Outer {
        self.outer
    }
}
