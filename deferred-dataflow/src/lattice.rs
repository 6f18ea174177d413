//! Partially ordered elements with a least upper bound.
//!
//! Lattices form the basis of the engine's scheduling. All logical times implement the `Lattice`
//! trait, and both the delay operator and the incremental operators reason about times only in
//! terms of `Lattice` methods: a delayed record lands at the join of its time and the requested
//! time, and a join of two records lands at the join of their times.

use std::fmt::Debug;

use timely::order::PartialOrder;
use timely::progress::frontier::AntichainRef;

use crate::error::{Error, Result};

/// A partially ordered type supporting joins and meets.
pub trait Lattice : PartialOrder {

    /// The smallest element greater than or equal to both arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use deferred_dataflow::Pair;
    /// use deferred_dataflow::lattice::Lattice;
    ///
    /// let time1 = Pair::new(3u64, 7u64);
    /// let time2 = Pair::new(4u64, 6u64);
    ///
    /// assert_eq!(time1.join(&time2), Pair::new(4, 7));
    /// ```
    fn join(&self, other: &Self) -> Self;

    /// Updates `self` to the smallest element greater than or equal to both arguments.
    fn join_assign(&mut self, other: &Self) where Self: Sized {
        *self = self.join(other);
    }

    /// The largest element less than or equal to both arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use deferred_dataflow::Pair;
    /// use deferred_dataflow::lattice::Lattice;
    ///
    /// let time1 = Pair::new(3u64, 7u64);
    /// let time2 = Pair::new(4u64, 6u64);
    ///
    /// assert_eq!(time1.meet(&time2), Pair::new(3, 6));
    /// ```
    fn meet(&self, other: &Self) -> Self;

    /// Updates `self` to the largest element less than or equal to both arguments.
    fn meet_assign(&mut self, other: &Self) where Self: Sized {
        *self = self.meet(other);
    }

    /// Advances self to the largest time indistinguishable under `frontier`.
    ///
    /// The result compares identically to `self` against every lattice element greater or equal
    /// to some element of `frontier`. When provided an empty frontier `self` is not modified.
    #[inline]
    fn advance_by(&mut self, frontier: AntichainRef<Self>) where Self: Sized {
        let mut iter = frontier.iter();
        if let Some(first) = iter.next() {
            let mut result = self.join(first);
            for f in iter {
                result.meet_assign(&self.join(f));
            }
            *self = result;
        }
    }
}

/// Implements `Lattice` for totally ordered primitive types.
macro_rules! implement_lattice {
    ($($index_type:ty,)*) => (
        $(
            impl Lattice for $index_type {
                #[inline] fn join(&self, other: &Self) -> Self { ::std::cmp::max(*self, *other) }
                #[inline] fn meet(&self, other: &Self) -> Self { ::std::cmp::min(*self, *other) }
            }
        )*
    )
}

implement_lattice!(u8, u16, u32, u64, usize, i32, i64,);

impl Lattice for () {
    #[inline] fn join(&self, _other: &()) {}
    #[inline] fn meet(&self, _other: &()) {}
}

/// Checks the lattice laws over every pair and triple drawn from `times`.
///
/// A timestamp type whose join is not idempotent, commutative, associative, and an upper bound
/// of its arguments can make iterative computations fail to terminate. This check is quadratic in
/// pairs and cubic in triples, and is meant for small samples.
pub fn check_laws<T: Lattice + Clone + Debug>(times: &[T]) -> Result<()> {
    for a in times.iter() {
        if a.join(a) != *a {
            return Err(Error::Configuration(format!("join of {:?} with itself is not idempotent", a)));
        }
        if !a.less_equal(a) {
            return Err(Error::Configuration(format!("{:?} is not less or equal to itself", a)));
        }
        for b in times.iter() {
            let ab = a.join(b);
            if ab != b.join(a) {
                return Err(Error::Configuration(format!("join of {:?} and {:?} is not commutative", a, b)));
            }
            if !a.less_equal(&ab) || !b.less_equal(&ab) {
                return Err(Error::Configuration(format!("join of {:?} and {:?} is not an upper bound", a, b)));
            }
            let meet = a.meet(b);
            if !meet.less_equal(a) || !meet.less_equal(b) {
                return Err(Error::Configuration(format!("meet of {:?} and {:?} is not a lower bound", a, b)));
            }
            for c in times.iter() {
                if ab.join(c) != a.join(&b.join(c)) {
                    return Err(Error::Configuration(format!("join of {:?}, {:?}, {:?} is not associative", a, b, c)));
                }
            }
        }
    }
    Ok(())
}
