//! Reference-counted holds on the times of a single location.

use timely::progress::frontier::{AntichainRef, MutableAntichain};

use crate::timestamp::Timestamp;

/// The holds at one dataflow location and the frontier they imply.
///
/// Each hold is a claim that data at its time may still be produced at this location. The
/// frontier is the antichain of minimal times with a positive count of holds.
pub struct LocationFrontier<T: Timestamp> {
    holds: MutableAntichain<T>,
}

impl<T: Timestamp> Default for LocationFrontier<T> {
    fn default() -> Self {
        LocationFrontier { holds: MutableAntichain::new() }
    }
}

impl<T: Timestamp> LocationFrontier<T> {
    /// Adds a hold at `time`, returning true if the frontier changed.
    pub fn hold(&mut self, time: T) -> bool {
        self.holds.update_iter(Some((time, 1))).next().is_some()
    }

    /// Releases a hold at `time`, returning true if the frontier changed.
    ///
    /// Every release must be matched by an earlier hold at the same time.
    pub fn release(&mut self, time: T) -> bool {
        debug_assert!(self.holds.count_for(&time) > 0, "release of {:?} without a hold", time);
        self.holds.update_iter(Some((time, -1))).next().is_some()
    }

    /// The minimal times still held.
    pub fn frontier(&self) -> AntichainRef<'_, T> {
        self.holds.frontier()
    }

    /// True if some hold is less than or equal to `time`.
    pub fn less_equal(&self, time: &T) -> bool {
        self.holds.less_equal(time)
    }

    /// True if no holds remain.
    pub fn is_empty(&self) -> bool {
        self.holds.is_empty()
    }

    /// The number of holds at exactly `time`.
    pub fn count_for(&self, time: &T) -> i64 {
        self.holds.count_for(time)
    }
}

#[cfg(test)]
mod tests {

    use super::LocationFrontier;
    use crate::timestamp::Pair;

    #[test]
    fn frontier_follows_holds() {
        let mut location = LocationFrontier::<u64>::default();
        assert!(location.is_empty());
        assert!(location.hold(3));
        assert!(!location.hold(5));
        assert!(!location.hold(3));
        assert_eq!(location.count_for(&3), 2);
        assert!(!location.release(3));
        assert!(location.release(3));
        assert_eq!(location.frontier().to_vec(), vec![5]);
        assert!(location.less_equal(&7));
        assert!(!location.less_equal(&4));
        assert!(location.release(5));
        assert!(location.is_empty());
    }

    #[test]
    fn incomparable_holds_form_antichain() {
        let mut location = LocationFrontier::default();
        location.hold(Pair::new(1u64, 4u64));
        location.hold(Pair::new(2u64, 1u64));
        location.hold(Pair::new(2u64, 5u64));
        assert_eq!(location.frontier().to_vec(), vec![Pair::new(1, 4), Pair::new(2, 1)]);
        assert!(!location.less_equal(&Pair::new(1, 3)));
        assert!(location.less_equal(&Pair::new(3, 3)));
    }
}
