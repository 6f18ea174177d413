//! Tracks holds across the locations of a scope and the frontiers they imply.
//!
//! Locations are dataflow operators, numbered in creation order. A hold at a location says the
//! location may still produce data at the held time; every location it can reach may therefore
//! still receive data at that time or later. The tracker reports, for any location, the frontier
//! of times that might still arrive there.
//!
//! Reachability ignores how operators transform times along the way. This is conservative: a
//! delay can only move times forward and joins only produce larger times, so a hold at `t`
//! upstream of a location bounds what the location can still see from below.

use timely::progress::Antichain;

use crate::progress::frontier::LocationFrontier;
use crate::timestamp::Timestamp;

/// Holds and reachability for the locations of one scope.
pub struct Tracker<T: Timestamp> {
    locations: Vec<LocationFrontier<T>>,
    successors: Vec<Vec<usize>>,
    /// For each location, the locations that can reach it (itself included).
    reaching: Vec<Vec<usize>>,
    /// Locations owned by input sessions.
    inputs: Vec<usize>,
    stale: bool,
}

impl<T: Timestamp> Default for Tracker<T> {
    fn default() -> Self {
        Tracker {
            locations: Vec::new(),
            successors: Vec::new(),
            reaching: Vec::new(),
            inputs: Vec::new(),
            stale: false,
        }
    }
}

impl<T: Timestamp> Tracker<T> {
    /// Adds a location and returns its identifier.
    pub fn add_location(&mut self) -> usize {
        self.locations.push(LocationFrontier::default());
        self.successors.push(Vec::new());
        self.stale = true;
        self.locations.len() - 1
    }

    /// Records that data flows from `source` to `target`.
    pub fn add_edge(&mut self, source: usize, target: usize) {
        if !self.successors[source].contains(&target) {
            self.successors[source].push(target);
            self.stale = true;
        }
    }

    /// Marks `location` as fed by an input session.
    pub fn mark_input(&mut self, location: usize) {
        if !self.inputs.contains(&location) {
            self.inputs.push(location);
        }
    }

    /// Number of locations.
    pub fn locations(&self) -> usize {
        self.locations.len()
    }

    /// Adds a hold at `time` for `location`.
    pub fn hold(&mut self, location: usize, time: T) {
        if self.locations[location].hold(time) {
            log::trace!("location {} frontier now {:?}", location, self.locations[location].frontier());
        }
    }

    /// Releases a hold at `time` for `location`.
    pub fn release(&mut self, location: usize, time: T) {
        if self.locations[location].release(time) {
            log::trace!("location {} frontier now {:?}", location, self.locations[location].frontier());
        }
    }

    /// The holds at `location` itself.
    pub fn holds(&self, location: usize) -> &LocationFrontier<T> {
        &self.locations[location]
    }

    /// The frontier of times that may still arrive at `location`.
    pub fn frontier(&mut self, location: usize) -> Antichain<T> {
        self.refresh();
        let mut frontier = Antichain::new();
        for &source in self.reaching[location].iter() {
            for time in self.locations[source].frontier().iter() {
                frontier.insert(time.clone());
            }
        }
        frontier
    }

    /// True if data leaving `source` can arrive at `target`, directly or through other locations.
    pub fn reaches(&mut self, source: usize, target: usize) -> bool {
        self.refresh();
        self.reaching[target].contains(&source)
    }

    /// True if an input session that can reach `location` holds a time less or equal to `time`.
    ///
    /// Work at `time` is not ready until this is false: more input at `time` may still arrive.
    pub fn blocked_by_inputs(&mut self, location: usize, time: &T) -> bool {
        if self.inputs.is_empty() {
            return false;
        }
        self.refresh();
        let reaching = &self.reaching[location];
        self.inputs
            .iter()
            .any(|input| reaching.contains(input) && self.locations[*input].less_equal(time))
    }

    /// Recomputes reachability after the graph has changed.
    fn refresh(&mut self) {
        if !self.stale {
            return;
        }
        let count = self.locations.len();
        let mut predecessors = vec![Vec::new(); count];
        for (source, targets) in self.successors.iter().enumerate() {
            for &target in targets.iter() {
                predecessors[target].push(source);
            }
        }

        self.reaching.clear();
        for location in 0 .. count {
            let mut seen = vec![false; count];
            let mut todo = vec![location];
            seen[location] = true;
            while let Some(next) = todo.pop() {
                for &source in predecessors[next].iter() {
                    if !seen[source] {
                        seen[source] = true;
                        todo.push(source);
                    }
                }
            }
            self.reaching.push((0 .. count).filter(|&index| seen[index]).collect());
        }
        self.stale = false;
    }
}

#[cfg(test)]
mod tests {

    use super::Tracker;

    #[test]
    fn frontier_covers_upstream_holds() {
        let mut tracker = Tracker::<u64>::default();
        let a = tracker.add_location();
        let b = tracker.add_location();
        let c = tracker.add_location();
        tracker.add_edge(a, b);
        tracker.add_edge(b, c);

        tracker.hold(a, 4);
        tracker.hold(c, 2);
        assert_eq!(tracker.frontier(c).elements(), &[2]);
        assert_eq!(tracker.frontier(b).elements(), &[4]);
        assert!(tracker.frontier(a).less_equal(&4));

        tracker.release(c, 2);
        assert_eq!(tracker.frontier(c).elements(), &[4]);
        tracker.release(a, 4);
        assert!(tracker.frontier(c).is_empty());
        assert!(tracker.frontier(b).is_empty());
    }

    #[test]
    fn cycles_reach_themselves() {
        let mut tracker = Tracker::<u64>::default();
        let a = tracker.add_location();
        let b = tracker.add_location();
        tracker.add_edge(a, b);
        tracker.add_edge(b, a);
        tracker.hold(b, 1);
        assert_eq!(tracker.frontier(a).elements(), &[1]);
    }

    #[test]
    fn only_reaching_inputs_block() {
        let mut tracker = Tracker::<u64>::default();
        let input1 = tracker.add_location();
        let input2 = tracker.add_location();
        let op = tracker.add_location();
        tracker.mark_input(input1);
        tracker.mark_input(input2);
        tracker.add_edge(input1, op);

        tracker.hold(input1, 3);
        tracker.hold(input2, 0);
        assert!(!tracker.blocked_by_inputs(op, &2));
        assert!(tracker.blocked_by_inputs(op, &3));
        assert!(tracker.blocked_by_inputs(op, &5));
    }
}
