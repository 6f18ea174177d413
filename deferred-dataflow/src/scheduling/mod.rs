//! Scheduling of operator work by time.
//!
//! A `Scheduler` pairs the work queue of a scope with its progress tracker. Every queued item
//! holds its time at the operator that will run it, from the moment it is pushed until the
//! operator has finished running at that time. Anything the operator produces while running is
//! held before the item's own hold is released, so the frontier never advances past work that
//! is still in flight.

pub mod queue;

pub use self::queue::{WorkItem, WorkQueue};

use crate::progress::Tracker;
use crate::timestamp::Timestamp;

/// The work queue and progress tracker of one scope.
pub struct Scheduler<T: Timestamp> {
    /// Pending `(time, operator)` work items.
    pub queue: WorkQueue<T>,
    /// Holds and reachability.
    pub tracker: Tracker<T>,
}

impl<T: Timestamp> Default for Scheduler<T> {
    fn default() -> Self {
        Scheduler { queue: WorkQueue::default(), tracker: Tracker::default() }
    }
}

impl<T: Timestamp> Scheduler<T> {
    /// Requests that `operator` run at `time`, holding the time until it has.
    pub fn schedule(&mut self, time: T, operator: usize) {
        if self.queue.push(time.clone(), operator) {
            self.tracker.hold(operator, time);
        }
    }

    /// Pops the least pending item that is ready to run.
    ///
    /// An item is ready if `limit` admits its time, no input can still send data at or before
    /// that time to the operator, and no item passed over can reach the operator at a time less
    /// or equal to it. Items that are not ready stay queued, and do not hold back ready work
    /// elsewhere in the scope.
    ///
    /// The item's hold remains in place until `retire` is called.
    pub fn pop_ready<L: Fn(&T) -> bool>(&mut self, limit: L) -> Option<WorkItem<T>> {
        let mut waiting: Vec<WorkItem<T>> = Vec::new();
        let mut ready = None;
        while let Some(item) = self.queue.pop_min() {
            let tracker = &mut self.tracker;
            let blocked = !limit(&item.time)
                || tracker.blocked_by_inputs(item.operator, &item.time)
                || waiting
                    .iter()
                    .any(|other| other.time.less_equal(&item.time) && tracker.reaches(other.operator, item.operator));
            if blocked {
                waiting.push(item);
            }
            else {
                ready = Some(item);
                break;
            }
        }
        if !waiting.is_empty() {
            log::trace!("{} work items not ready", waiting.len());
        }
        for item in waiting {
            self.queue.push(item.time, item.operator);
        }
        ready
    }

    /// Releases the hold of an item that has been run.
    pub fn retire(&mut self, item: WorkItem<T>) {
        self.tracker.release(item.operator, item.time);
    }

    /// Drops every pending item whose time satisfies `abandon`, releasing their holds.
    pub fn discard<F: Fn(&T) -> bool>(&mut self, abandon: F) -> usize {
        let removed = self.queue.retain(|time| !abandon(time));
        let count = removed.len();
        for item in removed {
            self.tracker.release(item.operator, item.time);
        }
        count
    }

    /// The time of the least pending item.
    pub fn next_time(&self) -> Option<&T> {
        self.queue.peek_min().map(|item| &item.time)
    }
}
