//! A priority queue of pending work, ordered by time and then by operator.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use fnv::FnvHashSet;

use crate::timestamp::Timestamp;

/// An operator that must run at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem<T> {
    /// The time at which the operator must run.
    pub time: T,
    /// The operator's identifier within its scope.
    pub operator: usize,
}

// We want the heap to act like a min-heap: least time first, then least operator.
impl<T: Ord> Ord for WorkItem<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (&other.time, other.operator).cmp(&(&self.time, self.operator))
    }
}

impl<T: Ord> PartialOrd for WorkItem<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending work items, popped least time first.
///
/// Pushing an item that is already present coalesces with it, so that an operator runs once per
/// time no matter how many batches it received at that time. Times are compared with `Ord`,
/// which linearizes the partial order: an item is never popped before an item at a time less
/// than it in the partial order.
pub struct WorkQueue<T: Timestamp> {
    heap: BinaryHeap<WorkItem<T>>,
    present: FnvHashSet<WorkItem<T>>,
}

impl<T: Timestamp> Default for WorkQueue<T> {
    fn default() -> Self {
        WorkQueue { heap: BinaryHeap::new(), present: FnvHashSet::default() }
    }
}

impl<T: Timestamp> WorkQueue<T> {
    /// Adds an item, returning false if an identical item was already pending.
    pub fn push(&mut self, time: T, operator: usize) -> bool {
        let item = WorkItem { time, operator };
        if self.present.insert(item.clone()) {
            self.heap.push(item);
            true
        }
        else {
            false
        }
    }

    /// The least pending item, if any.
    pub fn peek_min(&self) -> Option<&WorkItem<T>> {
        self.heap.peek()
    }

    /// Removes and returns the least pending item.
    pub fn pop_min(&mut self) -> Option<WorkItem<T>> {
        let item = self.heap.pop()?;
        self.present.remove(&item);
        Some(item)
    }

    /// Number of pending items.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if no items are pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Retains only the items whose time satisfies `keep`, returning the removed items.
    pub fn retain<F: Fn(&T) -> bool>(&mut self, keep: F) -> Vec<WorkItem<T>> {
        let (kept, removed): (Vec<_>, Vec<_>) =
        std::mem::take(&mut self.heap)
            .into_vec()
            .into_iter()
            .partition(|item| keep(&item.time));

        for item in removed.iter() {
            self.present.remove(item);
        }
        self.heap = BinaryHeap::from(kept);
        removed
    }
}
