//! Typed channels between operators.
//!
//! A producer hands batches to a `Tee`, which forwards them to one `Pusher` per consumer. A pusher
//! deposits the batch in its consumer's mailbox under the batch's time, and schedules the consumer
//! to run at that time. The consumer's `Puller` takes everything deposited for a time when the
//! consumer runs. Batches for the same time accumulate in one mailbox entry, and the queue
//! coalesces the corresponding work items, so each consumer runs once per time.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::scheduling::Scheduler;
use crate::timestamp::Timestamp;
use crate::Diff;

/// Batches awaiting a consumer, by time.
pub struct Mailbox<D, T> {
    batches: BTreeMap<T, Vec<(D, Diff)>>,
}

impl<D, T: Ord> Default for Mailbox<D, T> {
    fn default() -> Self {
        Mailbox { batches: BTreeMap::new() }
    }
}

/// Deposits batches into one consumer's mailbox.
pub struct Pusher<D, T: Timestamp> {
    mailbox: Rc<RefCell<Mailbox<D, T>>>,
    target: usize,
    scheduler: Rc<RefCell<Scheduler<T>>>,
}

impl<D, T: Timestamp> Pusher<D, T> {
    /// Deposits `data` at `time` and schedules the consumer at `time`.
    pub fn push(&self, time: &T, data: Vec<(D, Diff)>) {
        self.mailbox
            .borrow_mut()
            .batches
            .entry(time.clone())
            .or_default()
            .extend(data);
        self.scheduler.borrow_mut().schedule(time.clone(), self.target);
    }
}

/// Takes batches out of a consumer's mailbox.
pub struct Puller<D, T> {
    mailbox: Rc<RefCell<Mailbox<D, T>>>,
}

impl<D, T: Ord> Puller<D, T> {
    /// Removes and returns everything deposited at `time`.
    pub fn take(&self, time: &T) -> Vec<(D, Diff)> {
        self.mailbox.borrow_mut().batches.remove(time).unwrap_or_default()
    }

    /// Drops every batch whose time satisfies `abandon`.
    pub fn discard(&self, abandon: &dyn Fn(&T) -> bool) {
        self.mailbox.borrow_mut().batches.retain(|time, _| !abandon(time));
    }

    /// True if no batches are waiting.
    pub fn is_empty(&self) -> bool {
        self.mailbox.borrow().batches.is_empty()
    }
}

/// Creates a connected pusher and puller for the consumer `target`.
pub fn channel<D, T: Timestamp>(target: usize, scheduler: Rc<RefCell<Scheduler<T>>>) -> (Pusher<D, T>, Puller<D, T>) {
    let mailbox = Rc::new(RefCell::new(Mailbox::default()));
    let pusher = Pusher { mailbox: Rc::clone(&mailbox), target, scheduler };
    (pusher, Puller { mailbox })
}

/// The output of an operator, fanning out to any number of consumers.
///
/// Consumers may be attached after the tee is created, but only receive batches given after
/// they were attached.
pub struct Tee<D, T: Timestamp> {
    pushers: Rc<RefCell<Vec<Pusher<D, T>>>>,
}

impl<D, T: Timestamp> Clone for Tee<D, T> {
    fn clone(&self) -> Self {
        Tee { pushers: Rc::clone(&self.pushers) }
    }
}

impl<D, T: Timestamp> Default for Tee<D, T> {
    fn default() -> Self {
        Tee { pushers: Rc::new(RefCell::new(Vec::new())) }
    }
}

impl<D: Clone, T: Timestamp> Tee<D, T> {
    /// Attaches a consumer.
    pub fn add_pusher(&self, pusher: Pusher<D, T>) {
        self.pushers.borrow_mut().push(pusher);
    }

    /// Sends `data` at `time` to every consumer. Empty batches are not sent.
    pub fn give(&self, time: &T, data: Vec<(D, Diff)>) {
        if data.is_empty() {
            return;
        }
        let pushers = self.pushers.borrow();
        if let Some((last, rest)) = pushers.split_last() {
            for pusher in rest.iter() {
                pusher.push(time, data.clone());
            }
            last.push(time, data);
        }
    }
}

#[cfg(test)]
mod tests {

    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{channel, Tee};
    use crate::scheduling::Scheduler;

    #[test]
    fn batches_accumulate_per_time() {
        let scheduler = Rc::new(RefCell::new(Scheduler::<u64>::default()));
        let target = scheduler.borrow_mut().tracker.add_location();
        let (pusher, puller) = channel(target, Rc::clone(&scheduler));
        let tee = Tee::default();
        tee.add_pusher(pusher);

        tee.give(&2, vec![("a", 1)]);
        tee.give(&2, vec![("b", 1)]);
        tee.give(&3, vec![("c", 1)]);
        tee.give(&4, vec![]);

        assert_eq!(scheduler.borrow().queue.len(), 2);
        assert_eq!(puller.take(&2), vec![("a", 1), ("b", 1)]);
        assert!(puller.take(&2).is_empty());
        puller.discard(&|time| *time == 3);
        assert!(puller.is_empty());
    }

    #[test]
    fn tee_fans_out() {
        let scheduler = Rc::new(RefCell::new(Scheduler::<u64>::default()));
        let first = scheduler.borrow_mut().tracker.add_location();
        let second = scheduler.borrow_mut().tracker.add_location();
        let (pusher1, puller1) = channel(first, Rc::clone(&scheduler));
        let (pusher2, puller2) = channel(second, Rc::clone(&scheduler));
        let tee = Tee::default();
        tee.add_pusher(pusher1);
        tee.add_pusher(pusher2);

        tee.give(&0, vec![(7, -1)]);
        assert_eq!(puller1.take(&0), vec![(7, -1)]);
        assert_eq!(puller2.take(&0), vec![(7, -1)]);
    }
}
