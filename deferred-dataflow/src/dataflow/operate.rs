//! The interface between a scope and the operators it hosts.

use std::cell::RefCell;
use std::rc::Rc;

use timely::progress::Antichain;

use crate::scheduling::Scheduler;
use crate::timestamp::Timestamp;

/// An operator, as seen by the scope that runs it.
pub trait Operate<T: Timestamp> {
    /// A short name, used in logging.
    fn name(&self) -> &str;

    /// Performs all work for `time`: takes the input batches deposited at `time`, updates any
    /// state, and sends outputs at `time` or later.
    fn run(&mut self, time: &T);

    /// Drops any state and pending input at times satisfying `abandon`.
    ///
    /// Called when an enclosing iteration gives up on an outer time.
    fn discard(&mut self, _abandon: &dyn Fn(&T) -> bool) { }
}

/// Lets an operator ask to be run at a future time, without receiving input then.
pub struct Notifier<T: Timestamp> {
    operator: usize,
    scheduler: Rc<RefCell<Scheduler<T>>>,
}

impl<T: Timestamp> Notifier<T> {
    pub(crate) fn new(operator: usize, scheduler: Rc<RefCell<Scheduler<T>>>) -> Self {
        Notifier { operator, scheduler }
    }

    /// Schedules the operator at `time`.
    pub fn notify_at(&self, time: T) {
        self.scheduler.borrow_mut().schedule(time, self.operator);
    }

    /// The operator's identifier.
    pub fn operator(&self) -> usize {
        self.operator
    }
}

/// Reports the times that may still arrive at an operator.
///
/// Within a nested scope this includes the scope's `bound`: the times at which the enclosing
/// iteration may still bring data in, which the nested scope's own tracker cannot see.
#[derive(Clone)]
pub(crate) struct InputFrontier<T: Timestamp> {
    operator: usize,
    scheduler: Rc<RefCell<Scheduler<T>>>,
    bound: Rc<RefCell<Antichain<T>>>,
}

impl<T: Timestamp> InputFrontier<T> {
    pub(crate) fn new(operator: usize, scheduler: Rc<RefCell<Scheduler<T>>>, bound: Rc<RefCell<Antichain<T>>>) -> Self {
        InputFrontier { operator, scheduler, bound }
    }

    /// The current frontier. It is never empty while the operator is running.
    pub(crate) fn get(&self) -> Antichain<T> {
        let mut frontier = self.scheduler.borrow_mut().tracker.frontier(self.operator);
        for time in self.bound.borrow().iter() {
            frontier.insert(time.clone());
        }
        frontier
    }
}

/// An operator without inputs, standing for a location that only introduces data.
pub(crate) struct Source {
    pub(crate) name: &'static str,
}

impl<T: Timestamp> Operate<T> for Source {
    fn name(&self) -> &str { self.name }
    fn run(&mut self, _time: &T) { }
}
