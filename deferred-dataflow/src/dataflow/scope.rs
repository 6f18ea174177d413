//! Scopes: arenas of operators sharing a work queue and a progress tracker.
//!
//! Operators are boxed and stored by identifier, in creation order. Channels refer to operators
//! by identifier only, so cycles through feedback need no shared references between operators.
//! To run an operator the scope takes it out of its slot, runs it, and puts it back, so the
//! operator may freely use the scope's channels and scheduler while running.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use timely::progress::Antichain;

use crate::config::Config;
use crate::dataflow::channels::{channel, Puller, Tee};
use crate::dataflow::operate::{InputFrontier, Notifier, Operate};
use crate::error::Error;
use crate::logging::{Logger, ScheduleEvent};
use crate::scheduling::Scheduler;
use crate::timestamp::{Pair, Round, Timestamp};

/// An audit run at quiescence, returning descriptions of any problems found.
pub(crate) type Audit = Box<dyn Fn() -> Vec<String>>;

/// State shared by every scope of a worker.
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) logger: Logger,
    pub(crate) errors: RefCell<Vec<Error>>,
    pub(crate) audits: RefCell<Vec<Audit>>,
}

impl Shared {
    pub(crate) fn new(config: Config) -> Self {
        Shared {
            config,
            logger: Logger::new(),
            errors: RefCell::new(Vec::new()),
            audits: RefCell::new(Vec::new()),
        }
    }
}

/// A handle for operators to report errors and log events, without holding their scope.
#[derive(Clone)]
pub(crate) struct Reporter {
    shared: Rc<Shared>,
}

impl Reporter {
    /// Records a runtime error; it is logged now and returned by `Worker::take_errors`.
    pub(crate) fn report(&self, error: Error) {
        log::warn!("{}", error);
        self.shared.errors.borrow_mut().push(error);
    }

    pub(crate) fn logger(&self) -> &Logger {
        &self.shared.logger
    }
}

/// A dataflow scope over timestamps of type `T`.
///
/// The root scope of a worker has the worker's timestamp; each iteration nests a scope whose
/// timestamps pair the outer timestamp with a round.
pub struct Scope<T: Timestamp> {
    operators: Rc<RefCell<Vec<Option<Box<dyn Operate<T>>>>>>,
    scheduler: Rc<RefCell<Scheduler<T>>>,
    shared: Rc<Shared>,
    depth: usize,
    /// Links a nested scope to the iteration that owns it.
    parent: Option<Rc<dyn Any>>,
    /// Times at which data may still enter from the enclosing scope; empty for the root.
    bound: Rc<RefCell<Antichain<T>>>,
}

impl<T: Timestamp> Clone for Scope<T> {
    fn clone(&self) -> Self {
        Scope {
            operators: Rc::clone(&self.operators),
            scheduler: Rc::clone(&self.scheduler),
            shared: Rc::clone(&self.shared),
            depth: self.depth,
            parent: self.parent.as_ref().map(Rc::clone),
            bound: Rc::clone(&self.bound),
        }
    }
}

impl<T: Timestamp> Scope<T> {
    pub(crate) fn root(shared: Rc<Shared>) -> Self {
        Scope {
            operators: Rc::new(RefCell::new(Vec::new())),
            scheduler: Rc::new(RefCell::new(Scheduler::default())),
            shared,
            depth: 0,
            parent: None,
            bound: Rc::new(RefCell::new(Antichain::new())),
        }
    }

    /// A new scope nested in this one, linked to its owner by `parent`.
    pub(crate) fn nested(&self, parent: Rc<dyn Any>) -> Scope<Pair<T, Round>> {
        Scope {
            operators: Rc::new(RefCell::new(Vec::new())),
            scheduler: Rc::new(RefCell::new(Scheduler::default())),
            shared: Rc::clone(&self.shared),
            depth: self.depth + 1,
            parent: Some(parent),
            bound: Rc::new(RefCell::new(Antichain::new())),
        }
    }

    pub(crate) fn parent(&self) -> Option<&Rc<dyn Any>> {
        self.parent.as_ref()
    }

    /// Nesting depth; the root scope has depth zero.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The configuration of the worker hosting this scope.
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub(crate) fn scheduler(&self) -> Rc<RefCell<Scheduler<T>>> {
        Rc::clone(&self.scheduler)
    }

    pub(crate) fn reporter(&self) -> Reporter {
        Reporter { shared: Rc::clone(&self.shared) }
    }

    pub(crate) fn add_audit(&self, audit: Audit) {
        self.shared.audits.borrow_mut().push(audit);
    }

    /// Reserves an operator identifier and its progress location.
    pub(crate) fn allocate(&self) -> usize {
        let mut operators = self.operators.borrow_mut();
        operators.push(None);
        let location = self.scheduler.borrow_mut().tracker.add_location();
        debug_assert_eq!(location + 1, operators.len());
        location
    }

    /// Places the operator for a reserved identifier.
    pub(crate) fn install(&self, index: usize, operator: Box<dyn Operate<T>>) {
        let mut operators = self.operators.borrow_mut();
        assert!(operators[index].is_none(), "operator {} installed twice", index);
        operators[index] = Some(operator);
    }

    /// Attaches operator `target` to the output `tee` of operator `source`.
    pub(crate) fn connect<D: Clone>(&self, source: usize, tee: &Tee<D, T>, target: usize) -> Puller<D, T> {
        self.add_edge(source, target);
        self.attach(tee, target)
    }

    /// Attaches operator `target` to `tee`, without recording where `tee` comes from.
    pub(crate) fn attach<D: Clone>(&self, tee: &Tee<D, T>, target: usize) -> Puller<D, T> {
        let (pusher, puller) = channel(target, Rc::clone(&self.scheduler));
        tee.add_pusher(pusher);
        puller
    }

    pub(crate) fn add_edge(&self, source: usize, target: usize) {
        self.scheduler.borrow_mut().tracker.add_edge(source, target);
    }

    pub(crate) fn notifier(&self, operator: usize) -> Notifier<T> {
        Notifier::new(operator, Rc::clone(&self.scheduler))
    }

    pub(crate) fn input_frontier(&self, operator: usize) -> InputFrontier<T> {
        InputFrontier::new(operator, Rc::clone(&self.scheduler), Rc::clone(&self.bound))
    }

    /// Replaces the times at which data may still enter this scope from outside.
    pub(crate) fn set_bound(&self, bound: Antichain<T>) {
        *self.bound.borrow_mut() = bound;
    }

    /// The frontier of times that may still arrive at `operator`.
    pub fn frontier(&self, operator: usize) -> Antichain<T> {
        self.input_frontier(operator).get()
    }

    /// True if no work is pending in this scope.
    pub fn is_idle(&self) -> bool {
        self.scheduler.borrow().queue.is_empty()
    }

    /// The time of the least pending work item.
    pub(crate) fn next_time(&self) -> Option<T> {
        self.scheduler.borrow().next_time().cloned()
    }

    /// Runs the least ready work item whose time satisfies `limit`.
    ///
    /// Returns the time of the item run, or `None` if nothing was ready.
    pub(crate) fn step_with<L: Fn(&T) -> bool>(&self, limit: L) -> Option<T> {
        let item = self.scheduler.borrow_mut().pop_ready(limit)?;
        let taken = self.operators.borrow_mut()[item.operator].take();
        match taken {
            Some(mut operator) => {
                if self.shared.logger.enabled() {
                    self.shared.logger.log(ScheduleEvent {
                        depth: self.depth,
                        operator: item.operator,
                        name: operator.name().to_string(),
                    });
                }
                operator.run(&item.time);
                self.operators.borrow_mut()[item.operator] = Some(operator);
            }
            None => {
                log::error!("work scheduled for operator {} before it was installed", item.operator);
            }
        }
        let time = item.time.clone();
        self.scheduler.borrow_mut().retire(item);
        Some(time)
    }

    /// Drops all pending work and operator state at times satisfying `abandon`.
    pub(crate) fn discard(&self, abandon: &dyn Fn(&T) -> bool) -> usize {
        let dropped = self.scheduler.borrow_mut().discard(abandon);
        for operator in self.operators.borrow_mut().iter_mut().flatten() {
            operator.discard(abandon);
        }
        dropped
    }
}
