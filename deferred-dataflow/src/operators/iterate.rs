//! Iterative application of a dataflow fragment.
//!
//! The `iterate` operator takes as an argument a closure from a collection to a collection of the
//! same type. The output is the fixed point of repeatedly applying the closure, starting from the
//! source collection.
//!
//! The implementation of `iterate` does not directly apply the closure, but rather establishes a
//! nested scope whose timestamps pair the outer time with a round, in which differences circulate
//! until they dissipate. The nested scope is one operator of the enclosing scope: when run at an
//! outer time `t0`, it injects the collections that entered it at `(t0, 0)`, then runs the nested
//! scope until no work with outer time at most `t0` remains. Work the nested scope delays to later
//! rounds is part of that work, so a quiet round is not mistaken for a fixed point. Whatever left
//! the scope for `t0` is then emitted at `t0`.
//!
//! An iteration that exceeds the configured number of rounds for an outer time gives up on that
//! time: its pending work is dropped, nothing is emitted for it, and a `NonTermination` error is
//! reported to the worker. Other outer times proceed normally.
//!
//! # Examples
//!
//! The example repeatedly divides even numbers by two, and leaves odd numbers as they are.
//!
//! ```
//! use deferred_dataflow::{Config, Worker};
//! use deferred_dataflow::operators::{Capture, Iterate};
//!
//! let mut worker = Worker::<u64>::new(Config::default()).unwrap();
//! let captured = worker.dataflow(|scope| {
//!     let numbers = scope.new_collection_from(vec![12u64, 7, 40]).1;
//!     numbers
//!         .iterate(|values| values.map(|x| if x % 2 == 0 { x / 2 } else { x }))
//!         .capture()
//! });
//! worker.run();
//! assert_eq!(captured.accumulate(), vec![(3, 1), (5, 1), (7, 1)]);
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;
use std::rc::Rc;

use timely::progress::Antichain;

use crate::collection::Collection;
use crate::consolidation::consolidate;
use crate::dataflow::channels::{Puller, Tee};
use crate::dataflow::operate::{InputFrontier, Source};
use crate::dataflow::scope::Reporter;
use crate::dataflow::{Notifier, Operate, Scope};
use crate::error::Error;
use crate::logging::{AbandonEvent, FixedPointEvent};
use crate::operators::generic::Concatenate;
use crate::timestamp::{Pair, Refines, Round, Timestamp};
use crate::{Data, Diff};

/// Connects an entered collection to the iteration operator, once its identifier is known.
type EnterHook<T> = Box<dyn FnOnce(&Scope<T>, usize) -> Box<dyn EnterPort<T>>>;

/// Hooks registered by collections entering a nested scope, shared with that scope.
type EnterHooks<T> = RefCell<Vec<EnterHook<T>>>;

/// The iteration's end of a collection entering it.
trait EnterPort<T: Timestamp> {
    /// Moves updates received at `time` into the nested scope, at round zero.
    fn inject(&mut self, time: &T);
    /// Drops updates received at times satisfying `abandon`.
    fn discard(&mut self, abandon: &dyn Fn(&T) -> bool);
}

struct EnterChannel<D, T: Timestamp> {
    input: Puller<D, T>,
    output: Tee<D, Pair<T, Round>>,
}

impl<D: Data, T: Timestamp> EnterPort<T> for EnterChannel<D, T> {
    fn inject(&mut self, time: &T) {
        let batch = self.input.take(time);
        self.output.give(&<Pair<T, Round> as Refines<T>>::to_inner(time.clone()), batch);
    }

    fn discard(&mut self, abandon: &dyn Fn(&T) -> bool) {
        self.input.discard(abandon);
    }
}

impl<T: Timestamp, D: Data> Collection<T, D> {
    /// Brings the collection into a scope nested in its own, at round zero.
    ///
    /// The nested scope must have been created by `iterative` on this collection's scope, and
    /// the collection must be entered while the iteration is being built.
    pub fn enter(&self, child: &Scope<Pair<T, Round>>) -> Collection<Pair<T, Round>, D> {
        let hooks = match child.parent().and_then(|parent| parent.downcast_ref::<EnterHooks<T>>()) {
            Some(hooks) => hooks,
            None => panic!("collection entered into a scope not nested in its own"),
        };

        let operator = child.allocate();
        child.install(operator, Box::new(Source { name: "Enter" }));
        let output = Tee::default();

        let source = self.clone();
        let entered = output.clone();
        hooks.borrow_mut().push(Box::new(move |scope: &Scope<T>, iterate: usize| {
            let input = scope.connect(source.operator(), source.tee(), iterate);
            Box::new(EnterChannel { input, output: entered }) as Box<dyn EnterPort<T>>
        }));

        Collection::new(child.clone(), operator, output)
    }
}

impl<T: Timestamp> Scope<T> {
    /// Builds an iteration: a nested scope populated by `func`, whose result leaves the scope.
    ///
    /// Collections from this scope are brought into the nested scope with `enter`. The returned
    /// collection carries, at each outer time, the changes to the result at the fixed point.
    pub fn iterative<D, F>(&self, func: F) -> Collection<T, D>
    where
        D: Data,
        F: FnOnce(&Scope<Pair<T, Round>>) -> Collection<Pair<T, Round>, D>,
    {
        let hooks: Rc<EnterHooks<T>> = Rc::new(RefCell::new(Vec::new()));
        let parent: Rc<dyn Any> = Rc::clone(&hooks) as Rc<dyn Any>;
        let child = self.nested(parent);
        let result = func(&child);

        let results = Rc::new(RefCell::new(BTreeMap::new()));
        let buffer = Rc::clone(&results);
        result.attach_operator(|_, input| Box::new(Leave { input, results: buffer }));

        let operator = self.allocate();
        let registered = std::mem::take(&mut *hooks.borrow_mut());
        let ports = registered.into_iter().map(|hook| hook(self, operator)).collect();
        let output = Tee::default();
        self.install(operator, Box::new(IterateOperator {
            index: operator,
            child,
            ports,
            results,
            output: output.clone(),
            notifier: self.notifier(operator),
            frontier: self.input_frontier(operator),
            reporter: self.reporter(),
            ceiling: self.config().round_safety_ceiling,
        }));
        Collection::new(self.clone(), operator, output)
    }
}

/// Buffers the updates leaving a nested scope, by outer time.
struct Leave<D, T: Timestamp> {
    input: Puller<D, Pair<T, Round>>,
    results: Rc<RefCell<BTreeMap<T, Vec<(D, Diff)>>>>,
}

impl<D: Data, T: Timestamp> Operate<Pair<T, Round>> for Leave<D, T> {
    fn name(&self) -> &str { "Leave" }

    fn run(&mut self, time: &Pair<T, Round>) {
        let batch = self.input.take(time);
        if !batch.is_empty() {
            self.results.borrow_mut().entry(time.clone().to_outer()).or_default().extend(batch);
        }
    }

    fn discard(&mut self, abandon: &dyn Fn(&Pair<T, Round>) -> bool) {
        self.input.discard(abandon);
    }
}

struct IterateOperator<D, T: Timestamp> {
    index: usize,
    child: Scope<Pair<T, Round>>,
    ports: Vec<Box<dyn EnterPort<T>>>,
    results: Rc<RefCell<BTreeMap<T, Vec<(D, Diff)>>>>,
    output: Tee<D, T>,
    notifier: Notifier<T>,
    frontier: InputFrontier<T>,
    reporter: Reporter,
    ceiling: u64,
}

impl<D: Data, T: Timestamp> IterateOperator<D, T> {
    /// Removes and consolidates the results left at outer times at most `time`.
    fn take_results(&self, time: &T) -> Vec<(D, Diff)> {
        let mut results = self.results.borrow_mut();
        let done: Vec<T> = results.keys().filter(|t| t.less_equal(time)).cloned().collect();
        let mut batch = Vec::new();
        for t in done {
            if let Some(updates) = results.remove(&t) {
                batch.extend(updates);
            }
        }
        consolidate(&mut batch);
        batch
    }

    /// Drops all pending work for outer times at most `time`.
    fn abandon(&mut self, time: &T, rounds: u64) {
        let dropped = self.child.discard(&|inner: &Pair<T, Round>| inner.outer.less_equal(time));
        self.take_results(time);
        log::debug!("iteration {} dropped {} work items at {:?}", self.index, dropped, time);
        self.reporter.logger().log(AbandonEvent {
            operator: self.index,
            time: format!("{:?}", time),
            rounds,
        });
        self.reporter.report(Error::NonTermination { time: format!("{:?}", time), rounds });
    }
}

impl<D: Data, T: Timestamp> Operate<T> for IterateOperator<D, T> {
    fn name(&self) -> &str { "Iterate" }

    fn run(&mut self, time: &T) {
        // Outer times may only enter the child at round zero of times in the outer frontier.
        let mut bound = Antichain::new();
        for outer in self.frontier.get().iter() {
            bound.insert(<Pair<T, Round> as Refines<T>>::to_inner(outer.clone()));
        }
        self.child.set_bound(bound);

        for port in self.ports.iter_mut() {
            port.inject(time);
        }

        // Independent work in the child may run out of round order; count each round once.
        let mut seen = BTreeSet::new();
        let mut rounds = 0;
        let mut converged = true;
        while let Some(inner) = self.child.step_with(|inner| inner.outer.less_equal(time)) {
            if seen.insert(inner.inner) {
                rounds += 1;
            }
            if rounds > self.ceiling {
                converged = false;
                break;
            }
        }

        if converged {
            let batch = self.take_results(time);
            self.reporter.logger().log(FixedPointEvent {
                operator: self.index,
                time: format!("{:?}", time),
                rounds,
                updates: batch.len(),
            });
            self.output.give(time, batch);
        }
        else {
            self.abandon(time, rounds);
        }

        // Work at later outer times needs the iteration to run again then.
        if let Some(next) = self.child.next_time() {
            self.notifier.notify_at(next.to_outer());
        }
    }

    fn discard(&mut self, abandon: &dyn Fn(&T) -> bool) {
        for port in self.ports.iter_mut() {
            port.discard(abandon);
        }
        self.child.discard(&|inner: &Pair<T, Round>| abandon(&inner.outer));
        self.results.borrow_mut().retain(|time, _| !abandon(time));
    }
}

/// A collection defined recursively, as the result of a computation on itself.
///
/// A variable starts as its source collection. Once `set` is called with the result of the
/// computation, each round's variable is the previous round's result: the difference between
/// the result and the source is fed back, advanced by `step` rounds.
pub struct Variable<T: Timestamp, D: Data> {
    collection: Collection<Pair<T, Round>, D>,
    feedback: Tee<D, Pair<T, Round>>,
    source: Collection<Pair<T, Round>, D>,
    step: Round,
}

impl<T: Timestamp, D: Data> Variable<T, D> {
    /// Creates a variable starting as `source`, whose feedback advances by `step` rounds.
    ///
    /// # Panics
    ///
    /// Panics if `step` is zero, as feedback must advance the round.
    pub fn new_from(source: Collection<Pair<T, Round>, D>, step: Round) -> Self {
        assert!(step > 0, "feedback must advance the round");
        let scope = source.scope();
        let feedback = Tee::default();
        let operator = scope.allocate();
        let inputs = vec![
            scope.connect(source.operator(), source.tee(), operator),
            scope.attach(&feedback, operator),
        ];
        let output = Tee::default();
        scope.install(operator, Box::new(Concatenate { name: "Variable", inputs, output: output.clone() }));
        Variable {
            collection: Collection::new(scope, operator, output),
            feedback,
            source,
            step,
        }
    }

    /// Closes the loop: the variable at the next round is `result`. Returns `result`.
    pub fn set(self, result: &Collection<Pair<T, Round>, D>) -> Collection<Pair<T, Round>, D> {
        let difference = result.concat(&self.source.negate());
        let scope = self.collection.scope();
        let step = self.step;
        let feedback = self.feedback;
        let operator = difference.attach_operator(|_, input| Box::new(Feedback { input, output: feedback, step }));
        scope.add_edge(operator, self.collection.operator());
        result.clone()
    }
}

impl<T: Timestamp, D: Data> Deref for Variable<T, D> {
    type Target = Collection<Pair<T, Round>, D>;
    fn deref(&self) -> &Self::Target {
        &self.collection
    }
}

/// Returns updates to the head of the loop, `step` rounds later.
struct Feedback<D, T: Timestamp> {
    input: Puller<D, Pair<T, Round>>,
    output: Tee<D, Pair<T, Round>>,
    step: Round,
}

impl<D: Data, T: Timestamp> Operate<Pair<T, Round>> for Feedback<D, T> {
    fn name(&self) -> &str { "Feedback" }

    fn run(&mut self, time: &Pair<T, Round>) {
        let mut batch = self.input.take(time);
        consolidate(&mut batch);
        self.output.give(&time.advance_round(self.step), batch);
    }

    fn discard(&mut self, abandon: &dyn Fn(&Pair<T, Round>) -> bool) {
        self.input.discard(abandon);
    }
}

/// An extension trait for the `iterate` method.
pub trait Iterate<T: Timestamp, D: Data> {
    /// Iteratively applies `logic` to the source collection until convergence.
    fn iterate<F>(&self, logic: F) -> Collection<T, D>
    where
        F: FnOnce(&Collection<Pair<T, Round>, D>) -> Collection<Pair<T, Round>, D>;
}

impl<T: Timestamp, D: Data> Iterate<T, D> for Collection<T, D> {
    fn iterate<F>(&self, logic: F) -> Collection<T, D>
    where
        F: FnOnce(&Collection<Pair<T, Round>, D>) -> Collection<Pair<T, Round>, D>,
    {
        self.scope().iterative(|child| {
            let variable = Variable::new_from(self.enter(child), 1);
            let result = logic(&variable);
            variable.set(&result)
        })
    }
}

#[cfg(test)]
mod tests {

    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::config::Config;
    use crate::error::Error;
    use crate::logging::EngineEvent;
    use crate::operators::{Capture, Iterate};
    use crate::worker::Worker;

    #[test]
    fn abandons_times_past_the_ceiling() {
        let mut worker = Worker::<u64>::new(Config::default().round_safety_ceiling(50)).unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        worker.log_register(move |_, event| sink.borrow_mut().push(event.clone()));

        let (mut input, captured) = worker.dataflow(|scope| {
            let (input, numbers) = scope.new_collection::<u64>();
            let limits = numbers.iterate(|values| values.map(|x| if x < 100 { x + 1 } else { x }));
            (input, limits.capture())
        });

        input.insert(0);
        input.advance_to(1).unwrap();
        input.insert(90);
        input.close();
        worker.run();

        assert_eq!(captured.updates(), vec![(100, 1, 1)]);
        let errors = worker.take_errors();
        assert_eq!(errors, vec![Error::NonTermination { time: "0".to_string(), rounds: 51 }]);

        let outcomes: Vec<&'static str> = events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::FixedPoint(_) => Some("fixed point"),
                EngineEvent::Abandon(_) => Some("abandon"),
                _ => None,
            })
            .collect();
        assert_eq!(outcomes, vec!["abandon", "fixed point"]);
    }

    #[test]
    fn delayed_rounds_are_not_a_fixed_point() {
        use crate::operators::{Delay, Threshold};
        use crate::timestamp::Pair;

        let mut worker = Worker::<u64>::new(Config::default()).unwrap();
        let captured = worker.dataflow(|scope| {
            let numbers = scope.new_collection_from(vec![1u64]).1;
            numbers
                .iterate(|values| {
                    // Each successor only appears ten rounds per unit of its predecessor later.
                    let successors = values
                        .delay(|x, time| Pair::new(time.outer, *x * 10))
                        .filter(|x| *x < 4)
                        .map(|x| x + 1);
                    values.concat(&successors).distinct()
                })
                .capture()
        });
        worker.run();
        assert_eq!(captured.accumulate(), vec![(1, 1), (2, 1), (3, 1), (4, 1)]);
    }
}
