//! Advances the times of records, deferring their delivery.
//!
//! A record received at time `t` is delivered at `join(t, f(d, t))`, so times only move forward
//! and a function that asks for an earlier time has no effect. Records delivered at the same
//! time are gathered into one batch and one unit of downstream work, so the cost of delaying is
//! proportional to the number of distinct times, not to the number of records.
//!
//! Inside an iteration, delaying a record to a later round makes its round a priority: the
//! iteration processes rounds in order, so records delayed to round `k` are considered only
//! after every record at earlier rounds.

use std::collections::BTreeMap;

use crate::collection::Collection;
use crate::consolidation::consolidate;
use crate::dataflow::channels::{Puller, Tee};
use crate::dataflow::scope::Reporter;
use crate::dataflow::Operate;
use crate::error::Error;
use crate::logging::RescheduleEvent;
use crate::timestamp::Timestamp;
use crate::{Data, Diff};

/// Chooses the time at which a record should be delivered.
pub trait DelayFn<D, T> {
    /// The requested delivery time for `data`, received at `time`.
    fn delay(&mut self, data: &D, time: &T) -> T;
}

/// Adapts a closure to `DelayFn`.
pub struct DelayClosure<F>(pub F);

impl<D, T, F: FnMut(&D, &T) -> T> DelayFn<D, T> for DelayClosure<F> {
    #[inline]
    fn delay(&mut self, data: &D, time: &T) -> T {
        (self.0)(data, time)
    }
}

/// Methods to advance the times of records.
pub trait Delay<T: Timestamp, D: Data> {
    /// Delivers each record at the join of its time and the time returned by `func`.
    ///
    /// # Examples
    ///
    /// ```
    /// use deferred_dataflow::{Config, Worker};
    /// use deferred_dataflow::operators::{Capture, Delay};
    ///
    /// let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    /// let (mut input, captured) = worker.dataflow(|scope| {
    ///     let (input, data) = scope.new_collection::<u64>();
    ///     (input, data.delay(|x, _time| *x).capture())
    /// });
    ///
    /// input.insert(0);
    /// input.insert(3);
    /// input.close();
    /// worker.run();
    /// assert_eq!(captured.updates(), vec![(0, 0, 1), (3, 3, 1)]);
    /// ```
    fn delay<F: FnMut(&D, &T) -> T + 'static>(&self, func: F) -> Collection<T, D> {
        self.delay_core(DelayClosure(func))
    }

    /// Delivers each record at the join of its time and the time chosen by `logic`.
    fn delay_core<L: DelayFn<D, T> + 'static>(&self, logic: L) -> Collection<T, D>;

    /// Delivers each record at exactly the time returned by `func`.
    ///
    /// A record for which `func` returns a time not greater or equal to its own is dropped, and a
    /// configuration error is reported to the worker.
    fn delay_exact<F: FnMut(&D, &T) -> T + 'static>(&self, func: F) -> Collection<T, D>;
}

impl<T: Timestamp, D: Data> Delay<T, D> for Collection<T, D> {
    fn delay_core<L: DelayFn<D, T> + 'static>(&self, logic: L) -> Collection<T, D> {
        build(self, logic, false)
    }

    fn delay_exact<F: FnMut(&D, &T) -> T + 'static>(&self, func: F) -> Collection<T, D> {
        build(self, DelayClosure(func), true)
    }
}

fn build<T, D, L>(collection: &Collection<T, D>, logic: L, exact: bool) -> Collection<T, D>
where
    T: Timestamp,
    D: Data,
    L: DelayFn<D, T> + 'static,
{
    let scope = collection.scope();
    let output = Tee::default();
    let tee = output.clone();
    let operator = collection.attach_operator(|index, input| Box::new(DelayOperator {
        index,
        reporter: scope.reporter(),
        input,
        output,
        logic,
        exact,
    }));
    Collection::new(scope, operator, tee)
}

struct DelayOperator<D, T: Timestamp, L> {
    index: usize,
    reporter: Reporter,
    input: Puller<D, T>,
    output: Tee<D, T>,
    logic: L,
    exact: bool,
}

impl<D: Data, T: Timestamp, L: DelayFn<D, T>> Operate<T> for DelayOperator<D, T, L> {
    fn name(&self) -> &str { if self.exact { "DelayExact" } else { "Delay" } }

    fn run(&mut self, time: &T) {
        let batch = self.input.take(time);
        let records = batch.len();
        let mut rejected = 0;

        let mut delayed: BTreeMap<T, Vec<(D, Diff)>> = BTreeMap::new();
        for (data, diff) in batch {
            let requested = self.logic.delay(&data, time);
            let target = if !self.exact {
                time.join(&requested)
            }
            else if time.less_equal(&requested) {
                requested
            }
            else {
                rejected += 1;
                self.reporter.report(Error::Configuration(format!(
                    "delay of {:?} from {:?} to earlier time {:?}", data, time, requested
                )));
                continue;
            };
            delayed.entry(target).or_default().push((data, diff));
        }

        self.reporter.logger().log(RescheduleEvent {
            operator: self.index,
            records,
            times: delayed.len(),
            rejected,
        });

        for (target, mut batch) in delayed {
            consolidate(&mut batch);
            self.output.give(&target, batch);
        }
    }

    fn discard(&mut self, abandon: &dyn Fn(&T) -> bool) {
        self.input.discard(abandon);
    }
}
