//! Group records by a key, and apply a reduction function.
//!
//! The `reduce` operators act on data that can be viewed as pairs `(key, val)`. They group records
//! with the same key, and apply user supplied logic to the key and the accumulated values, which
//! is expected to populate a list of output values. The operator then emits only the difference
//! between the new output and the output it has produced so far for that key.
//!
//! Values are presented sorted, with positive multiplicities. This ordering can be exploited when
//! only the first few elements are required, as `min` does.
//!
//! With partially ordered times, the accumulated input at `t` can change at times that are not
//! themselves input times: an update at `t1` and one at an incomparable `t2` together define the
//! input at `join(t1, t2)`. When a key is processed at `t`, every recorded time `u` not less or
//! equal to `t` makes `join(t, u)` interesting, and the key is revisited at that time.
//!
//! Input and output histories are compacted against the operator's input frontier as they grow.

use std::collections::BTreeMap;

use fnv::FnvHashSet;
use smallvec::SmallVec;

use crate::collection::Collection;
use crate::config::TieBreak;
use crate::consolidation::{consolidate, consolidate_slice};
use crate::dataflow::channels::{Puller, Tee};
use crate::dataflow::operate::InputFrontier;
use crate::dataflow::{Notifier, Operate};
use crate::difference::Abelian;
use crate::hashable::Shards;
use crate::operators::history::{record, History};
use crate::timestamp::Timestamp;
use crate::{Data, Diff};

/// Computes the output for a key from its accumulated values.
pub trait ReduceFn<K, V, O> {
    /// Populates `output` from the values of `key`.
    ///
    /// `input` is sorted by value, contains only positive multiplicities, and is never empty.
    fn reduce(&mut self, key: &K, input: &[(&V, Diff)], output: &mut Vec<(O, Diff)>);
}

/// Adapts a closure to `ReduceFn`.
pub struct ReduceClosure<F>(pub F);

impl<K, V, O, F> ReduceFn<K, V, O> for ReduceClosure<F>
where
    F: FnMut(&K, &[(&V, Diff)], &mut Vec<(O, Diff)>),
{
    #[inline]
    fn reduce(&mut self, key: &K, input: &[(&V, Diff)], output: &mut Vec<(O, Diff)>) {
        (self.0)(key, input, output)
    }
}

/// Retains the least value for each key.
struct MinValue;

impl<K, V: Clone> ReduceFn<K, V, V> for MinValue {
    fn reduce(&mut self, _key: &K, input: &[(&V, Diff)], output: &mut Vec<(V, Diff)>) {
        output.push((input[0].0.clone(), 1));
    }
}

/// Extension trait for the `reduce` differential dataflow method.
pub trait Reduce<T: Timestamp, K: Data, V: Data> {
    /// Applies a reduction function on records grouped by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use deferred_dataflow::{Config, Worker};
    /// use deferred_dataflow::operators::{Capture, Reduce};
    ///
    /// let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    /// let captured = worker.dataflow(|scope| {
    ///     // report the first value for each group
    ///     scope.new_collection_from(1 .. 10).1
    ///          .map(|x| (x / 3, x))
    ///          .reduce(|_key, src, dst| dst.push((*src[0].0, 1)))
    ///          .capture()
    /// });
    /// worker.run();
    /// assert_eq!(captured.accumulate(), vec![((0, 1), 1), ((1, 3), 1), ((2, 6), 1), ((3, 9), 1)]);
    /// ```
    fn reduce<O, F>(&self, logic: F) -> Collection<T, (K, O)>
    where
        O: Data,
        F: FnMut(&K, &[(&V, Diff)], &mut Vec<(O, Diff)>) + 'static,
    {
        self.reduce_core("Reduce", ReduceClosure(logic))
    }

    /// Retains the least value for each key.
    fn min(&self) -> Collection<T, (K, V)>;

    /// Applies `logic` on records grouped by key, naming the operator `name`.
    fn reduce_core<O, L>(&self, name: &'static str, logic: L) -> Collection<T, (K, O)>
    where
        O: Data,
        L: ReduceFn<K, V, O> + 'static;
}

impl<T: Timestamp, K: Data, V: Data> Reduce<T, K, V> for Collection<T, (K, V)> {
    fn min(&self) -> Collection<T, (K, V)> {
        self.reduce_core("Min", MinValue)
    }

    fn reduce_core<O, L>(&self, name: &'static str, logic: L) -> Collection<T, (K, O)>
    where
        O: Data,
        L: ReduceFn<K, V, O> + 'static,
    {
        let scope = self.scope();
        let config = scope.config().clone();
        let output = Tee::default();
        let tee = output.clone();
        let operator = self.attach_operator(|index, input| Box::new(ReduceOperator {
            name,
            input,
            notifier: scope.notifier(index),
            frontier: scope.input_frontier(index),
            inputs: Shards::new(config.shard_count),
            outputs: Shards::new(config.shard_count),
            pending: BTreeMap::new(),
            tie_break: config.tie_break,
            output,
            logic,
        }));
        Collection::new(scope, operator, tee)
    }
}

/// Extension trait for the `count` differential dataflow method.
pub trait Count<T: Timestamp, K: Data> {
    /// Counts the number of occurrences of each element.
    ///
    /// Elements with non-positive accumulated counts are absent from the output.
    fn count(&self) -> Collection<T, (K, Diff)>;
}

impl<T: Timestamp, K: Data> Count<T, K> for Collection<T, K> {
    fn count(&self) -> Collection<T, (K, Diff)> {
        self.map(|key| (key, ()))
            .reduce_core("Count", ReduceClosure(|_key: &K, input: &[(&(), Diff)], output: &mut Vec<(Diff, Diff)>| {
                output.push((input[0].1, 1));
            }))
    }
}

/// Extension trait for the `distinct` and `threshold` differential dataflow methods.
pub trait Threshold<T: Timestamp, K: Data> {
    /// Reduces the collection to one occurrence of each distinct element.
    fn distinct(&self) -> Collection<T, K> {
        self.threshold(|_, _| 1)
    }

    /// Transforms the count of each element by `logic`, retaining the element with the result.
    fn threshold<F: FnMut(&K, Diff) -> Diff + 'static>(&self, logic: F) -> Collection<T, K>;
}

impl<T: Timestamp, K: Data> Threshold<T, K> for Collection<T, K> {
    fn threshold<F: FnMut(&K, Diff) -> Diff + 'static>(&self, mut logic: F) -> Collection<T, K> {
        self.map(|key| (key, ()))
            .reduce_core("Threshold", ReduceClosure(move |key: &K, input: &[(&(), Diff)], output: &mut Vec<((), Diff)>| {
                let count = logic(key, input[0].1);
                if count != 0 {
                    output.push(((), count));
                }
            }))
            .map(|(key, ())| key)
    }
}

struct ReduceOperator<K, V, O, T: Timestamp, L> {
    name: &'static str,
    input: Puller<(K, V), T>,
    notifier: Notifier<T>,
    frontier: InputFrontier<T>,
    inputs: Shards<K, History<V, T>>,
    outputs: Shards<K, History<O, T>>,
    /// Keys to revisit at future times, even without input at those times.
    pending: BTreeMap<T, Vec<K>>,
    tie_break: TieBreak,
    output: Tee<(K, O), T>,
    logic: L,
}

impl<K, V, O, T, L> ReduceOperator<K, V, O, T, L>
where
    K: Data,
    V: Data,
    O: Data,
    T: Timestamp,
    L: ReduceFn<K, V, O>,
{
    /// The keys to process at `time`, in the configured order.
    fn keys_at(&mut self, time: &T, changed: Vec<K>) -> Vec<K> {
        let mut keys = changed;
        if let Some(revisit) = self.pending.remove(time) {
            keys.extend(revisit);
        }
        match self.tie_break {
            TieBreak::Deterministic => {
                keys.sort();
                keys.dedup();
            }
            TieBreak::Stable => {
                let mut seen = FnvHashSet::default();
                keys.retain(|key| seen.insert(key.clone()));
            }
        }
        keys
    }

    /// Schedules `key` at every interesting time induced by `time` and the key's histories.
    fn revisit(&mut self, key: &K, time: &T) {
        let mut times = Vec::new();
        if let Some(history) = self.inputs.get(key) {
            times.extend(history.iter().map(|(_, t, _)| t).filter(|t| !t.less_equal(time)).map(|t| time.join(t)));
        }
        if let Some(history) = self.outputs.get(key) {
            times.extend(history.iter().map(|(_, t, _)| t).filter(|t| !t.less_equal(time)).map(|t| time.join(t)));
        }
        times.sort();
        times.dedup();
        for future in times {
            let keys = self.pending.entry(future.clone()).or_default();
            if keys.last() != Some(key) {
                keys.push(key.clone());
            }
            self.notifier.notify_at(future);
        }
    }
}

impl<K, V, O, T, L> Operate<T> for ReduceOperator<K, V, O, T, L>
where
    K: Data,
    V: Data,
    O: Data,
    T: Timestamp,
    L: ReduceFn<K, V, O>,
{
    fn name(&self) -> &str { self.name }

    fn run(&mut self, time: &T) {
        let mut batch = self.input.take(time);
        consolidate(&mut batch);

        let frontier = self.frontier.get();
        let mut changed = Vec::with_capacity(batch.len());
        for ((key, val), diff) in batch {
            if changed.last() != Some(&key) {
                changed.push(key.clone());
            }
            record(self.inputs.get_or_default(key), val, time, diff, frontier.borrow());
        }

        let mut produced = Vec::new();
        let mut result = Vec::new();
        for key in self.keys_at(time, changed) {

            // Accumulate the input at `time`, retaining positive multiplicities.
            result.clear();
            if let Some(history) = self.inputs.get(&key) {
                let mut values: SmallVec<[(&V, Diff); 16]> = history
                    .iter()
                    .filter(|(_, t, _)| t.less_equal(time))
                    .map(|(val, _, diff)| (val, *diff))
                    .collect();
                let len = consolidate_slice(&mut values[..]);
                values.truncate(len);
                values.retain(|(_, diff)| *diff > 0);
                if !values.is_empty() {
                    self.logic.reduce(&key, &values[..], &mut result);
                }
            }

            // Subtract the output produced so far.
            if let Some(history) = self.outputs.get(&key) {
                result.extend(
                    history
                        .iter()
                        .filter(|(_, t, _)| t.less_equal(time))
                        .map(|(out, _, diff)| (out.clone(), diff.negate()))
                );
            }
            consolidate(&mut result);

            if !result.is_empty() {
                let history = self.outputs.get_or_default(key.clone());
                for (out, diff) in result.iter() {
                    record(history, out.clone(), time, *diff, frontier.borrow());
                }
                produced.extend(result.drain(..).map(|(out, diff)| ((key.clone(), out), diff)));
            }

            self.revisit(&key, time);
        }

        consolidate(&mut produced);
        self.output.give(time, produced);
    }

    fn discard(&mut self, abandon: &dyn Fn(&T) -> bool) {
        self.input.discard(abandon);
        self.pending.retain(|time, _| !abandon(time));
    }
}

#[cfg(test)]
mod tests {

    use crate::config::{Config, TieBreak};
    use crate::operators::{Capture, Count, Reduce, Threshold};
    use crate::timestamp::Pair;
    use crate::worker::Worker;

    #[test]
    fn retractions_revise_outputs() {
        let mut worker = Worker::<u64>::new(Config::default()).unwrap();
        let (mut input, captured) = worker.dataflow(|scope| {
            let (input, data) = scope.new_collection::<(char, u64)>();
            (input, data.min().capture())
        });

        input.insert(('a', 5));
        input.insert(('a', 3));
        input.advance_to(1).unwrap();
        input.remove(('a', 3));
        input.advance_to(2).unwrap();
        input.remove(('a', 5));
        input.close();
        worker.run();

        assert_eq!(captured.updates(), vec![
            (('a', 3), 0, 1),
            (('a', 3), 1, -1),
            (('a', 5), 1, 1),
            (('a', 5), 2, -1),
        ]);
    }

    #[test]
    fn counts_and_distinct() {
        let mut worker = Worker::<u64>::new(Config::default().tie_break(TieBreak::Stable).shard_count(4)).unwrap();
        let (counts, distinct) = worker.dataflow(|scope| {
            let data = scope.new_collection_from(vec!['x', 'y', 'x', 'z', 'x']).1;
            (data.count().capture(), data.distinct().capture())
        });
        worker.run();

        assert_eq!(counts.accumulate(), vec![(('x', 3), 1), (('y', 1), 1), (('z', 1), 1)]);
        assert_eq!(distinct.accumulate(), vec![('x', 1), ('y', 1), ('z', 1)]);
    }

    #[test]
    fn long_lived_keys_stay_correct() {
        let mut worker = Worker::<u64>::new(Config::default()).unwrap();
        let (mut input, counts, least) = worker.dataflow(|scope| {
            let (input, data) = scope.new_collection::<(char, u64)>();
            (input, data.map(|(key, _)| key).count().capture(), data.min().capture())
        });

        for epoch in 0 .. 300u64 {
            input.insert(('k', epoch + 1));
            // Every third epoch retracts the least remaining value.
            if epoch % 3 == 0 && epoch > 0 {
                input.remove(('k', epoch / 3));
            }
            input.advance_to(epoch + 1).unwrap();
            worker.step_while(|| counts.probe().less_than(&(epoch + 1)) || least.probe().less_than(&(epoch + 1)));

            let present = (epoch + 1) - epoch / 3;
            assert_eq!(counts.accumulate_until(&epoch), vec![(('k', present as isize), 1)], "at epoch {}", epoch);
            assert_eq!(least.accumulate_until(&epoch), vec![(('k', epoch / 3 + 1), 1)], "at epoch {}", epoch);
        }
        assert!(worker.take_errors().is_empty());
    }

    #[test]
    fn revisits_keys_at_joined_times() {
        let mut worker = Worker::<Pair<u64, u64>>::new(Config::default()).unwrap();
        let (mut input, captured) = worker.dataflow(|scope| {
            let (input, data) = scope.new_collection::<(u8, u64)>();
            (input, data.reduce(|_key, src, dst| dst.push((src.len(), 1))).capture())
        });

        input.insert_at((0, 10), Pair::new(1, 0)).unwrap();
        input.insert_at((0, 20), Pair::new(0, 1)).unwrap();
        input.close();
        worker.run();

        // Both values are present only at the join of their times.
        assert_eq!(captured.accumulate_until(&Pair::new(1, 0)), vec![((0, 1), 1)]);
        assert_eq!(captured.accumulate_until(&Pair::new(0, 1)), vec![((0, 1), 1)]);
        assert_eq!(captured.accumulate_until(&Pair::new(1, 1)), vec![((0, 2), 1)]);
    }
}
