//! Match pairs of records based on a key.
//!
//! The join operator records every update it has seen on each input, keyed and sharded by key.
//! An update `(key, val1)` at time `t1` meets each recorded update `(key, val2)` at `t2` exactly
//! once, producing its output at `join(t1, t2)` with the product of the two counts. Updates
//! arriving on both inputs at the same time are processed as `ΔA·B + A'·ΔB`, where `A'` already
//! includes `ΔA`, so no pair is produced twice.
//!
//! Histories are compacted against the operator's input frontier as they grow, so a key whose
//! updates keep cancelling holds only the updates that still distinguish future times.

use std::collections::BTreeMap;

use crate::collection::Collection;
use crate::consolidation::consolidate;
use crate::dataflow::channels::{Puller, Tee};
use crate::dataflow::operate::InputFrontier;
use crate::dataflow::Operate;
use crate::difference::Multiply;
use crate::hashable::Shards;
use crate::operators::history::{record, History};
use crate::timestamp::Timestamp;
use crate::{Data, Diff};

/// Produces an output record from a matched pair of records.
pub trait JoinFn<K, V1, V2, D> {
    /// The output for `(key, val1)` matched with `(key, val2)`.
    fn join(&mut self, key: &K, val1: &V1, val2: &V2) -> D;
}

/// Adapts a closure to `JoinFn`.
pub struct JoinClosure<F>(pub F);

impl<K, V1, V2, D, F: FnMut(&K, &V1, &V2) -> D> JoinFn<K, V1, V2, D> for JoinClosure<F> {
    #[inline]
    fn join(&mut self, key: &K, val1: &V1, val2: &V2) -> D {
        (self.0)(key, val1, val2)
    }
}

/// Join implementations for `(key,val)` data.
pub trait Join<T: Timestamp, K: Data, V: Data> {
    /// Matches pairs `(key,val1)` and `(key,val2)` based on `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use deferred_dataflow::{Config, Worker};
    /// use deferred_dataflow::operators::{Capture, Join};
    ///
    /// let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    /// let captured = worker.dataflow(|scope| {
    ///     let x = scope.new_collection_from(vec![(0, 1), (1, 3)]).1;
    ///     let y = scope.new_collection_from(vec![(0, 'a'), (1, 'b')]).1;
    ///     x.join(&y).capture()
    /// });
    /// worker.run();
    /// assert_eq!(captured.accumulate(), vec![((0, (1, 'a')), 1), ((1, (3, 'b')), 1)]);
    /// ```
    fn join<V2: Data>(&self, other: &Collection<T, (K, V2)>) -> Collection<T, (K, (V, V2))> {
        self.join_map(other, |key, val1, val2| (key.clone(), (val1.clone(), val2.clone())))
    }

    /// Matches pairs `(key,val1)` and `(key,val2)` based on `key` and then applies a function.
    fn join_map<V2, D, F>(&self, other: &Collection<T, (K, V2)>, logic: F) -> Collection<T, D>
    where
        V2: Data,
        D: Data,
        F: FnMut(&K, &V, &V2) -> D + 'static,
    {
        self.join_core(other, JoinClosure(logic))
    }

    /// Matches pairs `(key, val)` and `key` based on `key`, producing the former with frequencies
    /// multiplied.
    fn semijoin(&self, other: &Collection<T, K>) -> Collection<T, (K, V)>;

    /// Subtracts the semijoin with `other` from `self`.
    fn antijoin(&self, other: &Collection<T, K>) -> Collection<T, (K, V)>;

    /// Matches pairs `(key,val1)` and `(key,val2)` based on `key`, producing outputs with `logic`.
    fn join_core<V2, D, L>(&self, other: &Collection<T, (K, V2)>, logic: L) -> Collection<T, D>
    where
        V2: Data,
        D: Data,
        L: JoinFn<K, V, V2, D> + 'static;
}

impl<T: Timestamp, K: Data, V: Data> Join<T, K, V> for Collection<T, (K, V)> {
    fn semijoin(&self, other: &Collection<T, K>) -> Collection<T, (K, V)> {
        let keys = other.map(|key| (key, ()));
        self.join_map(&keys, |key, val, _| (key.clone(), val.clone()))
    }

    fn antijoin(&self, other: &Collection<T, K>) -> Collection<T, (K, V)> {
        self.concat(&self.semijoin(other).negate())
    }

    fn join_core<V2, D, L>(&self, other: &Collection<T, (K, V2)>, logic: L) -> Collection<T, D>
    where
        V2: Data,
        D: Data,
        L: JoinFn<K, V, V2, D> + 'static,
    {
        let scope = self.scope();
        let shards = scope.config().shard_count;
        let operator = scope.allocate();
        let input1 = scope.connect(self.operator(), self.tee(), operator);
        let input2 = scope.connect(other.operator(), other.tee(), operator);
        let output = Tee::default();
        scope.install(operator, Box::new(JoinOperator {
            input1,
            input2,
            history1: Shards::new(shards),
            history2: Shards::new(shards),
            frontier: scope.input_frontier(operator),
            output: output.clone(),
            logic,
        }));
        Collection::new(scope, operator, output)
    }
}

struct JoinOperator<K, V1, V2, D, T: Timestamp, L> {
    input1: Puller<(K, V1), T>,
    input2: Puller<(K, V2), T>,
    history1: Shards<K, History<V1, T>>,
    history2: Shards<K, History<V2, T>>,
    frontier: InputFrontier<T>,
    output: Tee<D, T>,
    logic: L,
}

impl<K, V1, V2, D, T, L> Operate<T> for JoinOperator<K, V1, V2, D, T, L>
where
    K: Data,
    V1: Data,
    V2: Data,
    D: Data,
    T: Timestamp,
    L: JoinFn<K, V1, V2, D>,
{
    fn name(&self) -> &str { "Join" }

    fn run(&mut self, time: &T) {
        let mut batch1 = self.input1.take(time);
        let mut batch2 = self.input2.take(time);
        consolidate(&mut batch1);
        consolidate(&mut batch2);

        let frontier = self.frontier.get();
        let mut produced: BTreeMap<T, Vec<(D, Diff)>> = BTreeMap::new();

        for ((key, val1), diff1) in batch1 {
            if let Some(history) = self.history2.get(&key) {
                for (val2, time2, diff2) in history.iter() {
                    let output = self.logic.join(&key, &val1, val2);
                    produced.entry(time.join(time2)).or_default().push((output, diff1.multiply(diff2)));
                }
            }
            record(self.history1.get_or_default(key), val1, time, diff1, frontier.borrow());
        }

        for ((key, val2), diff2) in batch2 {
            if let Some(history) = self.history1.get(&key) {
                for (val1, time1, diff1) in history.iter() {
                    let output = self.logic.join(&key, val1, &val2);
                    produced.entry(time.join(time1)).or_default().push((output, diff1.multiply(&diff2)));
                }
            }
            record(self.history2.get_or_default(key), val2, time, diff2, frontier.borrow());
        }

        for (target, mut batch) in produced {
            consolidate(&mut batch);
            self.output.give(&target, batch);
        }
    }

    fn discard(&mut self, abandon: &dyn Fn(&T) -> bool) {
        self.input1.discard(abandon);
        self.input2.discard(abandon);
    }
}

#[cfg(test)]
mod tests {

    use crate::config::Config;
    use crate::operators::{Capture, Join};
    use crate::worker::Worker;

    #[test]
    fn churning_keys_join_correctly_across_epochs() {
        let mut worker = Worker::<u64>::new(Config::default()).unwrap();
        let (mut left, mut right, captured) = worker.dataflow(|scope| {
            let (left, x) = scope.new_collection::<(u8, u64)>();
            let (right, y) = scope.new_collection::<(u8, char)>();
            (left, right, x.join(&y).capture())
        });

        right.insert((0, 'a'));
        for epoch in 0 .. 200u64 {
            left.insert((0, epoch));
            if epoch > 0 {
                left.remove((0, epoch - 1));
            }
            match epoch % 10 {
                0 => right.insert((0, 'b')),
                5 => right.remove((0, 'b')),
                _ => { }
            }
            left.advance_to(epoch + 1).unwrap();
            right.advance_to(epoch + 1).unwrap();
            worker.step_while(|| captured.probe().less_than(&(epoch + 1)));

            let mut expected = vec![((0, (epoch, 'a')), 1)];
            if epoch % 10 < 5 {
                expected.push(((0, (epoch, 'b')), 1));
            }
            assert_eq!(captured.accumulate_until(&epoch), expected, "at epoch {}", epoch);
        }
        assert!(worker.take_errors().is_empty());
    }
}
