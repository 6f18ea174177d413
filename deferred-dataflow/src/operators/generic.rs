//! Operators that transform batches without keeping state across times.

use crate::consolidation::consolidate;
use crate::dataflow::channels::{Puller, Tee};
use crate::dataflow::Operate;
use crate::timestamp::Timestamp;
use crate::{Data, Diff};

/// Applies `logic` to the batch received at each time, sending its output at the same time.
pub(crate) struct Unary<D1, D2, T: Timestamp, L> {
    pub(crate) name: &'static str,
    pub(crate) input: Puller<D1, T>,
    pub(crate) output: Tee<D2, T>,
    pub(crate) logic: L,
}

impl<D1, D2, T, L> Operate<T> for Unary<D1, D2, T, L>
where
    D1: Data,
    D2: Data,
    T: Timestamp,
    L: FnMut(&T, Vec<(D1, Diff)>, &mut Vec<(D2, Diff)>) + 'static,
{
    fn name(&self) -> &str { self.name }

    fn run(&mut self, time: &T) {
        let batch = self.input.take(time);
        if batch.is_empty() {
            return;
        }
        let mut output = Vec::with_capacity(batch.len());
        (self.logic)(time, batch, &mut output);
        self.output.give(time, output);
    }

    fn discard(&mut self, abandon: &dyn Fn(&T) -> bool) {
        self.input.discard(abandon);
    }
}

/// Merges the batches of any number of inputs.
pub(crate) struct Concatenate<D: Data, T: Timestamp> {
    pub(crate) name: &'static str,
    pub(crate) inputs: Vec<Puller<D, T>>,
    pub(crate) output: Tee<D, T>,
}

impl<D: Data, T: Timestamp> Operate<T> for Concatenate<D, T> {
    fn name(&self) -> &str { self.name }

    fn run(&mut self, time: &T) {
        let mut batch = Vec::new();
        for input in self.inputs.iter() {
            batch.extend(input.take(time));
        }
        consolidate(&mut batch);
        self.output.give(time, batch);
    }

    fn discard(&mut self, abandon: &dyn Fn(&T) -> bool) {
        for input in self.inputs.iter() {
            input.discard(abandon);
        }
    }
}
