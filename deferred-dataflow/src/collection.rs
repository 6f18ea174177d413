//! Types and traits associated with collections of data.
//!
//! The `Collection` type is the main type through which programs describe dataflow. A collection
//! is a multiset of records that changes over logical time; each operator on collections adds an
//! operator to the scope and returns the collection it produces.

use crate::consolidation::consolidate;
use crate::dataflow::channels::{Puller, Tee};
use crate::dataflow::operate::Source;
use crate::dataflow::{Operate, Scope};
use crate::difference::Abelian;
use crate::operators::generic::{Concatenate, Unary};
use crate::timestamp::Timestamp;
use crate::{Data, Diff};

/// A mutable collection of values of type `D`, changing over times of type `T`.
pub struct Collection<T: Timestamp, D> {
    scope: Scope<T>,
    operator: usize,
    tee: Tee<D, T>,
}

impl<T: Timestamp, D> Clone for Collection<T, D> {
    fn clone(&self) -> Self {
        Collection {
            scope: self.scope.clone(),
            operator: self.operator,
            tee: self.tee.clone(),
        }
    }
}

impl<T: Timestamp, D: Data> Collection<T, D> {
    /// Wraps the output of `operator` as a collection.
    pub(crate) fn new(scope: Scope<T>, operator: usize, tee: Tee<D, T>) -> Self {
        Collection { scope, operator, tee }
    }

    /// A collection that never changes.
    pub fn empty(scope: &Scope<T>) -> Self {
        let operator = scope.allocate();
        scope.install(operator, Box::new(Source { name: "Empty" }));
        Collection::new(scope.clone(), operator, Tee::default())
    }

    /// The scope containing the collection.
    pub fn scope(&self) -> Scope<T> {
        self.scope.clone()
    }

    /// The identifier of the operator producing the collection.
    pub fn operator(&self) -> usize {
        self.operator
    }

    pub(crate) fn tee(&self) -> &Tee<D, T> {
        &self.tee
    }

    /// Adds an operator reading this collection, built by `constructor` from its identifier and
    /// input, and returns the operator's identifier.
    pub(crate) fn attach_operator<F>(&self, constructor: F) -> usize
    where
        F: FnOnce(usize, Puller<D, T>) -> Box<dyn Operate<T>>,
    {
        let operator = self.scope.allocate();
        let input = self.scope.connect(self.operator, &self.tee, operator);
        self.scope.install(operator, constructor(operator, input));
        operator
    }

    /// Applies `logic` to the batch of updates at each time.
    ///
    /// The output is produced at the same time as the input. This is the building block for the
    /// stateless operators below, and for application operators of the same shape.
    pub fn unary<D2, L>(&self, name: &'static str, logic: L) -> Collection<T, D2>
    where
        D2: Data,
        L: FnMut(&T, Vec<(D, Diff)>, &mut Vec<(D2, Diff)>) + 'static,
    {
        let output = Tee::default();
        let tee = output.clone();
        let operator = self.attach_operator(|_, input| Box::new(Unary { name, input, output, logic }));
        Collection::new(self.scope(), operator, tee)
    }

    /// Applies the supplied function to each element of the collection.
    ///
    /// # Examples
    ///
    /// ```
    /// use deferred_dataflow::{Config, Worker};
    /// use deferred_dataflow::operators::Capture;
    ///
    /// let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    /// let (mut input, captured) = worker.dataflow(|scope| {
    ///     let (input, data) = scope.new_collection();
    ///     (input, data.map(|x: u64| x * 2).capture())
    /// });
    /// input.insert(3);
    /// input.close();
    /// worker.run();
    /// assert_eq!(captured.accumulate(), vec![(6, 1)]);
    /// ```
    pub fn map<D2: Data, L: FnMut(D) -> D2 + 'static>(&self, mut logic: L) -> Collection<T, D2> {
        self.unary("Map", move |_time, input, output| {
            output.extend(input.into_iter().map(|(data, diff)| (logic(data), diff)));
        })
    }

    /// Applies the supplied function to each element, producing any number of outputs.
    pub fn flat_map<D2, I, L>(&self, mut logic: L) -> Collection<T, D2>
    where
        D2: Data,
        I: IntoIterator<Item=D2>,
        L: FnMut(D) -> I + 'static,
    {
        self.unary("FlatMap", move |_time, input, output| {
            for (data, diff) in input {
                output.extend(logic(data).into_iter().map(|x| (x, diff)));
            }
        })
    }

    /// Retains only the elements of the collection satisfying the supplied predicate.
    pub fn filter<L: FnMut(&D) -> bool + 'static>(&self, mut logic: L) -> Collection<T, D> {
        self.unary("Filter", move |_time, input, output| {
            output.extend(input.into_iter().filter(|(data, _)| logic(data)));
        })
    }

    /// Negates the counts of each element in the collection.
    pub fn negate(&self) -> Collection<T, D> {
        self.unary("Negate", |_time, input, output| {
            output.extend(input.into_iter().map(|(data, diff)| (data, diff.negate())));
        })
    }

    /// Adds the counts of elements from each collection.
    pub fn concat(&self, other: &Collection<T, D>) -> Collection<T, D> {
        self.concatenate(Some(other.clone()))
    }

    /// Adds the counts of elements from this and each of the other collections.
    pub fn concatenate<I>(&self, others: I) -> Collection<T, D>
    where
        I: IntoIterator<Item=Collection<T, D>>,
    {
        let mut sources = vec![self.clone()];
        sources.extend(others);

        let operator = self.scope.allocate();
        let inputs = sources
            .iter()
            .map(|source| self.scope.connect(source.operator, &source.tee, operator))
            .collect();
        let output = Tee::default();
        self.scope.install(operator, Box::new(Concatenate { name: "Concatenate", inputs, output: output.clone() }));
        Collection::new(self.scope(), operator, output)
    }

    /// Accumulates the updates at each time, removing those that cancel.
    pub fn consolidate(&self) -> Collection<T, D> {
        self.unary("Consolidate", |_time, mut input, output| {
            consolidate(&mut input);
            output.append(&mut input);
        })
    }

    /// Applies a supplied function to each update. Diagnostic.
    pub fn inspect<F: FnMut(&(D, T, Diff)) + 'static>(&self, mut func: F) -> Collection<T, D> {
        self.unary("Inspect", move |time, input, output| {
            for (data, diff) in input {
                let update = (data, time.clone(), diff);
                func(&update);
                output.push((update.0, update.2));
            }
        })
    }

    /// Applies a supplied function to each batch of updates, with its time. Diagnostic.
    pub fn inspect_batch<F: FnMut(&T, &[(D, Diff)]) + 'static>(&self, mut func: F) -> Collection<T, D> {
        self.unary("InspectBatch", move |time, mut input, output| {
            func(time, &input[..]);
            output.append(&mut input);
        })
    }
}
