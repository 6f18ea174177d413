//! Input sessions for simplified collection updates.
//!
//! An `InputSession` buffers updates with their logical times and introduces them into the
//! dataflow when flushed. Flushed updates wait in the input operator's mailbox until the operator
//! runs, so consumers attached after a flush still receive them. The session holds its current
//! time in the progress tracker: work at that time or later waits, as more input may still arrive,
//! while work at earlier times may proceed. Advancing the session releases its hold on earlier
//! times.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use fnv::FnvHashMap;

use crate::collection::Collection;
use crate::dataflow::channels::{channel, Puller, Pusher, Tee};
use crate::dataflow::operate::Source;
use crate::dataflow::{Operate, Scope};
use crate::error::{Error, Result};
use crate::scheduling::Scheduler;
use crate::timestamp::Timestamp;
use crate::{Data, Diff};

impl<T: Timestamp> Scope<T> {
    /// Creates a new collection and an input session to control it.
    ///
    /// # Examples
    ///
    /// ```
    /// use deferred_dataflow::{Config, Worker};
    /// use deferred_dataflow::operators::Capture;
    ///
    /// let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    /// let (mut input, captured) = worker.dataflow(|scope| {
    ///     let (input, words) = scope.new_collection::<&'static str>();
    ///     (input, words.capture())
    /// });
    ///
    /// input.insert("hello");
    /// input.advance_to(1).unwrap();
    /// input.remove("hello");
    /// input.advance_to(2).unwrap();
    /// worker.step_while(|| captured.probe().less_than(&2));
    ///
    /// assert_eq!(captured.updates(), vec![("hello", 0, 1), ("hello", 1, -1)]);
    /// ```
    pub fn new_collection<D: Data>(&self) -> (InputSession<T, D>, Collection<T, D>) {
        // The session holds its time at a location of its own, upstream of the input operator.
        let session = self.allocate();
        self.install(session, Box::new(Source { name: "InputSession" }));
        let operator = self.allocate();
        self.add_edge(session, operator);
        let tee = Tee::default();
        let (pusher, puller) = channel(operator, self.scheduler());
        self.install(operator, Box::new(Input { input: puller, output: tee.clone() }));

        let scheduler = self.scheduler();
        {
            let mut borrow = scheduler.borrow_mut();
            borrow.tracker.mark_input(session);
            borrow.tracker.hold(session, T::minimum());
        }

        let net = Rc::new(RefCell::new(FnvHashMap::default()));
        let audited = Rc::clone(&net);
        self.add_audit(Box::new(move || {
            audited
                .borrow()
                .iter()
                .filter(|(_, count)| **count < 0)
                .map(|(data, count): (&D, &Diff)| format!("input {} holds {:?} with multiplicity {}", operator, data, count))
                .collect()
        }));

        let handle = InputSession {
            time: T::minimum(),
            buffer: Vec::new(),
            pusher,
            session,
            scheduler,
            net,
        };
        (handle, Collection::new(self.clone(), operator, tee))
    }

    /// Creates a new collection with initial contents, and an input session to control it.
    pub fn new_collection_from<D, I>(&self, data: I) -> (InputSession<T, D>, Collection<T, D>)
    where
        D: Data,
        I: IntoIterator<Item=D>,
    {
        let (mut session, collection) = self.new_collection();
        for datum in data {
            session.insert(datum);
        }
        (session, collection)
    }
}

/// Forwards flushed updates to the consumers of an input collection.
struct Input<D, T: Timestamp> {
    input: Puller<D, T>,
    output: Tee<D, T>,
}

impl<D: Data, T: Timestamp> Operate<T> for Input<D, T> {
    fn name(&self) -> &str { "Input" }

    fn run(&mut self, time: &T) {
        self.output.give(time, self.input.take(time));
    }

    fn discard(&mut self, abandon: &dyn Fn(&T) -> bool) {
        self.input.discard(abandon);
    }
}

/// An input session, introducing updates to a collection.
pub struct InputSession<T: Timestamp, D: Data> {
    time: T,
    buffer: Vec<(D, T, Diff)>,
    pusher: Pusher<D, T>,
    session: usize,
    scheduler: Rc<RefCell<Scheduler<T>>>,
    net: Rc<RefCell<FnvHashMap<D, Diff>>>,
}

impl<T: Timestamp, D: Data> InputSession<T, D> {
    /// Adds an element to the collection.
    pub fn insert(&mut self, element: D) { self.update(element, 1); }
    /// Removes an element from the collection.
    pub fn remove(&mut self, element: D) { self.update(element, -1); }

    /// Adds to the weight of an element in the collection, at the session's current time.
    pub fn update(&mut self, element: D, change: Diff) {
        let time = self.time.clone();
        self.buffer.push((element, time, change));
    }

    /// Adds to the weight of an element in the collection at a time not before the session's.
    pub fn update_at(&mut self, element: D, time: T, change: Diff) -> Result<()> {
        if !self.time.less_equal(&time) {
            return Err(Error::Input(format!(
                "update to {:?} at {:?}, before the session time {:?}",
                element, time, self.time
            )));
        }
        self.buffer.push((element, time, change));
        Ok(())
    }

    /// Adds an element to the collection at a time not before the session's.
    pub fn insert_at(&mut self, element: D, time: T) -> Result<()> {
        self.update_at(element, time, 1)
    }

    /// Removes an element from the collection at a time not before the session's.
    pub fn remove_at(&mut self, element: D, time: T) -> Result<()> {
        self.update_at(element, time, -1)
    }

    /// Introduces buffered updates into the dataflow.
    pub fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let mut batches: BTreeMap<T, Vec<(D, Diff)>> = BTreeMap::new();
        {
            let mut net = self.net.borrow_mut();
            for (data, time, diff) in self.buffer.drain(..) {
                *net.entry(data.clone()).or_insert(0) += diff;
                batches.entry(time).or_default().push((data, diff));
            }
            net.retain(|_, count| *count != 0);
        }
        for (time, batch) in batches {
            self.pusher.push(&time, batch);
        }
    }

    /// Flushes buffered updates and advances the session to `time`.
    ///
    /// Work at times not greater or equal to `time` may proceed once the session has advanced.
    pub fn advance_to(&mut self, time: T) -> Result<()> {
        if !self.time.less_equal(&time) {
            return Err(Error::Input(format!("cannot advance input from {:?} back to {:?}", self.time, time)));
        }
        self.flush();
        let mut scheduler = self.scheduler.borrow_mut();
        scheduler.tracker.hold(self.session, time.clone());
        scheduler.tracker.release(self.session, std::mem::replace(&mut self.time, time));
        Ok(())
    }

    /// Reveals the current time of the session.
    pub fn time(&self) -> &T {
        &self.time
    }

    /// Closes the input, flushing buffered updates and releasing the session's hold.
    pub fn close(self) { }
}

impl<T: Timestamp, D: Data> Drop for InputSession<T, D> {
    fn drop(&mut self) {
        self.flush();
        self.scheduler.borrow_mut().tracker.release(self.session, self.time.clone());
    }
}
