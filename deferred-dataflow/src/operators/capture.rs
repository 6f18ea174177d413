//! Observing collections from outside the dataflow.
//!
//! A probe reports the frontier of times that may still change a collection; a capture also
//! records every update the collection emits, so that its contents can be read back at any time
//! that the probe reports as complete.

use std::cell::RefCell;
use std::rc::Rc;

use timely::progress::Antichain;

use crate::collection::Collection;
use crate::consolidation::consolidate;
use crate::dataflow::channels::Puller;
use crate::dataflow::operate::InputFrontier;
use crate::dataflow::Operate;
use crate::timestamp::Timestamp;
use crate::{Data, Diff};

/// Attaches probes and captures to collections.
pub trait Capture<T: Timestamp, D: Data> {
    /// Attaches a probe, reporting which times may still change the collection.
    fn probe(&self) -> ProbeHandle<T>;
    /// Records every update to the collection.
    fn capture(&self) -> CaptureHandle<T, D>;
}

impl<T: Timestamp, D: Data> Capture<T, D> for Collection<T, D> {
    fn probe(&self) -> ProbeHandle<T> {
        let operator = self.attach_operator(|_, input| Box::new(Sink { name: "Probe", input, updates: None }));
        ProbeHandle { input: self.scope().input_frontier(operator) }
    }

    fn capture(&self) -> CaptureHandle<T, D> {
        let updates = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&updates);
        let operator = self.attach_operator(|_, input| Box::new(Sink { name: "Capture", input, updates: Some(recorded) }));

        let audited = Rc::clone(&updates);
        self.scope().add_audit(Box::new(move || {
            accumulate(&audited.borrow(), |_| true)
                .into_iter()
                .filter(|(_, count)| *count < 0)
                .map(|(data, count)| format!("capture {} holds {:?} with multiplicity {}", operator, data, count))
                .collect()
        }));

        let probe = ProbeHandle { input: self.scope().input_frontier(operator) };
        CaptureHandle { updates, probe }
    }
}

/// Consumes a collection, optionally recording its updates.
struct Sink<D, T> {
    name: &'static str,
    input: Puller<D, T>,
    updates: Option<Rc<RefCell<Vec<(D, T, Diff)>>>>,
}

impl<D: Data, T: Timestamp> Operate<T> for Sink<D, T> {
    fn name(&self) -> &str { self.name }

    fn run(&mut self, time: &T) {
        let mut batch = self.input.take(time);
        if let Some(updates) = &self.updates {
            consolidate(&mut batch);
            updates
                .borrow_mut()
                .extend(batch.into_iter().map(|(data, diff)| (data, time.clone(), diff)));
        }
    }

    fn discard(&mut self, abandon: &dyn Fn(&T) -> bool) {
        self.input.discard(abandon);
    }
}

/// Reports the frontier of times that may still arrive at a location.
#[derive(Clone)]
pub struct ProbeHandle<T: Timestamp> {
    input: InputFrontier<T>,
}

impl<T: Timestamp> ProbeHandle<T> {
    /// The frontier of times that may still arrive.
    pub fn frontier(&self) -> Antichain<T> {
        self.input.get()
    }

    /// True if some time strictly less than `time` may still arrive.
    pub fn less_than(&self, time: &T) -> bool {
        self.frontier().less_than(time)
    }

    /// True if some time less than or equal to `time` may still arrive.
    pub fn less_equal(&self, time: &T) -> bool {
        self.frontier().less_equal(time)
    }

    /// True if no further times may arrive.
    pub fn done(&self) -> bool {
        self.frontier().is_empty()
    }
}

/// The updates recorded by a capture, and a probe for the captured collection.
pub struct CaptureHandle<T: Timestamp, D> {
    updates: Rc<RefCell<Vec<(D, T, Diff)>>>,
    probe: ProbeHandle<T>,
}

impl<T: Timestamp, D: Data> CaptureHandle<T, D> {
    /// The probe of the captured collection.
    pub fn probe(&self) -> &ProbeHandle<T> {
        &self.probe
    }

    /// Every update recorded so far, in the order received.
    pub fn updates(&self) -> Vec<(D, T, Diff)> {
        self.updates.borrow().clone()
    }

    /// A cursor reading updates from the beginning.
    pub fn cursor(&self) -> CaptureCursor<T, D> {
        CaptureCursor { updates: Rc::clone(&self.updates), position: 0 }
    }

    /// The net contents of the collection, over all times recorded so far.
    pub fn accumulate(&self) -> Vec<(D, Diff)> {
        accumulate(&self.updates.borrow(), |_| true)
    }

    /// The contents of the collection at `time`: the net of updates at times less or equal.
    ///
    /// The result is final once the probe no longer reports times less or equal to `time`.
    pub fn accumulate_until(&self, time: &T) -> Vec<(D, Diff)> {
        accumulate(&self.updates.borrow(), |t| t.less_equal(time))
    }
}

/// A restartable reader of captured updates.
///
/// Cursors may be cloned to remember a position, and reads resume from wherever the cursor
/// was left.
pub struct CaptureCursor<T, D> {
    updates: Rc<RefCell<Vec<(D, T, Diff)>>>,
    position: usize,
}

impl<T, D> Clone for CaptureCursor<T, D> {
    fn clone(&self) -> Self {
        CaptureCursor { updates: Rc::clone(&self.updates), position: self.position }
    }
}

impl<T: Clone, D: Clone> CaptureCursor<T, D> {
    /// Returns the updates recorded since the last read, and advances past them.
    pub fn read(&mut self) -> Vec<(D, T, Diff)> {
        let updates = self.updates.borrow();
        let fresh = updates[self.position ..].to_vec();
        self.position = updates.len();
        fresh
    }

    /// The number of updates read so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor to `position`, so that the next read resumes from there.
    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.updates.borrow().len());
    }
}

fn accumulate<D: Data, T, F: Fn(&T) -> bool>(updates: &[(D, T, Diff)], include: F) -> Vec<(D, Diff)> {
    let mut result: Vec<(D, Diff)> = updates
        .iter()
        .filter(|(_, time, _)| include(time))
        .map(|(data, _, diff)| (data.clone(), *diff))
        .collect();
    consolidate(&mut result);
    result
}
