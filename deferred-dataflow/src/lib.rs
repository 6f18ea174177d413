//! Deferred dataflow is an incremental dataflow engine in which operators may postpone the
//! delivery of records to later logical times.
//!
//! Programs are written in a collection-oriented style: multisets of records are transformed and
//! combined using operators like `map`, `join`, and `reduce`, and the higher-order `iterate`
//! operator repeats a fragment of dataflow until it reaches a fixed point. Having assembled a
//! dataflow, you may add or remove input records at later times and the engine updates the outputs
//! with the corresponding additions and retractions, without recomputing from scratch.
//!
//! What sets the engine apart is the `delay` operator. A record's logical time is a lattice
//! element, and `delay` advances it as a function of the record. The record is not seen downstream
//! until the engine's progress reaches that time, at which point all records sharing the time are
//! processed together. Inside an iteration whose round coordinate doubles as a priority (for
//! example, a path length), this turns round-robin relaxation into priority-ordered work.
//!
//! # Examples
//!
//! The following fragment computes shortest path lengths from a root, and then updates them as
//! an edge changes.
//!
//! ```
//! use deferred_dataflow::{Config, Worker};
//! use deferred_dataflow::algorithms::graphs::sssp::sssp;
//! use deferred_dataflow::operators::Capture;
//!
//! let mut worker = Worker::<u64>::new(Config::default()).unwrap();
//!
//! let (mut edges, mut roots, results) = worker.dataflow(|scope| {
//!     let (edge_input, edges) = scope.new_collection();
//!     let (root_input, roots) = scope.new_collection();
//!     let results = sssp(&edges, &roots).capture();
//!     (edge_input, root_input, results)
//! });
//!
//! edges.insert(('A', ('B', 1)));
//! edges.insert(('B', ('C', 1)));
//! edges.insert(('A', ('C', 5)));
//! roots.insert('A');
//! edges.advance_to(1).unwrap();
//! roots.advance_to(1).unwrap();
//! worker.step_while(|| results.probe().less_than(&1));
//!
//! let distances = results.accumulate_until(&0);
//! assert_eq!(distances, vec![(('A', 0), 1), (('B', 1), 1), (('C', 2), 1)]);
//!
//! // lengthen the edge from B to C; the shortest path to C is now direct.
//! edges.remove(('B', ('C', 1)));
//! edges.insert(('B', ('C', 10)));
//! edges.advance_to(2).unwrap();
//! roots.advance_to(2).unwrap();
//! worker.step_while(|| results.probe().less_than(&2));
//!
//! let distances = results.accumulate_until(&1);
//! assert_eq!(distances, vec![(('A', 0), 1), (('B', 1), 1), (('C', 5), 1)]);
//! ```

#![deny(missing_docs)]

use std::fmt::Debug;
use std::hash::Hash;

pub use timely::order::PartialOrder;

pub use crate::collection::Collection;
pub use crate::config::{Config, TieBreak};
pub use crate::error::{Error, Result};
pub use crate::input::InputSession;
pub use crate::timestamp::{Pair, Round, Timestamp};
pub use crate::worker::Worker;

/// Data type usable in deferred dataflow.
///
/// Records are ordered so that batches can be consolidated, and hashed so that keyed state can be
/// partitioned into shards.
pub trait Data : Ord + Hash + Clone + Debug + 'static { }
impl<T: Ord + Hash + Clone + Debug + 'static> Data for T { }

/// The signed multiplicity attached to every record.
///
/// Positive values are insertions and negative values are retractions.
pub type Diff = isize;

pub mod algorithms;
pub mod collection;
pub mod config;
pub mod consolidation;
pub mod dataflow;
pub mod difference;
pub mod error;
pub mod hashable;
pub mod input;
pub mod lattice;
pub mod logging;
pub mod operators;
pub mod progress;
pub mod scheduling;
pub mod timestamp;
pub mod worker;
