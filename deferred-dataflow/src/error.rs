//! Errors reported by the engine.
//!
//! Errors found while assembling a dataflow or configuring a worker are returned directly.
//! Errors found while running (a strict delay that would move time backwards, an iteration that
//! exceeds its round ceiling) are collected by the worker and drained with `Worker::take_errors`;
//! they affect only the times involved, and other times continue to be processed.

use thiserror::Error;

/// The kinds of failure the engine reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid configuration or application input, such as a zero shard count, a non-positive
    /// edge weight, or a delay function that moves a record backwards in time.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// An iteration did not reach a fixed point for `time` within the permitted `rounds`.
    ///
    /// The time is abandoned: no output is produced for it.
    #[error("iteration at time {time} did not reach a fixed point within {rounds} rounds")]
    NonTermination {
        /// The outer time whose iteration was abandoned.
        time: String,
        /// The number of distinct rounds processed before abandoning it.
        rounds: u64,
    },
    /// An update that cannot be accepted, or an accumulated multiplicity that went negative.
    #[error("input error: {0}")]
    Input(String),
}

/// A `Result` specialized to the engine's `Error`.
pub type Result<T> = std::result::Result<T, Error>;
