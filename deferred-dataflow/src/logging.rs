//! Loggers and logging events for deferred dataflow.
//!
//! Events describe scheduling decisions: which operator ran at which scope depth, how a delay
//! operator spread its records over future times, and how each iteration ended. They are only
//! materialized when a sink is registered, with `Worker::log_register` or `enable`.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;
use crate::worker::Worker;

/// Enables logging of engine events, written to `writer` as JSON lines of `[elapsed, event]`.
pub fn enable<T, W>(worker: &mut Worker<T>, mut writer: W)
where
    T: Timestamp,
    W: Write + 'static,
{
    worker.log_register(move |elapsed, event| {
        let written = serde_json::to_writer(&mut writer, &(elapsed, event))
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"));
        if let Err(error) = written {
            log::warn!("failed to write engine event: {}", error);
        }
    });
}

/// Possible engine events.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// An operator ran for one time.
    Schedule(ScheduleEvent),
    /// A delay operator moved records to later times.
    Reschedule(RescheduleEvent),
    /// An iteration reached a fixed point for an outer time.
    FixedPoint(FixedPointEvent),
    /// An iteration exceeded its round ceiling and abandoned an outer time.
    Abandon(AbandonEvent),
}

/// An operator ran for one time.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    /// Nesting depth of the scope containing the operator.
    pub depth: usize,
    /// Operator identifier, within its scope.
    pub operator: usize,
    /// Operator name.
    pub name: String,
}

impl From<ScheduleEvent> for EngineEvent { fn from(e: ScheduleEvent) -> Self { EngineEvent::Schedule(e) } }

/// A delay operator moved records to later times.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub struct RescheduleEvent {
    /// Operator identifier.
    pub operator: usize,
    /// Number of records received.
    pub records: usize,
    /// Number of distinct times they were delivered at.
    pub times: usize,
    /// Number of records dropped for moving backwards in time.
    pub rejected: usize,
}

impl From<RescheduleEvent> for EngineEvent { fn from(e: RescheduleEvent) -> Self { EngineEvent::Reschedule(e) } }

/// An iteration reached a fixed point.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub struct FixedPointEvent {
    /// Operator identifier of the iteration.
    pub operator: usize,
    /// Debug rendering of the outer time.
    pub time: String,
    /// Distinct rounds processed.
    pub rounds: u64,
    /// Number of updates emitted.
    pub updates: usize,
}

impl From<FixedPointEvent> for EngineEvent { fn from(e: FixedPointEvent) -> Self { EngineEvent::FixedPoint(e) } }

/// An iteration abandoned an outer time.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub struct AbandonEvent {
    /// Operator identifier of the iteration.
    pub operator: usize,
    /// Debug rendering of the outer time.
    pub time: String,
    /// Distinct rounds processed before abandoning.
    pub rounds: u64,
}

impl From<AbandonEvent> for EngineEvent { fn from(e: AbandonEvent) -> Self { EngineEvent::Abandon(e) } }

type Action = Box<dyn FnMut(Duration, &EngineEvent)>;

/// Logger for engine events, shared by every scope of a worker.
///
/// Events are stamped with the time elapsed since the logger was created.
#[derive(Clone)]
pub struct Logger {
    start: Instant,
    action: Rc<RefCell<Option<Action>>>,
}

impl Default for Logger {
    fn default() -> Self {
        Logger::new()
    }
}

impl Logger {
    /// A logger with no registered sink.
    pub fn new() -> Self {
        Logger { start: Instant::now(), action: Rc::new(RefCell::new(None)) }
    }

    /// Replaces the registered sink.
    pub fn set_action<F: FnMut(Duration, &EngineEvent) + 'static>(&self, action: F) {
        *self.action.borrow_mut() = Some(Box::new(action));
    }

    /// True when a sink is registered; callers may skip preparing events otherwise.
    pub fn enabled(&self) -> bool {
        self.action.borrow().is_some()
    }

    /// Passes an event to the registered sink, if any.
    pub fn log<E: Into<EngineEvent>>(&self, event: E) {
        if let Some(action) = self.action.borrow_mut().as_mut() {
            action(self.start.elapsed(), &event.into());
        }
    }
}
