//! The worker: hosts dataflows and runs their work to completion.
//!
//! A worker is single threaded. Each step pops the least ready work item of the root scope and
//! runs its operator; an iteration operator in turn runs its nested scope until the iteration
//! reaches a fixed point for the time at hand.

use std::rc::Rc;
use std::time::Duration;

use crate::config::Config;
use crate::dataflow::scope::Shared;
use crate::dataflow::Scope;
use crate::error::{Error, Result};
use crate::logging::EngineEvent;
use crate::timestamp::Timestamp;

/// A single-threaded host for dataflows over timestamps of type `T`.
pub struct Worker<T: Timestamp> {
    root: Scope<T>,
    shared: Rc<Shared>,
}

impl<T: Timestamp> Worker<T> {
    /// Creates a worker, after validating its configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        log::debug!("starting worker with {:?}", config);
        let shared = Rc::new(Shared::new(config));
        Ok(Worker { root: Scope::root(Rc::clone(&shared)), shared })
    }

    /// The worker's configuration.
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Constructs a dataflow in the root scope, returning whatever `func` returns.
    pub fn dataflow<R, F: FnOnce(&mut Scope<T>) -> R>(&mut self, func: F) -> R {
        let mut scope = self.root.clone();
        func(&mut scope)
    }

    /// Performs one unit of work, returning false if no work was ready.
    pub fn step(&mut self) -> bool {
        self.root.step_with(|_| true).is_some()
    }

    /// Steps while `func` returns true and work remains ready.
    pub fn step_while<F: FnMut() -> bool>(&mut self, mut func: F) {
        while func() {
            if !self.step() {
                break;
            }
        }
    }

    /// Steps until no work is ready.
    ///
    /// Work blocked on an input session that has not advanced past its time remains pending.
    pub fn run(&mut self) {
        while self.step() { }
    }

    /// True if no work is pending, ready or not.
    pub fn is_quiescent(&self) -> bool {
        self.root.is_idle()
    }

    /// Removes and returns the errors reported while running.
    pub fn take_errors(&mut self) -> Vec<Error> {
        std::mem::take(&mut *self.shared.errors.borrow_mut())
    }

    /// Checks that no input or captured output holds a record with negative multiplicity.
    ///
    /// The check only applies once the worker is quiescent; before then, retractions may
    /// legitimately precede the insertions they cancel.
    pub fn check_quiescence(&self) -> Result<()> {
        if !self.is_quiescent() {
            return Ok(());
        }
        let problems: Vec<String> = self.shared.audits.borrow().iter().flat_map(|audit| audit()).collect();
        if problems.is_empty() {
            Ok(())
        }
        else {
            Err(Error::Input(problems.join("; ")))
        }
    }

    /// Registers a sink for engine events, replacing any earlier sink.
    pub fn log_register<F: FnMut(Duration, &EngineEvent) + 'static>(&mut self, action: F) {
        self.shared.logger.set_action(action);
    }
}
