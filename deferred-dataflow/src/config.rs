//! Worker configuration.
//!
//! A `Config` can be built directly, deserialized, or parsed from command-line arguments in the
//! manner of timely's `execute_from_args`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The order in which a keyed operator revisits the keys that changed at a time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreak {
    /// Keys are processed in their `Ord` order, independent of arrival order.
    #[default]
    Deterministic,
    /// Keys are processed in the order their updates arrived.
    Stable,
}

impl FromStr for TieBreak {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deterministic" => Ok(TieBreak::Deterministic),
            "stable" => Ok(TieBreak::Stable),
            other => Err(Error::Configuration(format!("unknown tie-break policy: {:?}", other))),
        }
    }
}

/// Configuration for a worker and the dataflows it hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Order in which keys that changed at the same time are processed.
    pub tie_break: TieBreak,
    /// Maximum number of distinct rounds an iteration may take for a single outer time.
    pub round_safety_ceiling: u64,
    /// Number of shards keyed operator state is partitioned into.
    pub shard_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tie_break: TieBreak::Deterministic,
            round_safety_ceiling: 1_000_000,
            shard_count: 1,
        }
    }
}

impl Config {
    /// Sets the key processing order.
    pub fn tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Sets the round ceiling for iterations.
    pub fn round_safety_ceiling(mut self, rounds: u64) -> Self {
        self.round_safety_ceiling = rounds;
        self
    }

    /// Sets the number of shards for keyed state.
    pub fn shard_count(mut self, shards: usize) -> Self {
        self.shard_count = shards;
        self
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.round_safety_ceiling == 0 {
            return Err(Error::Configuration("round_safety_ceiling must be at least one".to_string()));
        }
        if self.shard_count == 0 {
            return Err(Error::Configuration("shard_count must be at least one".to_string()));
        }
        Ok(())
    }

    /// Installs options into a `getopts::Options` struct that correspond to the parameters in
    /// the configuration.
    pub fn install_options(opts: &mut getopts::Options) {
        opts.optopt("", "tie-break", "key processing order: deterministic or stable", "POLICY");
        opts.optopt("", "round-ceiling", "maximum rounds per iteration time", "ROUNDS");
        opts.optopt("", "shards", "number of shards for keyed state", "NUM");
    }

    /// Instantiates a configuration based upon the parsed options in `matches`.
    pub fn from_matches(matches: &getopts::Matches) -> Result<Config> {
        let defaults = Config::default();
        let tie_break = match matches.opt_str("tie-break") {
            Some(policy) => policy.parse()?,
            None => defaults.tie_break,
        };
        let round_safety_ceiling = matches
            .opt_get_default("round-ceiling", defaults.round_safety_ceiling)
            .map_err(|e| Error::Configuration(format!("--round-ceiling: {}", e)))?;
        let shard_count = matches
            .opt_get_default("shards", defaults.shard_count)
            .map_err(|e| Error::Configuration(format!("--shards: {}", e)))?;

        let config = Config { tie_break, round_safety_ceiling, shard_count };
        config.validate()?;
        Ok(config)
    }

    /// Constructs a new configuration by parsing the supplied text arguments.
    ///
    /// Arguments not recognized as options (including a leading program name) are ignored.
    pub fn from_args<I: IntoIterator<Item=String>>(args: I) -> Result<Config> {
        let mut opts = getopts::Options::new();
        Config::install_options(&mut opts);
        let matches = opts.parse(args).map_err(|e| Error::Configuration(e.to_string()))?;
        Config::from_matches(&matches)
    }
}
