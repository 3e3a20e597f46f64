//! # Aoc Royale
//!
//! A battle royale harness for Advent-of-Code-style puzzle solutions written by competing agents.
//!
//! It provides:
//! - A registry of in-process Rust solvers keyed by (agent, day, part) (`Registry`)
//! - Native C solvers, compiled once per batch and run as child processes speaking a small
//!   line protocol (see [`protocol`])
//! - Single runs with answer verification (`Harness`)
//! - Repeated, concurrency-bounded benchmarks aggregated into sessions (`Benchmarker`)
//! - SQLite persistence of days, runs and benchmark sessions (`Store`)
//! - Rankings and a medal table computed from benchmark sessions (see [`ranking`])
//!
//! Every solver run is converted into an [`Outcome`](crate::outcome::Outcome): an answer, a
//! duration in milliseconds, and an optional error. Failures never abort sibling runs.
//!
//! # Usage Example
//!
//! ```no_run
//! use aoc_royale::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = Store::open(std::path::Path::new(".royale/royale.db"))?;
//!     store.init_schema()?;
//!
//!     let registry = Registry::builtin()?;
//!     let config = Configuration::from_env();
//!     let limits = LimitsBuilder::new().with_concurrency(3).build()?;
//!
//!     let bench = Benchmarker::new(&store, &registry, config, limits);
//!     let plan = BenchPlan::new(Day::new(1)?).with_runs(20);
//!     let reports = bench.run(&plan, |event| println!("{event:?}"))?;
//!     println!("{} sessions", reports.iter().filter(|r| r.success).count());
//!     Ok(())
//! }
//! ```
//!
//! # Native solvers
//!
//! Native sources live at `<solutions>/<agent>/dayNN/partP.c`. They read the puzzle input on
//! stdin and print:
//!
//! ```text
//! TIME:<phase>:<milliseconds>
//! ANSWER:<answer>
//! ERROR:<message>
//! ```
//!
//! A `TIME:solve:<ms>` marker, when present, replaces wall-clock time as the run duration.
#![warn(missing_docs)]

pub use anyhow;

mod agent_collector;
pub mod bench;
mod cgroup_manager;
pub mod configuration;
pub mod correctness;
pub mod executor;
pub mod harness;
pub mod limits;
pub mod logger;
pub mod outcome;
pub mod pool;
pub mod protocol;
pub mod puzzle;
pub mod ranking;
pub mod registry;
mod scheduler;
pub mod solutions;
pub mod solver;
pub mod stats;
pub mod storage;

/// Commonly used types for quick access.
///
/// ```rust
/// use aoc_royale::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bench::{BenchEvent, BenchPlan, Benchmarker, TaskReport};
    pub use crate::configuration::Configuration;
    pub use crate::harness::{Harness, RunReport};
    pub use crate::limits::{Limits, LimitsBuilder};
    pub use crate::outcome::{Outcome, SolveError};
    pub use crate::puzzle::{Day, InputKind, Lang, Part};
    pub use crate::registry::Registry;
    pub use crate::stats::Stats;
    pub use crate::storage::Store;
}
