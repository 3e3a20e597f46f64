//! Resource limits for solver execution.
//!
//! Limits cover how many solvers may run at once and, when containment is enabled, how much
//! memory, how many processes and which CPUs each native solver may use. Containment is
//! enforced with Linux cgroups v2.
//!
//! # Example
//!
//! ```no_run
//! use aoc_royale::limits::LimitsBuilder;
//!
//! let limits = LimitsBuilder::new()
//!     .with_concurrency(3)
//!     .with_ram_per_solver(512)
//!     .with_cpu_list("0-3")
//!     .build()
//!     .unwrap();
//! ```
//!
//! Limits can also be read from environment variables with [`LimitsBuilder::from_env()`].

use std::{collections::BTreeSet, env};

use anyhow::{bail, Context};
use tracing::debug;

/// Concurrency used when none is configured, capped by the physical CPU count.
pub const DEFAULT_CONCURRENCY: usize = 4;
/// Process cap of a contained solver.
pub const DEFAULT_MAX_PIDS: i64 = 64;

#[derive(Debug, Default)]
enum AutoCpus {
    #[default]
    Auto,
    Count(usize),
    List(String),
}

/// A builder for [`Limits`].
///
/// By default the CPU set is every physical CPU of the host, concurrency is
/// `min(physical CPUs, 4)` and each solver may use an equal share of the available memory.
#[derive(Debug, Default)]
pub struct LimitsBuilder {
    ram_per_solver: Option<usize>,
    cpus: AutoCpus,
    max_pids: Option<i64>,
    concurrency: Option<usize>,
}

impl LimitsBuilder {
    /// Creates a builder with every limit on auto.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from environment variables.
    ///
    /// Read environment variables are:
    /// - `ROYALE_RAM_PER_SOLVER` (usize): memory limit per solver in MB
    /// - `ROYALE_CPU_LIST` (string): comma-separated list or ranges of CPUs, e.g. "0-3,6"
    /// - `ROYALE_TOTAL_CPU_COUNT` (usize): number of CPUs, overridden by `ROYALE_CPU_LIST`
    /// - `ROYALE_MAX_PIDS` (i64): process cap per solver
    /// - `ROYALE_CONCURRENCY` (usize): maximum number of solvers in flight
    #[must_use]
    pub fn from_env() -> Self {
        fn parse<T: std::str::FromStr>(var: &str) -> Option<T> {
            env::var(var).ok()?.parse().ok()
        }

        let cpus = if let Ok(list) = env::var("ROYALE_CPU_LIST") {
            AutoCpus::List(list)
        } else if let Some(count) = parse::<usize>("ROYALE_TOTAL_CPU_COUNT") {
            AutoCpus::Count(count)
        } else {
            AutoCpus::Auto
        };

        LimitsBuilder {
            ram_per_solver: parse("ROYALE_RAM_PER_SOLVER"),
            cpus,
            max_pids: parse("ROYALE_MAX_PIDS"),
            concurrency: parse("ROYALE_CONCURRENCY"),
        }
    }

    /// Sets the memory limit of each contained solver (in MB).
    #[must_use]
    pub fn with_ram_per_solver(self, max: usize) -> Self {
        Self {
            ram_per_solver: Some(max),
            ..self
        }
    }

    /// Sets the CPUs contained solvers are pinned to, e.g. `"0-3,6"`.
    #[must_use]
    pub fn with_cpu_list(self, list: &str) -> Self {
        Self {
            cpus: AutoCpus::List(list.to_string()),
            ..self
        }
    }

    /// Uses CPUs `0..count`.
    #[must_use]
    pub fn with_total_cpu_count(self, count: usize) -> Self {
        Self {
            cpus: AutoCpus::Count(count),
            ..self
        }
    }

    /// Sets the process cap of each contained solver.
    #[must_use]
    pub fn with_max_pids(self, max: i64) -> Self {
        Self {
            max_pids: Some(max),
            ..self
        }
    }

    /// Sets how many solvers may run at the same time.
    #[must_use]
    pub fn with_concurrency(self, concurrency: usize) -> Self {
        Self {
            concurrency: Some(concurrency),
            ..self
        }
    }

    /// Consumes the builder and returns the [`Limits`].
    ///
    /// # Errors
    ///
    /// Returns an error when the CPU list is invalid, when concurrency is zero, or when the
    /// per-solver memory times the concurrency exceeds the available memory.
    pub fn build(self) -> anyhow::Result<Limits> {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        let available_ram = sys.available_memory() as usize;

        let cpus = match self.cpus {
            AutoCpus::Auto => (0..num_cpus::get_physical().max(1) as u8).collect(),
            AutoCpus::Count(count) => (0..count as u8).collect(),
            AutoCpus::List(list) => {
                cpu_list_to_set(&list).map_err(|e| e.context("error parsing cpu list"))?
            }
        };
        if cpus.is_empty() {
            bail!("at least one CPU is required");
        }

        let concurrency = self
            .concurrency
            .unwrap_or_else(|| cpus.len().min(DEFAULT_CONCURRENCY));
        if concurrency == 0 {
            bail!("concurrency must be at least 1");
        }

        let ram_per_solver = match self.ram_per_solver {
            Some(mb) => {
                let bytes = mb * 1_000_000;
                if available_ram > 0 && bytes.saturating_mul(concurrency) > available_ram {
                    bail!(
                        "{concurrency} solvers of {mb}MB exceed the available memory ({}MB)",
                        available_ram / 1_000_000
                    );
                }
                bytes
            }
            None => available_ram / concurrency,
        };

        let limits = Limits {
            ram_per_solver,
            cpus,
            max_pids: self.max_pids.unwrap_or(DEFAULT_MAX_PIDS),
            concurrency,
        };
        debug!(?limits);
        Ok(limits)
    }
}

fn cpu_list_to_set(s: &str) -> anyhow::Result<BTreeSet<u8>> {
    if s.trim().is_empty() {
        bail!("Empty string");
    }
    let mut set = BTreeSet::new();
    for item in s.split(',') {
        let item = item.trim();
        match item.split_once('-') {
            None => {
                let value: u8 = item
                    .parse()
                    .with_context(|| format!("could not parse {item}"))?;
                set.insert(value);
            }
            Some((start, end)) => {
                let start: u8 = start
                    .parse()
                    .with_context(|| format!("could not parse {start}"))?;
                let end: u8 = end
                    .parse()
                    .with_context(|| format!("could not parse {end}"))?;
                let range = if start <= end {
                    start..=end
                } else {
                    end..=start
                };
                set.extend(range);
            }
        }
    }
    Ok(set)
}

/// Obtained using [`LimitsBuilder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    pub(crate) ram_per_solver: usize,
    pub(crate) cpus: BTreeSet<u8>,
    pub(crate) max_pids: i64,
    pub(crate) concurrency: usize,
}

impl Limits {
    /// Create a [`LimitsBuilder`].
    pub fn builder() -> LimitsBuilder {
        LimitsBuilder::new()
    }

    /// Maximum number of solvers in flight.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Memory limit per contained solver, in bytes.
    pub fn ram_per_solver(&self) -> usize {
        self.ram_per_solver
    }

    /// CPU list in cgroup `cpuset` syntax (`"0,1,2"`).
    pub fn cpu_list(&self) -> String {
        self.cpus
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cpu_lists() {
        let set = cpu_list_to_set("0-3,6").unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 6]);
        let set = cpu_list_to_set("5-3").unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert!(cpu_list_to_set("").is_err());
        assert!(cpu_list_to_set("a-2").is_err());
        assert!(cpu_list_to_set("1-2-3").is_err());
    }

    #[test]
    fn explicit_concurrency_and_cpus() {
        let limits = LimitsBuilder::new()
            .with_cpu_list("1,3")
            .with_concurrency(2)
            .with_max_pids(8)
            .build()
            .unwrap();
        assert_eq!(limits.concurrency(), 2);
        assert_eq!(limits.cpu_list(), "1,3");
        assert_eq!(limits.max_pids, 8);
    }

    #[test]
    fn default_concurrency_is_capped() {
        let limits = LimitsBuilder::new().with_total_cpu_count(16).build().unwrap();
        assert_eq!(limits.concurrency(), DEFAULT_CONCURRENCY);
        let limits = LimitsBuilder::new().with_total_cpu_count(2).build().unwrap();
        assert_eq!(limits.concurrency(), 2);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(LimitsBuilder::new().with_concurrency(0).build().is_err());
    }
}
