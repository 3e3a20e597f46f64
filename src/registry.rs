//! Static registry of in-process solvers.
//!
//! Solvers are plain functions registered under (agent, day, part) at startup; nothing is
//! loaded at runtime.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::{
    puzzle::{Day, Part},
    solver::{SolveFn, Solver},
};

/// Maps (agent, day, part) to a solver function.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    solvers: BTreeMap<(String, Day, Part), SolveFn>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// A registry holding every solver in [`crate::solutions`].
    pub fn builtin() -> anyhow::Result<Registry> {
        let mut registry = Registry::new();
        crate::solutions::register_all(&mut registry)?;
        Ok(registry)
    }

    /// Registers `solve`, replacing any previous solver for the same key.
    pub fn register(&mut self, agent: &str, day: Day, part: Part, solve: SolveFn) -> &mut Self {
        if self
            .solvers
            .insert((agent.to_string(), day, part), solve)
            .is_some()
        {
            warn!("solver for {agent} day{day}/{part} registered twice, keeping the last one");
        }
        self
    }

    /// The solver of `agent` for (`day`, `part`).
    pub fn get(&self, agent: &str, day: Day, part: Part) -> Option<SolveFn> {
        self.solvers.get(&(agent.to_string(), day, part)).copied()
    }

    /// Every agent with at least one solver, sorted.
    pub fn agents(&self) -> Vec<String> {
        self.solvers
            .keys()
            .map(|(agent, _, _)| agent.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Solvers for (`day`, `part`), sorted by agent.
    pub fn solvers_for(&self, day: Day, part: Part) -> Vec<Solver> {
        self.solvers
            .iter()
            .filter(|((_, d, p), _)| *d == day && *p == part)
            .map(|((agent, _, _), solve)| Solver::in_process(agent.clone(), day, part, *solve))
            .collect()
    }

    /// Number of registered solvers.
    pub fn len(&self) -> usize {
        self.solvers.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.solvers.is_empty()
    }
}
