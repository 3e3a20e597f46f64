//! Single runs with answer verification.
//!
//! [`Harness::run`] executes every selected agent once on one (day, part), stores one run
//! row per agent and classifies each answer against the expected answer recorded at the
//! time of comparison.

use std::{collections::BTreeSet, sync::Arc};

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{
    agent_collector::{agent_dirs, collect_native_solvers},
    configuration::Configuration,
    correctness::classify,
    executor::Executor,
    limits::Limits,
    outcome::Outcome,
    pool::run_bounded,
    puzzle::{is_free_star, load_input, Day, InputKind, Lang, Part},
    registry::Registry,
    solver::Solver,
    storage::{NewRun, Store},
};

/// Answer recorded for the free star.
pub const FREE_STAR_ANSWER: &str = "*";

/// Result of one stored run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Id of the stored row, `None` when it could not be stored
    pub run_id: Option<i64>,
    /// Agent tag
    pub agent: String,
    /// Puzzle day
    pub day: Day,
    /// Puzzle part
    pub part: Part,
    /// Solver language
    pub lang: Lang,
    /// Sample or final input
    pub kind: InputKind,
    /// Answer, empty on error
    pub answer: String,
    /// Duration in milliseconds
    pub time_ms: f64,
    /// `None` when no expected answer is recorded
    pub is_correct: Option<bool>,
    /// Error string, if the run failed
    pub error: Option<String>,
}

/// Runs solvers once and records the results.
pub struct Harness<'a> {
    store: &'a Store,
    registry: &'a Registry,
    executor: Executor,
    config: Configuration,
    concurrency: usize,
}

impl<'a> Harness<'a> {
    /// Create a [`Harness`] over `store` and `registry`.
    pub fn new(
        store: &'a Store,
        registry: &'a Registry,
        config: Configuration,
        limits: Limits,
    ) -> Harness<'a> {
        Harness {
            store,
            registry,
            concurrency: limits.concurrency(),
            executor: Executor::new(config.clone(), limits),
            config,
        }
    }

    /// Runs every selected solver of (`day`, `part`) once on the `kind` input.
    ///
    /// `langs` and `agents` filter the solvers; empty means all. Reports are ordered by agent
    /// then language. Solver failures are reported, never returned as errors, and so are
    /// storage failures once solvers ran: such a report has no `run_id`.
    #[instrument(skip(self))]
    pub fn run(
        &self,
        day: Day,
        part: Part,
        langs: &[Lang],
        agents: &[String],
        kind: InputKind,
    ) -> anyhow::Result<Vec<RunReport>> {
        let langs = selected_langs(langs);

        if is_free_star(day, part) {
            let mut reports = vec![];
            for (agent, lang) in known_agents(self.registry, &self.config, &langs, agents)? {
                let outcome = Outcome::solved(FREE_STAR_ANSWER, 0.0);
                reports.push(self.record(&agent, day, part, lang, kind, outcome, Some(true)));
            }
            return Ok(reports);
        }

        let solvers = collect_solvers(self.registry, &self.config, day, part, &langs, agents)?;
        if solvers.is_empty() {
            warn!("no solver found for day {day} part {part}");
            return Ok(vec![]);
        }
        info!(solvers = solvers.len(), "running");

        let input = Arc::new(load_input(&self.config.inputs_dir, day, kind));
        let executor = self.executor.clone();
        let timeout = executor.run_timeout();

        let mut outcomes: Vec<Option<Outcome>> = vec![None; solvers.len()];
        run_bounded(
            solvers.clone(),
            self.concurrency,
            move |solver: Solver| match input.as_ref() {
                Ok(input) => executor.run_once(&solver, input, timeout),
                Err(e) => Outcome::failed(e.clone(), 0.0),
            },
            |index, result| {
                outcomes[index] = Some(result.unwrap_or_else(|panic| {
                    Outcome::failed(crate::outcome::SolveError::Runtime(panic), 0.0)
                }));
            },
        );

        // classification reads the expected answer now, after every solver finished
        let expected = self.store.expected_answer(day, part, kind).unwrap_or_else(|e| {
            error!("could not read expected answer, runs stay unverified: {e:#}");
            None
        });
        let mut reports = Vec::with_capacity(solvers.len());
        for (solver, outcome) in solvers.iter().zip(outcomes) {
            let Some(outcome) = outcome else {
                continue;
            };
            let is_correct = classify(&outcome.answer, expected.as_deref());
            reports.push(self.record(
                &solver.agent,
                day,
                part,
                solver.lang(),
                kind,
                outcome,
                is_correct,
            ));
        }
        Ok(reports)
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        agent: &str,
        day: Day,
        part: Part,
        lang: Lang,
        kind: InputKind,
        outcome: Outcome,
        is_correct: Option<bool>,
    ) -> RunReport {
        let error = outcome.error_message();
        let stored = self.store.insert_run(&NewRun {
            agent: agent.to_string(),
            day,
            part,
            lang,
            kind,
            answer: outcome.answer.clone(),
            time_ms: outcome.time_ms,
            is_correct,
            error: error.clone(),
        });
        let run_id = match stored {
            Ok(id) => Some(id),
            Err(e) => {
                error!(agent, "could not store run: {e:#}");
                None
            }
        };
        RunReport {
            run_id,
            agent: agent.to_string(),
            day,
            part,
            lang,
            kind,
            answer: outcome.answer,
            time_ms: outcome.time_ms,
            is_correct,
            error,
        }
    }
}

/// `langs`, or every language when empty. Deduplicated, in [`Lang::ALL`] order.
pub(crate) fn selected_langs(langs: &[Lang]) -> Vec<Lang> {
    if langs.is_empty() {
        return Lang::ALL.to_vec();
    }
    Lang::ALL
        .into_iter()
        .filter(|lang| langs.contains(lang))
        .collect()
}

fn agent_selected(agents: &[String], agent: &str) -> bool {
    agents.is_empty() || agents.iter().any(|a| a == agent)
}

/// Solvers of (`day`, `part`) for `langs`, restricted to `agents` (empty means all), sorted
/// by agent then language.
pub(crate) fn collect_solvers(
    registry: &Registry,
    config: &Configuration,
    day: Day,
    part: Part,
    langs: &[Lang],
    agents: &[String],
) -> anyhow::Result<Vec<Solver>> {
    let mut solvers = vec![];
    for lang in langs {
        match lang {
            Lang::Rust => solvers.extend(registry.solvers_for(day, part)),
            Lang::C => {
                if config.solutions_dir.is_dir() {
                    solvers.extend(collect_native_solvers(
                        &config.solutions_dir,
                        day,
                        part,
                        config.verbose,
                    )?);
                } else {
                    warn!(
                        "no native solutions directory at '{}'",
                        config.solutions_dir.display()
                    );
                }
            }
        }
    }
    solvers.retain(|s| agent_selected(agents, &s.agent));
    solvers.sort_by(|a, b| (&a.agent, a.lang()).cmp(&(&b.agent, b.lang())));
    Ok(solvers)
}

/// Every (agent, language) pair that has at least one solver, whatever the day.
pub(crate) fn known_agents(
    registry: &Registry,
    config: &Configuration,
    langs: &[Lang],
    agents: &[String],
) -> anyhow::Result<Vec<(String, Lang)>> {
    let mut known = BTreeSet::new();
    for lang in langs {
        match lang {
            Lang::Rust => known.extend(registry.agents().into_iter().map(|a| (a, Lang::Rust))),
            Lang::C if config.solutions_dir.is_dir() => known.extend(
                agent_dirs(&config.solutions_dir)?
                    .into_iter()
                    .map(|(name, _)| (name, Lang::C)),
            ),
            Lang::C => {}
        }
    }
    Ok(known
        .into_iter()
        .filter(|(agent, _)| agent_selected(agents, agent))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::limits::LimitsBuilder;

    fn answer_42(_: &str) -> anyhow::Result<String> {
        Ok("42".to_string())
    }

    fn fails(_: &str) -> anyhow::Result<String> {
        anyhow::bail!("boom")
    }

    fn setup() -> (Store, Registry, tempfile::TempDir) {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        let day = Day::new(5).unwrap();
        let mut registry = Registry::new();
        registry
            .register("alpha", day, Part::One, answer_42)
            .register("bravo", day, Part::One, fails)
            .register("charlie", Day::new(6).unwrap(), Part::One, answer_42);

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("inputs/day05")).unwrap();
        std::fs::write(dir.path().join("inputs/day05/input.txt"), "x\n").unwrap();
        (store, registry, dir)
    }

    fn harness<'a>(store: &'a Store, registry: &'a Registry, dir: &Path) -> Harness<'a> {
        let config = Configuration::new()
            .with_verbose(false)
            .with_inputs_dir(dir.join("inputs"))
            .with_solutions_dir(dir.join("solutions"))
            .with_build_dir(dir.join("build"));
        let limits = LimitsBuilder::new().with_concurrency(2).build().unwrap();
        Harness::new(store, registry, config, limits)
    }

    #[test]
    fn errored_run_is_incorrect_once_an_answer_exists() {
        let (store, registry, dir) = setup();
        let harness = harness(&store, &registry, dir.path());
        let day = Day::new(5).unwrap();

        let reports = harness.run(day, Part::One, &[], &[], InputKind::Final).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.is_correct.is_none()));

        store.set_answer(day, Part::One, InputKind::Final, "42").unwrap();
        let reports = harness.run(day, Part::One, &[Lang::Rust], &[], InputKind::Final).unwrap();
        assert_eq!(reports[0].agent, "alpha");
        assert_eq!(reports[0].is_correct, Some(true));
        assert_eq!(reports[1].agent, "bravo");
        assert_eq!(reports[1].answer, "");
        assert_eq!(reports[1].error.as_deref(), Some("boom"));
        assert_eq!(reports[1].is_correct, Some(false));

        assert_eq!(store.recent_runs(Some(day), 10).unwrap().len(), 4);
    }

    #[test]
    fn missing_input_is_recorded_per_agent() {
        let (store, registry, dir) = setup();
        let harness = harness(&store, &registry, dir.path());
        let reports = harness
            .run(Day::new(5).unwrap(), Part::One, &[], &[], InputKind::Sample)
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports
            .iter()
            .all(|r| r.error.as_deref().unwrap().starts_with("Input not found")));
    }

    #[test]
    fn agent_filter() {
        let (store, registry, dir) = setup();
        let harness = harness(&store, &registry, dir.path());
        let agents = vec!["bravo".to_string()];
        let reports = harness
            .run(Day::new(5).unwrap(), Part::One, &[], &agents, InputKind::Final)
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].agent, "bravo");
    }

    #[test]
    fn free_star_executes_nothing() {
        let (store, registry, dir) = setup();
        let harness = harness(&store, &registry, dir.path());
        let reports = harness
            .run(Day::new(25).unwrap(), Part::Two, &[], &[], InputKind::Final)
            .unwrap();
        let agents: Vec<_> = reports.iter().map(|r| r.agent.as_str()).collect();
        assert_eq!(agents, vec!["alpha", "bravo", "charlie"]);
        for report in reports {
            assert_eq!(report.answer, FREE_STAR_ANSWER);
            assert_eq!(report.time_ms, 0.0);
            assert_eq!(report.is_correct, Some(true));
            assert_eq!(report.error, None);
        }
    }

    #[test]
    fn storage_failure_keeps_every_outcome() {
        let (_, registry, dir) = setup();
        let path = dir.path().join("royale.db");
        let store = Store::open(&path).unwrap();
        store.init_schema().unwrap();
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("DROP TABLE runs; DROP TABLE days;")
            .unwrap();

        let harness = harness(&store, &registry, dir.path());
        let reports = harness
            .run(Day::new(5).unwrap(), Part::One, &[], &[], InputKind::Final)
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].answer, "42");
        assert_eq!(reports[1].error.as_deref(), Some("boom"));
        for report in &reports {
            assert_eq!(report.run_id, None);
            assert_eq!(report.is_correct, None);
        }
    }

    #[test]
    fn langs_are_deduplicated_in_order() {
        assert_eq!(selected_langs(&[]), vec![Lang::Rust, Lang::C]);
        assert_eq!(selected_langs(&[Lang::C, Lang::Rust, Lang::C]), vec![Lang::Rust, Lang::C]);
    }
}
