//! Repeated, concurrency-bounded benchmarks.
//!
//! A [`Benchmarker`] turns a [`BenchPlan`] into one task per (agent, part, language), runs
//! the tasks with at most `Limits::concurrency()` in flight and stores one benchmark session
//! per successful task. Each task:
//!
//! - loads the input of the plan's day
//! - compiles the solver once (native solvers)
//! - runs it `runs` times with the benchmark timeout, stopping at the first failure
//! - on success, aggregates the timings into [`Stats`] and classifies the answer of the
//!   first repetition
//!
//! Sessions and their samples are written by the calling thread, in completion order, and
//! reported through [`BenchEvent`]s.
//!
//! Day 25 part 2 is a free star: it is recorded as a correct session without running
//! anything.

use std::{fmt, io::Write, time::Duration};

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{
    configuration::Configuration,
    correctness::classify,
    executor::Executor,
    harness::{collect_solvers, known_agents, selected_langs, FREE_STAR_ANSWER},
    limits::Limits,
    outcome::SolveError,
    pool::{run_bounded, TaskResult},
    puzzle::{is_free_star, load_input, Day, InputKind, Lang, Part},
    registry::Registry,
    solver::Solver,
    stats::Stats,
    storage::{NewSession, Store},
};

/// What to benchmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchPlan {
    day: Day,
    parts: Vec<Part>,
    langs: Vec<Lang>,
    agents: Vec<String>,
    runs: Option<usize>,
    kind: InputKind,
}

impl BenchPlan {
    /// Both parts of `day`, every language and agent, final input, configured repetitions.
    pub fn new(day: Day) -> BenchPlan {
        BenchPlan {
            day,
            parts: Part::ALL.to_vec(),
            langs: vec![],
            agents: vec![],
            runs: None,
            kind: InputKind::Final,
        }
    }

    /// Restrict to `parts`. Empty means both.
    pub fn with_parts(mut self, parts: impl IntoIterator<Item = Part>) -> Self {
        let parts: Vec<_> = parts.into_iter().collect();
        self.parts = if parts.is_empty() {
            Part::ALL.to_vec()
        } else {
            Part::ALL.into_iter().filter(|p| parts.contains(p)).collect()
        };
        self
    }

    /// Restrict to `langs`. Empty means all.
    pub fn with_langs(mut self, langs: impl IntoIterator<Item = Lang>) -> Self {
        self.langs = langs.into_iter().collect();
        self
    }

    /// Restrict to `agents`. Empty means all.
    pub fn with_agents<S: Into<String>>(mut self, agents: impl IntoIterator<Item = S>) -> Self {
        self.agents = agents.into_iter().map(Into::into).collect();
        self
    }

    /// Repetitions per task, overriding the configuration. Zero is treated as one.
    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = Some(runs.max(1));
        self
    }

    /// Benchmark on the sample or the final input.
    pub fn with_kind(mut self, kind: InputKind) -> Self {
        self.kind = kind;
        self
    }
}

/// One (agent, day, part, language) to benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BenchTask {
    /// Agent tag
    pub agent: String,
    /// Puzzle day
    pub day: Day,
    /// Puzzle part
    pub part: Part,
    /// Solver language
    pub lang: Lang,
}

impl fmt::Display for BenchTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} day{}/{} [{}]", self.agent, self.day, self.part, self.lang)
    }
}

/// Result of one benchmark task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    /// The benchmarked solver
    #[serde(flatten)]
    pub task: BenchTask,
    /// Sample or final input
    pub kind: InputKind,
    /// Every repetition succeeded and the session is stored
    pub success: bool,
    /// Id of the stored session
    pub session_id: Option<String>,
    /// Completed repetitions
    pub runs: usize,
    /// Answer of the first repetition
    pub answer: Option<String>,
    /// `None` when no expected answer is recorded
    pub is_correct: Option<bool>,
    /// Timing statistics of the repetitions
    pub stats: Option<Stats>,
    /// Why the task failed
    pub error: Option<String>,
}

/// Progress notifications of [`Benchmarker::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BenchEvent {
    /// A task completed
    Progress {
        /// Completed tasks so far
        completed: usize,
        /// Number of tasks
        total: usize,
        /// The completed task
        task: BenchTask,
    },
    /// Report of the task announced by the preceding `Progress`
    Result(TaskReport),
    /// Every task completed
    Done {
        /// Number of tasks
        completed: usize,
        /// Tasks with `success == false`
        failed: usize,
    },
}

enum Planned {
    Solver(Solver),
    FreeStar(BenchTask),
}

impl Planned {
    fn task(&self) -> BenchTask {
        match self {
            Planned::Solver(solver) => BenchTask {
                agent: solver.agent.clone(),
                day: solver.day,
                part: solver.part,
                lang: solver.lang(),
            },
            Planned::FreeStar(task) => task.clone(),
        }
    }
}

/// Answer and samples of a task whose repetitions all succeeded.
type Timings = Result<(String, Vec<f64>), SolveError>;

/// Runs benchmark plans and stores their sessions.
pub struct Benchmarker<'a> {
    store: &'a Store,
    registry: &'a Registry,
    config: Configuration,
    limits: Limits,
}

impl<'a> Benchmarker<'a> {
    /// Create a [`Benchmarker`] over `store` and `registry`.
    pub fn new(
        store: &'a Store,
        registry: &'a Registry,
        config: Configuration,
        limits: Limits,
    ) -> Benchmarker<'a> {
        Benchmarker {
            store,
            registry,
            config,
            limits,
        }
    }

    /// Tasks of `plan`, ordered by agent, part, then language.
    pub fn plan_tasks(&self, plan: &BenchPlan) -> anyhow::Result<Vec<BenchTask>> {
        Ok(self.planned(plan)?.iter().map(Planned::task).collect())
    }

    fn planned(&self, plan: &BenchPlan) -> anyhow::Result<Vec<Planned>> {
        let langs = selected_langs(&plan.langs);
        let mut planned = vec![];
        for &part in &plan.parts {
            if is_free_star(plan.day, part) {
                let agents = known_agents(self.registry, &self.config, &langs, &plan.agents)?;
                for (agent, lang) in agents {
                    planned.push(Planned::FreeStar(BenchTask {
                        agent,
                        day: plan.day,
                        part,
                        lang,
                    }));
                }
                continue;
            }

            let solvers = collect_solvers(
                self.registry,
                &self.config,
                plan.day,
                part,
                &langs,
                &plan.agents,
            )?;
            for agent in &plan.agents {
                for &lang in &langs {
                    if !solvers.iter().any(|s| &s.agent == agent && s.lang() == lang) {
                        warn!("no {lang} solver for {agent} day{}/{part}, skipped", plan.day);
                    }
                }
            }
            planned.extend(solvers.into_iter().map(Planned::Solver));
        }

        planned.sort_by_key(|p| {
            let task = p.task();
            (task.agent, task.part, task.lang)
        });
        Ok(planned)
    }

    /// Runs `plan`, calling `on_event` on this thread as tasks complete.
    ///
    /// Task failures are reported in the returned [`TaskReport`]s, in completion order.
    ///
    /// # Errors
    ///
    /// Returns an error when solvers cannot be collected. Storage failures mark the affected
    /// task as failed.
    #[instrument(skip(self, on_event))]
    pub fn run(
        &self,
        plan: &BenchPlan,
        mut on_event: impl FnMut(&BenchEvent),
    ) -> anyhow::Result<Vec<TaskReport>> {
        let runs = plan.runs.unwrap_or(self.config.runs()).max(1);
        let planned = self.planned(plan)?;
        let total = planned.len();
        info!(total, runs, "benchmark planned");

        let verbose = self.config.verbose;
        if verbose {
            disable_line_wrap();
        }

        let mut reports: Vec<TaskReport> = Vec::with_capacity(total);
        let mut emit = |report: TaskReport, reports: &mut Vec<TaskReport>| {
            if verbose {
                print_task_report(&report, reports.len() + 1, total);
            }
            on_event(&BenchEvent::Progress {
                completed: reports.len() + 1,
                total,
                task: report.task.clone(),
            });
            on_event(&BenchEvent::Result(report.clone()));
            reports.push(report);
        };

        let mut solvers = vec![];
        for p in planned {
            match p {
                Planned::FreeStar(task) => {
                    let timings = Ok((FREE_STAR_ANSWER.to_string(), vec![0.0]));
                    let report = self.store_session(task, plan.kind, timings);
                    emit(report, &mut reports);
                }
                Planned::Solver(solver) => solvers.push(solver),
            }
        }

        let executor = Executor::new(self.config.clone(), self.limits.clone());
        let timeout = executor.bench_timeout();
        let inputs_dir = self.config.inputs_dir.clone();
        let (day, kind) = (plan.day, plan.kind);
        let tasks: Vec<BenchTask> = solvers
            .iter()
            .map(|s| Planned::Solver(s.clone()).task())
            .collect();

        run_bounded(
            solvers,
            self.limits.concurrency(),
            move |solver: Solver| -> Timings {
                let input = load_input(&inputs_dir, day, kind)?;
                repeat(&executor, &solver, &input, runs, timeout)
            },
            |index, timings: TaskResult<Timings>| {
                let timings = timings.unwrap_or_else(|panic| Err(SolveError::Runtime(panic)));
                let report = self.store_session(tasks[index].clone(), kind, timings);
                emit(report, &mut reports);
            },
        );

        if verbose {
            enable_line_wrap();
        }

        let failed = reports.iter().filter(|r| !r.success).count();
        on_event(&BenchEvent::Done {
            completed: reports.len(),
            failed,
        });
        info!(completed = reports.len(), failed, "benchmark done");
        Ok(reports)
    }

    /// Classifies and persists the result of one task.
    fn store_session(&self, task: BenchTask, kind: InputKind, timings: Timings) -> TaskReport {
        let mut report = TaskReport {
            task,
            kind,
            success: false,
            session_id: None,
            runs: 0,
            answer: None,
            is_correct: None,
            stats: None,
            error: None,
        };

        let (answer, samples) = match timings {
            Ok(timings) => timings,
            Err(e) => {
                warn!(task = %report.task, "benchmark failed: {e}");
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.runs = samples.len();

        let Some(stats) = Stats::from_samples(&samples) else {
            report.error = Some("no repetition completed".to_string());
            return report;
        };
        let free_star = is_free_star(report.task.day, report.task.part);
        let is_correct = if free_star && answer == FREE_STAR_ANSWER {
            Some(true)
        } else {
            match self
                .store
                .expected_answer(report.task.day, report.task.part, kind)
            {
                Ok(expected) => classify(&answer, expected.as_deref()),
                Err(e) => {
                    error!("could not read expected answer: {e:#}");
                    report.error = Some(format!("{e:#}"));
                    return report;
                }
            }
        };

        let session = NewSession {
            agent: report.task.agent.clone(),
            day: report.task.day,
            part: report.task.part,
            lang: report.task.lang,
            kind,
            answer: answer.clone(),
            is_correct,
        };
        match self.store.insert_session(&session, &samples) {
            Ok(id) => {
                report.success = true;
                report.session_id = Some(id);
            }
            Err(e) => {
                error!("could not store session: {e:#}");
                report.error = Some(format!("{e:#}"));
            }
        }
        report.answer = Some(answer);
        report.is_correct = is_correct;
        report.stats = Some(stats);
        report
    }
}

/// Compiles once then runs `runs` repetitions. The first failure ends the task.
fn repeat(
    executor: &Executor,
    solver: &Solver,
    input: &str,
    runs: usize,
    timeout: Duration,
) -> Timings {
    let prepared = executor.prepare(solver)?;
    let mut answer = None;
    let mut samples = Vec::with_capacity(runs);
    for _ in 0..runs {
        let outcome = executor.execute(&prepared, input, timeout);
        if let Some(e) = outcome.error {
            return Err(e);
        }
        answer.get_or_insert(outcome.answer);
        samples.push(outcome.time_ms);
    }
    Ok((answer.unwrap_or_default(), samples))
}

fn print_task_report(report: &TaskReport, completed: usize, total: usize) {
    // clear line, green task, default, red errors
    match (&report.stats, &report.error) {
        (Some(stats), None) => {
            let verdict = match report.is_correct {
                Some(true) => "\x1b[32mcorrect\x1b[39m",
                Some(false) => "\x1b[31mwrong\x1b[39m",
                None => "\x1b[33munverified\x1b[39m",
            };
            println!(
                "\x1b[2K[{completed}/{total}] \x1b[32m{}:\x1b[39m p50 {:.3}ms avg {:.3}ms {verdict}",
                report.task, stats.p50, stats.avg
            );
        }
        (_, error) => println!(
            "\x1b[2K[{completed}/{total}] \x1b[32m{}:\x1b[39m \x1b[31m{}\x1b[39m",
            report.task,
            error.as_deref().unwrap_or("failed")
        ),
    }
    let _ = std::io::stdout().flush();
}

fn disable_line_wrap() {
    print!("\x1b[?7l");
}

fn enable_line_wrap() {
    print!("\x1b[?7h");
    let _ = std::io::stdout().flush();
}
