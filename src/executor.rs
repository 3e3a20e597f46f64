//! Runs one solver on one input and returns an [`Outcome`].
//!
//! In-process solvers run on a dedicated thread so that a timeout can be enforced; a timed
//! out thread is abandoned. Native solvers are compiled once by [`Executor::prepare`] and
//! then spawned for each execution, with the input written to their stdin and their stdout
//! parsed by [`Report::parse`].

use std::{
    io::{Read, Write},
    panic,
    path::PathBuf,
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use tracing::{debug, instrument, warn};

use crate::{
    agent_collector::compile_native,
    cgroup_manager::LimitedProcess,
    configuration::Configuration,
    limits::Limits,
    outcome::{millis, panic_message, Outcome, SolveError},
    protocol::Report,
    solver::{SolveFn, Solver, SolverKind},
};

const KILL_GRACE: Duration = Duration::from_secs(1);
/// Slack given to output readers when the solver exits right at its deadline.
const READ_GRACE: Duration = Duration::from_millis(50);

/// A command ready to be spawned for each execution of a native solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCommand {
    /// Program to run
    pub program: PathBuf,
    /// Its arguments
    pub args: Vec<String>,
}

impl NativeCommand {
    /// A compiled binary taking no arguments.
    pub fn binary(program: impl Into<PathBuf>) -> NativeCommand {
        NativeCommand {
            program: program.into(),
            args: vec![],
        }
    }
}

/// A solver ready to run: registered function or compiled binary.
#[derive(Debug, Clone)]
pub enum Prepared {
    /// Runs in-process
    InProcess(SolveFn),
    /// Spawns a child process
    Native(NativeCommand),
}

/// Executes solvers under the configured timeouts and containment.
#[derive(Debug, Clone)]
pub struct Executor {
    config: Configuration,
    limits: Limits,
}

impl Executor {
    /// Create an [`Executor`].
    pub fn new(config: Configuration, limits: Limits) -> Executor {
        Executor { config, limits }
    }

    /// Timeout of single runs.
    pub fn run_timeout(&self) -> Duration {
        self.config.run_timeout
    }

    /// Timeout of benchmark repetitions.
    pub fn bench_timeout(&self) -> Duration {
        self.config.bench_timeout
    }

    /// Makes `solver` runnable. Native sources are compiled into the build directory.
    #[instrument(skip_all, fields(solver = %solver))]
    pub fn prepare(&self, solver: &Solver) -> Result<Prepared, SolveError> {
        match &solver.kind {
            SolverKind::InProcess(solve) => Ok(Prepared::InProcess(*solve)),
            SolverKind::Native { source } => {
                let binary = self
                    .config
                    .build_dir
                    .join(&solver.agent)
                    .join(format!("{}_part{}", solver.day.dir_name(), solver.part));
                let binary = compile_native(source, &binary, &self.config.compiler)?;
                debug!(binary = %binary.display(), "compiled");
                Ok(Prepared::Native(NativeCommand::binary(binary)))
            }
        }
    }

    /// Runs a prepared solver once.
    pub fn execute(&self, prepared: &Prepared, input: &str, timeout: Duration) -> Outcome {
        match prepared {
            Prepared::InProcess(solve) => run_in_process(*solve, input, timeout),
            Prepared::Native(command) => self.run_native(command, input, timeout),
        }
    }

    /// Prepares then executes `solver` once. A compilation failure is returned as the
    /// outcome without spawning anything.
    pub fn run_once(&self, solver: &Solver, input: &str, timeout: Duration) -> Outcome {
        match self.prepare(solver) {
            Ok(prepared) => self.execute(&prepared, input, timeout),
            Err(e) => Outcome::failed(e, 0.0),
        }
    }

    fn launch(&self, command: &NativeCommand) -> anyhow::Result<LimitedProcess> {
        let program = command.program.to_string_lossy();
        if self.config.sandbox {
            match LimitedProcess::launch(
                &program,
                &command.args,
                self.limits.ram_per_solver as i64,
                self.limits.max_pids,
                &self.limits.cpu_list(),
            ) {
                Ok(process) => return Ok(process),
                Err(e) if self.config.allow_uncontained => {
                    warn!("containment unavailable, running uncontained: {e:#}");
                }
                Err(e) => return Err(e.context("could not contain solver")),
            }
        }
        LimitedProcess::launch_without_container(&program, &command.args)
    }

    #[instrument(skip(self, input), fields(program = %command.program.display()))]
    fn run_native(&self, command: &NativeCommand, input: &str, timeout: Duration) -> Outcome {
        let start = Instant::now();
        let mut process = match self.launch(command) {
            Ok(process) => process,
            Err(e) => return Outcome::failed(SolveError::Runtime(format!("{e:#}")), 0.0),
        };

        // closing stdin (drop) signals end of input
        if let Some(mut stdin) = process.child.stdin.take() {
            let input = input.to_owned();
            thread::spawn(move || {
                let _ = stdin.write_all(input.as_bytes());
            });
        }
        let stdout = process.child.stdout.take().map(spawn_reader);
        let stderr = process.child.stderr.take().map(spawn_reader);

        let status = match process.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                warn!(?timeout, "solver timed out");
                if let Err(e) = process.try_kill(KILL_GRACE) {
                    warn!("could not kill timed out solver: {e:#}");
                }
                return Outcome::failed(SolveError::Timeout, millis(timeout));
            }
            Err(e) => return Outcome::failed(SolveError::Runtime(format!("{e:#}")), 0.0),
        };
        let wall_ms = millis(start.elapsed());
        // kills whatever the solver forked, closing the pipes they inherited
        process.release();

        let read_deadline = (start + timeout).max(Instant::now() + READ_GRACE);
        let (Some(stdout), Some(stderr)) = (
            collect_output(stdout, read_deadline),
            collect_output(stderr, read_deadline),
        ) else {
            warn!(?timeout, "solver output still open after its deadline");
            return Outcome::failed(SolveError::Timeout, millis(timeout));
        };
        let report = Report::parse(&stdout);
        let time_ms = report.solve_time().unwrap_or(wall_ms);
        debug!(?status, wall_ms, time_ms, "solver exited");

        if let Some(error) = report.error {
            return Outcome::failed(SolveError::Runtime(error), time_ms);
        }
        if !status.success() {
            let code = status
                .code()
                .map_or_else(|| "a signal".to_string(), |code| format!("code {code}"));
            let stderr = stderr.trim();
            let message = if stderr.is_empty() {
                format!("Process exited with {code}")
            } else {
                format!("Process exited with {code}: {stderr}")
            };
            return Outcome::failed(SolveError::Runtime(message), time_ms);
        }
        match report.answer {
            Some(answer) => Outcome::solved(answer, time_ms),
            None => Outcome::failed(SolveError::Runtime("No output".to_string()), time_ms),
        }
    }
}

/// Runs `solve` on its own thread, timing the call only.
fn run_in_process(solve: SolveFn, input: &str, timeout: Duration) -> Outcome {
    let (tx, rx) = mpsc::channel();
    let input = input.to_owned();
    let spawned = thread::Builder::new()
        .name("solver".to_string())
        .spawn(move || {
            let start = Instant::now();
            let result = panic::catch_unwind(|| solve(&input));
            let elapsed = start.elapsed();
            let _ = tx.send((result, elapsed));
        });
    if let Err(e) = spawned {
        return Outcome::failed(
            SolveError::Runtime(format!("could not spawn solver thread: {e}")),
            0.0,
        );
    }

    match rx.recv_timeout(timeout) {
        Ok((Ok(Ok(answer)), elapsed)) => Outcome::solved(answer, millis(elapsed)),
        Ok((Ok(Err(e)), elapsed)) => {
            Outcome::failed(SolveError::Runtime(format!("{e:#}")), millis(elapsed))
        }
        Ok((Err(payload), elapsed)) => Outcome::failed(
            SolveError::Runtime(panic_message(payload.as_ref())),
            millis(elapsed),
        ),
        Err(RecvTimeoutError::Timeout) => {
            warn!(?timeout, "in-process solver timed out, abandoning its thread");
            Outcome::failed(SolveError::Timeout, millis(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Outcome::failed(
            SolveError::Runtime("solver thread exited without a result".to_string()),
            0.0,
        ),
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// The full output of a reader, or `None` if the pipe is still open at `deadline`.
fn collect_output(reader: Option<Receiver<String>>, deadline: Instant) -> Option<String> {
    let Some(reader) = reader else {
        return Some(String::new());
    };
    match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(output) => Some(output),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::LimitsBuilder;

    fn executor() -> Executor {
        let limits = LimitsBuilder::new().with_concurrency(1).build().unwrap();
        Executor::new(Configuration::new().with_verbose(false), limits)
    }

    fn sh(script: &str) -> Prepared {
        Prepared::Native(NativeCommand {
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), script.to_string()],
        })
    }

    fn count_lines(input: &str) -> anyhow::Result<String> {
        Ok(input.lines().count().to_string())
    }

    fn boom(_input: &str) -> anyhow::Result<String> {
        anyhow::bail!("boom")
    }

    fn panics(_input: &str) -> anyhow::Result<String> {
        panic!("index out of range")
    }

    fn sleeps(_input: &str) -> anyhow::Result<String> {
        thread::sleep(Duration::from_secs(2));
        Ok("late".to_string())
    }

    #[test]
    fn in_process_answer() {
        let prepared = Prepared::InProcess(count_lines);
        let outcome = executor().execute(&prepared, "a\nb\nc\n", Duration::from_secs(5));
        assert_eq!(outcome.answer, "3");
        assert!(outcome.is_ok());
        assert!(outcome.time_ms >= 0.0);
    }

    #[test]
    fn in_process_error_is_captured() {
        let outcome = executor().execute(&Prepared::InProcess(boom), "", Duration::from_secs(5));
        assert_eq!(outcome.answer, "");
        assert!(outcome.error_message().unwrap().contains("boom"));
    }

    #[test]
    fn in_process_panic_is_captured() {
        let outcome = executor().execute(&Prepared::InProcess(panics), "", Duration::from_secs(5));
        assert_eq!(outcome.answer, "");
        assert!(outcome.error_message().unwrap().contains("index out of range"));
    }

    #[test]
    fn in_process_timeout() {
        let timeout = Duration::from_millis(100);
        let outcome = executor().execute(&Prepared::InProcess(sleeps), "", timeout);
        assert_eq!(outcome.error, Some(SolveError::Timeout));
        assert_eq!(outcome.time_ms, 100.0);
    }

    #[test]
    fn native_protocol_and_solve_time() {
        let prepared =
            sh("cat > /dev/null; echo TIME:parse:0.5; echo TIME:solve:1.25; echo ANSWER:42");
        let outcome = executor().execute(&prepared, "1\n2\n", Duration::from_secs(10));
        assert_eq!(outcome.answer, "42");
        assert_eq!(outcome.time_ms, 1.25);
        assert!(outcome.is_ok());
    }

    #[test]
    fn native_reads_stdin() {
        let prepared = sh("wc -l | tr -d ' '");
        let outcome = executor().execute(&prepared, "a\nb\nc\nd\n", Duration::from_secs(10));
        assert_eq!(outcome.answer, "4");
    }

    #[test]
    fn native_error_marker() {
        let prepared = sh("echo ERROR:no solution");
        let outcome = executor().execute(&prepared, "", Duration::from_secs(10));
        assert_eq!(outcome.error_message().as_deref(), Some("no solution"));
        assert_eq!(outcome.answer, "");
    }

    #[test]
    fn native_non_zero_exit() {
        let prepared = sh("echo oops >&2; exit 3");
        let outcome = executor().execute(&prepared, "", Duration::from_secs(10));
        let error = outcome.error_message().unwrap();
        assert!(error.contains("code 3"), "{error}");
        assert!(error.contains("oops"), "{error}");
    }

    #[test]
    fn native_timeout_kills() {
        let timeout = Duration::from_millis(200);
        let start = Instant::now();
        let outcome = executor().execute(&sh("exec sleep 10"), "", timeout);
        assert_eq!(outcome.error, Some(SolveError::Timeout));
        assert_eq!(outcome.time_ms, 200.0);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn native_background_children_do_not_outlive_the_run() {
        let start = Instant::now();
        let prepared = sh("sleep 5 & echo ANSWER:1");
        let outcome = executor().execute(&prepared, "", Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(3), "{:?}", start.elapsed());
        assert_eq!(outcome.answer, "1");
        assert!(outcome.is_ok());
    }

    #[test]
    fn native_detached_pipe_holder_times_out() {
        let has_setsid = std::process::Command::new("setsid")
            .arg("true")
            .status()
            .is_ok_and(|s| s.success());
        if !has_setsid {
            return;
        }
        let timeout = Duration::from_millis(500);
        let start = Instant::now();
        let prepared = sh("setsid sleep 5 & echo ANSWER:1");
        let outcome = executor().execute(&prepared, "", timeout);
        assert!(start.elapsed() < Duration::from_secs(3), "{:?}", start.elapsed());
        assert_eq!(outcome.error, Some(SolveError::Timeout));
    }

    #[test]
    fn missing_source_fails_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let solver = Solver::native(
            "alpha",
            crate::puzzle::Day::new(1).unwrap(),
            crate::puzzle::Part::One,
            dir.path().join("missing.c"),
        );
        let outcome = executor().run_once(&solver, "", Duration::from_secs(1));
        assert!(outcome
            .error_message()
            .unwrap()
            .starts_with("Compilation failed"));
    }
}
