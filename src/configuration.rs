//! Config for the harness behaviors
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! All values are optional. Flags are case-insensitive: set the value to `"true"` to enable.
//!
//! - `ROYALE_VERBOSE`: Print collection and progress lines (default: `true`)
//! - `ROYALE_LOG`: Log to a file instead of stderr (default: `false`)
//! - `ROYALE_SANDBOX`: Run native solvers inside a cgroup (default: `false`)
//! - `ROYALE_ALLOW_UNCONTAINED`: Fall back to uncontained execution when the cgroup cannot be created (default: `false`)
//! - `ROYALE_RUN_TIMEOUT_SECS`: Timeout of a single run (default: `30`)
//! - `ROYALE_BENCH_TIMEOUT_SECS`: Timeout of each benchmark repetition (default: `60`)
//! - `ROYALE_RUNS`: Benchmark repetitions per session (default: `10`)
//! - `ROYALE_INPUTS`: Directory holding `dayNN/{sample,input}.txt` (default: `inputs`)
//! - `ROYALE_SOLUTIONS`: Directory holding `<agent>/dayNN/partP.c` (default: `solutions`)
//! - `ROYALE_BUILD_DIR`: Where native binaries are written (default: `target/royale`)
//! - `ROYALE_LOG_DIR`: Where log files are written (default: `.royale/logs`)
//! - `ROYALE_CC`: C compiler (default: `cc`)

use std::{env, path::PathBuf, time::Duration};

/// Configuration for harness behaviors.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub(crate) verbose: bool,
    pub(crate) log: bool,
    pub(crate) sandbox: bool,
    pub(crate) allow_uncontained: bool,
    pub(crate) run_timeout: Duration,
    pub(crate) bench_timeout: Duration,
    pub(crate) runs: usize,
    pub(crate) inputs_dir: PathBuf,
    pub(crate) solutions_dir: PathBuf,
    pub(crate) build_dir: PathBuf,
    pub(crate) log_dir: PathBuf,
    pub(crate) compiler: String,
}

impl Configuration {
    /// Timeout of a single run.
    pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(30);
    /// Timeout of each benchmark repetition.
    pub const DEFAULT_BENCH_TIMEOUT: Duration = Duration::from_secs(60);
    /// Benchmark repetitions per session.
    pub const DEFAULT_RUNS: usize = 10;

    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - Collection and progress lines are printed to stdout.
    /// - Logs go to stderr.
    /// - Native solvers run uncontained (no cgroup).
    /// - Single runs time out after 30 s, benchmark repetitions after 60 s.
    /// - Benchmarks repeat each solver 10 times.
    pub fn new() -> Self {
        Self {
            verbose: true,
            log: false,
            sandbox: false,
            allow_uncontained: false,
            run_timeout: Self::DEFAULT_RUN_TIMEOUT,
            bench_timeout: Self::DEFAULT_BENCH_TIMEOUT,
            runs: Self::DEFAULT_RUNS,
            inputs_dir: PathBuf::from("inputs"),
            solutions_dir: PathBuf::from("solutions"),
            build_dir: PathBuf::from("target/royale"),
            log_dir: PathBuf::from(".royale/logs"),
            compiler: "cc".to_string(),
        }
    }

    /// Create configuration from environment variables (see module documentation).
    ///
    /// Unset or unparsable values keep their default.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        fn get_env_secs(var: &str, default: Duration) -> Duration {
            env::var(var)
                .ok()
                .and_then(|val| val.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        }

        fn get_env_path(var: &str, default: PathBuf) -> PathBuf {
            env::var_os(var).map(PathBuf::from).unwrap_or(default)
        }

        let defaults = Self::new();
        Self {
            verbose: get_env_flag("ROYALE_VERBOSE", defaults.verbose),
            log: get_env_flag("ROYALE_LOG", defaults.log),
            sandbox: get_env_flag("ROYALE_SANDBOX", defaults.sandbox),
            allow_uncontained: get_env_flag("ROYALE_ALLOW_UNCONTAINED", defaults.allow_uncontained),
            run_timeout: get_env_secs("ROYALE_RUN_TIMEOUT_SECS", defaults.run_timeout),
            bench_timeout: get_env_secs("ROYALE_BENCH_TIMEOUT_SECS", defaults.bench_timeout),
            runs: env::var("ROYALE_RUNS")
                .ok()
                .and_then(|val| val.parse().ok())
                .filter(|runs| *runs > 0)
                .unwrap_or(defaults.runs),
            inputs_dir: get_env_path("ROYALE_INPUTS", defaults.inputs_dir),
            solutions_dir: get_env_path("ROYALE_SOLUTIONS", defaults.solutions_dir),
            build_dir: get_env_path("ROYALE_BUILD_DIR", defaults.build_dir),
            log_dir: get_env_path("ROYALE_LOG_DIR", defaults.log_dir),
            compiler: env::var("ROYALE_CC").unwrap_or(defaults.compiler),
        }
    }

    /// Enable or disable progress output.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Enable or disable cgroup containment of native solvers.
    pub fn with_sandbox(mut self, value: bool) -> Self {
        self.sandbox = value;
        self
    }

    /// Enable or disable the uncontained fallback when containment fails.
    pub fn with_allow_uncontained(mut self, value: bool) -> Self {
        self.allow_uncontained = value;
        self
    }

    /// Set the timeout of a single run.
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Set the timeout of each benchmark repetition.
    pub fn with_bench_timeout(mut self, timeout: Duration) -> Self {
        self.bench_timeout = timeout;
        self
    }

    /// Set the number of benchmark repetitions. Zero is treated as one.
    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs.max(1);
        self
    }

    /// Set the directory holding puzzle inputs.
    pub fn with_inputs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.inputs_dir = dir.into();
        self
    }

    /// Set the directory holding native sources.
    pub fn with_solutions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.solutions_dir = dir.into();
        self
    }

    /// Set the directory receiving compiled binaries.
    pub fn with_build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = dir.into();
        self
    }

    /// Set the directory receiving log files.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Set the C compiler command.
    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    /// Benchmark repetitions per session.
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Whether progress lines are printed.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Whether logs go to a file.
    pub fn log(&self) -> bool {
        self.log
    }

    /// Directory receiving log files.
    pub fn log_dir(&self) -> &std::path::Path {
        &self.log_dir
    }

    /// Directory holding puzzle inputs.
    pub fn inputs_dir(&self) -> &std::path::Path {
        &self.inputs_dir
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}
