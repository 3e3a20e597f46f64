//! Handle on one agent's solution to one (day, part).

use std::{fmt, hash::Hash, path::PathBuf};

use crate::puzzle::{Day, Lang, Part};

/// In-process solver: full raw input in, textual answer out. An `Err` signals failure.
pub type SolveFn = fn(&str) -> anyhow::Result<String>;

/// Where the solver's code lives.
#[derive(Debug, Clone)]
pub enum SolverKind {
    /// Statically registered Rust function
    InProcess(SolveFn),
    /// C source compiled before running
    Native {
        /// `<solutions>/<agent>/dayNN/partP.c`
        source: PathBuf,
    },
}

/// One agent's solver for one (day, part).
#[derive(Debug, Clone)]
pub struct Solver {
    /// Agent tag
    pub agent: String,
    /// Puzzle day
    pub day: Day,
    /// Puzzle part
    pub part: Part,
    /// How to run it
    pub kind: SolverKind,
}

impl PartialEq for Solver {
    fn eq(&self, other: &Self) -> bool {
        self.agent == other.agent
            && self.day == other.day
            && self.part == other.part
            && self.lang() == other.lang()
    }
}

impl Eq for Solver {}

impl Hash for Solver {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.agent.hash(state);
        self.day.hash(state);
        self.part.hash(state);
        self.lang().hash(state);
    }
}

impl Solver {
    /// A registered Rust solver.
    pub fn in_process(agent: impl Into<String>, day: Day, part: Part, solve: SolveFn) -> Solver {
        Solver {
            agent: agent.into(),
            day,
            part,
            kind: SolverKind::InProcess(solve),
        }
    }

    /// A C source to compile.
    pub fn native(agent: impl Into<String>, day: Day, part: Part, source: PathBuf) -> Solver {
        Solver {
            agent: agent.into(),
            day,
            part,
            kind: SolverKind::Native { source },
        }
    }

    /// Language tag of the solver.
    pub fn lang(&self) -> Lang {
        match self.kind {
            SolverKind::InProcess(_) => Lang::Rust,
            SolverKind::Native { .. } => Lang::C,
        }
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} day{}/{} [{}]",
            self.agent,
            self.day,
            self.part,
            self.lang()
        )
    }
}
