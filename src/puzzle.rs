//! Puzzle coordinates (day, part, language, input kind) and input loading.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::outcome::SolveError;

/// Last puzzle day. Day 0 is a warm-up day.
pub const LAST_DAY: u8 = 25;

/// A puzzle day, between 0 and [`LAST_DAY`] inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Day(u8);

impl Day {
    /// Validates the day number.
    pub fn new(day: u8) -> anyhow::Result<Day> {
        if day > LAST_DAY {
            bail!("day must be between 0 and {LAST_DAY}, got {day}");
        }
        Ok(Day(day))
    }

    /// The day number.
    pub fn number(self) -> u8 {
        self.0
    }

    /// Every day, in order.
    pub fn all() -> impl Iterator<Item = Day> {
        (0..=LAST_DAY).map(Day)
    }

    /// Directory name used for inputs and native sources (`day07`).
    pub fn dir_name(self) -> String {
        format!("day{:02}", self.0)
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for Day {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: u8 = s
            .trim()
            .parse()
            .with_context(|| format!("invalid day '{s}'"))?;
        Day::new(n)
    }
}

impl TryFrom<u8> for Day {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Day::new(value)
    }
}

impl From<Day> for u8 {
    fn from(day: Day) -> u8 {
        day.0
    }
}

/// One of the two sub-problems of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Part {
    /// Part 1
    One,
    /// Part 2
    Two,
}

impl Part {
    /// Both parts, in order.
    pub const ALL: [Part; 2] = [Part::One, Part::Two];

    /// `1` or `2`.
    pub fn number(self) -> u8 {
        match self {
            Part::One => 1,
            Part::Two => 2,
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl TryFrom<u8> for Part {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Part::One),
            2 => Ok(Part::Two),
            other => Err(anyhow!("part must be 1 or 2, got {other}")),
        }
    }
}

impl From<Part> for u8 {
    fn from(part: Part) -> u8 {
        part.number()
    }
}

impl FromStr for Part {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: u8 = s
            .trim()
            .parse()
            .with_context(|| format!("invalid part '{s}'"))?;
        Part::try_from(n)
    }
}

/// Language a solver is written in.
///
/// `Rust` solvers run in-process from the [`Registry`](crate::registry::Registry), `C` solvers
/// are compiled and run as child processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    /// In-process solver
    Rust,
    /// Native binary compiled from a C source
    C,
}

impl Lang {
    /// Both languages, in order.
    pub const ALL: [Lang; 2] = [Lang::Rust, Lang::C];

    /// Tag stored in the database and shown to users.
    pub fn as_str(self) -> &'static str {
        match self {
            Lang::Rust => "rust",
            Lang::C => "c",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Lang {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rust" | "rs" => Ok(Lang::Rust),
            "c" => Ok(Lang::C),
            other => Err(anyhow!("unknown language '{other}' (expected 'rust' or 'c')")),
        }
    }
}

/// Small worked example or full competition input.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// `sample.txt`
    Sample,
    /// `input.txt`
    #[default]
    Final,
}

impl InputKind {
    /// `Sample` when `sample` is true.
    pub fn from_sample_flag(sample: bool) -> InputKind {
        if sample {
            InputKind::Sample
        } else {
            InputKind::Final
        }
    }

    /// True for [`InputKind::Sample`].
    pub fn is_sample(self) -> bool {
        self == InputKind::Sample
    }

    /// Input file name inside a day directory.
    pub fn file_name(self) -> &'static str {
        match self {
            InputKind::Sample => "sample.txt",
            InputKind::Final => "input.txt",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            InputKind::Sample => "sample",
            InputKind::Final => "final",
        })
    }
}

/// Day 25 part 2 is awarded without solving anything.
pub fn is_free_star(day: Day, part: Part) -> bool {
    day.number() == LAST_DAY && part == Part::Two
}

/// Path of the input file for `day`.
pub fn input_path(inputs_dir: &Path, day: Day, kind: InputKind) -> PathBuf {
    inputs_dir.join(day.dir_name()).join(kind.file_name())
}

/// Reads the input of `day` from `<inputs_dir>/dayNN/{sample,input}.txt`.
#[instrument]
pub fn load_input(inputs_dir: &Path, day: Day, kind: InputKind) -> Result<String, SolveError> {
    let path = input_path(inputs_dir, day, kind);
    match std::fs::read_to_string(&path) {
        Ok(input) => {
            debug!(bytes = input.len(), "input loaded");
            Ok(input)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SolveError::InputMissing(path)),
        Err(e) => Err(SolveError::Runtime(format!(
            "could not read input {}: {e}",
            path.display()
        ))),
    }
}
