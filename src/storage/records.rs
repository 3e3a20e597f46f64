use rusqlite::{
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
    ToSql,
};
use serde::Serialize;

use crate::{
    puzzle::{Day, InputKind, Lang, Part},
    stats::Stats,
};

/// A row of the `days` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayRecord {
    /// Puzzle day
    pub day: Day,
    /// Puzzle statement of part 1
    pub part1_text: Option<String>,
    /// Puzzle statement of part 2
    pub part2_text: Option<String>,
    /// Sample input
    pub sample_input: Option<String>,
    /// Expected sample answer of part 1
    pub sample_answer1: Option<String>,
    /// Expected sample answer of part 2
    pub sample_answer2: Option<String>,
    /// Expected final answer of part 1
    pub answer1: Option<String>,
    /// Expected final answer of part 2
    pub answer2: Option<String>,
    /// RFC 3339 publish time
    pub published_at: Option<String>,
}

impl DayRecord {
    /// Expected answer of `part` for `kind`, if recorded.
    pub fn expected(&self, part: Part, kind: InputKind) -> Option<&str> {
        match (kind, part) {
            (InputKind::Sample, Part::One) => self.sample_answer1.as_deref(),
            (InputKind::Sample, Part::Two) => self.sample_answer2.as_deref(),
            (InputKind::Final, Part::One) => self.answer1.as_deref(),
            (InputKind::Final, Part::Two) => self.answer2.as_deref(),
        }
    }
}

/// A run to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRun {
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
    /// Answer text, empty on error
    pub answer: String,
    /// Duration in milliseconds
    pub time_ms: f64,
    /// `None` when no expected answer was recorded
    pub is_correct: Option<bool>,
    /// Error string, if the run failed
    pub error: Option<String>,
}

/// A stored run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    /// Row id
    pub id: i64,
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
    /// Answer text, empty on error
    pub answer: String,
    /// Duration in milliseconds
    pub time_ms: f64,
    /// `None` when no expected answer was recorded
    pub is_correct: Option<bool>,
    /// Error string, if the run failed
    pub error: Option<String>,
    /// RFC 3339 creation time
    pub created_at: String,
}

/// A benchmark session to insert. Its samples are passed alongside.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
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
    /// Answer of the first repetition
    pub answer: String,
    /// `None` when no expected answer was recorded
    pub is_correct: Option<bool>,
}

/// A stored benchmark session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    /// UUID v4
    pub id: String,
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
    /// Number of repetitions
    pub runs: usize,
    /// Answer text, empty on error
    pub answer: String,
    /// `None` when no expected answer was recorded
    pub is_correct: Option<bool>,
    /// Timing statistics
    #[serde(flatten)]
    pub stats: Stats,
    /// RFC 3339 creation time
    pub created_at: String,
}

impl ToSql for Day {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.number())))
    }
}

impl FromSql for Day {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let n = value.as_i64()?;
        let n = u8::try_from(n).map_err(|_| FromSqlError::OutOfRange(n))?;
        Day::new(n).map_err(|e| FromSqlError::Other(e.into()))
    }
}

impl ToSql for Part {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.number())))
    }
}

impl FromSql for Part {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let n = value.as_i64()?;
        let n = u8::try_from(n).map_err(|_| FromSqlError::OutOfRange(n))?;
        Part::try_from(n).map_err(|e| FromSqlError::Other(e.into()))
    }
}

impl ToSql for Lang {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Lang {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: anyhow::Error| FromSqlError::Other(e.into()))
    }
}
