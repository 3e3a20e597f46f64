//! Result of a single solver execution.

use std::{any::Any, fmt, path::PathBuf, time::Duration};

use serde::{Serialize, Serializer};

/// Why a solver run produced no answer.
///
/// The `Display` output is the error string stored in the database and shown to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    /// Required input file is absent.
    InputMissing(PathBuf),
    /// Native source failed to build. Holds the compiler diagnostic.
    Compile(String),
    /// Solver returned an error, panicked, or the process exited abnormally.
    Runtime(String),
    /// Wall-clock budget exceeded. The solver was killed.
    Timeout,
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::InputMissing(path) => write!(f, "Input not found: {}", path.display()),
            SolveError::Compile(msg) => write!(f, "Compilation failed: {msg}"),
            SolveError::Runtime(msg) => f.write_str(msg),
            SolveError::Timeout => f.write_str("Timeout"),
        }
    }
}

impl std::error::Error for SolveError {}

impl Serialize for SolveError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `{answer, time_ms, error?}` for one execution.
///
/// When `error` is set, `answer` is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Textual answer, exactly as produced by the solver
    pub answer: String,
    /// Duration in milliseconds
    pub time_ms: f64,
    /// Failure, if any
    pub error: Option<SolveError>,
}

impl Outcome {
    /// A successful run.
    pub fn solved(answer: impl Into<String>, time_ms: f64) -> Outcome {
        Outcome {
            answer: answer.into(),
            time_ms,
            error: None,
        }
    }

    /// A failed run. The answer is forced to the empty string.
    pub fn failed(error: SolveError, time_ms: f64) -> Outcome {
        Outcome {
            answer: String::new(),
            time_ms,
            error: Some(error),
        }
    }

    /// True when no error occurred.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The error as stored in the database.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

pub(crate) fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "solver panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_has_empty_answer() {
        let outcome = Outcome::failed(SolveError::Runtime("boom".into()), 3.0);
        assert_eq!(outcome.answer, "");
        assert!(!outcome.is_ok());
        assert_eq!(outcome.error_message().as_deref(), Some("boom"));
    }

    #[test]
    fn error_strings() {
        assert_eq!(SolveError::Timeout.to_string(), "Timeout");
        assert!(SolveError::Compile("x.c:1: error".into())
            .to_string()
            .starts_with("Compilation failed"));
    }

    #[test]
    fn outcome_serializes_error_as_string() {
        let json = serde_json::to_value(Outcome::failed(SolveError::Timeout, 10.0)).unwrap();
        assert_eq!(json["error"], "Timeout");
        assert_eq!(json["answer"], "");
    }
}
