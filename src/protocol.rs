//! Line protocol spoken by native solvers on stdout.
//!
//! ```text
//! TIME:<phase-name>:<float-milliseconds>
//! ANSWER:<answer-text>
//! ERROR:<message>
//! ```
//!
//! Unknown lines are ignored. When neither `ANSWER:` nor `ERROR:` appears, the first line that
//! is not a `TIME:` marker is taken as the answer.

use serde::Serialize;

const TIME_PREFIX: &str = "TIME:";
const ANSWER_PREFIX: &str = "ANSWER:";
const ERROR_PREFIX: &str = "ERROR:";

/// Phase whose timing replaces wall-clock time.
pub const SOLVE_PHASE: &str = "solve";

/// A `TIME:` marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phase {
    /// Phase name (`parse`, `solve`, ...)
    pub name: String,
    /// Milliseconds reported by the solver
    pub ms: f64,
}

/// Everything recognized in a native solver's stdout.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Report {
    /// `ANSWER:` line, or the fallback first line
    pub answer: Option<String>,
    /// `ERROR:` line
    pub error: Option<String>,
    /// `TIME:` lines, in order
    pub phases: Vec<Phase>,
}

impl Report {
    /// Parses solver stdout. Pure: the same text always gives the same report.
    ///
    /// Without `ANSWER:` and `ERROR:` lines the answer is not the raw first line of stdout:
    /// the output is trimmed and leading `TIME:` markers are skipped, so a solver printing
    /// timings before a bare answer line still gets that answer recorded. Output holding
    /// only `TIME:` markers or whitespace has no answer.
    pub fn parse(stdout: &str) -> Report {
        let mut report = Report::default();

        for line in stdout.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if let Some(rest) = line.strip_prefix(TIME_PREFIX) {
                if let Some(phase) = parse_phase(rest) {
                    report.phases.push(phase);
                }
            } else if let Some(rest) = line.strip_prefix(ANSWER_PREFIX) {
                report.answer.get_or_insert_with(|| rest.to_string());
            } else if let Some(rest) = line.strip_prefix(ERROR_PREFIX) {
                report.error.get_or_insert_with(|| rest.to_string());
            }
        }

        if report.answer.is_none() && report.error.is_none() {
            report.answer = stdout
                .trim()
                .lines()
                .map(|line| line.strip_suffix('\r').unwrap_or(line))
                .find(|line| !line.starts_with(TIME_PREFIX))
                .map(String::from);
        }

        report
    }

    /// Milliseconds of the last `solve` phase, if reported.
    pub fn solve_time(&self) -> Option<f64> {
        self.phases
            .iter()
            .rev()
            .find(|phase| phase.name == SOLVE_PHASE)
            .map(|phase| phase.ms)
    }
}

fn parse_phase(rest: &str) -> Option<Phase> {
    let (name, ms) = rest.rsplit_once(':')?;
    let ms: f64 = ms.trim().parse().ok()?;
    if !ms.is_finite() || ms < 0.0 {
        return None;
    }
    Some(Phase {
        name: name.to_string(),
        ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_markers() {
        let report = Report::parse("TIME:parse:0.25\nTIME:solve:1.5\nANSWER:142\n");
        assert_eq!(report.answer.as_deref(), Some("142"));
        assert_eq!(report.error, None);
        assert_eq!(report.phases.len(), 2);
        assert_eq!(report.solve_time(), Some(1.5));
    }

    #[test]
    fn error_marker() {
        let report = Report::parse("TIME:parse:0.1\nERROR:bad input\n");
        assert_eq!(report.error.as_deref(), Some("bad input"));
        assert_eq!(report.answer, None);
        assert_eq!(report.solve_time(), None);
    }

    #[test]
    fn unknown_lines_are_ignored() {
        let report = Report::parse("debug: hello\nANSWER:7\nVERSION:2\n");
        assert_eq!(report.answer.as_deref(), Some("7"));
    }

    #[test]
    fn falls_back_to_first_line() {
        let report = Report::parse("\n  281\nsomething else\n");
        assert_eq!(report.answer.as_deref(), Some("281"));

        let report = Report::parse("TIME:solve:3\n99\n");
        assert_eq!(report.answer.as_deref(), Some("99"));
        assert_eq!(report.solve_time(), Some(3.0));

        let report = Report::parse("TIME:parse:1\nTIME:solve:2\n");
        assert_eq!(report.answer, None);
        assert_eq!(report.phases.len(), 2);
    }

    #[test]
    fn empty_output_has_no_answer() {
        assert_eq!(Report::parse(""), Report::default());
        assert_eq!(Report::parse("  \n").answer, None);
    }

    #[test]
    fn crlf_and_malformed_time() {
        let report = Report::parse("TIME:solve:abc\r\nTIME:a:b:2.0\r\nANSWER:x y\r\n");
        assert_eq!(report.answer.as_deref(), Some("x y"));
        assert_eq!(
            report.phases,
            vec![Phase {
                name: "a:b".into(),
                ms: 2.0
            }]
        );
    }

    #[test]
    fn parsing_is_idempotent() {
        let text = "TIME:solve:4.2\nnoise\nANSWER:12\nERROR:late\n";
        assert_eq!(Report::parse(text), Report::parse(text));
    }
}
