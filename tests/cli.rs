use std::process::{Command, Output};

use serde_json::Value;

/// A scratch database and build directory for one test.
struct Royale {
    dir: tempfile::TempDir,
}

impl Royale {
    fn new() -> Royale {
        Royale {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_royale"))
            .args(args)
            .env("ROYALE_DB", self.dir.path().join("royale.db"))
            .env("ROYALE_BUILD_DIR", self.dir.path().join("build"))
            .env("ROYALE_INPUTS", "tests/inputs")
            .env("ROYALE_SOLUTIONS", "tests/native_agents")
            .env_remove("ROYALE_LOG")
            .env_remove("ROYALE_VERBOSE")
            .output()
            .unwrap()
    }

    fn code(&self, args: &[&str]) -> i32 {
        let output = self.run(args);
        output.status.code().unwrap()
    }
}

fn json_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn check_passes_only_on_verified_answers() {
    let royale = Royale::new();
    assert_eq!(royale.code(&["init"]), 0);

    // no expected answer yet: unverified is not a pass
    assert_eq!(royale.code(&["check", "0", "1", "--lang", "rust"]), 1);

    assert_eq!(royale.code(&["set-answer", "0", "1", "79162"]), 0);
    assert_eq!(royale.code(&["check", "0", "1", "--lang", "rust"]), 0);

    assert_eq!(royale.code(&["set-answer", "0", "1", "1"]), 0);
    assert_eq!(royale.code(&["check", "0", "1", "--lang", "rust"]), 1);
    // a wrong answer is still a successful run
    assert_eq!(royale.code(&["run", "0", "1", "--lang", "rust"]), 0);
}

#[test]
fn run_json_prints_one_object_per_agent() {
    let royale = Royale::new();
    royale.run(&["set-answer", "0", "2", "227707"]);

    let output = royale.run(&["run", "0", "2", "--lang", "rust", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let reports = json_lines(&output);
    let agents: Vec<_> = reports.iter().map(|r| r["agent"].as_str().unwrap()).collect();
    assert_eq!(agents, vec!["alpha", "bravo", "charlie"]);
    assert!(reports.iter().all(|r| r["answer"] == "227707"));
    assert!(reports.iter().all(|r| r["is_correct"] == true));
}

#[test]
fn missing_input_fails_the_run() {
    let royale = Royale::new();
    let output = royale.run(&["run", "1", "1", "--lang", "rust", "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let reports = json_lines(&output);
    assert!(!reports.is_empty());
    for report in &reports {
        let error = report["error"].as_str().unwrap();
        assert!(error.starts_with("Input not found"), "{error}");
    }
}

#[test]
fn bench_json_streams_events() {
    let royale = Royale::new();
    let output = royale.run(&[
        "bench", "0", "--part", "1", "--lang", "rust", "--runs", "2", "--json",
    ]);
    assert_eq!(output.status.code(), Some(0));

    let events = json_lines(&output);
    let types: Vec<_> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        vec!["progress", "result", "progress", "result", "progress", "result", "done"]
    );
    let done = events.last().unwrap();
    assert_eq!(done["completed"], 3);
    assert_eq!(done["failed"], 0);
    for result in events.iter().filter(|e| e["type"] == "result") {
        assert_eq!(result["success"], true);
        assert_eq!(result["runs"], 2);
    }

    let output = royale.run(&["leaderboard", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let board = &json_lines(&output)[0];
    assert_eq!(board["podiums"].as_array().unwrap().len(), 1);
    assert_eq!(board["standings"].as_array().unwrap().len(), 3);
}

#[test]
fn invalid_arguments_exit_with_one() {
    let royale = Royale::new();
    assert_eq!(royale.code(&["run", "99", "1"]), 1);
    assert_eq!(royale.code(&["run", "1", "3"]), 1);
    assert_eq!(royale.code(&["run", "1", "1", "--lang", "cobol"]), 1);
    assert_eq!(royale.code(&["frobnicate"]), 1);
    assert_eq!(royale.code(&["--help"]), 0);
}
