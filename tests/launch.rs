use aoc_royale::{harness::FREE_STAR_ANSWER, prelude::*, ranking};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const FINAL_PART1: &str = "79162";
const FINAL_PART2: &str = "227707";

fn init_test_logger() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn cc_available() -> bool {
    std::process::Command::new("cc")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn store() -> Store {
    let store = Store::memory().unwrap();
    store.init_schema().unwrap();
    store
}

fn config(build_dir: &tempfile::TempDir) -> Configuration {
    Configuration::new()
        .with_verbose(false)
        .with_inputs_dir("tests/inputs")
        .with_solutions_dir("tests/native_agents")
        .with_build_dir(build_dir.path())
}

fn limits() -> Limits {
    LimitsBuilder::new()
        .with_total_cpu_count(2)
        .with_concurrency(2)
        .build()
        .unwrap()
}

fn day0() -> Day {
    Day::new(0).unwrap()
}

#[test]
fn registered_agents_solve_the_warm_up() {
    init_test_logger();
    let store = store();
    let registry = Registry::builtin().unwrap();
    let build = tempfile::tempdir().unwrap();
    let harness = Harness::new(&store, &registry, config(&build), limits());

    store.set_answer(day0(), Part::One, InputKind::Final, FINAL_PART1).unwrap();
    store.set_answer(day0(), Part::Two, InputKind::Final, FINAL_PART2).unwrap();

    for part in Part::ALL {
        let reports = harness
            .run(day0(), part, &[Lang::Rust], &[], InputKind::Final)
            .unwrap();
        let agents: Vec<_> = reports.iter().map(|r| r.agent.as_str()).collect();
        assert_eq!(agents, vec!["alpha", "bravo", "charlie"]);
        for report in &reports {
            assert_eq!(report.is_correct, Some(true), "{report:?}");
            assert!(report.error.is_none());
        }
    }
    assert_eq!(store.recent_runs(Some(day0()), 100).unwrap().len(), 6);
}

#[test]
fn native_agents_are_compiled_and_verified() {
    if !cc_available() {
        eprintln!("no C compiler, skipping");
        return;
    }
    init_test_logger();
    let store = store();
    let registry = Registry::new();
    let build = tempfile::tempdir().unwrap();
    let harness = Harness::new(&store, &registry, config(&build), limits());
    store.set_answer(day0(), Part::One, InputKind::Sample, "24000").unwrap();

    let reports = harness
        .run(day0(), Part::One, &[Lang::C], &[], InputKind::Sample)
        .unwrap();
    let agents: Vec<_> = reports.iter().map(|r| r.agent.as_str()).collect();
    assert_eq!(agents, vec!["alpha", "bravo", "broken", "charlie"]);

    let alpha = &reports[0];
    assert_eq!(alpha.answer, "24000");
    assert_eq!(alpha.is_correct, Some(true));
    assert!(alpha.time_ms < 1000.0);

    // plain stdout, no markers
    let bravo = &reports[1];
    assert_eq!(bravo.answer, "24000");
    assert_eq!(bravo.is_correct, Some(true));

    let broken = &reports[2];
    assert!(broken.error.as_deref().unwrap().starts_with("Compilation failed"));
    assert_eq!(broken.answer, "");
    assert_eq!(broken.is_correct, Some(false));
    assert!(!build.path().join("broken/day00_part1").exists());

    let charlie = &reports[3];
    assert_eq!(charlie.error.as_deref(), Some("boom"));
    assert_eq!(charlie.is_correct, Some(false));
}

#[test]
fn unverified_until_an_answer_is_recorded() {
    let store = store();
    let registry = Registry::builtin().unwrap();
    let build = tempfile::tempdir().unwrap();
    let harness = Harness::new(&store, &registry, config(&build), limits());

    let agents = vec!["alpha".to_string()];
    let first = harness
        .run(day0(), Part::One, &[Lang::Rust], &agents, InputKind::Sample)
        .unwrap();
    assert_eq!(first[0].answer, "24000");
    assert_eq!(first[0].is_correct, None);

    store.set_answer(day0(), Part::One, InputKind::Sample, "24001").unwrap();
    let second = harness
        .run(day0(), Part::One, &[Lang::Rust], &agents, InputKind::Sample)
        .unwrap();
    assert_eq!(second[0].is_correct, Some(false));
}

#[test]
fn bench_stores_sessions_and_ranks_agents() {
    init_test_logger();
    let store = store();
    let registry = Registry::builtin().unwrap();
    let build = tempfile::tempdir().unwrap();
    let bench = Benchmarker::new(&store, &registry, config(&build), limits());
    store.set_answer(day0(), Part::Two, InputKind::Final, FINAL_PART2).unwrap();

    let plan = BenchPlan::new(day0())
        .with_langs([Lang::Rust])
        .with_runs(4);
    let mut progress = vec![];
    let mut done = None;
    let reports = bench
        .run(&plan, |event| match event {
            BenchEvent::Progress { completed, total, .. } => progress.push((*completed, *total)),
            BenchEvent::Result(_) => {}
            BenchEvent::Done { completed, failed } => done = Some((*completed, *failed)),
        })
        .unwrap();

    assert_eq!(reports.len(), 6);
    assert!(reports.iter().all(|r| r.success));
    assert_eq!(progress.len(), 6);
    assert_eq!(progress.last(), Some(&(6, 6)));
    assert_eq!(done, Some((6, 0)));

    for report in &reports {
        let id = report.session_id.as_deref().unwrap();
        let stored = store.session(id).unwrap().unwrap();
        assert_eq!(stored.runs, 4);
        assert_eq!(store.recompute_session_stats(id).unwrap(), Some(stored.stats));
        let expected = match report.task.part {
            Part::One => None,
            Part::Two => Some(true),
        };
        assert_eq!(report.is_correct, expected);
    }

    let podiums = ranking::podiums(&store.sessions(Some(day0())).unwrap());
    assert_eq!(podiums.len(), 2);
    assert!(podiums.iter().all(|p| p.placements.len() == 3));
    let standings = ranking::standings(&podiums);
    let medals: u32 = standings.iter().map(|s| s.medals.total()).sum();
    assert_eq!(medals, 6);
}

#[test]
fn native_bench_compiles_once() {
    if !cc_available() {
        eprintln!("no C compiler, skipping");
        return;
    }
    let store = store();
    let registry = Registry::new();
    let build = tempfile::tempdir().unwrap();
    let bench = Benchmarker::new(&store, &registry, config(&build), limits());

    let plan = BenchPlan::new(day0())
        .with_parts([Part::One])
        .with_langs([Lang::C])
        .with_agents(["alpha", "broken"])
        .with_runs(3);
    let reports = bench.run(&plan, |_| {}).unwrap();
    assert_eq!(reports.len(), 2);

    let alpha = reports.iter().find(|r| r.task.agent == "alpha").unwrap();
    assert!(alpha.success, "{alpha:?}");
    assert_eq!(alpha.answer.as_deref(), Some(FINAL_PART1));
    assert_eq!(alpha.runs, 3);
    assert!(build.path().join("alpha/day00_part1").is_file());

    let broken = reports.iter().find(|r| r.task.agent == "broken").unwrap();
    assert!(!broken.success);
    assert!(broken.error.as_deref().unwrap().starts_with("Compilation failed"));
}

#[test]
fn free_star_is_awarded_without_running() {
    let store = store();
    let registry = Registry::builtin().unwrap();
    let build = tempfile::tempdir().unwrap();
    let harness = Harness::new(&store, &registry, config(&build), limits());

    let day25 = Day::new(25).unwrap();
    let reports = harness
        .run(day25, Part::Two, &[Lang::Rust], &[], InputKind::Final)
        .unwrap();
    assert_eq!(reports.len(), 3);
    for report in reports {
        assert_eq!(report.answer, FREE_STAR_ANSWER);
        assert_eq!(report.time_ms, 0.0);
        assert_eq!(report.is_correct, Some(true));
    }
}
