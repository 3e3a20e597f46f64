use std::path::Path;

use anyhow::{bail, Context};
use aoc_royale::{
    harness::RunReport,
    logger::{init_logger, init_stderr_logger},
    prelude::*,
    ranking::{podiums, standings},
};
use tracing::{info, Level};

use super::args::*;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const VERIFICATION_FAILED: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 1;
    pub const FATAL: i32 = 2;
}

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = Configuration::from_env();
    let config = if cli.log { config.with_log(true) } else { config };
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    if config.log() {
        let path = init_logger(config.log_dir(), Level::TRACE)?;
        eprintln!("logging to {}", path.display());
    } else {
        init_stderr_logger(level)?;
    }

    let store = open_store(&cli.db)?;
    match cli.cmd {
        Command::Init => {
            eprintln!("initialized {}", cli.db.display());
            Ok(exit_codes::OK)
        }
        Command::Publish(args) => cmd_publish(&store, &config, args),
        Command::SetAnswer(args) => cmd_set_answer(&store, args),
        Command::Run(args) => cmd_run(&store, config, args, false),
        Command::Check(args) => cmd_run(&store, config, args, true),
        Command::Bench(args) => cmd_bench(&store, config, args),
        Command::Leaderboard(args) => cmd_leaderboard(&store, args),
        Command::History(args) => cmd_history(&store, args),
    }
}

fn open_store(path: &Path) -> anyhow::Result<Store> {
    let store = Store::open(path)?;
    store.init_schema()?;
    Ok(store)
}

fn cmd_publish(store: &Store, config: &Configuration, args: PublishArgs) -> anyhow::Result<i32> {
    let dir = config.inputs_dir().join(args.day.dir_name());
    let read = |name: &str| std::fs::read_to_string(dir.join(name)).ok();
    let part1 = read("part1.md");
    let part2 = read("part2.md");
    let sample = read("sample.txt");
    if part1.is_none() && part2.is_none() && sample.is_none() {
        bail!(
            "nothing to publish in {}: expected part1.md, part2.md or sample.txt",
            dir.display()
        );
    }

    store.publish(
        args.day,
        part1.as_deref(),
        part2.as_deref(),
        sample.as_deref(),
    )?;
    for (name, found) in [
        ("part1.md", part1.is_some()),
        ("part2.md", part2.is_some()),
        ("sample.txt", sample.is_some()),
    ] {
        if found {
            eprintln!("published {}/{name}", dir.display());
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_set_answer(store: &Store, args: SetAnswerArgs) -> anyhow::Result<i32> {
    let kind = InputKind::from_sample_flag(args.sample);
    store.set_answer(args.day, args.part, kind, &args.answer)?;
    eprintln!(
        "expected {kind} answer of day {} part {}: {}",
        args.day, args.part, args.answer
    );
    Ok(exit_codes::OK)
}

fn cmd_run(
    store: &Store,
    config: Configuration,
    args: RunArgs,
    check: bool,
) -> anyhow::Result<i32> {
    let registry = Registry::builtin()?;
    let limits = LimitsBuilder::from_env().build()?;
    let verbose = !args.json && config.verbose();
    let config = config.with_verbose(verbose);
    let harness = Harness::new(store, &registry, config, limits);

    let kind = InputKind::from_sample_flag(args.sample);
    let reports = harness.run(args.day, args.part, &args.langs, &args.agents, kind)?;
    if reports.is_empty() {
        eprintln!("no solver for day {} part {}", args.day, args.part);
        return Ok(exit_codes::VERIFICATION_FAILED);
    }

    for report in &reports {
        if args.json {
            println!("{}", serde_json::to_string(report)?);
        } else {
            print_run(report);
        }
    }

    let unstored = reports.iter().filter(|r| r.run_id.is_none()).count();
    if unstored > 0 {
        eprintln!("{unstored} run(s) could not be stored");
    }
    let failed = unstored > 0
        || if check {
            reports.iter().any(|r| r.is_correct != Some(true))
        } else {
            reports.iter().any(|r| r.error.is_some())
        };
    info!(runs = reports.len(), failed, "run finished");
    Ok(if failed {
        exit_codes::VERIFICATION_FAILED
    } else {
        exit_codes::OK
    })
}

fn verdict(is_correct: Option<bool>) -> &'static str {
    match is_correct {
        Some(true) => "correct",
        Some(false) => "wrong",
        None => "unverified",
    }
}

fn print_run(report: &RunReport) {
    match &report.error {
        Some(error) => println!(
            "{:<10} {:<4} error: {error} ({:.3}ms, {})",
            report.agent,
            report.lang,
            report.time_ms,
            verdict(report.is_correct)
        ),
        None => println!(
            "{:<10} {:<4} {:<20} {:>12.3}ms {}",
            report.agent,
            report.lang,
            report.answer,
            report.time_ms,
            verdict(report.is_correct)
        ),
    }
}

fn cmd_bench(store: &Store, config: Configuration, args: BenchArgs) -> anyhow::Result<i32> {
    let registry = Registry::builtin()?;
    let mut limits = LimitsBuilder::from_env();
    if let Some(concurrency) = args.concurrency {
        limits = limits.with_concurrency(concurrency);
    }
    let limits = limits.build()?;
    let verbose = !args.json && config.verbose();
    let config = config.with_verbose(verbose);
    let bench = Benchmarker::new(store, &registry, config, limits);

    let mut plan = BenchPlan::new(args.day)
        .with_parts(args.part)
        .with_langs(args.langs)
        .with_agents(args.agents)
        .with_kind(InputKind::from_sample_flag(args.sample));
    if let Some(runs) = args.runs {
        plan = plan.with_runs(runs);
    }

    let json = args.json;
    let mut write_error = None;
    let reports = bench.run(&plan, |event| {
        if !json || write_error.is_some() {
            return;
        }
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => write_error = Some(e),
        }
    })?;
    if let Some(e) = write_error {
        return Err(e).context("could not serialize benchmark event");
    }

    if reports.is_empty() {
        eprintln!("nothing to benchmark for day {}", args.day);
        return Ok(exit_codes::VERIFICATION_FAILED);
    }
    let failed = reports.iter().filter(|r| !r.success).count();
    if !json {
        println!("{} sessions stored, {failed} failed", reports.len() - failed);
    }
    Ok(if failed > 0 {
        exit_codes::VERIFICATION_FAILED
    } else {
        exit_codes::OK
    })
}

fn cmd_leaderboard(store: &Store, args: LeaderboardArgs) -> anyhow::Result<i32> {
    let sessions: Vec<_> = store
        .sessions(args.day)?
        .into_iter()
        .filter(|s| s.kind == InputKind::Final)
        .collect();
    let podiums = podiums(&sessions);
    let standings = standings(&podiums);

    if args.json {
        let json = serde_json::json!({ "podiums": podiums, "standings": standings });
        println!("{}", serde_json::to_string(&json)?);
        return Ok(exit_codes::OK);
    }

    if podiums.is_empty() {
        println!("no benchmark session yet");
        return Ok(exit_codes::OK);
    }
    for podium in &podiums {
        println!("day {} part {} [{}]", podium.day, podium.part, podium.lang);
        for p in &podium.placements {
            println!(
                "  {}. {:<10} p50 {:>10.3}ms  avg {:>10.3}ms  {}",
                p.rank,
                p.agent,
                p.p50_ms,
                p.avg_ms,
                verdict(p.is_correct)
            );
        }
    }
    println!();
    println!("medal table");
    for (i, s) in standings.iter().enumerate() {
        println!(
            "  {}. {:<10} {}  (total p50 {:.3}ms)",
            i + 1,
            s.agent,
            s.medals,
            s.total_p50_ms
        );
    }
    Ok(exit_codes::OK)
}

fn cmd_history(store: &Store, args: HistoryArgs) -> anyhow::Result<i32> {
    let runs = store.recent_runs(args.day, args.limit)?;
    if runs.is_empty() {
        println!("no run yet");
    }
    for run in runs {
        let result = match &run.error {
            Some(error) => format!("error: {error}"),
            None => run.answer.clone(),
        };
        println!(
            "{} day{}/{} {:<10} {:<4} {:<6} {:<20} {:>10.3}ms {}",
            run.created_at,
            run.day,
            run.part,
            run.agent,
            run.lang,
            run.kind,
            result,
            run.time_ms,
            verdict(run.is_correct)
        );
    }
    Ok(exit_codes::OK)
}
