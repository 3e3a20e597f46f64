use std::path::PathBuf;

use aoc_royale::puzzle::{Day, Lang, Part};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "royale",
    version,
    about = "Battle royale harness for Advent-of-Code-style solvers"
)]
pub struct Cli {
    /// SQLite database
    #[arg(long, global = true, env = "ROYALE_DB", default_value = ".royale/royale.db")]
    pub db: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log to a timestamped file instead of stderr
    #[arg(long, global = true)]
    pub log: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the schema and the 26 day rows
    Init,
    /// Load a day's puzzle texts and sample input
    Publish(PublishArgs),
    /// Record an expected answer
    SetAnswer(SetAnswerArgs),
    /// Run each agent once and store the runs
    Run(RunArgs),
    /// Run each agent once; fail unless every answer is verified correct
    Check(RunArgs),
    /// Benchmark a day and store sessions
    Bench(BenchArgs),
    /// Rankings per (day, part, language) and the medal table
    Leaderboard(LeaderboardArgs),
    /// Recent runs
    History(HistoryArgs),
}

#[derive(Args, Clone)]
pub struct PublishArgs {
    pub day: Day,
}

#[derive(Args, Clone)]
pub struct SetAnswerArgs {
    pub day: Day,
    pub part: Part,
    pub answer: String,

    /// Answer of the sample input
    #[arg(long)]
    pub sample: bool,
}

#[derive(Args, Clone)]
pub struct RunArgs {
    pub day: Day,
    pub part: Part,

    /// Use the sample input
    #[arg(long)]
    pub sample: bool,

    /// Only these languages (rust|c), repeatable
    #[arg(long = "lang")]
    pub langs: Vec<Lang>,

    /// Only these agents, repeatable
    #[arg(long = "agent")]
    pub agents: Vec<String>,

    /// Print one JSON object per run
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct BenchArgs {
    pub day: Day,

    /// Only this part
    #[arg(long)]
    pub part: Option<Part>,

    /// Only these languages (rust|c), repeatable
    #[arg(long = "lang")]
    pub langs: Vec<Lang>,

    /// Only these agents, repeatable
    #[arg(long = "agent")]
    pub agents: Vec<String>,

    /// Repetitions per solver
    #[arg(long)]
    pub runs: Option<usize>,

    /// Solvers running at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Use the sample input
    #[arg(long)]
    pub sample: bool,

    /// Print progress/result/done events as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct LeaderboardArgs {
    /// Only this day
    #[arg(long)]
    pub day: Option<Day>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct HistoryArgs {
    /// Only this day
    #[arg(long)]
    pub day: Option<Day>,

    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}
