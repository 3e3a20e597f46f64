use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::bail;
use tracing::{info, instrument, warn};

use crate::{
    puzzle::{Day, Part},
    solver::Solver,
};

mod agent_compiler;

pub(crate) use agent_compiler::compile_native;

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Path of an agent's native source: `<agent_dir>/dayNN/partP.c`.
pub(crate) fn source_path(agent_dir: &Path, day: Day, part: Part) -> PathBuf {
    agent_dir
        .join(day.dir_name())
        .join(format!("part{}.c", part.number()))
}

/// Agent directories found in `directory`, sorted by name. Non-directories are skipped.
pub(crate) fn agent_dirs(directory: &Path) -> anyhow::Result<Vec<(String, PathBuf)>> {
    if !directory.is_dir() {
        bail!("'{}' is not a valid directory", directory.display());
    }

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let Ok(entry) = entry else {
            warn!("one entry cannot be read in {}", directory.display());
            continue;
        };
        let path = entry.path();
        let Ok(name) = entry.file_name().into_string() else {
            warn!("name error: {:?}", entry.file_name());
            continue;
        };
        if !path.is_dir() {
            warn!("Not a directory: '{name}'");
            continue;
        }
        dirs.push((name, path));
    }
    dirs.sort();
    Ok(dirs)
}

/// Collects the native solvers of every agent in `directory` that has a source for
/// (`day`, `part`).
#[instrument]
pub(crate) fn collect_native_solvers(
    directory: &Path,
    day: Day,
    part: Part,
    verbose: bool,
) -> anyhow::Result<Vec<Solver>> {
    let agents = agent_dirs(directory)?;
    info!(agent_directories = ?agents);

    let longest_name = agents
        .iter()
        .fold(0, |acu, (name, _)| acu.max(name.len()))
        + 3; // at least 3 dots

    if verbose {
        println!("Collecting native solvers for day {day} part {part}...");
    }

    let mut solvers = Vec::new();
    for (name, dir) in agents {
        if verbose {
            print!("Collecting {name:·<longest_name$} ");
            let _ = std::io::stdout().flush(); // try to flush stdout
        }

        let source = source_path(&dir, day, part);
        if !source.is_file() {
            if verbose {
                println!("{YELLOW}no source{RESET}");
            }
            continue;
        }
        if source.metadata().map(|m| m.len() == 0).unwrap_or(true) {
            warn!("empty source: '{}'", source.display());
            if verbose {
                println!("{RED}empty source{RESET}");
            }
            continue;
        }

        if verbose {
            println!("{GREEN}Ok{RESET}");
        }
        solvers.push(Solver::native(name, day, part, source));
    }

    Ok(solvers)
}
