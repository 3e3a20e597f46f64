//! Tracing subscribers.

use std::{fs::File, path::Path};

use anyhow::{anyhow, Context};
use time::{
    format_description::{self, parse},
    OffsetDateTime, UtcOffset,
};
use tracing::{subscriber::set_global_default, Level};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, FmtSubscriber};

/// Installs a global subscriber writing every event up to `level` to a new timestamped file
/// in `log_dir`. Returns the path of the log file.
///
/// Fails if a global subscriber is already set.
pub fn init_logger(log_dir: &Path, level: Level) -> anyhow::Result<std::path::PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("could not create {}", log_dir.display()))?;
    let path = log_dir.join(get_log_file_name()?);
    let file = File::create(&path).with_context(|| format!("could not create {}", path.display()))?;
    let writer = BoxMakeWriter::new(file);
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        local_offset,
        format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")?,
    );

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_ansi(false)
        .with_timer(timer)
        .with_writer(writer)
        .finish();

    set_global_default(subscriber).map_err(|e| {
        anyhow!("could not set global default tracing subscriber, one is probably already set: {e}")
    })?;
    Ok(path)
}

/// Installs a global subscriber writing events up to `level` to stderr.
pub fn init_stderr_logger(level: Level) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    set_global_default(subscriber)
        .map_err(|e| anyhow!("could not set global default tracing subscriber: {e}"))
}

fn get_log_file_name() -> anyhow::Result<String> {
    let format = parse("[year]-[month]-[day]_[hour]-[minute]-[second]_royale.log")?;
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    Ok(now.format(&format)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_name_is_timestamped() {
        let name = get_log_file_name().unwrap();
        assert!(name.ends_with("_royale.log"), "{name}");
        assert_eq!(name.len(), "2024-12-01_06-00-00_royale.log".len());
    }
}
