use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

use anyhow::{anyhow, Context};
use rusqlite::{params, Connection, OptionalExtension, Row};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    records::{DayRecord, NewRun, NewSession, RunRecord, SessionRecord},
    schema::DDL,
};
use crate::{
    puzzle::{Day, InputKind, Part},
    stats::Stats,
};

const RUN_COLUMNS: &str =
    "id, agent, day, part, lang, is_sample, answer, time_ms, is_correct, error, created_at";

const SESSION_COLUMNS: &str = "id, agent, day, part, lang, is_sample, runs, answer, is_correct, \
     avg_ms, min_ms, max_ms, stddev_ms, p50_ms, p95_ms, p99_ms, created_at";

/// Handle on the harness database.
///
/// One connection, opened once and shared by reference. Only the coordinating thread writes.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (or creates) the database at `path`. Parent directories are created.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("could not create {}", dir.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite db {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// A private in-memory database.
    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("store connection poisoned"))
    }

    /// Creates missing tables and the 26 day rows.
    #[instrument(skip(self))]
    pub fn init_schema(&self) -> anyhow::Result<()> {
        let mut conn = self.lock()?;
        conn.execute_batch(DDL).context("failed to create schema")?;
        let tx = conn.transaction()?;
        for day in Day::all() {
            tx.execute("INSERT OR IGNORE INTO days (id) VALUES (?1)", params![day])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// The row of `day`.
    pub fn day(&self, day: Day) -> anyhow::Result<Option<DayRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT id, part1_text, part2_text, sample_input, sample_answer1, sample_answer2,
                        answer1, answer2, published_at
                 FROM days WHERE id = ?1",
                params![day],
                day_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Every day row, in order.
    pub fn days(&self) -> anyhow::Result<Vec<DayRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, part1_text, part2_text, sample_input, sample_answer1, sample_answer2,
                    answer1, answer2, published_at
             FROM days ORDER BY id",
        )?;
        let rows = stmt.query_map([], day_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Stores the puzzle texts and sample input of `day` and stamps it as published.
    /// `None` keeps the current value.
    #[instrument(skip(self, part1_text, part2_text, sample_input))]
    pub fn publish(
        &self,
        day: Day,
        part1_text: Option<&str>,
        part2_text: Option<&str>,
        sample_input: Option<&str>,
    ) -> anyhow::Result<()> {
        let now = now_rfc3339()?;
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE days SET
                part1_text = COALESCE(?2, part1_text),
                part2_text = COALESCE(?3, part2_text),
                sample_input = COALESCE(?4, sample_input),
                published_at = ?5
             WHERE id = ?1",
            params![day, part1_text, part2_text, sample_input, now],
        )?;
        if changed == 0 {
            return Err(anyhow!("day {day} does not exist, run init first"));
        }
        Ok(())
    }

    /// Records the expected answer of (`day`, `part`) for `kind`.
    #[instrument(skip(self))]
    pub fn set_answer(
        &self,
        day: Day,
        part: Part,
        kind: InputKind,
        answer: &str,
    ) -> anyhow::Result<()> {
        let column = answer_column(part, kind);
        let conn = self.lock()?;
        let changed = conn.execute(
            &format!("UPDATE days SET {column} = ?2 WHERE id = ?1"),
            params![day, answer],
        )?;
        if changed == 0 {
            return Err(anyhow!("day {day} does not exist, run init first"));
        }
        Ok(())
    }

    /// Expected answer of (`day`, `part`) for `kind`, read now.
    pub fn expected_answer(
        &self,
        day: Day,
        part: Part,
        kind: InputKind,
    ) -> anyhow::Result<Option<String>> {
        let column = answer_column(part, kind);
        let conn = self.lock()?;
        let answer = conn
            .query_row(
                &format!("SELECT {column} FROM days WHERE id = ?1"),
                params![day],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(answer.flatten())
    }

    /// Inserts a run and returns its id.
    pub fn insert_run(&self, run: &NewRun) -> anyhow::Result<i64> {
        let now = now_rfc3339()?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO runs
                (agent, day, part, lang, is_sample, answer, time_ms, is_correct, error, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                run.agent,
                run.day,
                run.part,
                run.lang,
                run.kind.is_sample(),
                run.answer,
                run.time_ms,
                run.is_correct,
                run.error,
                now
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The `limit` most recent runs, newest first, optionally for one day.
    pub fn recent_runs(&self, day: Option<Day>, limit: usize) -> anyhow::Result<Vec<RunRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM runs
             WHERE ?1 IS NULL OR day = ?1
             ORDER BY id DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![day, limit as i64], run_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Inserts a session and its samples in one transaction. Returns the session id.
    ///
    /// The stored statistics are computed from `samples`, which must not be empty.
    #[instrument(skip(self, session, samples), fields(agent = %session.agent, runs = samples.len()))]
    pub fn insert_session(&self, session: &NewSession, samples: &[f64]) -> anyhow::Result<String> {
        let stats = Stats::from_samples(samples)
            .ok_or_else(|| anyhow!("a benchmark session needs at least one sample"))?;
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!("INSERT INTO benchmark_sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"),
            params![
                id,
                session.agent,
                session.day,
                session.part,
                session.lang,
                session.kind.is_sample(),
                samples.len() as i64,
                session.answer,
                session.is_correct,
                stats.avg,
                stats.min,
                stats.max,
                stats.std_dev,
                stats.p50,
                stats.p95,
                stats.p99,
                now
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO benchmark_runs (session_id, run_index, time_ms) VALUES (?1, ?2, ?3)",
            )?;
            for (index, time_ms) in samples.iter().enumerate() {
                stmt.execute(params![id, index as i64, time_ms])?;
            }
        }
        tx.commit().context("failed to commit benchmark session")?;
        debug!(%id, "session stored");
        Ok(id)
    }

    /// The session with `id`.
    pub fn session(&self, id: &str) -> anyhow::Result<Option<SessionRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM benchmark_sessions WHERE id = ?1"),
                params![id],
                session_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Raw samples of a session, in run order.
    pub fn session_samples(&self, id: &str) -> anyhow::Result<Vec<f64>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT time_ms FROM benchmark_runs WHERE session_id = ?1 ORDER BY run_index",
        )?;
        let rows = stmt.query_map(params![id], |row| row.get::<_, f64>(0))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Statistics recomputed from the stored samples of a session.
    pub fn recompute_session_stats(&self, id: &str) -> anyhow::Result<Option<Stats>> {
        Ok(Stats::from_samples(&self.session_samples(id)?))
    }

    /// Sessions in insertion order, optionally for one day.
    pub fn sessions(&self, day: Option<Day>) -> anyhow::Result<Vec<SessionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM benchmark_sessions
             WHERE ?1 IS NULL OR day = ?1
             ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params![day], session_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Deletes a session and its samples. Returns false when it did not exist.
    pub fn delete_session(&self, id: &str) -> anyhow::Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM benchmark_sessions WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

fn answer_column(part: Part, kind: InputKind) -> &'static str {
    match (kind, part) {
        (InputKind::Sample, Part::One) => "sample_answer1",
        (InputKind::Sample, Part::Two) => "sample_answer2",
        (InputKind::Final, Part::One) => "answer1",
        (InputKind::Final, Part::Two) => "answer2",
    }
}

fn day_from_row(row: &Row<'_>) -> rusqlite::Result<DayRecord> {
    Ok(DayRecord {
        day: row.get(0)?,
        part1_text: row.get(1)?,
        part2_text: row.get(2)?,
        sample_input: row.get(3)?,
        sample_answer1: row.get(4)?,
        sample_answer2: row.get(5)?,
        answer1: row.get(6)?,
        answer2: row.get(7)?,
        published_at: row.get(8)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        agent: row.get(1)?,
        day: row.get(2)?,
        part: row.get(3)?,
        lang: row.get(4)?,
        kind: InputKind::from_sample_flag(row.get(5)?),
        answer: row.get(6)?,
        time_ms: row.get(7)?,
        is_correct: row.get(8)?,
        error: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        agent: row.get(1)?,
        day: row.get(2)?,
        part: row.get(3)?,
        lang: row.get(4)?,
        kind: InputKind::from_sample_flag(row.get(5)?),
        runs: row.get::<_, i64>(6)?.max(0) as usize,
        answer: row.get(7)?,
        is_correct: row.get(8)?,
        stats: Stats {
            avg: row.get(9)?,
            min: row.get(10)?,
            max: row.get(11)?,
            std_dev: row.get(12)?,
            p50: row.get(13)?,
            p95: row.get(14)?,
            p99: row.get(15)?,
        },
        created_at: row.get(16)?,
    })
}

/// Current UTC time as RFC 3339.
pub(crate) fn now_rfc3339() -> anyhow::Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("could not format timestamp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::Lang;

    fn store() -> Store {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        store
    }

    fn day(n: u8) -> Day {
        Day::new(n).unwrap()
    }

    fn session(agent: &str) -> NewSession {
        NewSession {
            agent: agent.to_string(),
            day: day(1),
            part: Part::One,
            lang: Lang::Rust,
            kind: InputKind::Final,
            answer: "142".to_string(),
            is_correct: Some(true),
        }
    }

    #[test]
    fn init_creates_every_day_once() {
        let store = store();
        store.init_schema().unwrap();
        let days = store.days().unwrap();
        assert_eq!(days.len(), 26);
        assert_eq!(days[0].day, day(0));
        assert_eq!(days[25].day, day(25));
        assert!(days.iter().all(|d| d.published_at.is_none()));
    }

    #[test]
    fn expected_answers_per_part_and_kind() {
        let store = store();
        assert_eq!(store.expected_answer(day(1), Part::One, InputKind::Final).unwrap(), None);

        store.set_answer(day(1), Part::One, InputKind::Sample, "142").unwrap();
        store.set_answer(day(1), Part::Two, InputKind::Final, "54249").unwrap();

        let sample = store.expected_answer(day(1), Part::One, InputKind::Sample).unwrap();
        assert_eq!(sample.as_deref(), Some("142"));
        assert_eq!(store.expected_answer(day(1), Part::One, InputKind::Final).unwrap(), None);
        let record = store.day(day(1)).unwrap().unwrap();
        assert_eq!(record.expected(Part::Two, InputKind::Final), Some("54249"));
    }

    #[test]
    fn publish_keeps_missing_fields() {
        let store = store();
        store.publish(day(2), Some("# Part 1"), None, Some("1\n2\n")).unwrap();
        store.publish(day(2), None, Some("# Part 2"), None).unwrap();
        let record = store.day(day(2)).unwrap().unwrap();
        assert_eq!(record.part1_text.as_deref(), Some("# Part 1"));
        assert_eq!(record.part2_text.as_deref(), Some("# Part 2"));
        assert_eq!(record.sample_input.as_deref(), Some("1\n2\n"));
        assert!(record.published_at.is_some());
    }

    #[test]
    fn runs_are_listed_newest_first() {
        let store = store();
        for (agent, correct) in [("alpha", Some(true)), ("bravo", None), ("charlie", Some(false))] {
            store
                .insert_run(&NewRun {
                    agent: agent.to_string(),
                    day: day(3),
                    part: Part::Two,
                    lang: Lang::C,
                    kind: InputKind::Sample,
                    answer: "7".to_string(),
                    time_ms: 1.5,
                    is_correct: correct,
                    error: None,
                })
                .unwrap();
        }
        let runs = store.recent_runs(Some(day(3)), 2).unwrap();
        let agents: Vec<_> = runs.iter().map(|r| r.agent.as_str()).collect();
        assert_eq!(agents, vec!["charlie", "bravo"]);
        assert_eq!(runs[1].is_correct, None);
        assert_eq!(runs[0].kind, InputKind::Sample);
        assert_eq!(runs[0].lang, Lang::C);
        assert!(store.recent_runs(Some(day(4)), 10).unwrap().is_empty());
        assert_eq!(store.recent_runs(None, 10).unwrap().len(), 3);
    }

    #[test]
    fn session_stats_match_recomputed_samples() {
        let store = store();
        let samples: Vec<f64> = (1..=10).map(|n| n as f64 * 10.0).collect();
        let id = store.insert_session(&session("alpha"), &samples).unwrap();

        let stored = store.session(&id).unwrap().unwrap();
        assert_eq!(stored.runs, 10);
        assert_eq!(stored.stats.avg, 55.0);
        assert_eq!(stored.stats.min, 10.0);
        assert_eq!(stored.stats.max, 100.0);
        assert_eq!(store.session_samples(&id).unwrap(), samples);
        assert_eq!(store.recompute_session_stats(&id).unwrap(), Some(stored.stats));
    }

    #[test]
    fn session_needs_samples() {
        let store = store();
        assert!(store.insert_session(&session("alpha"), &[]).is_err());
        assert!(store.sessions(None).unwrap().is_empty());
    }

    #[test]
    fn deleting_a_session_cascades() {
        let store = store();
        let samples = [3.0, 1.0, 2.0];
        let first = store.insert_session(&session("alpha"), &samples).unwrap();
        let second = store.insert_session(&session("bravo"), &samples).unwrap();
        assert_ne!(first, second);

        let ids: Vec<_> = store.sessions(Some(day(1))).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first.clone(), second.clone()]);

        assert!(store.delete_session(&first).unwrap());
        assert!(!store.delete_session(&first).unwrap());
        assert!(store.session_samples(&first).unwrap().is_empty());
        assert_eq!(store.session_samples(&second).unwrap().len(), 3);
        assert!(store.sessions(Some(day(2))).unwrap().is_empty());
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/royale.db");
        let store = Store::open(&path).unwrap();
        store.init_schema().unwrap();
        assert!(path.is_file());
    }
}
