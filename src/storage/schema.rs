pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS days (
    id              INTEGER PRIMARY KEY CHECK (id BETWEEN 0 AND 25),
    part1_text      TEXT,
    part2_text      TEXT,
    sample_input    TEXT,
    sample_answer1  TEXT,
    sample_answer2  TEXT,
    answer1         TEXT,
    answer2         TEXT,
    published_at    TEXT
);

CREATE TABLE IF NOT EXISTS runs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    agent       TEXT NOT NULL,
    day         INTEGER NOT NULL REFERENCES days(id),
    part        INTEGER NOT NULL CHECK (part IN (1, 2)),
    lang        TEXT NOT NULL,
    answer      TEXT NOT NULL,
    time_ms     REAL NOT NULL,
    is_correct  INTEGER,
    is_sample   INTEGER NOT NULL,
    error       TEXT,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_day ON runs(day, part);

CREATE TABLE IF NOT EXISTS benchmark_sessions (
    id          TEXT PRIMARY KEY,
    agent       TEXT NOT NULL,
    day         INTEGER NOT NULL REFERENCES days(id),
    part        INTEGER NOT NULL CHECK (part IN (1, 2)),
    lang        TEXT NOT NULL,
    is_sample   INTEGER NOT NULL,
    runs        INTEGER NOT NULL,
    answer      TEXT NOT NULL,
    is_correct  INTEGER,
    avg_ms      REAL NOT NULL,
    min_ms      REAL NOT NULL,
    max_ms      REAL NOT NULL,
    stddev_ms   REAL NOT NULL,
    p50_ms      REAL NOT NULL,
    p95_ms      REAL NOT NULL,
    p99_ms      REAL NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_day ON benchmark_sessions(day, part, lang);

CREATE TABLE IF NOT EXISTS benchmark_runs (
    session_id  TEXT NOT NULL REFERENCES benchmark_sessions(id) ON DELETE CASCADE,
    run_index   INTEGER NOT NULL,
    time_ms     REAL NOT NULL,
    PRIMARY KEY (session_id, run_index)
);
"#;
