//! SQL schema for the pulse SQLite queue.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- The durable queue. Rows are appended by the sampling tick and removed only
-- by an atomic drain; `sample_id` is the insertion (= collection) order.
CREATE TABLE IF NOT EXISTS samples (
    sample_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    time          TEXT NOT NULL,    -- local wall-clock, 'YYYY-MM-DD HH:MM:SS.ffff'
    location      TEXT,             -- 'lat lon' or NULL when no fix
    heartrate     INTEGER NOT NULL DEFAULT 0,
    stepcount     INTEGER NOT NULL DEFAULT 0,
    acceleration  TEXT,             -- 'x:.. y:.. z:..' or NULL when unavailable
    gyro          TEXT,
    magnetometer  TEXT,
    battery       REAL,             -- [0,1] or NULL
    activeenergy  REAL NOT NULL DEFAULT 0,
    restingenergy REAL NOT NULL DEFAULT 0,
    participantid TEXT NOT NULL DEFAULT '',
    sittingtime   INTEGER NOT NULL DEFAULT 0
);

-- Participant identifier records. Append-only history; reads take the
-- newest row.
CREATE TABLE IF NOT EXISTS participants (
    record_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    participant TEXT NOT NULL,
    written_at  TEXT NOT NULL       -- ISO 8601 UTC
);

PRAGMA user_version = 1;
";
