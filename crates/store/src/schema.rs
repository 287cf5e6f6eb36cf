//! SQLite schema definition and migration.

use rusqlite::Connection;
use std::time::Duration;

/// Current schema version, tracked in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Configure the connection and create tables if they don't exist.
pub fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    // In-memory databases answer "memory" here, which is fine
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(Duration::from_secs(5))?;

    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    Ok(())
}

const SCHEMA_V1: &str = "
BEGIN;

CREATE TABLE IF NOT EXISTS analyses (
    id TEXT PRIMARY KEY,
    video_path TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    error_message TEXT
);
CREATE INDEX IF NOT EXISTS idx_analyses_status ON analyses(status);
CREATE INDEX IF NOT EXISTS idx_analyses_created ON analyses(created_at);

CREATE TABLE IF NOT EXISTS classification_results (
    id TEXT PRIMARY KEY,
    analysis_id TEXT NOT NULL UNIQUE,
    is_normal INTEGER NOT NULL,
    confidence REAL NOT NULL CHECK (confidence >= 0.0 AND confidence <= 1.0),
    conditions TEXT NOT NULL DEFAULT '[]',
    explanation TEXT NOT NULL DEFAULT '',
    feature_importance TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    FOREIGN KEY (analysis_id) REFERENCES analyses(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_classification_analysis ON classification_results(analysis_id);

CREATE TABLE IF NOT EXISTS training_datasets (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS training_samples (
    id TEXT PRIMARY KEY,
    dataset_id TEXT NOT NULL,
    features TEXT NOT NULL,
    label TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    FOREIGN KEY (dataset_id) REFERENCES training_datasets(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_samples_dataset ON training_samples(dataset_id);
CREATE INDEX IF NOT EXISTS idx_samples_label ON training_samples(label);

CREATE TABLE IF NOT EXISTS pose_analysis_results (
    id TEXT PRIMARY KEY,
    dataset_id TEXT NOT NULL,
    sequence_id TEXT NOT NULL,
    analysis_blob TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_pose_dataset_sequence
    ON pose_analysis_results(dataset_id, sequence_id);
CREATE INDEX IF NOT EXISTS idx_pose_content_hash ON pose_analysis_results(content_hash);

COMMIT;
";
