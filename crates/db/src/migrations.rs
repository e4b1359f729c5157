/// Inline SQL migrations for the job record store.
///
/// Timestamps are Unix milliseconds. `segments` holds a JSON array.
pub const MIGRATIONS: &[&str] = &[
    // Migration 1: transcription_jobs table
    r#"
CREATE TABLE IF NOT EXISTS transcription_jobs (
    id            TEXT PRIMARY KEY,
    owner_id      INTEGER NOT NULL,
    file_name     TEXT NOT NULL,
    file_path     TEXT NOT NULL,
    file_size     INTEGER NOT NULL,
    duration      REAL,
    status        TEXT NOT NULL DEFAULT 'queued'
                  CHECK (status IN ('queued', 'processing', 'done', 'failed', 'cancelled')),
    text          TEXT,
    segments      TEXT,
    error_message TEXT,
    created_at    INTEGER NOT NULL,
    completed_at  INTEGER,
    updated_at    INTEGER NOT NULL
);
"#,
    // Migration 2: listing index (owner, newest first)
    r#"
CREATE INDEX IF NOT EXISTS idx_jobs_owner_created ON transcription_jobs(owner_id, created_at DESC);
"#,
    // Migration 3: status index
    r#"
CREATE INDEX IF NOT EXISTS idx_jobs_status ON transcription_jobs(status);
"#,
];
