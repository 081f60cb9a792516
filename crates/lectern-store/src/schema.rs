//! History database schema.

/// Append-only record log. `seq` fixes insertion order; `id` is the
/// UUID handed back to callers.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    collection TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection, seq);
"#;
