//! `SQLite` schema for the shared-file table backend.
//!
//! A file can hold several named worksheets. Each worksheet keeps its header
//! as a JSON array of column names, and each row as a JSON array of cells.

/// SQL statement to create the worksheets table.
pub const CREATE_WORKSHEETS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS worksheets (
    name TEXT PRIMARY KEY,
    header TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the worksheet rows table.
pub const CREATE_ROWS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS worksheet_rows (
    worksheet TEXT NOT NULL REFERENCES worksheets(name) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    cells TEXT NOT NULL,
    PRIMARY KEY (worksheet, position)
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_WORKSHEETS_TABLE,
    CREATE_ROWS_TABLE,
    CREATE_METADATA_TABLE,
];
