//! Schema bootstrap and versioning for the `SQLite` backend.

use rusqlite::{Connection, OptionalExtension};

use super::schema::SCHEMA_STATEMENTS;
use super::StoreError;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Create all tables if needed and bring the schema to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if a statement fails or the file
/// carries a schema version this build does not know.
pub fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(StoreError::Unavailable(format!(
            "table file uses schema version {version}, \
             newer than supported version {CURRENT_VERSION}"
        )));
    }
    if version < CURRENT_VERSION {
        set_schema_version(conn, CURRENT_VERSION)?;
    }

    Ok(())
}

/// Read the recorded schema version; 0 for a fresh file.
fn get_schema_version(conn: &Connection) -> Result<i32, StoreError> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        Some(value) => value
            .parse()
            .map_err(|_| StoreError::Unavailable(format!("invalid schema version: {value}"))),
        None => Ok(0),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}
