//! Shared-file table backend on `SQLite`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::table::Table;

use super::{check_shape, deadline_passed, migrations, StoreError, TableStore};

/// How long a connection waits on a lock held by another writer.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One named worksheet inside an `SQLite` file.
///
/// Every operation opens its own connection on a blocking worker and closes
/// it when done; no connection outlives a single read or update.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    worksheet: String,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Address `worksheet` in the file at `path`.
    ///
    /// Nothing is opened until the first read or update.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, worksheet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            worksheet: worksheet.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Set how long to wait for another connection's lock.
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the worksheet this store reads and writes.
    #[must_use]
    pub fn worksheet(&self) -> &str {
        &self.worksheet
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!(
                        "failed to create directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        debug!("Opening table file at {}", self.path.display());
        let conn = Connection::open(&self.path).map_err(|e| {
            StoreError::Unavailable(format!(
                "failed to open table file {}: {e}",
                self.path.display()
            ))
        })?;

        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&conn)?;

        Ok(conn)
    }

    fn read_blocking(&self) -> Result<Table, StoreError> {
        let conn = self.connect()?;

        let header: Option<String> = conn
            .query_row(
                "SELECT header FROM worksheets WHERE name = ?1",
                [&self.worksheet],
                |row| row.get(0),
            )
            .optional()?;

        let Some(header) = header else {
            debug!("Worksheet {} does not exist yet", self.worksheet);
            return Ok(Table::default());
        };
        let header: Vec<String> = serde_json::from_str(&header).map_err(|e| {
            StoreError::Unavailable(format!(
                "corrupt header in worksheet {}: {e}",
                self.worksheet
            ))
        })?;

        let mut stmt = conn.prepare(
            "SELECT position, cells FROM worksheet_rows WHERE worksheet = ?1 ORDER BY position",
        )?;
        let stored = stmt
            .query_map([&self.worksheet], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(stored.len());
        for (position, cells) in stored {
            let row: Vec<String> = serde_json::from_str(&cells).map_err(|e| {
                StoreError::Unavailable(format!(
                    "corrupt row {position} in worksheet {}: {e}",
                    self.worksheet
                ))
            })?;
            rows.push(row);
        }

        debug!(
            "Read {} rows from worksheet {}",
            rows.len(),
            self.worksheet
        );
        Ok(Table { header, rows })
    }

    fn update_blocking(
        &self,
        table: &Table,
        deadline: Option<Instant>,
    ) -> Result<(), StoreError> {
        check_shape(table)?;

        let header = serde_json::to_string(&table.header)
            .map_err(|e| StoreError::Rejected(format!("header cannot be encoded: {e}")))?;
        let mut encoded = Vec::with_capacity(table.rows.len());
        for (position, row) in table.rows.iter().enumerate() {
            let cells = serde_json::to_string(row).map_err(|e| {
                StoreError::Rejected(format!("row {position} cannot be encoded: {e}"))
            })?;
            let position = i64::try_from(position)
                .map_err(|_| StoreError::Rejected("too many rows".to_string()))?;
            encoded.push((position, cells));
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute(
            r"
            INSERT INTO worksheets (name, header, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE
                SET header = excluded.header, updated_at = excluded.updated_at
            ",
            params![self.worksheet, header, Utc::now().to_rfc3339()],
        )?;
        tx.execute(
            "DELETE FROM worksheet_rows WHERE worksheet = ?1",
            [&self.worksheet],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO worksheet_rows (worksheet, position, cells) VALUES (?1, ?2, ?3)",
            )?;
            for (position, cells) in &encoded {
                stmt.execute(params![self.worksheet, position, cells])?;
            }
        }

        // Past the deadline the caller has already reported a failure.
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            tx.rollback()?;
            debug!("Abandoned write to worksheet {}", self.worksheet);
            return Err(deadline_passed(self.name()));
        }
        tx.commit()?;

        debug!(
            "Wrote {} rows to worksheet {}",
            encoded.len(),
            self.worksheet
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl TableStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn read(&self) -> Result<Table, StoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.read_blocking())
            .await
            .map_err(|e| StoreError::Unavailable(format!("table read task failed: {e}")))?
    }

    async fn update_until(
        &self,
        table: &Table,
        deadline: Option<Instant>,
    ) -> Result<(), StoreError> {
        let store = self.clone();
        let table = table.clone();
        tokio::task::spawn_blocking(move || store.update_blocking(&table, deadline))
            .await
            .map_err(|e| StoreError::Unavailable(format!("table write task failed: {e}")))?
    }
}
