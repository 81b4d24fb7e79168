//! Remote table backends.
//!
//! The logbook treats its backing store as an opaque tabular resource with
//! exactly two operations: read the whole table, and overwrite the whole
//! table. Backends implement [`TableStore`]; the synchronizer owns the
//! read-modify-write protocol on top of it.

mod memory;
pub mod migrations;
pub mod schema;
mod sqlite;

use std::collections::HashSet;
use std::time::Instant;

use thiserror::Error;

use crate::config::{Config, StoreBackend};
use crate::table::Table;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Failures reported by a table backend.
///
/// The message is shown to the user as-is, so backends should put the
/// underlying diagnostic text in it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or failed while serving the request.
    #[error("{0}")]
    Unavailable(String),

    /// The store refused the data it was given.
    #[error("{0}")]
    Rejected(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// A tabular resource that can be read and overwritten as a whole.
///
/// Implementations hold no cache: every `read` reflects the store's current
/// contents, and every `update` replaces them entirely.
#[async_trait::async_trait]
pub trait TableStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Fetch the full current table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the table cannot be fetched.
    async fn read(&self) -> Result<Table, StoreError>;

    /// Replace the full table with `table`, committing only if the write
    /// completes before `deadline`.
    ///
    /// A write that reaches its deadline is abandoned and leaves the stored
    /// table unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] if the table's shape is refused, or
    /// [`StoreError::Unavailable`] if the write could not be carried out or
    /// the deadline passed first.
    async fn update_until(
        &self,
        table: &Table,
        deadline: Option<Instant>,
    ) -> Result<(), StoreError>;

    /// Replace the full table with `table`, with no deadline.
    ///
    /// # Errors
    ///
    /// See [`TableStore::update_until`].
    async fn update(&self, table: &Table) -> Result<(), StoreError> {
        self.update_until(table, None).await
    }
}

/// Error for a write abandoned at its deadline.
pub(crate) fn deadline_passed(store: &str) -> StoreError {
    StoreError::Unavailable(format!("{store} write abandoned: deadline passed before commit"))
}

/// Reject tables a spreadsheet could not hold.
///
/// # Errors
///
/// Returns [`StoreError::Rejected`] for ragged rows or repeated column names.
pub fn check_shape(table: &Table) -> Result<(), StoreError> {
    if let Some(index) = table.first_ragged_row() {
        let cells = table.rows.get(index).map_or(0, Vec::len);
        return Err(StoreError::Rejected(format!(
            "row {index} has {cells} cells, expected {}",
            table.header.len()
        )));
    }

    let mut seen = HashSet::new();
    for name in &table.header {
        if !seen.insert(name.as_str()) {
            return Err(StoreError::Rejected(format!("duplicate column {name:?}")));
        }
    }

    Ok(())
}

/// Build the backend selected by the configuration.
#[must_use]
pub fn open_store(config: &Config) -> Box<dyn TableStore> {
    match config.store.backend {
        StoreBackend::Sqlite => Box::new(
            SqliteStore::new(config.database_path(), config.store.worksheet.clone())
                .with_busy_timeout(config.store_timeout() / 2),
        ),
        StoreBackend::Memory => Box::new(MemoryStore::new()),
    }
}
