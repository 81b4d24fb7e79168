//! Read-modify-write access to the remote flight table.
//!
//! Appending a flight re-reads the whole table, adds one row in memory and
//! writes the whole table back. There is no version check between the read
//! and the write, so two sessions appending at the same time can lose one
//! of the two new rows: whichever session writes last wins.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::FlightRecord;
use crate::store::{StoreError, TableStore};
use crate::table::{FlightLog, Table};

/// Handle on one remote table, scoped to a configuration.
///
/// Holds no table state between calls; every operation goes to the store.
pub struct Synchronizer {
    store: Box<dyn TableStore>,
    timeout: Duration,
}

impl fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("store", &self.store.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Synchronizer {
    /// Wrap `store`, bounding every read and write by `timeout`.
    #[must_use]
    pub fn new(store: Box<dyn TableStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// The per-operation timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the raw table as it stands in the store right now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteUnavailable`] if the read fails or times out.
    pub async fn fetch_table(&self) -> Result<Table> {
        debug!("Reading flight table from {} store", self.store.name());
        let table = self.bounded("read", self.store.read()).await?;
        debug!("Fetched {} rows", table.len());
        Ok(table)
    }

    /// Overwrite the remote table with `table`.
    ///
    /// The store is told to abandon the write a quarter of the timeout before
    /// the timeout itself expires, so a write reported as timed out never
    /// lands later.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteWriteRejected`] if the store refuses the
    /// table, or [`Error::RemoteUnavailable`] if the write fails or times out.
    pub async fn write_table(&self, table: &Table) -> Result<()> {
        debug!(
            "Writing {} rows to {} store",
            table.len(),
            self.store.name()
        );
        let deadline = Instant::now() + self.commit_window();
        self.bounded("write", self.store.update_until(table, Some(deadline)))
            .await
    }

    /// Fetch every flight currently in the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteUnavailable`] if the read fails or times out.
    pub async fn fetch_all(&self) -> Result<FlightLog> {
        let table = self.fetch_table().await?;
        Ok(FlightLog::from_table(&table))
    }

    /// Append `record` to the remote table.
    ///
    /// Reads the full table, appends the record as its last row and writes
    /// the full table back. Calling this twice with the same record yields
    /// two rows. Returns the row count after the write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteUnavailable`] if either step fails or times
    /// out, or [`Error::RemoteWriteRejected`] if the store refuses the write.
    /// Nothing is retried.
    pub async fn append(&self, record: &FlightRecord) -> Result<usize> {
        let mut table = self.fetch_table().await?;
        table.append_record(record);
        self.write_table(&table).await?;

        info!(
            "Logged flight by {} on {} ({}), table now has {} rows",
            record.pilot(),
            record.date(),
            record.duration(),
            table.len()
        );
        Ok(table.len())
    }

    fn commit_window(&self) -> Duration {
        self.timeout - self.timeout / 4
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = std::result::Result<T, StoreError>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(StoreError::Unavailable(message))) => Err(Error::remote_unavailable(message)),
            Ok(Err(StoreError::Rejected(message))) => Err(Error::remote_write_rejected(message)),
            Err(_) => Err(Error::remote_unavailable(format!(
                "{} {operation} timed out after {:?}",
                self.store.name(),
                self.timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    use crate::record::{build_record, Aircraft, RawFlightInput};
    use crate::store::{MemoryStore, SqliteStore};
    use crate::table::{COLUMNS, COL_PILOT};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn record(pilot: &str) -> FlightRecord {
        build_record(&RawFlightInput {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            pilot: pilot.to_string(),
            aircraft: Aircraft::Mavic3E,
            location: "Sector Norte".to_string(),
            takeoff_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            landing_time: NaiveTime::from_hms_opt(8, 47, 0).unwrap(),
            battery_start: 100,
            battery_end: 25,
            notes: String::new(),
        })
        .unwrap()
    }

    fn session(store: &MemoryStore) -> Synchronizer {
        Synchronizer::new(Box::new(store.clone()), TIMEOUT)
    }

    fn seeded_store() -> MemoryStore {
        let mut table = Table::default();
        table.append_record(&record("Seed"));
        MemoryStore::with_table(table)
    }

    #[tokio::test]
    async fn test_fetch_all_on_empty_table() {
        let store = MemoryStore::new();
        let log = session(&store).fetch_all().await.unwrap();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_append_adds_exactly_one_row_each_call() {
        let store = MemoryStore::new();
        let sync = session(&store);
        let flight = record("Juan Pérez");

        assert_eq!(sync.append(&flight).await.unwrap(), 1);
        assert_eq!(sync.append(&flight).await.unwrap(), 2);
        assert_eq!(sync.append(&flight).await.unwrap(), 3);

        let log = sync.fetch_all().await.unwrap();
        assert_eq!(log.len(), 3);
        assert!(log.records().iter().all(|r| r == &flight));
    }

    #[tokio::test]
    async fn test_append_keeps_existing_rows_in_order() {
        let store = seeded_store();
        let sync = session(&store);

        sync.append(&record("Ana")).await.unwrap();

        let table = store.snapshot();
        assert_eq!(table.header.len(), COLUMNS.len());
        assert_eq!(table.cell(0, COL_PILOT), Some("Seed"));
        assert_eq!(table.cell(1, COL_PILOT), Some("Ana"));
    }

    #[tokio::test]
    async fn test_interleaved_appends_lose_the_first_write() {
        let store = seeded_store();
        let a = session(&store);
        let b = session(&store);

        let mut a_table = a.fetch_table().await.unwrap();
        let mut b_table = b.fetch_table().await.unwrap();
        a_table.append_record(&record("A"));
        a.write_table(&a_table).await.unwrap();
        b_table.append_record(&record("B"));
        b.write_table(&b_table).await.unwrap();

        let log = a.fetch_all().await.unwrap();
        let pilots: Vec<&str> = log.records().iter().map(FlightRecord::pilot).collect();
        assert_eq!(pilots, vec!["Seed", "B"]);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_sequential_sessions_over_shared_file() {
        let path = std::env::temp_dir().join(format!(
            "dronelog_test_sync_{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let first = Synchronizer::new(Box::new(SqliteStore::new(&path, "flights")), TIMEOUT);
        let second = Synchronizer::new(Box::new(SqliteStore::new(&path, "flights")), TIMEOUT);

        assert_eq!(first.append(&record("Ana")).await.unwrap(), 1);
        assert_eq!(second.append(&record("Luis")).await.unwrap(), 2);

        let log = first.fetch_all().await.unwrap();
        let pilots: Vec<&str> = log.records().iter().map(FlightRecord::pilot).collect();
        assert_eq!(pilots, vec!["Ana", "Luis"]);
        assert_eq!(log.records()[1].duration().to_string(), "0:47:00");

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }

    #[tokio::test]
    async fn test_timed_out_append_never_lands() {
        let path = std::env::temp_dir().join(format!(
            "dronelog_test_sync_locked_{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let store = SqliteStore::new(&path, "flights").with_busy_timeout(Duration::from_secs(5));
        let sync = Synchronizer::new(Box::new(store.clone()), Duration::from_secs(1));
        sync.append(&record("Seed")).await.unwrap();

        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let lock_path = path.clone();
        let locker = std::thread::spawn(move || {
            let conn = rusqlite::Connection::open(&lock_path).unwrap();
            conn.execute_batch("BEGIN IMMEDIATE").unwrap();
            locked_tx.send(()).unwrap();
            std::thread::sleep(Duration::from_secs(2));
            conn.execute_batch("COMMIT").unwrap();
        });
        locked_rx.recv().unwrap();

        let err = sync.append(&record("Ana")).await.unwrap_err();
        assert!(matches!(err, Error::RemoteUnavailable { .. }));
        assert!(err.to_string().contains("timed out"));

        // Let the abandoned write finish waiting on the lock.
        locker.join().unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let log = sync.fetch_all().await.unwrap();
        let pilots: Vec<&str> = log.records().iter().map(FlightRecord::pilot).collect();
        assert_eq!(pilots, vec!["Seed"]);

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }

    #[test]
    fn test_commit_window_is_inside_timeout() {
        let sync = Synchronizer::new(Box::new(MemoryStore::new()), Duration::from_secs(8));
        assert_eq!(sync.commit_window(), Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_read_failure_surfaces_verbatim() {
        let store = MemoryStore::new();
        store.fail_reads("401 Unauthorized: token expired");
        let sync = session(&store);

        let err = sync.append(&record("Ana")).await.unwrap_err();
        match err {
            Error::RemoteUnavailable { message } => {
                assert_eq!(message, "401 Unauthorized: token expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_surfaces_verbatim() {
        let store = seeded_store();
        store.fail_writes("connection reset");
        let sync = session(&store);

        let err = sync.append(&record("Ana")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::RemoteUnavailable { ref message } if message == "connection reset"
        ));
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_write() {
        let store = MemoryStore::new();
        store.reject_writes("range is protected");
        let sync = session(&store);

        let err = sync.append(&record("Ana")).await.unwrap_err();
        assert!(matches!(err, Error::RemoteWriteRejected { .. }));
        assert!(err.to_string().contains("range is protected"));
    }

    #[tokio::test]
    async fn test_ragged_table_write_is_rejected() {
        let store = MemoryStore::new();
        let sync = session(&store);
        let table = Table {
            header: vec!["Fecha".to_string()],
            rows: vec![vec![]],
        };

        let err = sync.write_table(&table).await.unwrap_err();
        assert!(matches!(err, Error::RemoteWriteRejected { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out_as_unavailable() {
        let store = MemoryStore::new();
        store.set_latency(Some(Duration::from_secs(60)));
        let sync = Synchronizer::new(Box::new(store.clone()), Duration::from_secs(1));

        let err = sync.fetch_all().await.unwrap_err();
        assert!(matches!(err, Error::RemoteUnavailable { .. }));
        assert!(err.to_string().contains("timed out"));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_debug_names_store() {
        let sync = session(&MemoryStore::new());
        let debug_str = format!("{sync:?}");
        assert!(debug_str.contains("memory"));
        assert_eq!(sync.timeout(), TIMEOUT);
    }
}
