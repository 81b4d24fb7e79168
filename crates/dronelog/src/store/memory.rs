//! In-process table backend.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::table::Table;

use super::{check_shape, deadline_passed, StoreError, TableStore};

/// A shared table living in process memory.
///
/// Clones are handles onto the same table, which makes it possible to stand
/// up several independent sessions against one "remote" table. Faults and
/// latency can be injected to exercise failure paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    table: Table,
    read_failure: Option<String>,
    write_failure: Option<String>,
    write_rejection: Option<String>,
    latency: Option<Duration>,
    writes: usize,
}

impl MemoryStore {
    /// Create a store holding an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with `table`.
    #[must_use]
    pub fn with_table(table: Table) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.inner.lock() {
            state.table = table;
        }
        store
    }

    /// A copy of the table as it stands now.
    #[must_use]
    pub fn snapshot(&self) -> Table {
        self.lock()
            .map(|state| state.table.clone())
            .unwrap_or_default()
    }

    /// Number of successful `update` calls so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().map(|state| state.writes).unwrap_or_default()
    }

    /// Make every subsequent read fail with `message`.
    pub fn fail_reads(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.lock() {
            state.read_failure = Some(message.into());
        }
    }

    /// Make every subsequent write fail with `message`.
    pub fn fail_writes(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.lock() {
            state.write_failure = Some(message.into());
        }
    }

    /// Make every subsequent write be refused with `message`.
    pub fn reject_writes(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.lock() {
            state.write_rejection = Some(message.into());
        }
    }

    /// Delay every operation by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut state) = self.lock() {
            state.latency = latency;
        }
    }

    /// Remove all injected faults and latency.
    pub fn clear_faults(&self) {
        if let Ok(mut state) = self.lock() {
            state.read_failure = None;
            state.write_failure = None;
            state.write_rejection = None;
            state.latency = None;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    async fn delay(&self) -> Result<(), StoreError> {
        let latency = self.lock()?.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TableStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self) -> Result<Table, StoreError> {
        self.delay().await?;
        let state = self.lock()?;
        if let Some(message) = &state.read_failure {
            return Err(StoreError::Unavailable(message.clone()));
        }
        Ok(state.table.clone())
    }

    async fn update_until(
        &self,
        table: &Table,
        deadline: Option<Instant>,
    ) -> Result<(), StoreError> {
        self.delay().await?;
        let mut state = self.lock()?;
        if let Some(message) = &state.write_failure {
            return Err(StoreError::Unavailable(message.clone()));
        }
        if let Some(message) = &state.write_rejection {
            return Err(StoreError::Rejected(message.clone()));
        }
        check_shape(table)?;
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(deadline_passed(self.name()));
        }
        state.table = table.clone();
        state.writes += 1;
        Ok(())
    }
}
