//! Read-only history view.
//!
//! Loading the history never fails: a read error degrades to an
//! informational view instead of an error, since nothing is written here.
//! The view shows the stored table as it is, every row and every column,
//! whether or not a row would pass today's form checks.

use std::fmt::Write as _;

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::sync::Synchronizer;
use crate::table::{Table, COL_AIRCRAFT};

/// Shown when the table holds no rows.
pub const EMPTY_MESSAGE: &str = "No flights recorded yet.";

/// Summary figures shown above the history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSummary {
    /// Number of rows in the table.
    pub total: usize,
    /// `Aeronave` value of the last row in store order.
    pub last_aircraft: Option<String>,
}

impl LogSummary {
    /// Compute the figures from the raw table.
    #[must_use]
    pub fn from_table(table: &Table) -> Self {
        let last_aircraft = table
            .len()
            .checked_sub(1)
            .and_then(|last| table.cell(last, COL_AIRCRAFT))
            .map(ToString::to_string);

        Self {
            total: table.len(),
            last_aircraft,
        }
    }
}

/// What the history screen has to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryView {
    /// The table has rows.
    Records {
        /// The stored table, unchanged.
        table: Table,
        /// Figures over all rows.
        summary: LogSummary,
    },
    /// The table exists but has no rows.
    Empty,
    /// The table could not be read.
    Unavailable {
        /// Why, as reported by the store.
        message: String,
    },
}

impl HistoryView {
    /// Read the current table for display.
    pub async fn load(sync: &Synchronizer) -> Self {
        match sync.fetch_table().await {
            Ok(table) => Self::from_table(table),
            Err(e) => {
                warn!("History read failed: {}", e);
                Self::Unavailable {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Build the view for a table that was read successfully.
    #[must_use]
    pub fn from_table(table: Table) -> Self {
        if table.is_empty() {
            return Self::Empty;
        }
        let summary = LogSummary::from_table(&table);
        Self::Records { table, summary }
    }

    /// Render as a list with one line per stored row.
    #[must_use]
    pub fn render_plain(&self, newest_first: bool) -> String {
        self.render_with(newest_first, |table, rows, out| {
            for row in rows {
                let cells: Vec<&str> = (0..table.header.len())
                    .map(|column| cell_at(row, column))
                    .filter(|cell| !cell.is_empty())
                    .collect();
                let _ = writeln!(out, "{}", cells.join("  "));
            }
        })
    }

    /// Render as an aligned table under the stored header.
    #[must_use]
    pub fn render_table(&self, newest_first: bool) -> String {
        self.render_with(newest_first, |table, rows, out| {
            let mut widths: Vec<usize> = table.header.iter().map(|h| h.chars().count()).collect();
            for row in rows {
                for (column, width) in widths.iter_mut().enumerate() {
                    *width = (*width).max(cell_at(row, column).chars().count());
                }
            }

            let header: Vec<&str> = table.header.iter().map(String::as_str).collect();
            write_aligned(out, &header, &widths);
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            let rule: Vec<&str> = rule.iter().map(String::as_str).collect();
            write_aligned(out, &rule, &widths);
            for row in rows {
                let cells: Vec<&str> = (0..widths.len()).map(|c| cell_at(row, c)).collect();
                write_aligned(out, &cells, &widths);
            }
        })
    }

    /// Render as a JSON document. Each flight is an object keyed by column name.
    #[must_use]
    pub fn to_json(&self, newest_first: bool) -> Value {
        match self {
            Self::Records { table, summary } => {
                let flights: Vec<Value> = ordered_rows(table, newest_first)
                    .into_iter()
                    .map(|row| {
                        let object: Map<String, Value> = table
                            .header
                            .iter()
                            .enumerate()
                            .map(|(column, name)| {
                                (name.clone(), Value::from(cell_at(row, column)))
                            })
                            .collect();
                        Value::Object(object)
                    })
                    .collect();
                json!({
                    "status": "ok",
                    "total": summary.total,
                    "last_aircraft": summary.last_aircraft,
                    "columns": table.header,
                    "flights": flights,
                })
            }
            Self::Empty => json!({
                "status": "empty",
                "total": 0,
                "last_aircraft": null,
                "flights": [],
            }),
            Self::Unavailable { message } => json!({
                "status": "unavailable",
                "message": message,
            }),
        }
    }

    fn render_with(
        &self,
        newest_first: bool,
        body: impl FnOnce(&Table, &[&Vec<String>], &mut String),
    ) -> String {
        let mut out = String::new();
        match self {
            Self::Records { table, summary } => {
                let _ = writeln!(out, "Total flights: {}", summary.total);
                let _ = writeln!(
                    out,
                    "Last aircraft: {}",
                    summary.last_aircraft.as_deref().unwrap_or("-")
                );
                out.push('\n');
                body(table, &ordered_rows(table, newest_first), &mut out);
            }
            Self::Empty => {
                let _ = writeln!(out, "{EMPTY_MESSAGE}");
            }
            Self::Unavailable { message } => {
                let _ = writeln!(out, "History unavailable: {message}");
            }
        }
        out
    }
}

fn ordered_rows(table: &Table, newest_first: bool) -> Vec<&Vec<String>> {
    if newest_first {
        table.rows.iter().rev().collect()
    } else {
        table.rows.iter().collect()
    }
}

fn cell_at(row: &[String], column: usize) -> &str {
    row.get(column).map_or("", String::as_str)
}

fn write_aligned(out: &mut String, cells: &[&str], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use std::time::Duration;

    use crate::record::{build_record, Aircraft, FlightRecord, RawFlightInput};
    use crate::store::{MemoryStore, SqliteStore, TableStore};
    use crate::table::COLUMNS;

    fn record(pilot: &str, aircraft: Aircraft) -> FlightRecord {
        build_record(&RawFlightInput {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            pilot: pilot.to_string(),
            aircraft,
            location: "Sector Norte".to_string(),
            takeoff_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            landing_time: NaiveTime::from_hms_opt(8, 47, 0).unwrap(),
            battery_start: 100,
            battery_end: 25,
            notes: String::new(),
        })
        .unwrap()
    }

    fn two_flight_table() -> Table {
        let mut table = Table::default();
        table.append_record(&record("Ana", Aircraft::Mavic3E));
        table.append_record(&record("Luis", Aircraft::Matrice300));
        table
    }

    /// A table as an older version of the app could leave it: a zero-length
    /// flight, an extra column, and a duration that was typed by hand.
    fn legacy_table() -> Table {
        let mut header: Vec<String> = COLUMNS.iter().map(ToString::to_string).collect();
        header.push("Matricula".to_string());
        let row = |cells: [&str; 11]| -> Vec<String> {
            cells.iter().map(ToString::to_string).collect()
        };
        Table {
            header,
            rows: vec![
                row([
                    "2024-04-30", "Ana", "Otro", "Base", "09:00", "09:00", "0:00:00", "100",
                    "100", "", "EC-ABC",
                ]),
                row([
                    "2024-05-01", "Luis", "Matrice 300", "Puerto", "10:00", "10:30", "0:30",
                    "90", "40", "viento", "",
                ]),
            ],
        }
    }

    fn sync_over(store: &MemoryStore) -> Synchronizer {
        Synchronizer::new(Box::new(store.clone()), Duration::from_secs(5))
    }

    #[test]
    fn test_summary_counts_rows_and_reads_last_aircraft() {
        let summary = LogSummary::from_table(&two_flight_table());
        assert_eq!(summary.total, 2);
        assert_eq!(summary.last_aircraft.as_deref(), Some("Matrice 300"));
    }

    #[test]
    fn test_summary_of_empty_table() {
        assert_eq!(LogSummary::from_table(&Table::default()), LogSummary::default());
    }

    #[tokio::test]
    async fn test_load_empty_table_reports_no_records() {
        let view = HistoryView::load(&sync_over(&MemoryStore::new())).await;
        assert_eq!(view, HistoryView::Empty);
        assert!(view.render_plain(true).contains(EMPTY_MESSAGE));
    }

    #[tokio::test]
    async fn test_header_only_table_reports_no_records() {
        let path = std::env::temp_dir().join(format!(
            "dronelog_test_history_empty_{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let store = SqliteStore::new(&path, "flights");
        let header_only = Table {
            header: COLUMNS.iter().map(ToString::to_string).collect(),
            rows: Vec::new(),
        };
        store.update(&header_only).await.unwrap();

        let sync = Synchronizer::new(Box::new(store), Duration::from_secs(5));
        assert!(sync.fetch_all().await.unwrap().is_empty());

        let view = HistoryView::load(&sync).await;
        assert_eq!(view, HistoryView::Empty);
        assert_eq!(view.render_table(true).trim(), EMPTY_MESSAGE);
        assert_eq!(view.to_json(true)["status"], "empty");

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }

    #[tokio::test]
    async fn test_load_failure_degrades_to_message() {
        let store = MemoryStore::new();
        store.fail_reads("spreadsheet not shared with service account");

        let view = HistoryView::load(&sync_over(&store)).await;
        match &view {
            HistoryView::Unavailable { message } => {
                assert!(message.contains("spreadsheet not shared"));
            }
            other => panic!("unexpected view: {other:?}"),
        }
        assert!(view.render_table(true).starts_with("History unavailable:"));
    }

    #[tokio::test]
    async fn test_load_records() {
        let store = MemoryStore::with_table(two_flight_table());
        let view = HistoryView::load(&sync_over(&store)).await;

        match view {
            HistoryView::Records { table, summary } => {
                assert_eq!(table, two_flight_table());
                assert_eq!(summary.total, 2);
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[test]
    fn test_plain_render_orders_newest_first() {
        let view = HistoryView::from_table(two_flight_table());
        let text = view.render_plain(true);

        assert!(text.contains("Total flights: 2"));
        assert!(text.contains("Last aircraft: Matrice 300"));
        let luis = text.find("Luis").unwrap();
        let ana = text.find("Ana").unwrap();
        assert!(luis < ana);

        let text = view.render_plain(false);
        assert!(text.find("Ana").unwrap() < text.find("Luis").unwrap());
    }

    #[test]
    fn test_table_render_is_aligned() {
        let view = HistoryView::from_table(two_flight_table());
        let text = view.render_table(false);
        let lines: Vec<&str> = text.lines().collect();

        let header = lines.iter().position(|l| l.starts_with("Fecha")).unwrap();
        let pilot_column = lines[header].find("Piloto").unwrap();
        assert_eq!(lines[header + 2].find("Ana"), Some(pilot_column));
        assert_eq!(lines[header + 3].find("Luis"), Some(pilot_column));
        assert!(text.contains("0:47:00"));
        assert!(text.contains("DJI Mavic 3E"));
    }

    #[test]
    fn test_every_stored_row_and_column_is_shown() {
        let view = HistoryView::from_table(legacy_table());

        let text = view.render_table(false);
        assert!(text.contains("Matricula"));
        assert!(text.contains("EC-ABC"));
        let ana = text.lines().find(|l| l.contains("Ana")).unwrap();
        assert!(ana.contains("09:00"));
        assert!(ana.contains("0:00:00"));
        let luis = text.lines().find(|l| l.contains("Luis")).unwrap();
        assert!(luis.contains("0:30"));
        assert!(!luis.contains("0:30:00"));

        let plain = view.render_plain(false);
        assert!(plain.contains("Ana"));
        assert!(plain.contains("EC-ABC"));

        let value = view.to_json(false);
        assert_eq!(value["total"], 2);
        assert_eq!(value["flights"][0]["Piloto"], "Ana");
        assert_eq!(value["flights"][0]["Aterrizaje"], "09:00");
        assert_eq!(value["flights"][0]["Matricula"], "EC-ABC");
        assert_eq!(value["flights"][1]["Duracion"], "0:30");
    }

    #[test]
    fn test_json_render() {
        let view = HistoryView::from_table(two_flight_table());
        let value = view.to_json(true);

        assert_eq!(value["status"], "ok");
        assert_eq!(value["total"], 2);
        assert_eq!(value["last_aircraft"], "Matrice 300");
        assert_eq!(value["columns"][0], "Fecha");
        assert_eq!(value["flights"][0]["Piloto"], "Luis");

        assert_eq!(HistoryView::Empty.to_json(true)["status"], "empty");
        let unavailable = HistoryView::Unavailable {
            message: "offline".to_string(),
        };
        assert_eq!(unavailable.to_json(true)["message"], "offline");
    }
}
