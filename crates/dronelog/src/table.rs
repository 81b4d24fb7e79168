//! The untyped tabular shape held by the remote store.
//!
//! The store knows nothing beyond column names and string cells. This module
//! is the only place where those rows are turned into [`FlightRecord`]s and
//! back, so the rest of the crate works with typed records.

use chrono::{NaiveDate, NaiveTime};
use tracing::warn;

use crate::error::{Error, Result};
use crate::record::{build_record, Aircraft, FlightRecord, RawFlightInput};

/// Flight date, `YYYY-MM-DD`.
pub const COL_DATE: &str = "Fecha";
/// Pilot name.
pub const COL_PILOT: &str = "Piloto";
/// Aircraft label.
pub const COL_AIRCRAFT: &str = "Aeronave";
/// Location.
pub const COL_LOCATION: &str = "Lugar";
/// Takeoff time, `HH:MM`.
pub const COL_TAKEOFF: &str = "Despegue";
/// Landing time, `HH:MM`.
pub const COL_LANDING: &str = "Aterrizaje";
/// Elapsed time, `H:MM:SS`.
pub const COL_DURATION: &str = "Duracion";
/// Battery at takeoff.
pub const COL_BATTERY_START: &str = "Bat_Ini";
/// Battery at landing.
pub const COL_BATTERY_END: &str = "Bat_Fin";
/// Observations.
pub const COL_NOTES: &str = "Observaciones";

/// The fixed column header of the flight table, in order.
pub const COLUMNS: [&str; 10] = [
    COL_DATE,
    COL_PILOT,
    COL_AIRCRAFT,
    COL_LOCATION,
    COL_TAKEOFF,
    COL_LANDING,
    COL_DURATION,
    COL_BATTERY_START,
    COL_BATTERY_END,
    COL_NOTES,
];

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// A rectangular grid of string cells under a named header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Column names.
    pub header: Vec<String>,
    /// Data rows, each ideally `header.len()` cells long.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// The cell at `row` under column `name`, if both exist.
    #[must_use]
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column_index(name)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Index of the first row whose length differs from the header's.
    #[must_use]
    pub fn first_ragged_row(&self) -> Option<usize> {
        let width = self.header.len();
        self.rows.iter().position(|row| row.len() != width)
    }

    /// Append a record as a new last row.
    ///
    /// Columns the record needs but the header lacks are added at the end,
    /// with existing rows padded by empty cells. Columns the record does not
    /// know about get an empty cell in the new row. Nothing else about the
    /// existing rows changes.
    pub fn append_record(&mut self, record: &FlightRecord) {
        for name in COLUMNS {
            if self.column_index(name).is_none() {
                self.header.push(name.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
            }
        }

        let values = record.to_row();
        let mut row = vec![String::new(); self.header.len()];
        for (name, value) in COLUMNS.iter().zip(values) {
            if let Some(col) = self.column_index(name) {
                if let Some(slot) = row.get_mut(col) {
                    *slot = value;
                }
            }
        }
        self.rows.push(row);
    }
}

impl FlightRecord {
    /// Cells for this record, in [`COLUMNS`] order.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date().format(DATE_FORMAT).to_string(),
            self.pilot().to_string(),
            self.aircraft().label().to_string(),
            self.location().to_string(),
            self.takeoff_time().format(TIME_FORMAT).to_string(),
            self.landing_time().format(TIME_FORMAT).to_string(),
            self.duration().to_string(),
            self.battery_start().to_string(),
            self.battery_end().to_string(),
            self.notes().to_string(),
        ]
    }

    /// Read row `index` of `table` back into a record.
    ///
    /// Cells are located by column name. The stored duration is ignored and
    /// recomputed from the two times; a stored row has to pass the same
    /// checks as a freshly submitted form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRow`] if a required column is absent or a
    /// cell does not parse.
    pub fn from_row(table: &Table, index: usize) -> Result<Self> {
        let date_text = required(table, index, COL_DATE)?;
        let date = NaiveDate::parse_from_str(date_text.trim(), DATE_FORMAT)
            .map_err(|e| Error::malformed_row(index, format!("date {date_text:?}: {e}")))?;

        let aircraft_text = required(table, index, COL_AIRCRAFT)?;
        let aircraft = Aircraft::from_label(aircraft_text).unwrap_or_else(|| {
            warn!(
                "Unknown aircraft {:?} in row {}, treating as {}",
                aircraft_text,
                index,
                Aircraft::Other
            );
            Aircraft::Other
        });

        let raw = RawFlightInput {
            date,
            pilot: required(table, index, COL_PILOT)?.to_string(),
            aircraft,
            location: required(table, index, COL_LOCATION)?.to_string(),
            takeoff_time: parse_time(index, required(table, index, COL_TAKEOFF)?)?,
            landing_time: parse_time(index, required(table, index, COL_LANDING)?)?,
            battery_start: parse_battery(index, required(table, index, COL_BATTERY_START)?)?,
            battery_end: parse_battery(index, required(table, index, COL_BATTERY_END)?)?,
            notes: table
                .cell(index, COL_NOTES)
                .map(ToString::to_string)
                .unwrap_or_default(),
        };

        build_record(&raw).map_err(|e| Error::malformed_row(index, e.to_string()))
    }
}

fn required<'a>(table: &'a Table, index: usize, name: &str) -> Result<&'a str> {
    table
        .cell(index, name)
        .ok_or_else(|| Error::malformed_row(index, format!("no value for column {name}")))
}

fn parse_time(index: usize, text: &str) -> Result<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .map_err(|e| Error::malformed_row(index, format!("time {text:?}: {e}")))
}

fn parse_battery(index: usize, text: &str) -> Result<u8> {
    let text = text.trim();
    // Spreadsheet tools like to turn integer columns into floats.
    let digits = text.strip_suffix(".0").unwrap_or(text);
    match digits.parse::<u8>() {
        Ok(value) if value <= 100 => Ok(value),
        _ => Err(Error::malformed_row(
            index,
            format!("battery {text:?} is not a percentage"),
        )),
    }
}

/// The flight records held in the remote table, in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightLog {
    records: Vec<FlightRecord>,
    skipped: usize,
}

impl FlightLog {
    /// Convert every row of `table`, skipping rows that are not valid records.
    #[must_use]
    pub fn from_table(table: &Table) -> Self {
        let mut records = Vec::with_capacity(table.len());
        let mut skipped = 0;

        for index in 0..table.len() {
            match FlightRecord::from_row(table, index) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping stored row: {}", e);
                    skipped += 1;
                }
            }
        }

        Self { records, skipped }
    }

    /// Records in store order.
    #[must_use]
    pub fn records(&self) -> &[FlightRecord] {
        &self.records
    }

    /// Records with the most recently appended first.
    #[must_use]
    pub fn newest_first(&self) -> Vec<&FlightRecord> {
        self.records.iter().rev().collect()
    }

    /// Number of readable records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no readable records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows that could not be read as records.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
