//! `dronelog` - A drone flight logbook kept in a shared table
//!
//! This library turns flight entry form values into validated flight records,
//! appends them to a shared remote table with a read-modify-write cycle, and
//! reads the table back for the history view.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod record;
pub mod store;
pub mod sync;
pub mod table;

pub use config::Config;
pub use error::{Error, Result, ValidationError};
pub use history::HistoryView;
pub use logging::init_logging;
pub use record::{build_record, Aircraft, FlightRecord, RawFlightInput};
pub use store::{open_store, TableStore};
pub use sync::Synchronizer;
pub use table::{FlightLog, Table};
