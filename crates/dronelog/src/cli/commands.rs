//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Subcommand, ValueEnum};

use crate::record::{Aircraft, RawFlightInput};

/// Log command arguments: the flight entry form.
#[derive(Debug, Args)]
pub struct LogCommand {
    /// Flight date, YYYY-MM-DD (defaults to today)
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Pilot name
    #[arg(short, long)]
    pub pilot: String,

    /// Aircraft model
    #[arg(short, long, value_enum, default_value = "mavic-3e")]
    pub aircraft: AircraftArg,

    /// Where the flight took place
    #[arg(short, long)]
    pub location: String,

    /// Takeoff time, HH:MM
    #[arg(short, long, value_parser = parse_time_of_day)]
    pub takeoff: NaiveTime,

    /// Landing time, HH:MM
    #[arg(short = 'L', long, value_parser = parse_time_of_day)]
    pub landing: NaiveTime,

    /// Battery charge at takeoff, percent
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub battery_start: u8,

    /// Battery charge at landing, percent
    #[arg(long, default_value_t = 25, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub battery_end: u8,

    /// Observations
    #[arg(short, long, default_value = "")]
    pub notes: String,
}

impl LogCommand {
    /// The form values, with a missing date filled in from `today`.
    #[must_use]
    pub fn to_input(&self, today: NaiveDate) -> RawFlightInput {
        RawFlightInput {
            date: self.date.unwrap_or(today),
            pilot: self.pilot.clone(),
            aircraft: self.aircraft.into(),
            location: self.location.clone(),
            takeoff_time: self.takeoff,
            landing_time: self.landing,
            battery_start: self.battery_start,
            battery_end: self.battery_end,
            notes: self.notes.clone(),
        }
    }
}

/// Accept `HH:MM` or `HH:MM:SS`.
fn parse_time_of_day(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| format!("expected HH:MM, got {value:?}"))
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// List the most recent flight first
    #[arg(long, conflicts_with = "oldest_first")]
    pub newest_first: bool,

    /// List flights in the order they were logged
    #[arg(long)]
    pub oldest_first: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl HistoryCommand {
    /// Resolve the listing order against the configured default.
    #[must_use]
    pub fn newest_first(&self, default: bool) -> bool {
        if self.newest_first {
            true
        } else if self.oldest_first {
            false
        } else {
            default
        }
    }
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Aircraft argument for the log form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AircraftArg {
    /// DJI Mavic 3E
    #[value(name = "mavic-3e")]
    Mavic3E,
    /// DJI Mini 4 Pro
    #[value(name = "mini-4-pro")]
    Mini4Pro,
    /// Matrice 300
    #[value(name = "matrice-300")]
    Matrice300,
    /// Any other aircraft
    Other,
}

impl From<AircraftArg> for Aircraft {
    fn from(arg: AircraftArg) -> Self {
        match arg {
            AircraftArg::Mavic3E => Self::Mavic3E,
            AircraftArg::Mini4Pro => Self::Mini4Pro,
            AircraftArg::Matrice300 => Self::Matrice300,
            AircraftArg::Other => Self::Other,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per flight
    Plain,
    /// Aligned table
    #[default]
    Table,
    /// JSON output
    Json,
}
