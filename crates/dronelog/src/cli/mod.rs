//! Command-line interface for dronelog.
//!
//! This module provides the CLI structure for the `dronelog` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{AircraftArg, ConfigCommand, HistoryCommand, LogCommand, OutputFormat};

/// dronelog - Drone flight logbook
///
/// Records drone flights into a shared flight table and shows the
/// accumulated history.
#[derive(Debug, Parser)]
#[command(name = "dronelog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a flight
    Log(LogCommand),

    /// Show logged flights
    History(HistoryCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                2 => crate::logging::Verbosity::Debug,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;
    use chrono::{NaiveDate, NaiveTime};
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "dronelog");
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["dronelog", "history"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["dronelog", "-v", "history"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["dronelog", "-vv", "history"]).verbosity(), Verbosity::Debug);
        assert_eq!(parse(&["dronelog", "-vvv", "history"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["dronelog", "-q", "history"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_log_with_defaults() {
        let cli = parse(&[
            "dronelog",
            "log",
            "--pilot",
            "Juan Pérez",
            "--location",
            "Sector Norte",
            "--takeoff",
            "08:00",
            "--landing",
            "08:47",
        ]);

        let Command::Log(cmd) = cli.command else {
            panic!("expected log command");
        };
        assert_eq!(cmd.date, None);
        assert_eq!(cmd.aircraft, AircraftArg::Mavic3E);
        assert_eq!(cmd.takeoff, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(cmd.landing, NaiveTime::from_hms_opt(8, 47, 0).unwrap());
        assert_eq!(cmd.battery_start, 100);
        assert_eq!(cmd.battery_end, 25);
        assert!(cmd.notes.is_empty());
    }

    #[test]
    fn test_parse_log_full_form() {
        let cli = parse(&[
            "dronelog",
            "log",
            "-d",
            "2024-05-01",
            "-p",
            "Ana",
            "-a",
            "matrice-300",
            "-l",
            "Puerto",
            "-t",
            "09:00",
            "-L",
            "09:30",
            "--battery-start",
            "90",
            "--battery-end",
            "0",
            "-n",
            "inspección de línea",
        ]);

        let Command::Log(cmd) = cli.command else {
            panic!("expected log command");
        };
        assert_eq!(cmd.date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(cmd.aircraft, AircraftArg::Matrice300);
        assert_eq!(cmd.battery_start, 90);
        assert_eq!(cmd.battery_end, 0);
        assert_eq!(cmd.notes, "inspección de línea");
    }

    #[test]
    fn test_battery_outside_range_is_refused() {
        let result = Cli::try_parse_from([
            "dronelog",
            "log",
            "--pilot",
            "Ana",
            "--location",
            "Puerto",
            "--takeoff",
            "09:00",
            "--landing",
            "09:30",
            "--battery-start",
            "101",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_time_is_refused() {
        let result = Cli::try_parse_from([
            "dronelog",
            "log",
            "--pilot",
            "Ana",
            "--location",
            "Puerto",
            "--takeoff",
            "nine",
            "--landing",
            "09:30",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_history() {
        let cli = parse(&["dronelog", "history", "--oldest-first", "--format", "json"]);
        let Command::History(cmd) = cli.command else {
            panic!("expected history command");
        };
        assert!(cmd.oldest_first);
        assert_eq!(cmd.format, OutputFormat::Json);
    }

    #[test]
    fn test_history_order_flags_conflict() {
        let result =
            Cli::try_parse_from(["dronelog", "history", "--newest-first", "--oldest-first"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["dronelog", "-c", "/custom/config.toml", "history"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = parse(&["dronelog", "config", "validate", "--file", "/tmp/x.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }
}
