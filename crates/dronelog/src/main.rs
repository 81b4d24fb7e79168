//! `dronelog` - CLI for the drone flight logbook
//!
//! This binary provides the flight entry form (`log`) and the history view
//! (`history`) on top of the shared flight table.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::debug;

use dronelog::cli::{Cli, Command, ConfigCommand, HistoryCommand, LogCommand, OutputFormat};
use dronelog::{build_record, init_logging, open_store, Config, HistoryView, Synchronizer};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Log(log_cmd) => {
            let config = Config::load_from(cli.config)?;
            handle_log(&config, &log_cmd).await
        }
        Command::History(history_cmd) => {
            let config = Config::load_from(cli.config)?;
            handle_history(&config, &history_cmd).await
        }
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
    }
}

fn synchronizer(config: &Config) -> Synchronizer {
    debug!(
        "Using {} store at {}",
        config.store.backend,
        config.database_path().display()
    );
    Synchronizer::new(open_store(config), config.store_timeout())
}

async fn handle_log(config: &Config, cmd: &LogCommand) -> anyhow::Result<()> {
    let input = cmd.to_input(Local::now().date_naive());

    // Nothing reaches the store unless the form is valid.
    let record = build_record(&input)?;

    synchronizer(config)
        .append(&record)
        .await
        .context("Error saving flight")?;

    println!("Flight saved! Duration: {}", record.duration());
    Ok(())
}

async fn handle_history(config: &Config, cmd: &HistoryCommand) -> anyhow::Result<()> {
    let view = HistoryView::load(&synchronizer(config)).await;
    let newest_first = cmd.newest_first(config.display.newest_first);

    match cmd.format {
        OutputFormat::Plain => print!("{}", view.render_plain(newest_first)),
        OutputFormat::Table => print!("{}", view.render_table(newest_first)),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&view.to_json(newest_first))?
            );
        }
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Store]");
                println!("  Backend:            {}", config.store.backend);
                println!("  Table file:         {}", config.database_path().display());
                println!("  Worksheet:          {}", config.store.worksheet);
                println!("  Timeout (seconds):  {}", config.store.timeout_secs);
                println!();
                println!("[Display]");
                println!("  Newest first:       {}", config.display.newest_first);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path)).context("Configuration error")?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
