// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use daylog::config::{apply_env_overrides, load_config_with_env, DaylogConfig, LoggingConfig};
use daylog::{DatedDirectory, LogQuery, LogService, SystemClock};

/// daylog - batch application logs into per-day SQLite files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Storage base path (overrides config file)
    #[arg(long)]
    base_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read `board<TAB>system<TAB>module<TAB>log` lines from stdin and persist them
    Ingest,

    /// Print the stored lines for a board/system/module
    Query {
        #[arg(short, long)]
        board: String,

        #[arg(short, long)]
        system: String,

        #[arg(short, long)]
        module: String,

        /// Day to read (YYYY-MM-DD), today if omitted
        #[arg(long, value_parser = parse_day)]
        day: Option<NaiveDate>,

        /// Print a JSON array instead of plain lines
        #[arg(long)]
        json: bool,
    },
}

fn parse_day(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("invalid day '{}': {}", value, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration, falling back to defaults when the file is absent
    let config_found = args.config.exists();
    let mut config = if config_found {
        load_config_with_env(&args.config)?
    } else {
        let mut config = DaylogConfig::default();
        apply_env_overrides(&mut config)?;
        config
    };

    // Apply CLI overrides
    if let Some(base_path) = args.base_path {
        config.storage.base_path = base_path;
    }

    init_tracing(&config.logging);
    if config_found {
        info!("Loaded configuration from: {:?}", args.config);
    } else {
        info!("No configuration at {:?}, using defaults", args.config);
    }

    match args.command {
        Command::Ingest => ingest(&config).await,
        Command::Query {
            board,
            system,
            module,
            day,
            json,
        } => query(&config, &board, &system, &module, day, json),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "compact" => builder.compact().init(),
        _ => builder.init(),
    }
}

async fn ingest(config: &DaylogConfig) -> Result<()> {
    let service = LogService::start(config)?;
    info!("Reading log records from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut accepted = 0u64;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => match parse_line(&line) {
                        Some((board, system, module, log)) => {
                            service.log(board, system, module, log);
                            accepted += 1;
                        }
                        None => warn!("Skipping malformed line: {:?}", line),
                    },
                    None => {
                        info!("End of input");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    let report = service.shutdown().await?;
    info!(
        accepted,
        final_written = report.written,
        final_lost = report.lost,
        "daylog ingest finished"
    );
    Ok(())
}

fn parse_line(line: &str) -> Option<(&str, &str, &str, &str)> {
    let mut fields = line.splitn(4, '\t');
    let board = fields.next()?;
    let system = fields.next()?;
    let module = fields.next()?;
    let log = fields.next()?;
    if board.is_empty() {
        return None;
    }
    Some((board, system, module, log))
}

fn query(
    config: &DaylogConfig,
    board: &str,
    system: &str,
    module: &str,
    day: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let clock = Arc::new(SystemClock);
    let query = LogQuery::new(
        Arc::new(DatedDirectory::new(&config.storage.base_path)),
        clock,
        config.storage.file_name.clone(),
        config.storage.table_name.clone(),
    );

    let lines = match day {
        Some(day) => query.query_day(day, board, system, module),
        None => query.query(board, system, module),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
    } else {
        for line in &lines {
            println!("{}", line);
        }
    }

    Ok(())
}
