use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rowdb::{Database, Row};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Runs a SQL script against a fresh in-memory database and prints the rows
/// produced by every statement, tab-separated.
#[derive(Parser, Debug)]
#[command(name = "rowdb", version, about = "Run SQL scripts against an in-memory rowdb")]
struct Cli {
    /// SQL script to run; read from stdin when omitted
    #[arg(value_name = "FILE", conflicts_with = "command")]
    script: Option<PathBuf>,

    /// Run a single SQL string instead of a script file
    #[arg(short = 'c', long)]
    command: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let sql = read_sql(&cli)?;

    let mut db = Database::new();
    let results = db.script(&sql).context("script failed")?;
    info!(statements = results.len(), "script finished");

    for rows in results.iter().filter(|rows| !rows.is_empty()) {
        for row in rows {
            println!("{}", format_row(row));
        }
        println!();
    }
    Ok(())
}

fn read_sql(cli: &Cli) -> Result<String> {
    if let Some(command) = &cli.command {
        return Ok(command.clone());
    }
    match &cli.script {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut sql = String::new();
            io::stdin()
                .read_to_string(&mut sql)
                .context("failed to read stdin")?;
            Ok(sql)
        }
    }
}

fn format_row(row: &Row) -> String {
    row.values()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\t")
}
