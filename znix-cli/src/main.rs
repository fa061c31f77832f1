use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};
use znix_core::{Config, ToolCommand};

mod error;
mod subcommands;

/// Check and format znix documents
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Formatter command line, fed the document on stdin
    #[arg(long, global = true, value_name = "COMMAND")]
    formatter: Option<ToolCommand>,

    /// Parser command line, fed the document on stdin
    #[arg(long, global = true, value_name = "COMMAND")]
    parser: Option<ToolCommand>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report structural, statement and type problems
    Check(subcommands::check::Args),
    /// Format documents through the host formatter
    Fmt(subcommands::fmt::Args),
}

impl Cli {
    fn config(&self) -> Config {
        let defaults = Config::default();
        Config {
            formatter: self.formatter.clone().unwrap_or(defaults.formatter),
            parser: self.parser.clone().unwrap_or(defaults.parser),
            ..defaults
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let clean = match &cli.command {
        Command::Check(args) => subcommands::check::run(args, &config).await?,
        Command::Fmt(args) => subcommands::fmt::run(args, &config).await?,
    };

    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
