pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "shiptrack",
    about = "Shiptrack operator CLI",
    long_about = "Inspect shiptrack configuration, readiness, and the rating log, and run the action smoke scenario.",
    after_help = "Examples:\n  shiptrack doctor --json\n  shiptrack config\n  shiptrack ratings --limit 5\n  shiptrack smoke"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the seeded lookup and delivery-estimate scenario with per-check timing")]
    Smoke,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, rating log writability, and summarization endpoint reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show the most recent rows of the rating log")]
    Ratings {
        #[arg(long, default_value_t = 10, help = "Number of rows to show, newest last")]
        limit: usize,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Smoke => commands::smoke::run(),
        Command::Config => commands::CommandResult::printed(commands::config::run()),
        Command::Doctor { json } => commands::CommandResult::printed(commands::doctor::run(json)),
        Command::Ratings { limit, json } => commands::ratings::run(limit, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
