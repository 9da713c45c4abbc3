//! Operator CLI binary: `branch`, `merge`, `outbox`, `consumer`, `compact`.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, TopCommand};
use oms_core::timestamp::Timestamp;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let now = Timestamp::now();

    let result = match cli.command {
        TopCommand::Branch { action } => commands::run_branch(action, now),
        TopCommand::Merge { action } => commands::run_merge(action, now),
        TopCommand::Outbox { action } => commands::run_outbox(action, now),
        TopCommand::Consumer { action } => commands::run_consumer(action, now),
        TopCommand::Compact { action } => commands::run_compact(action),
    };

    match result {
        Ok(value) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&value).unwrap());
            } else {
                println!("{}", value);
            }
        }
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(1);
        }
    }
}
