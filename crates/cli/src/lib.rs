pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "storefront",
    about = "Storefront assistant operator CLI",
    long_about = "Inspect configuration, check backend readiness, list the live catalog, and try the product-card enhancer.",
    after_help = "Examples:\n  storefront doctor --json\n  storefront config\n  storefront enhance '<h3>Blue Mug</h3>'"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Validate config, catalog connectivity, and note storage")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Print the live product catalog as the agent sees it")]
    Catalog,
    #[command(about = "Run the product-card enhancer on a message against the live catalog")]
    Enhance {
        #[arg(help = "Assistant message text to enhance")]
        text: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Config => commands::config::run(),
        Command::Catalog => commands::catalog::run(),
        Command::Enhance { text } => commands::enhance::run(&text),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
