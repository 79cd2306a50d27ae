//! examlens CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "examlens",
    version,
    about = "Diagnostic assessment reports and remediation practice"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and database
    Init,

    /// Score an attempt and print its diagnostic report
    Report {
        /// Attempt id
        #[arg(long)]
        attempt: String,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Also save the report as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Select a remediation practice set for an attempt
    Practice {
        /// Attempt id
        #[arg(long)]
        attempt: String,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Roll leaf mastery up a content tree
    Rollup {
        /// JSON file with a flat array of tree nodes
        #[arg(long)]
        tree: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examlens=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(config),
        Commands::Report {
            attempt,
            format,
            output,
        } => commands::report::execute(attempt, format, output, config).await,
        Commands::Practice { attempt, format } => {
            commands::practice::execute(attempt, format, config).await
        }
        Commands::Rollup { tree, format } => commands::rollup::execute(tree, format),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
