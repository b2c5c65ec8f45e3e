mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use bazaar_process::Role;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Party viewing a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RoleArg {
    Customer,
    Provider,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Role {
        match role {
            RoleArg::Customer => Role::Customer,
            RoleArg::Provider => Role::Provider,
        }
    }
}

/// Marketplace client core: entity graph cache and transaction processes.
#[derive(Parser)]
#[command(
    name = "bazaar",
    version,
    about = "Inspect marketplace API responses and transaction processes"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a bazaar.toml configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a response envelope against the JSON Schema
    Validate {
        /// Path to the response JSON file
        response: PathBuf,
    },

    /// Merge response files in order and print the denormalized entities
    Resolve {
        /// Response JSON files, merged in the order given
        #[arg(required = true)]
        responses: Vec<PathBuf>,
        /// Root reference as type/id; defaults to the last response's data
        #[arg(long = "ref", value_name = "TYPE/ID")]
        refs: Vec<String>,
        /// Fail on references to resources that were never merged
        #[arg(long)]
        strict: bool,
    },

    /// Describe a transaction's lifecycle state for one party
    Describe {
        /// Response JSON files, merged in the order given
        #[arg(required = true)]
        responses: Vec<PathBuf>,
        /// Transaction id
        #[arg(long)]
        tx: String,
        /// Viewing party
        #[arg(long, value_enum)]
        role: RoleArg,
    },

    /// List registered processes, aliases and transitions
    Processes,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(msg) => {
                report_error(&msg, cli.output, cli.quiet);
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Commands::Validate { response } => {
            commands::validate::cmd_validate(&response, cli.output, cli.quiet);
        }
        Commands::Resolve {
            responses,
            refs,
            strict,
        } => {
            commands::resolve::cmd_resolve(
                &responses,
                &refs,
                strict,
                &config,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Describe {
            responses,
            tx,
            role,
        } => {
            commands::describe::cmd_describe(
                &responses,
                &tx,
                role.into(),
                &config,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Processes => {
            commands::processes::cmd_processes(&config, cli.output, cli.quiet);
        }
    }
}

/// Log to stderr, filtered by `BAZAAR_LOG` (default `warn`).
fn init_tracing(quiet: bool) {
    let default = if quiet { "error" } else { "warn" };
    let filter = EnvFilter::try_from_env("BAZAAR_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
