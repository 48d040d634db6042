//! gql-from-source - extract a GraphQL schema from doc-comment tagged Rust code.
//!
//! # Usage
//!
//! ```bash
//! gql-from-source [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Write the schema as YAML and the resolver map next to it:
//! ```bash
//! gql-from-source ./my-server -o schema.yaml --resolvers resolvers.yaml
//! ```
//!
//! JSON output with nullable-by-default output types:
//! ```bash
//! gql-from-source ./my-server -f json --nullable-by-default
//! ```
//!
//! When extraction reports diagnostics they are printed to stderr as code
//! frames and the process exits with status 1.

use anyhow::Result;
use clap::Parser;
use gql_from_source::cli::{self, RunOutcome};
use log::info;

fn main() -> Result<()> {
    // Parse once up front so the verbose flag can configure the logger
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("gql-from-source starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    match cli::run(args)? {
        RunOutcome::Written => {
            info!("Schema extraction completed successfully");
            Ok(())
        }
        RunOutcome::Rejected(_) => std::process::exit(1),
    }
}
