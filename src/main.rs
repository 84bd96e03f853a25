//! # datainspect command-line entry point
//!
//! ```bash
//! datainspect profile data.csv
//! datainspect transform data.csv --pipeline steps.json --output cleaned.csv
//! datainspect filter data.csv --clauses clauses.json
//! datainspect operations
//! datainspect settings --write
//! ```
//!
//! Set `RUST_LOG=debug` to see every pipeline step and filter clause.

#![warn(clippy::all, rust_2018_idioms)]

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    if cli.quiet_files {
        datainspect::logging::init_console();
    } else if let Err(e) = datainspect::logging::init() {
        eprintln!("File logging unavailable ({e:#}), logging to console only");
        datainspect::logging::init_console();
    }

    cli::run_command(cli)
}
