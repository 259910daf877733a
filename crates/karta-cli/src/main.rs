//! The `karta` command.

use std::io::{self, Write};

use clap::Parser;
use eyre::{Context, Result};

use karta_cli::config::CliConfig;
use karta_cli::logging::init_logging;
use karta_cli::{Cli, run};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::from_env()
        .wrap_err("invalid configuration")?
        .apply_overrides(cli.log_level);
    init_logging(&config);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting karta");

    let mut stdout = io::stdout().lock();
    run(&cli, &mut stdout)?;
    stdout.flush().wrap_err("failed to flush output")
}
