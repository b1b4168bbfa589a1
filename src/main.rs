//! Playlist Drawer - offline inspection tool for the drawer engine.
//!
//! Computes snap points for a layout, classifies gestures, prints dedup keys
//! and shows the row operations a list change produces, without a host UI.

mod cli;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("playlist_drawer=info".parse()?))
        .init();

    if !cli::run_command(&args)? {
        // No subcommand: show what the current configuration produces
        cli::print_summary()?;
    }
    Ok(())
}
