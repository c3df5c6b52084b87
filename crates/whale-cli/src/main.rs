//! # whale — a simple container runtime
//!
//! Daemon-less two-stage container startup: `whale run` persists a
//! container descriptor and hands off to the stage executables.

mod commands;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
