//! `qm`: a command-line front end for the equipment inventory.

use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}
