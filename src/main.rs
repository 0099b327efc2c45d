//! CLI entry point for the wavetiles demonstration generator

use clap::Parser;
use wavetiles::io::cli::{run, Cli};

fn main() -> wavetiles::Result<()> {
    let cli = Cli::parse();
    run(&cli)
}
