//! Command-line interface for the demonstration generator

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::algorithm::{Backtracking, Resolution};
use crate::io::error::Result;
use crate::io::presets::{build_propagator, describe, Preset};
use crate::io::render::render_plane;

/// Fixed seed for reproducible generation
pub const DEFAULT_SEED: u64 = 42;

#[derive(Parser)]
#[command(name = "wavetiles")]
#[command(
    author,
    version,
    about = "Generate tile grids by weighted constraint propagation"
)]
/// Command-line arguments for the demonstration generator
pub struct Cli {
    /// Demonstration model to generate
    #[arg(value_enum, default_value = "pipes")]
    pub model: Preset,

    /// Grid width in cells
    #[arg(short = 'W', long, default_value_t = 24)]
    pub width: usize,

    /// Grid height in cells
    #[arg(short = 'H', long, default_value_t = 16)]
    pub height: usize,

    /// Random seed for reproducible generation
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Observation history depth: -1 keeps all, 0 disables backtracking
    #[arg(short, long, default_value_t = -1, allow_hyphen_values = true)]
    pub backtrack: i64,

    /// Maximum observations before giving up
    #[arg(short = 'n', long)]
    pub steps: Option<usize>,

    /// Restarts with derived seeds after a terminal contradiction
    #[arg(short, long, default_value_t = 0)]
    pub retries: usize,

    /// Print the grid after every observation
    #[arg(short, long)]
    pub watch: bool,

    /// Suppress the progress display and summary line
    #[arg(short, long)]
    pub quiet: bool,
}

/// Run the generator according to the CLI arguments
///
/// # Errors
///
/// Returns an error for impossible configurations; contradictions and step
/// limits are reported in the summary, not as errors.
// Grid output is the program's purpose
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn run(cli: &Cli) -> Result<()> {
    let mut propagator = build_propagator(
        cli.model,
        cli.width,
        cli.height,
        cli.seed,
        Backtracking::from_depth(cli.backtrack),
    )?;

    let status = if cli.watch {
        let mut status = propagator.status();
        let mut steps_taken = 0usize;
        while status == Resolution::Undecided {
            if cli.steps.is_some_and(|limit| steps_taken >= limit) {
                break;
            }
            status = propagator.step()?;
            steps_taken += 1;
            println!("{}", render_plane(&propagator, 0, |&tile| tile));
        }
        status
    } else {
        let progress = (!cli.quiet).then(|| spinner(cli.model));
        let status = match cli.steps {
            Some(limit) => propagator.run_steps(limit)?,
            None => propagator.run_with_retries(cli.retries)?,
        };
        if let Some(progress) = progress {
            progress.finish_and_clear();
        }
        status
    };

    if !cli.watch {
        println!("{}", render_plane(&propagator, 0, |&tile| tile));
    }
    if !cli.quiet {
        eprintln!(
            "{}: {} ({} backtracks, seed {})",
            env!("CARGO_PKG_NAME"),
            describe(status),
            propagator.backtrack_count(),
            cli.seed
        );
    }
    Ok(())
}

fn spinner(preset: Preset) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(format!("collapsing {preset:?}"));
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}
