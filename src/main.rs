//! Packwright - a declarative asset pipeline for single-page applications.

mod actor;
mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod output;
mod pipeline;
mod reload;
mod resolve;
mod transform;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ProjectConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = ProjectConfig::load(cli)?;
    let mode = cli.mode();

    match &cli.command {
        Commands::Build { .. } => cli::build::build(&config, mode),
        Commands::Serve { .. } => cli::serve::serve(config, mode),
        Commands::Inspect { .. } => cli::inspect::inspect(&config, mode),
    }
}
