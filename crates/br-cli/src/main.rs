use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use br_cli::commands::{export, load_run, logs, parse_window, report, sections};
use br_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so command output stays pipeable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match &cli.command {
        Some(Commands::Sections { input, json }) => {
            let run = load_run(input, &config)?;
            sections::run(&mut out, &run, *json)?;
        }
        Some(Commands::Export { input, out: dir }) => {
            let run = load_run(input, &config)?;
            let dir = dir.as_ref().unwrap_or(&config.output_dir);
            export::run(&mut out, &run, dir)?;
        }
        Some(Commands::Logs {
            input,
            window,
            merged,
            json,
        }) => {
            let window = parse_window(window.as_deref(), &config)?;
            let mut run = load_run(input, &config)?;
            logs::run(
                &mut out,
                &mut run,
                &config.log_sections,
                &window,
                *merged,
                *json,
            )?;
        }
        Some(Commands::Report {
            input,
            window,
            json,
        }) => {
            let window = parse_window(window.as_deref(), &config)?;
            let mut run = load_run(input, &config)?;
            report::run(&mut out, &mut run, &config.log_sections, &window, *json)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            writeln!(out, "{}", Cli::command().render_help())?;
        }
    }

    out.flush()?;
    Ok(())
}
