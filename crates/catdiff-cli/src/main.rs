//! catdiff - operator catalog diff generator CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use catdiff_cli::cmd;
use catdiff_cli::{Cli, Commands, IncludeCommands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Diff {
            new,
            old,
            config,
            heads_only,
            additive,
            skip_deps,
            fallback_channel,
            output,
        } => cmd::diff::diff(&cmd::diff::DiffOptions {
            new,
            old,
            config,
            heads_only,
            additive,
            skip_deps,
            fallback_channel,
            output,
        }),
        Commands::Images { path } => cmd::images::images(&path),
        Commands::Validate { path } => cmd::validate::validate(&path),
        Commands::Include { command } => match command {
            IncludeCommands::Init { path } => cmd::include::init(&path),
            IncludeCommands::Update { path, previous } => cmd::include::update(&path, &previous),
        },
    }
}
