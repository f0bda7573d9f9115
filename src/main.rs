//! Lexa CLI entry point.

use anyhow::Result;
use clap::Parser;
use lexa::cli::{commands, Cli, Commands};
use lexa::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("lexa={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Execute command
    match &cli.command {
        Commands::Complete { prompt, model, system } => {
            commands::run_complete(prompt, model.as_deref(), system.as_deref(), &settings).await?;
        }

        Commands::Generate { prompt, model } => {
            commands::run_generate(prompt, model.as_deref(), &settings).await?;
        }

        Commands::Embed { provider, input, model, workers } => {
            commands::run_embed(*provider, input.as_deref(), model.as_deref(), *workers, &settings)
                .await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings)?;
        }
    }

    Ok(())
}
